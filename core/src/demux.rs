//! Pending-request table shared by the SYN prober and the resolver.
//!
//! A request registers its key before anything goes on the wire and gets back
//! a [`Pending`] handle. The receive loop looks replies up by key and completes
//! the matching entry. Dropping the handle, on timeout or cancellation, removes
//! the entry, so a late reply finds nothing and is discarded.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

struct Entry<C, V> {
    token: u64,
    context: C,
    tx: oneshot::Sender<V>,
}

pub struct PendingTable<K, C, V> {
    entries: Mutex<HashMap<K, Entry<C, V>>>,
    next_token: AtomicU64,
}

impl<K, C, V> Default for PendingTable<K, C, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
        }
    }
}

impl<K, C, V> PendingTable<K, C, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key`. `None` when another request already holds it.
    ///
    /// `context` is handed back to the receive loop in [`PendingTable::resolve`]
    /// so it can check a reply against the request (sequence numbers, record
    /// type) before accepting it.
    pub fn register(self: &Arc<Self>, key: K, context: C) -> Option<Pending<K, C, V>> {
        let mut entries = self.lock();
        if entries.contains_key(&key) {
            return None;
        }

        let token: u64 = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        entries.insert(key.clone(), Entry { token, context, tx });

        Some(Pending {
            table: Arc::clone(self),
            key,
            token,
            rx,
        })
    }

    /// Completes the entry for `key` with whatever `accept` builds from its
    /// context. Returns `false` when no request waits on `key` or `accept`
    /// rejects the reply; the entry then stays in place.
    pub fn resolve<F>(&self, key: &K, accept: F) -> bool
    where
        F: FnOnce(&C) -> Option<V>,
    {
        let mut entries = self.lock();
        let Some(entry) = entries.get(key) else {
            return false;
        };
        let Some(value) = accept(&entry.context) else {
            return false;
        };

        match entries.remove(key) {
            // The waiter may have given up between lookup and send.
            Some(entry) => entry.tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, key: &K, token: u64) {
        let mut entries = self.lock();
        if entries.get(key).is_some_and(|entry| entry.token == token) {
            entries.remove(key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<C, V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration handle of one outstanding request.
pub struct Pending<K, C, V>
where
    K: Eq + Hash + Clone,
{
    table: Arc<PendingTable<K, C, V>>,
    key: K,
    token: u64,
    rx: oneshot::Receiver<V>,
}

impl<K, C, V> Pending<K, C, V>
where
    K: Eq + Hash + Clone,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Waits for the reply. `None` once `timeout` has elapsed.
    pub async fn wait(mut self, timeout: Duration) -> Option<V> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(value)) => Some(value),
            _ => None,
        }
    }
}

impl<K, C, V> Drop for Pending<K, C, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        self.table.release(&self.key, self.token);
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
