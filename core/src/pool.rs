//! Bounded worker pool.
//!
//! Items are pulled lazily from the input iterator, at most `workers` tasks run
//! at once, and results are delivered through a bounded channel in completion
//! order. Dropping the receiver stops the dispatcher from starting new work.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::debug;

pub fn dispatch<I, F, Fut, T>(items: I, workers: usize, task: F) -> mpsc::Receiver<T>
where
    I: IntoIterator + Send + 'static,
    I::IntoIter: Send,
    I::Item: Send + 'static,
    F: Fn(I::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let workers: usize = workers.max(1);
    let (tx, rx) = mpsc::channel::<T>(workers);
    let semaphore: Arc<Semaphore> = Arc::new(Semaphore::new(workers));

    tokio::spawn(async move {
        let mut dispatched: usize = 0;
        for item in items {
            if tx.is_closed() {
                debug!("Result receiver dropped after {dispatched} tasks");
                break;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };

            let fut = task(item);
            let tx = tx.clone();
            tokio::spawn(async move {
                let result: T = fut.await;
                let _ = tx.send(result).await;
                drop(permit);
            });
            dispatched += 1;
        }
    });

    rx
}

/// Drains a result channel into a vector.
pub async fn collect<T>(mut rx: mpsc::Receiver<T>) -> Vec<T> {
    let mut results: Vec<T> = Vec::new();
    while let Some(result) = rx.recv().await {
        results.push(result);
    }
    results
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
