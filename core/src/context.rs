//! Everything a probe needs, opened once per run and passed explicitly.

use std::net::SocketAddr;
use std::sync::Arc;

use recon_common::config::Config;
use recon_common::error::StartupError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::network::nameserver;
use crate::network::transport::{self, Inbound, ListenerGuard, SegmentSender};
use crate::resolver::DnsResolver;
use crate::scanner::syn::{self, SynEngine};

/// Shared handle to the sockets, listener threads and configuration of a run.
///
/// Cloning is cheap. The resources are released when the last clone is
/// dropped, or explicitly with [`NetworkContext::shutdown`].
#[derive(Clone)]
pub struct NetworkContext {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    resolver: DnsResolver,
    syn: Option<SynRuntime>,
}

struct SynRuntime {
    engine: Arc<SynEngine>,
    listeners: Option<ListenerGuard>,
    demux: JoinHandle<()>,
}

impl Drop for SynRuntime {
    fn drop(&mut self) {
        self.demux.abort();
    }
}

impl NetworkContext {
    /// Opens the resolver socket and, when `raw_sockets` is set, the raw TCP
    /// and ICMP channels. Missing privileges surface here as
    /// [`StartupError::Privilege`], before anything is sent.
    pub async fn open(config: Config, raw_sockets: bool) -> Result<Self, StartupError> {
        let syn = if raw_sockets {
            let channels = transport::start_packet_capture()?;
            let sender: Arc<dyn SegmentSender> = Arc::new(channels.sender);
            Some(spawn_syn_runtime(&config, sender, channels.inbound, Some(channels.listeners)))
        } else {
            None
        };
        Self::assemble(config, syn).await
    }

    /// Opens a context whose SYN probes go through `sender` and whose replies
    /// are read from `inbound` instead of raw sockets.
    pub async fn with_segment_sender(
        config: Config,
        sender: Arc<dyn SegmentSender>,
        inbound: mpsc::UnboundedReceiver<Inbound>,
    ) -> Result<Self, StartupError> {
        let syn = spawn_syn_runtime(&config, sender, inbound, None);
        Self::assemble(config, Some(syn)).await
    }

    async fn assemble(config: Config, syn: Option<SynRuntime>) -> Result<Self, StartupError> {
        let nameserver: SocketAddr = match config.nameserver {
            Some(nameserver) => nameserver,
            None => nameserver::system_nameserver(),
        };
        let resolver = DnsResolver::bind(nameserver).await?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                resolver,
                syn,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn resolver(&self) -> &DnsResolver {
        &self.inner.resolver
    }

    pub fn nameserver(&self) -> SocketAddr {
        self.inner.resolver.nameserver()
    }

    /// `None` when the context was opened without raw sockets.
    pub fn syn_engine(&self) -> Option<&Arc<SynEngine>> {
        self.inner.syn.as_ref().map(|syn| &syn.engine)
    }

    /// Stops the listeners and waits for their sockets to close.
    ///
    /// With other clones still alive this only drops this handle.
    pub async fn shutdown(self) {
        let Ok(inner) = Arc::try_unwrap(self.inner) else {
            debug!("Network context still shared, leaving shutdown to the last handle");
            return;
        };
        let Some(mut syn) = inner.syn else {
            return;
        };
        syn.demux.abort();
        if let Some(listeners) = syn.listeners.take()
            && tokio::task::spawn_blocking(move || listeners.join()).await.is_err()
        {
            warn!("Listener shutdown was interrupted");
        }
    }
}

fn spawn_syn_runtime(
    config: &Config,
    sender: Arc<dyn SegmentSender>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    listeners: Option<ListenerGuard>,
) -> SynRuntime {
    let engine = Arc::new(SynEngine::new(sender, config.send_rst));
    let demux = tokio::spawn(syn::run_demux(Arc::clone(&engine), inbound));
    SynRuntime {
        engine,
        listeners,
        demux,
    }
}
