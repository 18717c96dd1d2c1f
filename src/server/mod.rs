pub mod connection;

use crate::config::{MockConfig, UpstreamConfig};
use crate::error::{MockError, Result};
use crate::metrics::{MetricsCollector, MetricsExporter};
use crate::upstream::{EndpointRegistry, Responder};
use log::{error, info};
use std::future::{pending, Future};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

pub use self::connection::{http1_builder, serve_connection, HEADER_READ_TIMEOUT};

/// One simulated upstream service: a name, the address it will listen on and
/// its route table. Nothing is bound until [`UpstreamInstance::bind`].
#[derive(Debug, Clone)]
pub struct UpstreamInstance {
    name: String,
    addr: SocketAddr,
    registry: EndpointRegistry,
    header_read_timeout: Duration,
}

impl UpstreamInstance {
    pub fn new(name: impl Into<String>, addr: SocketAddr, registry: EndpointRegistry) -> Self {
        Self {
            name: name.into(),
            addr,
            registry,
            header_read_timeout: HEADER_READ_TIMEOUT,
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        Ok(Self::new(config.name.clone(), config.addr(), config.registry()?))
    }

    /// Connections that have not delivered a full request head within
    /// `timeout` are closed.
    pub fn with_header_read_timeout(mut self, timeout: Duration) -> Self {
        self.header_read_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub async fn bind(self, metrics: &MetricsCollector) -> Result<BoundInstance> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| MockError::Bind {
                addr: self.addr,
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let metrics = metrics.for_upstream(&self.name);
        let responder = Responder::new(self.name, self.registry, metrics);

        Ok(BoundInstance {
            listener,
            local_addr,
            responder: Arc::new(responder),
            header_read_timeout: self.header_read_timeout,
        })
    }
}

/// An upstream instance holding its listener, ready to serve.
pub struct BoundInstance {
    listener: TcpListener,
    local_addr: SocketAddr,
    responder: Arc<Responder>,
    header_read_timeout: Duration,
}

impl BoundInstance {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn name(&self) -> &str {
        self.responder.upstream()
    }

    pub fn responder(&self) -> Arc<Responder> {
        self.responder.clone()
    }

    /// Accepts connections until the task is dropped or aborted.
    pub async fn serve(self) {
        self.serve_until(pending()).await
    }

    /// Accepts connections until `shutdown` resolves. Connections already
    /// accepted keep running to completion.
    pub async fn serve_until(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("[{}] stopped listening on {}", self.name(), self.local_addr);
                    return;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(serve_connection(
                            stream,
                            peer,
                            self.responder.clone(),
                            self.header_read_timeout,
                        ));
                    }
                    Err(e) => {
                        error!("[{}] connection error: {}", self.name(), e);
                    }
                },
            }
        }
    }
}

/// Binds every configured upstream (and the metrics listener, if any) and
/// serves them.
///
/// All listeners are bound before any starts serving, so a port conflict
/// aborts startup without leaving a partially running set. A listener task
/// that fails leaves the others serving; the failure is returned once every
/// task has ended.
pub async fn serve_all(config: &MockConfig, metrics: Arc<MetricsCollector>) -> Result<()> {
    config.validate()?;

    let mut bound = Vec::with_capacity(config.upstreams.len());
    for upstream in &config.upstreams {
        let instance = UpstreamInstance::from_config(upstream)?.bind(&metrics).await?;
        info!(
            "[{}] listening on http://{}",
            instance.name(),
            instance.local_addr()
        );
        for route in instance.responder().registry().routes() {
            info!(
                "[{}]   GET {} -> {} after {:?}",
                instance.name(),
                route.path(),
                route.status(),
                route.delay()
            );
        }
        bound.push(instance);
    }

    let exporter = match &config.metrics {
        Some(metrics_config) => {
            let exporter = MetricsExporter::bind(metrics_config.addr(), metrics.clone()).await?;
            info!("metrics on http://{}/metrics", exporter.local_addr());
            Some(exporter)
        }
        None => None,
    };

    let mut tasks = JoinSet::new();
    for instance in bound {
        tasks.spawn(instance.serve());
    }
    if let Some(exporter) = exporter {
        tasks.spawn(exporter.serve());
    }

    join_listeners(tasks).await
}

async fn join_listeners(mut tasks: JoinSet<()>) -> Result<()> {
    let mut failure = None;

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("listener task failed: {}", e);
            failure.get_or_insert(e);
        }
    }

    match failure {
        Some(e) => Err(MockError::Listener(e)),
        None => Ok(()),
    }
}
