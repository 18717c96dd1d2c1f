use super::{EndpointRegistry, MockRequest, MockResponse};
use crate::metrics::UpstreamMetrics;
use http::Method;
use log::{debug, info};
use tokio::time::sleep;

/// Terminal state of a request.
///
/// A request moves `Received -> Delaying -> Responded`, or ends early in one
/// of the other states. Nothing is ever retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Responded,
    NotFound,
    MethodNotAllowed,
    /// The caller hung up while the delay was still running.
    Abandoned,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Responded => "responded",
            Outcome::NotFound => "not_found",
            Outcome::MethodNotAllowed => "method_not_allowed",
            Outcome::Abandoned => "abandoned",
        }
    }
}

/// Resolves a request against the registry, waits out the route's delay and
/// produces its fixed response.
///
/// The connection drops the `handle` future when the caller goes away. A
/// future dropped mid-delay records the request as abandoned and nothing
/// else happens.
pub struct Responder {
    upstream: String,
    registry: EndpointRegistry,
    metrics: UpstreamMetrics,
}

impl Responder {
    pub fn new(upstream: impl Into<String>, registry: EndpointRegistry, metrics: UpstreamMetrics) -> Self {
        Self {
            upstream: upstream.into(),
            registry,
            metrics,
        }
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &UpstreamMetrics {
        &self.metrics
    }

    pub async fn handle(&self, request: &MockRequest) -> MockResponse {
        let policy = match self.registry.resolve(request.path()) {
            Ok(policy) => policy,
            Err(e) => {
                debug!("[{}] {} {}: {}", self.upstream, request.method(), request.path(), e);
                self.record(request, Outcome::NotFound);
                return MockResponse::not_found();
            }
        };

        let head = match *request.method() {
            Method::GET => false,
            Method::HEAD => true,
            _ => {
                debug!(
                    "[{}] {} {}: method not allowed",
                    self.upstream,
                    request.method(),
                    request.path()
                );
                self.record(request, Outcome::MethodNotAllowed);
                return MockResponse::method_not_allowed();
            }
        };

        if !policy.delay().is_zero() {
            debug!(
                "[{}] {} {}: delaying {:?}",
                self.upstream,
                request.method(),
                request.path(),
                policy.delay()
            );
            let mut pending = InFlight {
                responder: self,
                request,
                finished: false,
            };
            sleep(policy.delay()).await;
            pending.finished = true;
        }

        let latency = request.arrived_at().elapsed();
        debug!(
            "[{}] {} {}: {} after {:?}",
            self.upstream,
            request.method(),
            request.path(),
            policy.status(),
            latency
        );
        self.record(request, Outcome::Responded);

        if head {
            MockResponse::head_from_policy(policy)
        } else {
            MockResponse::from_policy(policy)
        }
    }

    /// Records a request whose caller went away before it was answered.
    pub fn abandon(&self, request: &MockRequest) {
        info!(
            "[{}] {} {}: caller disconnected after {:?}, response dropped",
            self.upstream,
            request.method(),
            request.path(),
            request.arrived_at().elapsed()
        );
        self.record(request, Outcome::Abandoned);
    }

    pub fn record(&self, request: &MockRequest, outcome: Outcome) {
        self.metrics.record(outcome, request.arrived_at().elapsed());
    }
}

/// Marks a request as abandoned if its delay is dropped before it elapses.
struct InFlight<'a> {
    responder: &'a Responder,
    request: &'a MockRequest,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.responder.abandon(self.request);
        }
    }
}
