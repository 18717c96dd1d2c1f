use http::Method;
use tokio::time::Instant;

/// An inbound request as handed over by hyper. Lives for one exchange.
#[derive(Debug, Clone)]
pub struct MockRequest {
    method: Method,
    path: String,
    arrived_at: Instant,
}

impl MockRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            arrived_at: Instant::now(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn arrived_at(&self) -> Instant {
        self.arrived_at
    }
}
