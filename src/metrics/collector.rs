use crate::error::Result;
use crate::upstream::Outcome;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Latency buckets around the delays gateways are usually tested against.
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.05, 0.1, 0.5, 1.0, 3.0, 5.0, 10.0, 15.0, 30.0];

/// Process-wide request counters, one label set per upstream instance.
///
/// Each collector owns its own registry so independent collectors (tests,
/// embedded use) never fight over the global one.
pub struct MetricsCollector {
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("mock_upstream_requests_total", "Requests by terminal outcome"),
            &["upstream", "outcome"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new(
                "mock_upstream_response_latency_seconds",
                "Time from request arrival to response for answered requests",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["upstream"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            requests,
            latency,
        })
    }

    pub fn for_upstream(&self, upstream: &str) -> UpstreamMetrics {
        UpstreamMetrics {
            upstream: upstream.to_string(),
            requests: self.requests.clone(),
            latency: self.latency.clone(),
        }
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Handle on the collector scoped to one upstream instance.
#[derive(Clone)]
pub struct UpstreamMetrics {
    upstream: String,
    requests: IntCounterVec,
    latency: HistogramVec,
}

impl UpstreamMetrics {
    pub fn record(&self, outcome: Outcome, latency: Duration) {
        self.requests
            .with_label_values(&[self.upstream.as_str(), outcome.as_str()])
            .inc();

        if outcome == Outcome::Responded {
            self.latency
                .with_label_values(&[self.upstream.as_str()])
                .observe(latency.as_secs_f64());
        }
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        self.requests
            .with_label_values(&[self.upstream.as_str(), outcome.as_str()])
            .get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_are_scoped_per_upstream() {
        let collector = MetricsCollector::new().unwrap();
        let fast = collector.for_upstream("fast");
        let slow = collector.for_upstream("slow");

        fast.record(Outcome::Responded, Duration::from_millis(1));
        fast.record(Outcome::Responded, Duration::from_millis(2));
        slow.record(Outcome::Abandoned, Duration::from_secs(10));

        assert_eq!(fast.count(Outcome::Responded), 2);
        assert_eq!(fast.count(Outcome::Abandoned), 0);
        assert_eq!(slow.count(Outcome::Abandoned), 1);
    }

    #[test]
    fn test_render_exposition() {
        let collector = MetricsCollector::new().unwrap();
        let upstream = collector.for_upstream("mock-upstream");
        upstream.record(Outcome::Responded, Duration::from_secs(3));
        upstream.record(Outcome::NotFound, Duration::ZERO);

        let text = collector.render().unwrap();
        assert!(text.contains(
            r#"mock_upstream_requests_total{outcome="responded",upstream="mock-upstream"} 1"#
        ));
        assert!(text.contains(
            r#"mock_upstream_requests_total{outcome="not_found",upstream="mock-upstream"} 1"#
        ));
        assert!(text.contains(
            r#"mock_upstream_response_latency_seconds_count{upstream="mock-upstream"} 1"#
        ));
    }

    #[test]
    fn test_independent_collectors() {
        // Two collectors in one process must not clash on registration.
        let first = MetricsCollector::new().unwrap();
        let second = MetricsCollector::new().unwrap();

        first.for_upstream("a").record(Outcome::Responded, Duration::ZERO);
        assert_eq!(second.for_upstream("a").count(Outcome::Responded), 0);
    }
}
