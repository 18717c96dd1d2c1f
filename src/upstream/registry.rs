use crate::config::RouteConfig;
use crate::error::{MockError, Result};
use bytes::Bytes;
use http::StatusCode;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Fixed behavior of a single GET route: how long to wait and what to send.
///
/// The JSON body is rendered once at construction so every request to the
/// route returns byte-identical output.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePolicy {
    path: String,
    delay: Duration,
    payload: Map<String, Value>,
    status: StatusCode,
    body: Bytes,
}

impl RoutePolicy {
    pub fn new(
        path: impl Into<String>,
        delay: Duration,
        payload: Map<String, Value>,
        status: u16,
    ) -> Result<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(MockError::Config(format!(
                "route path must start with '/': {}",
                path
            )));
        }

        let status = StatusCode::from_u16(status)
            .map_err(|_| MockError::Config(format!("invalid status code {} for {}", status, path)))?;

        let body = Bytes::from(serde_json::to_vec(&payload)?);

        Ok(Self {
            path,
            delay,
            payload,
            status,
            body,
        })
    }

    pub fn from_config(route: &RouteConfig) -> Result<Self> {
        let delay = parse_delay(route.delay_secs).ok_or_else(|| {
            MockError::Config(format!(
                "invalid delay {} for {}: must be a finite, non-negative number of seconds",
                route.delay_secs, route.path
            ))
        })?;

        Self::new(route.path.clone(), delay, route.payload.clone(), route.status)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Serialized payload, field order preserved.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

fn parse_delay(secs: f64) -> Option<Duration> {
    if secs.is_sign_negative() {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// Exact-match route table of one upstream instance.
///
/// Built once and never mutated; lookups are shared freely across
/// connection tasks.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    policies: Vec<RoutePolicy>,
    index: HashMap<String, usize>,
}

impl EndpointRegistry {
    pub fn new(policies: Vec<RoutePolicy>) -> Result<Self> {
        let mut index = HashMap::with_capacity(policies.len());
        for (position, policy) in policies.iter().enumerate() {
            if index.insert(policy.path.clone(), position).is_some() {
                return Err(MockError::Config(format!(
                    "duplicate route path: {}",
                    policy.path
                )));
            }
        }

        Ok(Self { policies, index })
    }

    pub fn from_routes(routes: &[RouteConfig]) -> Result<Self> {
        let policies = routes
            .iter()
            .map(RoutePolicy::from_config)
            .collect::<Result<Vec<_>>>()?;
        Self::new(policies)
    }

    pub fn resolve(&self, path: &str) -> Result<&RoutePolicy> {
        self.index
            .get(path)
            .map(|&position| &self.policies[position])
            .ok_or_else(|| MockError::RouteNotFound(path.to_string()))
    }

    /// Policies in configuration order.
    pub fn routes(&self) -> impl Iterator<Item = &RoutePolicy> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route(path: &str, delay_secs: f64) -> RouteConfig {
        let payload = json!({ "message": "pong", "upstream": "test", "status": "healthy" });
        RouteConfig {
            path: path.to_string(),
            delay_secs,
            status: 200,
            payload: payload.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_resolve_exact_match() {
        let registry = EndpointRegistry::from_routes(&[route("/ping", 3.0), route("/fast", 0.0)]).unwrap();

        let ping = registry.resolve("/ping").unwrap();
        assert_eq!(ping.path(), "/ping");
        assert_eq!(ping.delay(), Duration::from_secs(3));
        assert_eq!(ping.status(), StatusCode::OK);

        assert!(registry.resolve("/fast").unwrap().delay().is_zero());
    }

    #[test]
    fn test_unmatched_paths_not_found() {
        let registry = EndpointRegistry::from_routes(&[route("/ping", 0.0)]).unwrap();

        for path in ["/missing", "/ping/", "/PING", "/pin", ""] {
            assert!(
                matches!(registry.resolve(path), Err(MockError::RouteNotFound(_))),
                "{} should not resolve",
                path
            );
        }
    }

    #[test]
    fn test_body_keeps_field_order() {
        let registry = EndpointRegistry::from_routes(&[route("/ping", 0.0)]).unwrap();
        let body = registry.resolve("/ping").unwrap().body();

        assert_eq!(
            &body[..],
            br#"{"message":"pong","upstream":"test","status":"healthy"}"#
        );
    }

    #[test]
    fn test_fractional_delay() {
        let registry = EndpointRegistry::from_routes(&[route("/ping", 0.25)]).unwrap();
        assert_eq!(registry.resolve("/ping").unwrap().delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_delays_rejected() {
        for delay in [-1.0, -0.0, f64::NAN, f64::INFINITY] {
            assert!(
                EndpointRegistry::from_routes(&[route("/ping", delay)]).is_err(),
                "delay {} should be rejected",
                delay
            );
        }
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let result = EndpointRegistry::from_routes(&[route("/ping", 0.0), route("/ping", 15.0)]);
        assert!(matches!(result, Err(MockError::Config(_))));
    }

    #[test]
    fn test_relative_path_rejected() {
        assert!(EndpointRegistry::from_routes(&[route("ping", 0.0)]).is_err());
    }

    #[test]
    fn test_custom_status() {
        let mut failing = route("/error", 0.0);
        failing.status = 503;
        let registry = EndpointRegistry::from_routes(&[failing]).unwrap();
        assert_eq!(registry.resolve("/error").unwrap().status(), StatusCode::SERVICE_UNAVAILABLE);

        let mut invalid = route("/bad", 0.0);
        invalid.status = 42;
        assert!(EndpointRegistry::from_routes(&[invalid]).is_err());
    }

    #[test]
    fn test_routes_in_configuration_order() {
        let registry = EndpointRegistry::from_routes(&[route("/b", 0.0), route("/a", 0.0)]).unwrap();
        let paths: Vec<&str> = registry.routes().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["/b", "/a"]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }
}
