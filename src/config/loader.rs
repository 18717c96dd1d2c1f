use crate::error::{MockError, Result};
use crate::upstream::EndpointRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MockConfig {
    pub upstreams: Vec<UpstreamConfig>,
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
}

/// One simulated upstream service: a single listener and its route table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub name: String,
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    pub port: u16,
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RouteConfig {
    pub path: String,
    #[serde(default)]
    pub delay_secs: f64,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)] // Empty object if missing
    pub payload: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MetricsConfig {
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    pub port: u16,
}

// Default value functions
fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_status() -> u16 {
    200
}

impl MockConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: MockConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that would otherwise only fail once the
    /// instances are started: empty configs, clashing listeners and
    /// invalid route tables.
    pub fn validate(&self) -> Result<()> {
        if self.upstreams.is_empty() {
            return Err(MockError::Config(
                "at least one upstream must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut addrs = HashSet::new();
        for upstream in &self.upstreams {
            if !names.insert(upstream.name.as_str()) {
                return Err(MockError::Config(format!(
                    "duplicate upstream name: {}",
                    upstream.name
                )));
            }
            // Port 0 asks the OS for an ephemeral port, so it never clashes.
            if upstream.port != 0 && !addrs.insert(upstream.addr()) {
                return Err(MockError::Config(format!(
                    "upstream {} reuses listen address {}",
                    upstream.name,
                    upstream.addr()
                )));
            }
            upstream.registry()?;
        }

        if let Some(metrics) = &self.metrics {
            if metrics.port != 0 && addrs.contains(&metrics.addr()) {
                return Err(MockError::Config(format!(
                    "metrics listener clashes with an upstream on {}",
                    metrics.addr()
                )));
            }
        }

        Ok(())
    }

    /// Rebinds every listener (upstreams and metrics) to `addr`.
    pub fn with_listen_addr(mut self, addr: IpAddr) -> Self {
        for upstream in &mut self.upstreams {
            upstream.bind = addr;
        }
        if let Some(metrics) = &mut self.metrics {
            metrics.bind = addr;
        }
        self
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        let bind = self
            .metrics
            .as_ref()
            .map(|m| m.bind)
            .unwrap_or_else(default_bind);
        self.metrics = Some(MetricsConfig { bind, port });
        self
    }
}

impl UpstreamConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn registry(&self) -> Result<EndpointRegistry> {
        EndpointRegistry::from_routes(&self.routes).map_err(|e| match e {
            MockError::Config(msg) => MockError::Config(format!("upstream {}: {}", self.name, msg)),
            other => other,
        })
    }
}

impl MetricsConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
