//! Built-in upstream profiles.
//!
//! These reproduce the upstream variants a gateway test suite usually needs
//! without writing a configuration file:
//! - `instant`: answers `/ping` immediately on port 8080
//! - `slow`: delays `/ping` by 3s on port 8082, well under a 10s gateway timeout
//! - `timeout`: delays `/ping` by 15s on port 8082, past a 10s gateway timeout
//!
//! `slow` and `timeout` share a port; they are alternative failure profiles
//! for the same simulated upstream and cannot run side by side.

use super::{MockConfig, RouteConfig, UpstreamConfig};
use clap::ValueEnum;
use serde_json::{Map, Value};
use std::net::{IpAddr, Ipv4Addr};

pub const INSTANT_PORT: u16 = 8080;
pub const DELAYED_PORT: u16 = 8082;

pub const SLOW_PING_DELAY_SECS: f64 = 3.0;
pub const TIMEOUT_PING_DELAY_SECS: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Profile {
    Instant,
    Slow,
    Timeout,
}

impl Profile {
    pub fn upstream_name(self) -> &'static str {
        match self {
            Profile::Instant => "mock-upstream",
            Profile::Slow => "mock-upstream-slow",
            Profile::Timeout => "mock-upstream-timeout",
        }
    }

    pub fn port(self) -> u16 {
        match self {
            Profile::Instant => INSTANT_PORT,
            Profile::Slow | Profile::Timeout => DELAYED_PORT,
        }
    }

    pub fn upstream(self) -> UpstreamConfig {
        let name = self.upstream_name();
        let port = self.port();

        let routes = match self {
            Profile::Instant => vec![ping_route(name, 0.0, None)],
            Profile::Slow => vec![
                ping_route(name, SLOW_PING_DELAY_SECS, Some(port)),
                fast_route(name, port),
            ],
            Profile::Timeout => vec![
                ping_route(name, TIMEOUT_PING_DELAY_SECS, Some(port)),
                fast_route(name, port),
            ],
        };

        UpstreamConfig {
            name: name.to_string(),
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            routes,
        }
    }
}

/// `/ping` answering `{"message":"pong","upstream":..,"status":"healthy"[,"port":..]}`.
pub fn ping_route(upstream: &str, delay_secs: f64, port: Option<u16>) -> RouteConfig {
    RouteConfig {
        path: "/ping".to_string(),
        delay_secs,
        status: 200,
        payload: payload("pong", upstream, port),
    }
}

/// `/fast` answering immediately, always tagged with the port.
pub fn fast_route(upstream: &str, port: u16) -> RouteConfig {
    RouteConfig {
        path: "/fast".to_string(),
        delay_secs: 0.0,
        status: 200,
        payload: payload("fast response", upstream, Some(port)),
    }
}

fn payload(message: &str, upstream: &str, port: Option<u16>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("message".to_string(), Value::from(message));
    fields.insert("upstream".to_string(), Value::from(upstream));
    fields.insert("status".to_string(), Value::from("healthy"));
    if let Some(port) = port {
        fields.insert("port".to_string(), Value::from(port));
    }
    fields
}

impl MockConfig {
    pub fn from_profiles(profiles: &[Profile]) -> Self {
        Self {
            upstreams: profiles.iter().map(|p| p.upstream()).collect(),
            metrics: None,
        }
    }
}

impl Default for MockConfig {
    /// The instant upstream on 8080 next to the slow one on 8082.
    fn default() -> Self {
        Self::from_profiles(&[Profile::Instant, Profile::Slow])
    }
}
