use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MockError {
    /// The listener could not be bound; fatal at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no route for path {0}")]
    RouteNotFound(String),

    #[error("failed to encode payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// A listener task panicked or was cancelled while serving.
    #[error("listener task failed: {0}")]
    Listener(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, MockError>;
