pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod upstream;

pub use config::*;
pub use error::MockError;
pub use metrics::*;
pub use server::{serve_all, BoundInstance, UpstreamInstance};
pub use upstream::*;
