pub mod collector;
pub mod exporter;

pub use collector::*;
pub use exporter::*;
