pub mod registry;
pub mod request;
pub mod responder;
pub mod response;

pub use registry::*;
pub use request::*;
pub use responder::*;
pub use response::*;
