pub mod loader;
pub mod profiles;
pub use loader::*;
pub use profiles::Profile;
