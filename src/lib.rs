pub mod channels;
pub mod config;
pub mod error;
pub mod kernel;
pub mod outputs;

// Re-export specific items if needed for convenient access
pub use config::EngineConfig;
pub use error::{GuardianError, Result};
pub use kernel::reactor::{EngineHandle, Reactor};
