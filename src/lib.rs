pub mod config;
pub mod core;
pub mod errors;

// Re-export commonly used items for convenience
pub use config::TesterConfig;
pub use self::core::*;
pub use errors::{ErrorKind, TesterError, TesterResult};
