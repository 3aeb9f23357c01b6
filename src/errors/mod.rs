pub mod tester_error;

pub use tester_error::{ErrorKind, TesterError, TesterResult};
