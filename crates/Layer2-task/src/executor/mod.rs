//! Command executors
//!
//! - `LocalExecutor` - spawns the command on the host with a single timeout

pub mod local;
pub mod r#trait;

pub use local::LocalExecutor;
pub use r#trait::{Executor, ProcessOutput};
