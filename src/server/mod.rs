//! Process plumbing around the core.
//!
//! - **`listener`**: Accept loop with a bounded worker pool and graceful drain
//! - **`shutdown`**: Shared shutdown signal
//! - **`control`**: `exit` command read from standard input

pub mod control;
pub mod listener;
pub mod shutdown;

pub use shutdown::Shutdown;
