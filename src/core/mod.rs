/// Core Module for sqlship
///
/// Shared infrastructure: the error type and the database driver layer the
/// orchestrator runs scripts through.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, SqlshipError};
