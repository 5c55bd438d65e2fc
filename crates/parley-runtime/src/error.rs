//! Runtime error types.

use thiserror::Error;

use parley_framework::LoadError;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command failed to load.
    #[error("Failed to load command: {0}")]
    Load(#[from] LoadError),

    /// The event loop has been started; no new senders are handed out.
    #[error("Runtime is already running")]
    AlreadyRunning,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
