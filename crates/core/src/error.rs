//! Error types shared by the shapes crates.

use thiserror::Error;

/// Top-level error type for the shapes demo.
#[derive(Error, Debug)]
pub enum Error {
    /// Graphics backend failure (device, submission, fence)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// Geometry or material construction errors
    #[error("Resource error: {0}")]
    Resource(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the shapes [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
