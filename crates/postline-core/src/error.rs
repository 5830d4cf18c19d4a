//! Error types for postline core.

use crate::chart::ChartError;
use crate::config::ConfigError;
use crate::publish::PublishError;
use postline_abstraction::ModelError;
use thiserror::Error;

/// Core error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PostlineError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Model construction errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Chart rendering errors
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    /// Publishing errors that prevented the local artifact from being written
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid pipeline input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for postline operations.
pub type Result<T> = std::result::Result<T, PostlineError>;
