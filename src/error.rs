//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.

use thiserror::Error;

/// Main error type for Porepath operations
#[derive(Error, Debug)]
pub enum PorepathError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input (negative probability, bad base character, move over threshold)
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Topology violations detected when constructing an HMM
    #[error("Invalid topology: {message}")]
    InvalidTopology { message: String },

    /// Viterbi could not reach any state with positive probability
    #[error("no viable path through the model for this emission sequence")]
    NoViablePath,

    /// Linear-scale forward weights collapsed to zero across a whole row
    #[error("forward weights underflowed to zero at row {row}")]
    Underflow { row: usize },

    /// Model document missing required fields or carrying an unknown state tag
    #[error("Deserialization error: {message}")]
    Deserialization { message: String },

    /// Configuration errors (invalid CLI arguments)
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Type alias for Results using PorepathError
pub type Result<T> = std::result::Result<T, PorepathError>;

impl PorepathError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid topology error
    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Create a deserialization error
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// Convert serde_json errors to PorepathError
impl From<serde_json::Error> for PorepathError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization {
            message: err.to_string(),
        }
    }
}
