use thiserror::Error;

/// Errors surfaced across the session boundary.
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// The interpreter raised a fault while evaluating a command.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
    /// Host-side codec failure while moving a value across the boundary.
    #[error("Serialization failed: {0}")]
    Serialization(String),
    /// The caller used an identifier the bridge reserves for itself.
    #[error("Invalid name: {0}")]
    InvalidName(String),
    /// A `get` failed. The cause is discarded on purpose: retrieval
    /// failures all look alike to the caller.
    #[error("The requested variable could not be retrieved")]
    Retrieval,
    /// A failure outside the interpreter's own error protocol.
    #[error("Unknown error encountered")]
    Unknown,
}

pub type Result<T> = std::result::Result<T, Error>;
