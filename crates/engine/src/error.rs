use thiserror::Error;

/// Failures raised by the interpreter.
///
/// Messages follow the engine's own diagnostic style (`object 'x' not
/// found`, `could not find function "f"`); the variant records which stage
/// produced them.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    /// The source text could not be tokenized or parsed.
    #[error("{0}")]
    Syntax(String),
    /// Evaluation raised a fault, including `stop()`.
    #[error("{0}")]
    Eval(String),
    /// A resource guard tripped; the interpreter considers this
    /// unrecoverable and has already raised the fatal callback.
    #[error("{0}")]
    Limit(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
