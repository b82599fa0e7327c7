use thiserror::Error;

/// Errors emitted while generating rows or documents.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid override for '{field}': {message}")]
    InvalidOverride { field: String, message: String },
    #[error("generator '{id}' failed: {message}")]
    Generator { id: String, message: String },
    #[error("override for '{field}' failed: {message}")]
    OverrideFailed { field: String, message: String },
    #[error("invalid document config: {0}")]
    InvalidDocument(String),
}
