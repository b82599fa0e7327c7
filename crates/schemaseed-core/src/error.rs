use thiserror::Error;

/// Schema-level errors raised by the core crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("foreign key on {entity} references missing entity {referenced}")]
    MissingReference { entity: String, referenced: String },
}

pub type Result<T> = std::result::Result<T, Error>;
