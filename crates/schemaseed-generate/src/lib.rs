//! Deterministic row and document generation for schemaseed.
//!
//! All randomness flows through [`SeedRandom`]; the uniqueness and reference
//! registries are scoped to one run through [`GenerationState`].

pub mod document;
pub mod errors;
pub mod generators;
pub mod overrides;
pub mod random;
pub mod refs;
pub mod row;
pub mod uniqueness;

pub use document::{DocumentContext, generate_document, generate_documents, reference_key};
pub use errors::GenerationError;
pub use generators::{
    FnGenerator, Generator, GeneratorCall, GeneratorRegistry, InferredGenerator,
};
pub use overrides::{FieldOverride, OverrideFn, OverrideInput, Overrides, override_fn};
pub use random::SeedRandom;
pub use refs::ReferenceRegistry;
pub use row::{GenerationContext, GenerationState, Row, generate_row, generate_rows};
pub use uniqueness::{DEFAULT_MAX_RETRIES, UniquenessRegistry};
