//! Core contracts for schemaseed.
//!
//! This crate defines the schema graph consumed by the planner and the row
//! generator, the foreign-key dependency graph with its topological sorter,
//! schema validation, and redaction helpers shared by the runner and the CLI.

pub mod constraints;
pub mod error;
pub mod graph;
pub mod redaction;
pub mod schema;
pub mod types;
pub mod validation;

pub use constraints::{FkAction, ForeignKey, PrimaryKey, UniqueConstraint};
pub use error::{Error, Result};
pub use graph::{DependencyGraph, DependencyNode, GraphSummary, TopoSort};
pub use redaction::{
    REDACTED_PLACEHOLDER, RedactedConnection, is_sensitive_field, redact_connection_string,
    redact_row,
};
pub use schema::{Column, EntitySchema, SchemaGraph};
pub use types::{NormalizedType, Seed};
pub use validation::validate_schema;

/// Current contract version for `schema.json` artifacts.
pub const SCHEMA_VERSION: &str = "0.1";
