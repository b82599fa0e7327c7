//! Seed planning for schemaseed.
//!
//! Turns a schema graph into an insertion order (cycle resolution plus
//! include/exclude filtering), and defines the seed configuration contract
//! together with its structural and semantic validation.

pub mod cycles;
pub mod document;
pub mod errors;
pub mod model;
pub mod planner;
pub mod schema;
pub mod validate;

pub use cycles::{CycleResolution, CycleStrategy, resolve_cycles};
pub use document::{
    CollectionConfig, DocumentConfig, DocumentPlan, FieldConfig, FieldKind, FieldSpec,
    create_document_plan,
};
pub use errors::{IssueSeverity, PlanError, Result, ValidationIssue, ValidationReport};
pub use model::{
    DEFAULT_BATCH_SIZE, DEFAULT_ROW_COUNT, OverrideSpec, RowCount, SeedConfig, parse_instant,
};
pub use planner::{PlanOptions, SeedPlan, create_seed_plan};
pub use schema::config_json_schema;
pub use validate::{
    ValidatedConfig, validate_config, validate_config_against_schema, validate_config_json,
};
