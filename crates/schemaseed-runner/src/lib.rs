//! Transactional seeding runs against relational and document adapters.
//!
//! A run is: safety gate, connect, optional truncate, begin, then for each
//! planned entity generate, hook, insert in batches and record keys, then
//! commit. Disconnect always happens exactly once. Pre-flight problems are
//! returned as [`SeedError`]; everything after connect lands in the
//! [`EffectReport`].

pub mod adapter;
pub mod document;
pub mod errors;
pub mod hooks;
pub mod options;
pub mod plugins;
pub mod report;
pub mod safety;
pub mod sql;

mod keys;

pub use adapter::{AdapterCapabilities, AdapterError, DocumentAdapter, InsertBatch, SqlAdapter};
pub use document::run_seed_documents;
pub use errors::SeedError;
pub use hooks::{HookChain, HookError, SeedHooks};
pub use options::SeedOptions;
pub use plugins::Plugin;
pub use report::{EffectReport, EntityStats, ReportError};
pub use safety::{SafetyError, check_production_safety, detect_production};
pub use sql::run_seed_sql;
