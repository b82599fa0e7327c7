use thiserror::Error;

use schemaseed_generate::GenerationError;
use schemaseed_plan::PlanError;

use crate::adapter::AdapterError;
use crate::hooks::HookError;
use crate::safety::SafetyError;

/// Errors that stop a run, either before connecting or inside one entity.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Safety(#[from] SafetyError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error("entity '{0}' is not part of the schema")]
    UnknownEntity(String),
}
