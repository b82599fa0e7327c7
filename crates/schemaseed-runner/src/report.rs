use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use schemaseed_generate::Row;

/// Outcome of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub entity: String,
    pub inserted_count: u64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error recorded during a run; `entity` is `None` for run-level failures
/// such as connect or commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub message: String,
}

/// Structured result of a seeding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectReport {
    pub success: bool,
    pub duration_ms: u64,
    pub seed: String,
    pub dry_run: bool,
    /// Per-entity stats in processing order.
    pub entities: Vec<EntityStats>,
    pub errors: Vec<ReportError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// First rows of each entity with sensitive fields redacted.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub previews: BTreeMap<String, Vec<Row>>,
}

impl EffectReport {
    pub fn new(seed: String, dry_run: bool) -> Self {
        Self {
            success: true,
            duration_ms: 0,
            seed,
            dry_run,
            entities: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            previews: BTreeMap::new(),
        }
    }

    pub fn entity(&self, name: &str) -> Option<&EntityStats> {
        self.entities.iter().find(|stats| stats.entity == name)
    }

    pub fn total_inserted(&self) -> u64 {
        self.entities.iter().map(|stats| stats.inserted_count).sum()
    }

    pub(crate) fn record_entity(&mut self, stats: EntityStats) {
        self.entities.push(stats);
    }

    pub(crate) fn record_entity_failure(&mut self, entity: &str, message: String, duration_ms: u64) {
        self.success = false;
        self.entities.push(EntityStats {
            entity: entity.to_string(),
            inserted_count: 0,
            duration_ms,
            error: Some(message.clone()),
        });
        self.errors.push(ReportError {
            entity: Some(entity.to_string()),
            message,
        });
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.success = false;
        self.errors.push(ReportError {
            entity: None,
            message,
        });
    }
}
