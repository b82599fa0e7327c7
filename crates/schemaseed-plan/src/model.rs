use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use schemaseed_core::Seed;

use crate::document::DocumentConfig;

/// Rows generated per entity when nothing else is configured.
pub const DEFAULT_ROW_COUNT: u64 = 10;
/// Rows per adapter insert call when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Seed configuration file (`schemaseed.toml` / `schemaseed.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    /// Connection target; checked by the production safety gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// Seed for the deterministic random stream (integer or string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Seed>,
    /// Row count, either one number for every entity or a per-entity map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<RowCount>,
    /// Rows per insert call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub dry_run: bool,
    /// Empty target entities (in reverse insertion order) before seeding.
    #[serde(default)]
    pub truncate: bool,
    #[serde(default)]
    pub allow_production: bool,
    /// Expand `include` with every entity the included ones depend on.
    #[serde(default)]
    pub include_parents: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Instant that date generators count back from (RFC 3339 or `YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<String>,
    /// Per-entity field overrides: `entity -> field -> override`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, BTreeMap<String, Value>>,
    /// Field overrides applied to every entity with a matching field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub global_overrides: BTreeMap<String, Value>,
    /// Document-store collections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<DocumentConfig>,
}

impl SeedConfig {
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Parsed `reference_time`; `None` when unset or unparsable.
    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.reference_time.as_deref().and_then(parse_instant)
    }
}

/// Row count setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RowCount {
    Uniform(u64),
    PerEntity(BTreeMap<String, u64>),
}

impl Default for RowCount {
    fn default() -> Self {
        RowCount::Uniform(DEFAULT_ROW_COUNT)
    }
}

impl RowCount {
    pub fn for_entity(&self, entity: &str) -> u64 {
        match self {
            RowCount::Uniform(count) => *count,
            RowCount::PerEntity(counts) => counts.get(entity).copied().unwrap_or(DEFAULT_ROW_COUNT),
        }
    }
}

/// Declarative override parsed from configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideSpec {
    /// `{"enum": [...], "weights": [...]}`
    EnumChoice {
        values: Vec<Value>,
        weights: Option<Vec<f64>>,
    },
    /// `{"dateBetween": [start, end]}`, bounds inclusive.
    DateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Any other value, used verbatim.
    Literal(Value),
}

impl OverrideSpec {
    /// Interpret a configuration value. Objects carrying `enum` or
    /// `dateBetween` must be well formed; everything else is a literal.
    pub fn parse(value: &Value) -> Result<Self, String> {
        let Some(object) = value.as_object() else {
            return Ok(OverrideSpec::Literal(value.clone()));
        };

        if let Some(values) = object.get("enum") {
            let values = values
                .as_array()
                .ok_or_else(|| "\"enum\" must be an array".to_string())?;
            if values.is_empty() {
                return Err("\"enum\" must list at least one value".to_string());
            }
            let weights = match object.get("weights") {
                None | Some(Value::Null) => None,
                Some(weights) => Some(parse_weights(weights, values.len())?),
            };
            return Ok(OverrideSpec::EnumChoice {
                values: values.clone(),
                weights,
            });
        }

        if let Some(bounds) = object.get("dateBetween") {
            let bounds = bounds
                .as_array()
                .filter(|bounds| bounds.len() == 2)
                .ok_or_else(|| "\"dateBetween\" must be an array of [start, end]".to_string())?;
            let start = parse_bound(&bounds[0])?;
            let end = parse_bound(&bounds[1])?;
            if start > end {
                return Err("\"dateBetween\" start must not be after end".to_string());
            }
            return Ok(OverrideSpec::DateRange { start, end });
        }

        Ok(OverrideSpec::Literal(value.clone()))
    }
}

fn parse_weights(weights: &Value, expected: usize) -> Result<Vec<f64>, String> {
    let weights = weights
        .as_array()
        .ok_or_else(|| "\"weights\" must be an array".to_string())?;
    if weights.len() != expected {
        return Err(format!(
            "\"weights\" has {} entries but \"enum\" has {}",
            weights.len(),
            expected
        ));
    }
    weights
        .iter()
        .map(|weight| match weight.as_f64() {
            Some(weight) if weight >= 0.0 => Ok(weight),
            _ => Err(format!("weight {weight} must be a non-negative number")),
        })
        .collect()
}

fn parse_bound(value: &Value) -> Result<DateTime<Utc>, String> {
    value
        .as_str()
        .and_then(parse_instant)
        .ok_or_else(|| format!("{value} is not an RFC 3339 timestamp or YYYY-MM-DD date"))
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
