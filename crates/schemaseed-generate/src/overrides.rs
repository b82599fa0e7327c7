use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use schemaseed_plan::{OverrideSpec, SeedConfig};

use crate::errors::GenerationError;
use crate::random::SeedRandom;
use crate::refs::ReferenceRegistry;

/// Arguments handed to a function override.
pub struct OverrideInput<'a> {
    pub row_index: usize,
    pub rng: &'a mut SeedRandom,
    pub refs: &'a ReferenceRegistry,
}

/// Caller-supplied value function. May suspend.
#[async_trait]
pub trait OverrideFn: Send + Sync {
    async fn call(&self, input: OverrideInput<'_>) -> Result<Value, GenerationError>;
}

struct SyncOverride<F>(F);

#[async_trait]
impl<F> OverrideFn for SyncOverride<F>
where
    F: Fn(OverrideInput<'_>) -> Result<Value, GenerationError> + Send + Sync,
{
    async fn call(&self, input: OverrideInput<'_>) -> Result<Value, GenerationError> {
        (self.0)(input)
    }
}

/// Wrap a plain closure as an [`OverrideFn`].
pub fn override_fn<F>(func: F) -> Arc<dyn OverrideFn>
where
    F: Fn(OverrideInput<'_>) -> Result<Value, GenerationError> + Send + Sync + 'static,
{
    Arc::new(SyncOverride(func))
}

/// How a single field's value is chosen instead of inference.
#[derive(Clone)]
pub enum FieldOverride {
    Function(Arc<dyn OverrideFn>),
    EnumChoice {
        values: Vec<Value>,
        weights: Option<Vec<f64>>,
    },
    DateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Literal(Value),
}

impl FieldOverride {
    pub fn function(func: Arc<dyn OverrideFn>) -> Self {
        FieldOverride::Function(func)
    }
}

impl From<OverrideSpec> for FieldOverride {
    fn from(spec: OverrideSpec) -> Self {
        match spec {
            OverrideSpec::EnumChoice { values, weights } => {
                FieldOverride::EnumChoice { values, weights }
            }
            OverrideSpec::DateRange { start, end } => FieldOverride::DateRange { start, end },
            OverrideSpec::Literal(value) => FieldOverride::Literal(value),
        }
    }
}

impl fmt::Debug for FieldOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldOverride::Function(_) => f.write_str("Function(..)"),
            FieldOverride::EnumChoice { values, weights } => f
                .debug_struct("EnumChoice")
                .field("values", values)
                .field("weights", weights)
                .finish(),
            FieldOverride::DateRange { start, end } => f
                .debug_struct("DateRange")
                .field("start", start)
                .field("end", end)
                .finish(),
            FieldOverride::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
        }
    }
}

/// Global and per-entity field overrides. Entity entries shadow globals.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    global: BTreeMap<String, FieldOverride>,
    entities: BTreeMap<String, BTreeMap<String, FieldOverride>>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_global(&mut self, field: &str, value: FieldOverride) {
        self.global.insert(field.to_string(), value);
    }

    pub fn set(&mut self, entity: &str, field: &str, value: FieldOverride) {
        self.entities
            .entry(entity.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn lookup(&self, entity: &str, field: &str) -> Option<&FieldOverride> {
        self.entities
            .get(entity)
            .and_then(|fields| fields.get(field))
            .or_else(|| self.global.get(field))
    }

    /// Fold `other` in; its entries replace ours on conflict.
    pub fn merge(&mut self, other: Overrides) {
        self.global.extend(other.global);
        for (entity, fields) in other.entities {
            self.entities.entry(entity).or_default().extend(fields);
        }
    }

    /// Build from the `overrides` / `global_overrides` tables of a config.
    pub fn from_config(config: &SeedConfig) -> Result<Self, GenerationError> {
        let mut overrides = Self::new();
        for (field, value) in &config.global_overrides {
            overrides.set_global(field, parse_override(field, value)?);
        }
        for (entity, fields) in &config.overrides {
            for (field, value) in fields {
                let path = format!("{entity}.{field}");
                overrides.set(entity, field, parse_override(&path, value)?);
            }
        }
        Ok(overrides)
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.entities.values().all(BTreeMap::is_empty)
    }
}

fn parse_override(field: &str, value: &Value) -> Result<FieldOverride, GenerationError> {
    OverrideSpec::parse(value)
        .map(FieldOverride::from)
        .map_err(|message| GenerationError::InvalidOverride {
            field: field.to_string(),
            message,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaseed_core::Seed;
    use serde_json::json;

    #[test]
    fn entity_override_shadows_global() {
        let mut overrides = Overrides::new();
        overrides.set_global("status", FieldOverride::Literal(json!("global")));
        overrides.set("users", "status", FieldOverride::Literal(json!("users")));

        assert!(matches!(
            overrides.lookup("users", "status"),
            Some(FieldOverride::Literal(value)) if value == &json!("users")
        ));
        assert!(matches!(
            overrides.lookup("posts", "status"),
            Some(FieldOverride::Literal(value)) if value == &json!("global")
        ));
        assert!(overrides.lookup("posts", "title").is_none());
    }

    #[test]
    fn merge_prefers_incoming_entries() {
        let mut base = Overrides::new();
        base.set("users", "role", FieldOverride::Literal(json!("member")));
        let mut plugin = Overrides::new();
        plugin.set("users", "role", FieldOverride::Literal(json!("admin")));
        base.merge(plugin);

        assert!(matches!(
            base.lookup("users", "role"),
            Some(FieldOverride::Literal(value)) if value == &json!("admin")
        ));
    }

    #[test]
    fn config_overrides_are_parsed() {
        let config: SeedConfig = serde_json::from_value(json!({
            "overrides": {"users": {"role": {"enum": ["a", "b"], "weights": [1, 0]}}},
            "global_overrides": {"tenant": "acme"}
        }))
        .unwrap();
        let overrides = Overrides::from_config(&config).unwrap();
        assert!(matches!(
            overrides.lookup("users", "role"),
            Some(FieldOverride::EnumChoice { values, .. }) if values.len() == 2
        ));
        assert!(!overrides.is_empty());
    }

    #[test]
    fn malformed_config_override_names_the_field() {
        let config: SeedConfig = serde_json::from_value(json!({
            "overrides": {"users": {"role": {"enum": []}}}
        }))
        .unwrap();
        let err = Overrides::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("users.role"));
    }

    #[tokio::test]
    async fn closures_become_function_overrides() {
        let func = override_fn(|input| Ok(json!(format!("row-{}", input.row_index))));
        let mut rng = SeedRandom::new(&Seed::Int(1));
        let refs = ReferenceRegistry::new();
        let value = func
            .call(OverrideInput {
                row_index: 3,
                rng: &mut rng,
                refs: &refs,
            })
            .await
            .unwrap();
        assert_eq!(value, json!("row-3"));
    }
}
