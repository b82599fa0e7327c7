use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constraints::{ForeignKey, PrimaryKey, UniqueConstraint};
use crate::types::NormalizedType;

/// Schema graph for one run: entity name to entity schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaGraph {
    /// Entities keyed by name.
    #[serde(default)]
    pub entities: BTreeMap<String, EntitySchema>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph keyed by each entity's own name.
    pub fn from_entities(entities: impl IntoIterator<Item = EntitySchema>) -> Self {
        let entities = entities
            .into_iter()
            .map(|entity| (entity.name.clone(), entity))
            .collect();
        Self { entities }
    }

    pub fn insert(&mut self, entity: EntitySchema) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// A table or collection to seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntitySchema {
    pub name: String,
    /// Optional namespace qualifier (schema/database).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Columns keyed by name; ordering carries no meaning.
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub unique_constraints: Vec<UniqueConstraint>,
    /// Row estimate reported by introspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl EntitySchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: None,
            columns: BTreeMap::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
            row_count: None,
            comment: None,
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = Some(PrimaryKey {
            name: None,
            columns: columns.iter().map(|column| column.to_string()).collect(),
        });
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_unique(mut self, columns: &[&str]) -> Self {
        self.unique_constraints.push(UniqueConstraint {
            name: None,
            columns: columns.iter().map(|column| column.to_string()).collect(),
        });
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn primary_key_columns(&self) -> &[String] {
        self.primary_key
            .as_ref()
            .map(|pk| pk.columns.as_slice())
            .unwrap_or(&[])
    }

    /// True when the column belongs to the primary key or any unique constraint.
    pub fn is_unique_column(&self, column: &str) -> bool {
        self.primary_key_columns().iter().any(|name| name == column)
            || self
                .unique_constraints
                .iter()
                .any(|unique| unique.columns.iter().any(|name| name == column))
    }

    /// Foreign key whose first owning column is `column`.
    pub fn reference_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.first_column() == Some(column))
    }

    /// Qualified name (`namespace.name`) when a namespace is set.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Column (or document field) metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub name: String,
    /// Normalized type used for inference and fallbacks.
    #[serde(rename = "type")]
    pub data_type: NormalizedType,
    /// Type as reported by the source engine.
    #[serde(default)]
    pub raw_type: String,
    #[serde(default)]
    pub nullable: bool,
    /// Declared default, used verbatim by the type fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Identity/auto-increment columns are left to the store.
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: &str, data_type: NormalizedType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            raw_type: data_type.as_str().to_string(),
            nullable: false,
            default: None,
            enum_values: None,
            auto_increment: false,
            precision: None,
            scale: None,
            max_length: None,
            comment: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_enum_values(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|value| value.to_string()).collect());
        self
    }
}
