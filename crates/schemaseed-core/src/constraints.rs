use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Primary key definition preserving column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PrimaryKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Unique constraint definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UniqueConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Referential action applied on update/delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

/// Foreign key definition preserving column ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owning columns, in declaration order.
    pub columns: Vec<String>,
    /// Name of the entity this key points at.
    pub referenced_entity: String,
    /// Referenced columns, aligned with `columns`.
    pub referenced_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<FkAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<FkAction>,
}

impl ForeignKey {
    /// Build a single-column foreign key.
    pub fn new(column: &str, referenced_entity: &str, referenced_column: &str) -> Self {
        Self {
            name: None,
            columns: vec![column.to_string()],
            referenced_entity: referenced_entity.to_string(),
            referenced_columns: vec![referenced_column.to_string()],
            on_update: None,
            on_delete: None,
        }
    }

    /// True when the key points back at its owning entity.
    pub fn is_self_reference(&self, owner: &str) -> bool {
        self.referenced_entity == owner
    }

    /// The column populated from the reference registry.
    pub fn first_column(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }
}
