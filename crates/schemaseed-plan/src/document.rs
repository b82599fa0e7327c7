use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{PlanError, Result};
use crate::planner::{PlanOptions, apply_filters};

/// Document-store seeding section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentConfig {
    /// Store URI; checked by the production safety gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub collections: BTreeMap<String, CollectionConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CollectionConfig {
    /// Documents to generate; falls back to the run's row count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
    pub fields: BTreeMap<String, FieldConfig>,
}

/// A field is either a bare type name or a full spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldConfig {
    Type(String),
    Spec(FieldSpec),
}

impl FieldConfig {
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldConfig::Type(name) => Some(FieldKind::parse(name)),
            FieldConfig::Spec(spec) => spec.kind(),
        }
    }

    pub fn spec(&self) -> Option<&FieldSpec> {
        match self {
            FieldConfig::Type(_) => None,
            FieldConfig::Spec(spec) => Some(spec),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Enforce distinct values across the collection.
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    /// Nested fields for `object`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, FieldConfig>>,
    /// Element config for `array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub of: Option<Box<FieldConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    /// `collection.field` whose recorded ids fill this field.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl FieldSpec {
    pub fn kind(&self) -> Option<FieldKind> {
        self.kind.as_deref().map(FieldKind::parse)
    }

    /// Collection named by `ref`.
    pub fn referenced_collection(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .map(|reference| reference.split('.').next().unwrap_or(reference))
    }
}

/// Field types understood by the document generator. Unknown names are
/// looked up in the generator registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Float,
    Decimal,
    Boolean,
    Date,
    DateRecent,
    DateBetween,
    ObjectId,
    Enum,
    Object,
    Array,
    Generator(String),
}

impl FieldKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "string" => FieldKind::String,
            "int" => FieldKind::Int,
            "float" => FieldKind::Float,
            "decimal" => FieldKind::Decimal,
            "boolean" => FieldKind::Boolean,
            "date" => FieldKind::Date,
            "dateRecent" => FieldKind::DateRecent,
            "dateBetween" => FieldKind::DateBetween,
            "objectId" => FieldKind::ObjectId,
            "enum" => FieldKind::Enum,
            "object" => FieldKind::Object,
            "array" => FieldKind::Array,
            "street" => FieldKind::Generator("address".to_string()),
            other => FieldKind::Generator(other.to_string()),
        }
    }
}

/// Collection insertion order plus the reference edges it was derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentPlan {
    pub insert_order: Vec<String>,
    pub dependencies: BTreeMap<String, BTreeSet<String>>,
}

/// Order collections so referenced ones are seeded first. A `ref` to an
/// undefined collection or any reference cycle is a configuration error.
pub fn create_document_plan(config: &DocumentConfig, options: &PlanOptions) -> Result<DocumentPlan> {
    let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for (name, collection) in &config.collections {
        let mut deps = BTreeSet::new();
        for field in collection.fields.values() {
            collect_references(field, &mut |reference, target| {
                if !config.collections.contains_key(target) {
                    return Err(PlanError::UnknownReference {
                        collection: name.clone(),
                        reference: reference.to_string(),
                    });
                }
                if target != name {
                    deps.insert(target.to_string());
                }
                Ok(())
            })?;
        }
        dependencies.insert(name.clone(), deps);
    }

    let mut visited = BTreeSet::new();
    let mut visiting = BTreeSet::new();
    let mut order = Vec::with_capacity(dependencies.len());
    for name in dependencies.keys() {
        visit(name, &dependencies, &mut visited, &mut visiting, &mut order)?;
    }

    let insert_order = apply_filters(order, options, |roots| {
        let mut closure = BTreeSet::new();
        let mut stack: Vec<String> = roots.to_vec();
        while let Some(name) = stack.pop() {
            if closure.insert(name.clone())
                && let Some(deps) = dependencies.get(&name)
            {
                stack.extend(deps.iter().cloned());
            }
        }
        closure
    });

    Ok(DocumentPlan {
        insert_order,
        dependencies,
    })
}

fn collect_references(
    field: &FieldConfig,
    on_reference: &mut dyn FnMut(&str, &str) -> Result<()>,
) -> Result<()> {
    let Some(spec) = field.spec() else {
        return Ok(());
    };
    if let (Some(reference), Some(target)) = (spec.reference.as_deref(), spec.referenced_collection()) {
        on_reference(reference, target)?;
    }
    if let Some(fields) = &spec.fields {
        for nested in fields.values() {
            collect_references(nested, on_reference)?;
        }
    }
    if let Some(element) = &spec.of {
        collect_references(element, on_reference)?;
    }
    Ok(())
}

fn visit(
    name: &str,
    dependencies: &BTreeMap<String, BTreeSet<String>>,
    visited: &mut BTreeSet<String>,
    visiting: &mut BTreeSet<String>,
    order: &mut Vec<String>,
) -> Result<()> {
    if visiting.contains(name) {
        return Err(PlanError::CircularReference(name.to_string()));
    }
    if visited.contains(name) {
        return Ok(());
    }

    visiting.insert(name.to_string());
    if let Some(deps) = dependencies.get(name) {
        for dep in deps {
            visit(dep, dependencies, visited, visiting, order)?;
        }
    }
    visiting.remove(name);
    visited.insert(name.to_string());
    order.push(name.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> DocumentConfig {
        serde_json::from_value(value).expect("document config")
    }

    #[test]
    fn orders_referenced_collections_first() {
        let config = config(json!({
            "collections": {
                "orders": { "fields": {
                    "customer": { "ref": "customers._id" },
                    "lines": { "type": "array", "of": { "type": "object", "fields": {
                        "product": { "ref": "products._id" }
                    }}}
                }},
                "customers": { "fields": { "name": "fullName" } },
                "products": { "fields": { "sku": { "type": "string", "unique": true } } }
            }
        }));

        let plan = create_document_plan(&config, &PlanOptions::default()).unwrap();
        let position = |name: &str| plan.insert_order.iter().position(|item| item == name).unwrap();
        assert!(position("customers") < position("orders"));
        assert!(position("products") < position("orders"));
    }

    #[test]
    fn rejects_unknown_reference() {
        let config = config(json!({
            "collections": { "orders": { "fields": { "customer": { "ref": "customers._id" } } } }
        }));
        let err = create_document_plan(&config, &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::UnknownReference { .. }));
    }

    #[test]
    fn rejects_reference_cycle() {
        let config = config(json!({
            "collections": {
                "a": { "fields": { "b": { "ref": "b._id" } } },
                "b": { "fields": { "a": { "ref": "a._id" } } }
            }
        }));
        let err = create_document_plan(&config, &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::CircularReference(_)));
    }

    #[test]
    fn self_reference_is_not_a_dependency() {
        let config = config(json!({
            "collections": { "nodes": { "fields": { "parent": { "ref": "nodes._id" } } } }
        }));
        let plan = create_document_plan(&config, &PlanOptions::default()).unwrap();
        assert_eq!(plan.insert_order, vec!["nodes".to_string()]);
    }

    #[test]
    fn parses_field_kinds() {
        assert_eq!(FieldKind::parse("objectId"), FieldKind::ObjectId);
        assert_eq!(FieldKind::parse("street"), FieldKind::Generator("address".to_string()));
        assert_eq!(FieldKind::parse("email"), FieldKind::Generator("email".to_string()));
    }
}
