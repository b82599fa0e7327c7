use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::warn;

use schemaseed_plan::{FieldConfig, FieldKind, FieldSpec, parse_instant};

use crate::errors::GenerationError;
use crate::generators::builtin::{format_instant, random_object_id, round_to};
use crate::generators::{GeneratorCall, GeneratorRegistry};
use crate::random::SeedRandom;
use crate::refs::ReferenceRegistry;
use crate::row::{GenerationState, Row};
use crate::uniqueness::DEFAULT_MAX_RETRIES;

const DEFAULT_INT_MAX: f64 = 1_000_000.0;
const DEFAULT_FLOAT_MAX: f64 = 100.0;
const DEFAULT_MIN_ITEMS: u64 = 1;
const DEFAULT_MAX_ITEMS: u64 = 5;
const DEFAULT_RANGE_START: &str = "2020-01-01";

/// Read-only inputs for document generation.
#[derive(Debug, Clone, Copy)]
pub struct DocumentContext<'a> {
    pub registry: &'a GeneratorRegistry,
    pub reference_time: DateTime<Utc>,
}

/// Generate `count` documents for one collection.
pub fn generate_documents(
    collection: &str,
    fields: &BTreeMap<String, FieldConfig>,
    count: usize,
    ctx: &DocumentContext<'_>,
    state: &mut GenerationState,
) -> Result<Vec<Row>, GenerationError> {
    (0..count)
        .map(|row_index| generate_document(collection, fields, row_index, ctx, state))
        .collect()
}

/// Generate one document. Fields flagged `unique` at the top level are
/// checked against the uniqueness registry.
pub fn generate_document(
    collection: &str,
    fields: &BTreeMap<String, FieldConfig>,
    row_index: usize,
    ctx: &DocumentContext<'_>,
    state: &mut GenerationState,
) -> Result<Row, GenerationError> {
    let mut document = Row::new();
    for (name, field) in fields {
        let GenerationState {
            rng,
            uniqueness,
            refs,
        } = &mut *state;
        let mut draw = Draw {
            rng,
            refs: &*refs,
            ctx,
            collection,
            row_index,
        };
        let unique = field.spec().is_some_and(|spec| spec.unique);
        let value = if unique {
            uniqueness.ensure_unique_sync(
                collection,
                name,
                || draw.field(name, field),
                DEFAULT_MAX_RETRIES,
            )?
        } else {
            draw.field(name, field)?
        };
        document.insert(name.clone(), value);
    }
    Ok(document)
}

struct Draw<'a, 'c> {
    rng: &'a mut SeedRandom,
    refs: &'a ReferenceRegistry,
    ctx: &'a DocumentContext<'c>,
    collection: &'a str,
    row_index: usize,
}

impl Draw<'_, '_> {
    fn field(&mut self, path: &str, field: &FieldConfig) -> Result<Value, GenerationError> {
        let spec = field.spec();
        if let Some(reference) = spec.and_then(|spec| spec.reference.as_deref()) {
            return Ok(self.reference(path, reference));
        }
        let kind = field.kind().ok_or_else(|| {
            GenerationError::InvalidDocument(format!(
                "field '{}.{path}' has neither a type nor a ref",
                self.collection
            ))
        })?;
        self.kind(path, &kind, spec)
    }

    fn reference(&mut self, path: &str, reference: &str) -> Value {
        match self.refs.get_random_reference(reference_key(reference), self.rng) {
            Some(value) => value,
            None => {
                warn!(
                    collection = %self.collection,
                    field = %path,
                    reference = %reference,
                    "no documents recorded for reference; leaving null"
                );
                Value::Null
            }
        }
    }

    fn kind(
        &mut self,
        path: &str,
        kind: &FieldKind,
        spec: Option<&FieldSpec>,
    ) -> Result<Value, GenerationError> {
        let min = spec.and_then(|spec| spec.min);
        let max = spec.and_then(|spec| spec.max);
        let value = match kind {
            FieldKind::ObjectId => Value::String(random_object_id(self.rng)),
            FieldKind::Int => {
                let min = min.unwrap_or(0.0) as i64;
                let max = max.unwrap_or(DEFAULT_INT_MAX) as i64;
                json!(self.rng.next_int(min, max))
            }
            FieldKind::Float | FieldKind::Decimal => {
                let min = min.unwrap_or(0.0);
                let max = max.unwrap_or(DEFAULT_FLOAT_MAX);
                json!(round_to(self.rng.next_f64() * (max - min) + min, 2))
            }
            FieldKind::Boolean => Value::Bool(self.rng.boolean(0.5)),
            FieldKind::Date => {
                let millis = self.rng.next_int(0, self.ctx.reference_time.timestamp_millis());
                self.instant(path, millis)?
            }
            FieldKind::DateBetween => {
                let from = self.bound(path, spec.and_then(|spec| spec.from.as_deref()))?;
                let to = match spec.and_then(|spec| spec.to.as_deref()) {
                    Some(to) => self.bound(path, Some(to))?,
                    None => self.ctx.reference_time,
                };
                let millis = self
                    .rng
                    .next_int(from.timestamp_millis(), to.timestamp_millis());
                self.instant(path, millis)?
            }
            FieldKind::Enum => {
                let values = spec.and_then(|spec| spec.values.as_deref()).unwrap_or(&[]);
                let weights = spec.and_then(|spec| spec.weights.as_deref());
                self.rng.pick(values, weights).cloned().unwrap_or(Value::Null)
            }
            FieldKind::Object => {
                let mut object = Row::new();
                if let Some(fields) = spec.and_then(|spec| spec.fields.as_ref()) {
                    for (name, field) in fields {
                        let nested = format!("{path}.{name}");
                        object.insert(name.clone(), self.field(&nested, field)?);
                    }
                }
                Value::Object(object)
            }
            FieldKind::Array => {
                let element = spec.and_then(|spec| spec.of.as_deref()).ok_or_else(|| {
                    GenerationError::InvalidDocument(format!(
                        "array field '{}.{path}' is missing 'of'",
                        self.collection
                    ))
                })?;
                let min_items = spec
                    .and_then(|spec| spec.min_items)
                    .unwrap_or(DEFAULT_MIN_ITEMS);
                let max_items = spec
                    .and_then(|spec| spec.max_items)
                    .unwrap_or(DEFAULT_MAX_ITEMS);
                let count = self.rng.next_int(min_items as i64, max_items as i64).max(0);
                let element_path = format!("{path}[]");
                let items = (0..count)
                    .map(|_| self.field(&element_path, element))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Array(items)
            }
            FieldKind::String => self.generator(path, "firstName", None)?,
            FieldKind::DateRecent => self.generator(path, "dateRecent", None)?,
            FieldKind::Generator(id) => self.generator(path, id, None)?,
        };
        Ok(value)
    }

    fn generator(
        &mut self,
        path: &str,
        id: &str,
        options: Option<&Value>,
    ) -> Result<Value, GenerationError> {
        let Some(generator) = self.ctx.registry.get(id) else {
            warn!(
                collection = %self.collection,
                field = %path,
                generator = %id,
                "unknown generator; leaving null"
            );
            return Ok(Value::Null);
        };
        generator.generate(&mut GeneratorCall {
            rng: &mut *self.rng,
            refs: self.refs,
            entity: self.collection,
            field: path,
            row_index: self.row_index,
            options,
            reference_time: self.ctx.reference_time,
        })
    }

    fn bound(&self, path: &str, value: Option<&str>) -> Result<DateTime<Utc>, GenerationError> {
        let value = value.unwrap_or(DEFAULT_RANGE_START);
        parse_instant(value).ok_or_else(|| {
            GenerationError::InvalidDocument(format!(
                "field '{}.{path}' has an unparsable date bound '{value}'",
                self.collection
            ))
        })
    }

    fn instant(&self, path: &str, millis: i64) -> Result<Value, GenerationError> {
        DateTime::from_timestamp_millis(millis)
            .map(|instant| Value::String(format_instant(instant)))
            .ok_or_else(|| {
                GenerationError::InvalidDocument(format!(
                    "field '{}.{path}' produced an out-of-range instant",
                    self.collection
                ))
            })
    }
}

/// Registry key a `ref` resolves against: the bare collection for `_id`
/// references, `collection.field` otherwise.
pub fn reference_key(reference: &str) -> &str {
    match reference.split_once('.') {
        Some((collection, "_id")) => collection,
        _ => reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use schemaseed_core::Seed;

    fn fields(value: Value) -> BTreeMap<String, FieldConfig> {
        serde_json::from_value(value).unwrap()
    }

    fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn generates_every_field_kind() {
        let registry = GeneratorRegistry::with_builtins();
        let ctx = DocumentContext {
            registry: &registry,
            reference_time: reference_time(),
        };
        let mut state = GenerationState::new(&Seed::Int(21));
        let fields = fields(json!({
            "_id": "objectId",
            "age": {"type": "int", "min": 18, "max": 90},
            "score": {"type": "float", "min": 1, "max": 2},
            "active": "boolean",
            "joined": {"type": "dateBetween", "from": "2023-01-01", "to": "2023-12-31"},
            "tier": {"type": "enum", "values": ["free", "pro"], "weights": [0, 1]},
            "profile": {"type": "object", "fields": {"city": "city", "bio": "string"}},
            "tags": {"type": "array", "of": "string", "minItems": 2, "maxItems": 3},
            "email": "email"
        }));

        let doc = generate_document("users", &fields, 0, &ctx, &mut state).unwrap();

        assert_eq!(doc["_id"].as_str().unwrap().len(), 24);
        assert!((18..=90).contains(&doc["age"].as_i64().unwrap()));
        let score = doc["score"].as_f64().unwrap();
        assert!((1.0..=2.0).contains(&score));
        assert!(doc["active"].is_boolean());
        assert!(doc["joined"].as_str().unwrap().starts_with("2023-"));
        assert_eq!(doc["tier"], json!("pro"));
        assert!(doc["profile"]["city"].is_string());
        let tags = doc["tags"].as_array().unwrap();
        assert!((2..=3).contains(&tags.len()));
        assert!(doc["email"].as_str().unwrap().contains('@'));
    }

    #[test]
    fn references_pick_recorded_ids() {
        let registry = GeneratorRegistry::with_builtins();
        let ctx = DocumentContext {
            registry: &registry,
            reference_time: reference_time(),
        };
        let mut state = GenerationState::new(&Seed::Int(4));
        let fields = fields(json!({"author": {"ref": "users._id"}}));

        let orphan = generate_document("posts", &fields, 0, &ctx, &mut state).unwrap();
        assert_eq!(orphan["author"], Value::Null);

        state.refs.add_reference("users", json!("abc"));
        let linked = generate_document("posts", &fields, 1, &ctx, &mut state).unwrap();
        assert_eq!(linked["author"], json!("abc"));

        let by_email = self::fields(json!({"contact": {"ref": "users.email"}}));
        state.refs.add_reference("users.email", json!("a@example.com"));
        let doc = generate_document("posts", &by_email, 2, &ctx, &mut state).unwrap();
        assert_eq!(doc["contact"], json!("a@example.com"));
        assert_eq!(reference_key("users"), "users");
    }

    #[test]
    fn unique_fields_never_repeat() {
        let registry = GeneratorRegistry::with_builtins();
        let ctx = DocumentContext {
            registry: &registry,
            reference_time: reference_time(),
        };
        let mut state = GenerationState::new(&Seed::Int(4));
        let fields = fields(json!({"code": {"type": "int", "min": 1, "max": 3, "unique": true}}));

        let docs = generate_documents("coupons", &fields, 6, &ctx, &mut state).unwrap();
        let mut codes: Vec<String> = docs.iter().map(|doc| doc["code"].to_string()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 6);
    }

    #[test]
    fn int_bounds_beyond_i64_saturate() {
        let registry = GeneratorRegistry::with_builtins();
        let ctx = DocumentContext {
            registry: &registry,
            reference_time: reference_time(),
        };
        let mut state = GenerationState::new(&Seed::Int(1));
        let fields = fields(json!({"serial": {"type": "int", "min": -1e19, "max": 1e19}}));

        let docs = generate_documents("devices", &fields, 8, &ctx, &mut state).unwrap();
        assert!(docs.iter().all(|doc| doc["serial"].is_i64()));
    }

    #[test]
    fn array_without_element_type_is_rejected() {
        let registry = GeneratorRegistry::with_builtins();
        let ctx = DocumentContext {
            registry: &registry,
            reference_time: reference_time(),
        };
        let mut state = GenerationState::new(&Seed::Int(4));
        let fields = fields(json!({"tags": {"type": "array"}}));
        let err = generate_document("posts", &fields, 0, &ctx, &mut state).unwrap_err();
        assert!(err.to_string().contains("posts.tags"));
    }
}
