use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use schemaseed_core::{Column, EntitySchema, NormalizedType, Seed};

use crate::errors::GenerationError;
use crate::generators::builtin::{format_instant, random_object_id, random_uuid, round_to};
use crate::generators::{GeneratorCall, GeneratorRegistry};
use crate::overrides::{FieldOverride, OverrideInput, Overrides};
use crate::random::SeedRandom;
use crate::refs::ReferenceRegistry;
use crate::uniqueness::{DEFAULT_MAX_RETRIES, UniquenessRegistry};

/// One generated record, keyed by column name.
pub type Row = Map<String, Value>;

const NULL_PROBABILITY: f64 = 0.1;

static NO_NULL_COLUMNS: BTreeSet<(String, String)> = BTreeSet::new();

/// Mutable per-run state: the random stream and both registries.
#[derive(Debug)]
pub struct GenerationState {
    pub rng: SeedRandom,
    pub uniqueness: UniquenessRegistry,
    pub refs: ReferenceRegistry,
}

impl GenerationState {
    pub fn new(seed: &Seed) -> Self {
        Self {
            rng: SeedRandom::new(seed),
            uniqueness: UniquenessRegistry::new(),
            refs: ReferenceRegistry::new(),
        }
    }
}

/// Read-only inputs shared by every row of a run.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub registry: &'a GeneratorRegistry,
    pub overrides: &'a Overrides,
    /// `(entity, column)` pairs left null on first insert to break a cycle.
    pub null_columns: &'a BTreeSet<(String, String)>,
    pub reference_time: DateTime<Utc>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        registry: &'a GeneratorRegistry,
        overrides: &'a Overrides,
        reference_time: DateTime<Utc>,
    ) -> Self {
        Self {
            registry,
            overrides,
            null_columns: &NO_NULL_COLUMNS,
            reference_time,
        }
    }

    pub fn with_null_columns(mut self, null_columns: &'a BTreeSet<(String, String)>) -> Self {
        self.null_columns = null_columns;
        self
    }
}

/// Generate `count` rows for `entity`, in order, from the shared state.
pub async fn generate_rows(
    entity: &EntitySchema,
    count: usize,
    ctx: &GenerationContext<'_>,
    state: &mut GenerationState,
) -> Result<Vec<Row>, GenerationError> {
    let mut rows = Vec::with_capacity(count);
    for row_index in 0..count {
        rows.push(generate_row(entity, row_index, ctx, state).await?);
    }
    debug!(entity = %entity.name, rows = rows.len(), "generated rows");
    Ok(rows)
}

/// Generate one row. Columns are visited in name order.
pub async fn generate_row(
    entity: &EntitySchema,
    row_index: usize,
    ctx: &GenerationContext<'_>,
    state: &mut GenerationState,
) -> Result<Row, GenerationError> {
    let mut row = Row::new();
    for column in entity.columns.values() {
        if column.auto_increment {
            continue;
        }
        let value = column_value(entity, column, row_index, ctx, state).await?;
        row.insert(column.name.clone(), value);
    }
    Ok(row)
}

async fn column_value(
    entity: &EntitySchema,
    column: &Column,
    row_index: usize,
    ctx: &GenerationContext<'_>,
    state: &mut GenerationState,
) -> Result<Value, GenerationError> {
    if ctx
        .null_columns
        .contains(&(entity.name.clone(), column.name.clone()))
    {
        return Ok(Value::Null);
    }

    if let Some(foreign_key) = entity.reference_for(&column.name)
        && let Some(value) = state
            .refs
            .get_random_reference(&foreign_key.referenced_entity, &mut state.rng)
    {
        return Ok(value);
    }

    if let Some(field_override) = ctx.overrides.lookup(&entity.name, &column.name) {
        return apply_override(field_override, &column.name, row_index, state).await;
    }

    if let Some(inferred) = ctx.registry.infer(&column.name, column.data_type) {
        if let Some(generator) = ctx.registry.get(&inferred.generator_id) {
            let GenerationState {
                rng,
                uniqueness,
                refs,
            } = &mut *state;
            let mut generate = || {
                generator.generate(&mut GeneratorCall {
                    rng: &mut *rng,
                    refs: &*refs,
                    entity: &entity.name,
                    field: &column.name,
                    row_index,
                    options: inferred.options.as_ref(),
                    reference_time: ctx.reference_time,
                })
            };
            return if entity.is_unique_column(&column.name) {
                uniqueness.ensure_unique_sync(
                    &entity.name,
                    &column.name,
                    generate,
                    DEFAULT_MAX_RETRIES,
                )
            } else {
                generate()
            };
        }
        warn!(
            entity = %entity.name,
            column = %column.name,
            generator = %inferred.generator_id,
            "inferred generator is not registered; using type fallback"
        );
    }

    Ok(default_value(column, &mut state.rng, ctx.reference_time))
}

async fn apply_override(
    field_override: &FieldOverride,
    field: &str,
    row_index: usize,
    state: &mut GenerationState,
) -> Result<Value, GenerationError> {
    match field_override {
        FieldOverride::Function(func) => {
            func.call(OverrideInput {
                row_index,
                rng: &mut state.rng,
                refs: &state.refs,
            })
            .await
        }
        FieldOverride::EnumChoice { values, weights } => Ok(state
            .rng
            .pick(values, weights.as_deref())
            .cloned()
            .unwrap_or(Value::Null)),
        FieldOverride::DateRange { start, end } => {
            let millis = state
                .rng
                .next_int(start.timestamp_millis(), end.timestamp_millis());
            DateTime::from_timestamp_millis(millis)
                .map(|instant| Value::String(format_instant(instant)))
                .ok_or_else(|| GenerationError::InvalidOverride {
                    field: field.to_string(),
                    message: format!("{millis} ms is outside the representable range"),
                })
        }
        FieldOverride::Literal(value) => Ok(value.clone()),
    }
}

/// Value for a column nothing else could fill.
fn default_value(column: &Column, rng: &mut SeedRandom, reference_time: DateTime<Utc>) -> Value {
    if let Some(default) = &column.default {
        return default.clone();
    }
    if column.nullable && rng.boolean(NULL_PROBABILITY) {
        return Value::Null;
    }
    match column.data_type {
        NormalizedType::Int | NormalizedType::Bigint => json!(rng.next_int(1, 1000)),
        NormalizedType::Float | NormalizedType::Decimal => json!(round_to(rng.next_f64() * 100.0, 2)),
        NormalizedType::Boolean => Value::Bool(rng.boolean(0.5)),
        NormalizedType::Date | NormalizedType::Datetime => {
            Value::String(format_instant(reference_time))
        }
        NormalizedType::Json => json!({"mock": "data"}),
        NormalizedType::Enum => match column.enum_values.as_deref() {
            Some(values) if !values.is_empty() => rng
                .pick(values, None)
                .map_or(Value::Null, |value| Value::String(value.clone())),
            _ => Value::String("VALUE".to_string()),
        },
        NormalizedType::Uuid => Value::String(random_uuid(rng)),
        NormalizedType::ObjectId => Value::String(random_object_id(rng)),
        NormalizedType::String | NormalizedType::Text | NormalizedType::Binary => {
            Value::String("mock-string".to_string())
        }
    }
}
