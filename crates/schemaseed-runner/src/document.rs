use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use schemaseed_generate::{
    DocumentContext, GenerationState, GeneratorRegistry, Row, generate_documents,
};
use schemaseed_plan::{
    CollectionConfig, DocumentConfig, FieldConfig, FieldKind, RowCount, create_document_plan,
};

use crate::adapter::DocumentAdapter;
use crate::errors::SeedError;
use crate::hooks::{HookChain, SeedHooks};
use crate::keys::{elapsed_ms, preview, record_keys, resolve_seed};
use crate::options::SeedOptions;
use crate::plugins::apply_plugins;
use crate::report::{EffectReport, EntityStats};
use crate::safety::check_production_safety;

const ID_FIELD: &str = "_id";

/// Seed a document store from collection definitions.
///
/// Same contract as [`run_seed_sql`](crate::run_seed_sql): configuration,
/// planning and safety problems are returned before connecting; later
/// failures are recorded, rolled back when the store supports transactions,
/// and stop the run.
pub async fn run_seed_documents<A>(
    adapter: &mut A,
    config: &DocumentConfig,
    options: SeedOptions,
    registry: GeneratorRegistry,
) -> Result<EffectReport, SeedError>
where
    A: DocumentAdapter + ?Sized,
{
    let started = Instant::now();
    options.validate()?;
    validate_collections(config)?;
    let plan = create_document_plan(config, &options.plan_options())?;

    let target = config.uri.clone().or_else(|| adapter.connection_target());
    check_production_safety(options.allow_production, target.as_deref())?;

    let SeedOptions {
        rows,
        seed,
        dry_run,
        batch_size,
        truncate,
        mut overrides,
        mut hooks,
        plugins,
        reference_time,
        preview_rows,
        ..
    } = options;
    let mut registry = registry;
    // Overrides only apply to relational runs.
    apply_plugins(plugins, &mut registry, &mut overrides, &mut hooks);

    let seed = resolve_seed(seed);
    let reference_time = reference_time.unwrap_or_else(Utc::now);
    let ctx = DocumentContext {
        registry: &registry,
        reference_time,
    };
    let mut state = GenerationState::new(&seed);
    let mut report = EffectReport::new(seed.to_string(), dry_run);

    info!(
        engine = adapter.engine(),
        collections = plan.insert_order.len(),
        seed = %seed,
        dry_run,
        "document seed run started"
    );

    let run = DocumentRun {
        config,
        rows: &rows,
        referenced: referenced_fields(config),
        dry_run,
        truncate,
        batch_size,
        preview_rows,
        hooks: &hooks,
        ctx: &ctx,
    };

    match adapter.connect().await {
        Ok(()) => run.execute(adapter, &plan.insert_order, &mut state, &mut report).await,
        Err(err) => {
            warn!(error = %err, "connect failed");
            report.record_failure(err.to_string());
        }
    }

    if let Err(err) = adapter.disconnect().await {
        warn!(error = %err, "disconnect failed");
        report.warnings.push(format!("disconnect failed: {err}"));
    }

    report.duration_ms = elapsed_ms(started);
    info!(
        success = report.success,
        documents = report.total_inserted(),
        errors = report.errors.len(),
        duration_ms = report.duration_ms,
        "document seed run finished"
    );
    Ok(report)
}

struct DocumentRun<'a> {
    config: &'a DocumentConfig,
    rows: &'a RowCount,
    /// Non-`_id` fields other collections reference, per collection.
    referenced: BTreeMap<String, BTreeSet<String>>,
    dry_run: bool,
    truncate: bool,
    batch_size: usize,
    preview_rows: usize,
    hooks: &'a HookChain,
    ctx: &'a DocumentContext<'a>,
}

impl DocumentRun<'_> {
    async fn execute<A>(
        &self,
        adapter: &mut A,
        order: &[String],
        state: &mut GenerationState,
        report: &mut EffectReport,
    ) where
        A: DocumentAdapter + ?Sized,
    {
        if self.truncate && !self.dry_run && !order.is_empty() {
            if adapter.supports_truncate() {
                let reversed: Vec<String> = order.iter().rev().cloned().collect();
                if let Err(err) = adapter.truncate_collections(&reversed).await {
                    warn!(error = %err, "truncate failed");
                    report.record_failure(err.to_string());
                    return;
                }
            } else {
                report
                    .warnings
                    .push(format!("{} does not support truncation; skipped", adapter.engine()));
            }
        }

        if !self.dry_run
            && let Err(err) = adapter.begin().await
        {
            report.record_failure(err.to_string());
            return;
        }

        for name in order {
            let collection_started = Instant::now();
            if let Err(err) = self.seed_collection(adapter, name, state, report).await {
                warn!(collection = %name, error = %err, "collection failed");
                report.record_entity_failure(name, err.to_string(), elapsed_ms(collection_started));
                if self.dry_run {
                    continue;
                }
                if let Err(rollback) = adapter.rollback().await {
                    report.warnings.push(format!("rollback failed: {rollback}"));
                }
                return;
            }
        }

        if !self.dry_run
            && let Err(err) = adapter.commit().await
        {
            report.record_failure(err.to_string());
        }
    }

    async fn seed_collection<A>(
        &self,
        adapter: &mut A,
        name: &str,
        state: &mut GenerationState,
        report: &mut EffectReport,
    ) -> Result<(), SeedError>
    where
        A: DocumentAdapter + ?Sized,
    {
        let started = Instant::now();
        let collection = self
            .config
            .collections
            .get(name)
            .ok_or_else(|| SeedError::UnknownEntity(name.to_string()))?;
        let count = collection
            .rows
            .unwrap_or_else(|| self.rows.for_entity(name)) as usize;
        let documents = generate_documents(name, &collection.fields, count, self.ctx, state)?;
        if self.preview_rows > 0 {
            report
                .previews
                .insert(name.to_string(), preview(&documents, self.preview_rows));
        }

        if self.dry_run {
            self.record(state, name, &documents, &[]);
            report.record_entity(EntityStats {
                entity: name.to_string(),
                inserted_count: documents.len() as u64,
                duration_ms: elapsed_ms(started),
                error: None,
            });
            return Ok(());
        }

        let documents = self.hooks.before_insert(name, documents).await?;
        for chunk in documents.chunks(self.batch_size) {
            let returned = adapter.insert_many(name, chunk).await?;
            self.record(state, name, chunk, &returned);
            debug!(collection = %name, documents = chunk.len(), "batch inserted");
        }

        let stats = EntityStats {
            entity: name.to_string(),
            inserted_count: documents.len() as u64,
            duration_ms: elapsed_ms(started),
            error: None,
        };
        self.hooks.after_insert(name, &stats).await?;
        info!(
            collection = %name,
            documents = stats.inserted_count,
            duration_ms = stats.duration_ms,
            "collection seeded"
        );
        report.record_entity(stats);
        Ok(())
    }

    fn record(&self, state: &mut GenerationState, name: &str, documents: &[Row], returned: &[Value]) {
        record_keys(&mut state.refs, name, Some(ID_FIELD), documents, returned);
        let Some(fields) = self.referenced.get(name) else {
            return;
        };
        for field in fields {
            let key = format!("{name}.{field}");
            for document in documents {
                if let Some(value) = document.get(field).filter(|value| !value.is_null()) {
                    state.refs.add_reference(&key, value.clone());
                }
            }
        }
    }
}

/// Checks that make a document config unusable at all.
fn validate_collections(config: &DocumentConfig) -> Result<(), SeedError> {
    if config.collections.is_empty() {
        return Err(SeedError::Config("no collections defined".to_string()));
    }
    for (name, collection) in &config.collections {
        validate_collection(name, collection)?;
    }
    Ok(())
}

fn validate_collection(name: &str, collection: &CollectionConfig) -> Result<(), SeedError> {
    if collection.rows == Some(0) {
        return Err(SeedError::Config(format!(
            "collection '{name}' must have rows > 0"
        )));
    }
    if collection.fields.is_empty() {
        return Err(SeedError::Config(format!(
            "collection '{name}' must define fields"
        )));
    }
    for (field, config) in &collection.fields {
        let Some(spec) = config.spec() else {
            continue;
        };
        if config.kind() == Some(FieldKind::Enum)
            && let (Some(values), Some(weights)) = (&spec.values, &spec.weights)
            && values.len() != weights.len()
        {
            return Err(SeedError::Config(format!(
                "enum weights and values length mismatch in {name}.{field}"
            )));
        }
    }
    Ok(())
}

/// `collection -> fields` referenced as `collection.field` by any `ref`,
/// excluding `_id`, which is always recorded.
fn referenced_fields(config: &DocumentConfig) -> BTreeMap<String, BTreeSet<String>> {
    let mut referenced: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for collection in config.collections.values() {
        for field in collection.fields.values() {
            collect_references(field, &mut referenced);
        }
    }
    referenced
}

fn collect_references(field: &FieldConfig, referenced: &mut BTreeMap<String, BTreeSet<String>>) {
    let Some(spec) = field.spec() else {
        return;
    };
    if let Some((collection, target)) = spec
        .reference
        .as_deref()
        .and_then(|reference| reference.split_once('.'))
        && target != ID_FIELD
    {
        referenced
            .entry(collection.to_string())
            .or_default()
            .insert(target.to_string());
    }
    for nested in spec.fields.iter().flat_map(|fields| fields.values()) {
        collect_references(nested, referenced);
    }
    if let Some(element) = spec.of.as_deref() {
        collect_references(element, referenced);
    }
}
