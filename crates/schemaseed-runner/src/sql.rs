use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use schemaseed_core::{EntitySchema, SchemaGraph};
use schemaseed_generate::{
    GenerationContext, GenerationState, GeneratorRegistry, Row, generate_rows,
};
use schemaseed_plan::{RowCount, SeedPlan};

use crate::adapter::{InsertBatch, SqlAdapter};
use crate::errors::SeedError;
use crate::hooks::{HookChain, SeedHooks};
use crate::keys::{elapsed_ms, preview, record_keys, resolve_seed};
use crate::options::SeedOptions;
use crate::plugins::apply_plugins;
use crate::report::{EffectReport, EntityStats};
use crate::safety::check_production_safety;

/// Seed a relational store following `plan`.
///
/// Returns `Err` only for problems found before connecting: invalid options
/// or a refused production target. Failures after that are recorded in the
/// report, roll the transaction back and stop the run. `disconnect` is
/// called exactly once whenever `connect` was attempted.
pub async fn run_seed_sql<A>(
    adapter: &mut A,
    schema: &SchemaGraph,
    plan: &SeedPlan,
    options: SeedOptions,
    registry: GeneratorRegistry,
) -> Result<EffectReport, SeedError>
where
    A: SqlAdapter + ?Sized,
{
    let started = Instant::now();
    options.validate()?;
    let SeedOptions {
        rows,
        seed,
        dry_run,
        batch_size,
        allow_production,
        truncate,
        mut overrides,
        mut hooks,
        plugins,
        reference_time,
        preview_rows,
        ..
    } = options;
    let mut registry = registry;
    apply_plugins(plugins, &mut registry, &mut overrides, &mut hooks);

    check_production_safety(allow_production, adapter.connection_target().as_deref())?;

    let seed = resolve_seed(seed);
    let reference_time = reference_time.unwrap_or_else(Utc::now);
    let null_columns = plan.null_columns();
    let ctx = GenerationContext::new(&registry, &overrides, reference_time)
        .with_null_columns(&null_columns);
    let mut state = GenerationState::new(&seed);
    let mut report = EffectReport::new(seed.to_string(), dry_run);

    info!(
        engine = adapter.engine(),
        entities = plan.insert_order.len(),
        seed = %seed,
        dry_run,
        reference_time = %reference_time.to_rfc3339(),
        "seed run started"
    );

    let run = SqlRun {
        schema,
        rows: &rows,
        dry_run,
        truncate,
        batch_size,
        preview_rows,
        hooks: &hooks,
        ctx: &ctx,
    };

    match adapter.connect().await {
        Ok(()) => run.execute(adapter, plan, &mut state, &mut report).await,
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
        rows = report.total_inserted(),
        errors = report.errors.len(),
        duration_ms = report.duration_ms,
        "seed run finished"
    );
    Ok(report)
}

struct SqlRun<'a> {
    schema: &'a SchemaGraph,
    rows: &'a RowCount,
    dry_run: bool,
    truncate: bool,
    batch_size: usize,
    preview_rows: usize,
    hooks: &'a HookChain,
    ctx: &'a GenerationContext<'a>,
}

impl SqlRun<'_> {
    async fn execute<A>(
        &self,
        adapter: &mut A,
        plan: &SeedPlan,
        state: &mut GenerationState,
        report: &mut EffectReport,
    ) where
        A: SqlAdapter + ?Sized,
    {
        if self.truncate && !self.dry_run && !plan.insert_order.is_empty() {
            let reversed: Vec<String> = plan.insert_order.iter().rev().cloned().collect();
            if let Err(err) = adapter.truncate(&reversed).await {
                warn!(error = %err, "truncate failed");
                report.record_failure(err.to_string());
                return;
            }
            info!(entities = reversed.len(), "truncated target entities");
        }

        if !self.dry_run
            && let Err(err) = adapter.begin().await
        {
            warn!(error = %err, "begin failed");
            report.record_failure(err.to_string());
            return;
        }

        for name in &plan.insert_order {
            let entity_started = Instant::now();
            match self.seed_entity(adapter, name, state, report).await {
                Ok(()) => {}
                Err(err) => {
                    warn!(entity = %name, error = %err, "entity failed");
                    report.record_entity_failure(name, err.to_string(), elapsed_ms(entity_started));
                    if self.dry_run {
                        continue;
                    }
                    if let Err(rollback) = adapter.rollback().await {
                        warn!(error = %rollback, "rollback failed");
                        report.warnings.push(format!("rollback failed: {rollback}"));
                    }
                    return;
                }
            }
        }

        if !self.dry_run
            && let Err(err) = adapter.commit().await
        {
            warn!(error = %err, "commit failed");
            report.record_failure(err.to_string());
        }
    }

    async fn seed_entity<A>(
        &self,
        adapter: &mut A,
        name: &str,
        state: &mut GenerationState,
        report: &mut EffectReport,
    ) -> Result<(), SeedError>
    where
        A: SqlAdapter + ?Sized,
    {
        let started = Instant::now();
        let entity = self
            .schema
            .entity(name)
            .ok_or_else(|| SeedError::UnknownEntity(name.to_string()))?;
        let count = self.rows.for_entity(name) as usize;
        let rows = generate_rows(entity, count, self.ctx, state).await?;
        if self.preview_rows > 0 {
            report
                .previews
                .insert(name.to_string(), preview(&rows, self.preview_rows));
        }

        if self.dry_run {
            record_keys(&mut state.refs, name, key_column(entity), &rows, &[]);
            report.record_entity(EntityStats {
                entity: name.to_string(),
                inserted_count: rows.len() as u64,
                duration_ms: elapsed_ms(started),
                error: None,
            });
            debug!(entity = %name, rows = rows.len(), "dry run; nothing inserted");
            return Ok(());
        }

        let rows = self.hooks.before_insert(name, rows).await?;
        self.insert_rows(adapter, entity, &rows, state).await?;

        let stats = EntityStats {
            entity: name.to_string(),
            inserted_count: rows.len() as u64,
            duration_ms: elapsed_ms(started),
            error: None,
        };
        self.hooks.after_insert(name, &stats).await?;
        info!(
            entity = %name,
            rows = stats.inserted_count,
            duration_ms = stats.duration_ms,
            "entity seeded"
        );
        report.record_entity(stats);
        Ok(())
    }

    async fn insert_rows<A>(
        &self,
        adapter: &mut A,
        entity: &EntitySchema,
        rows: &[Row],
        state: &mut GenerationState,
    ) -> Result<(), SeedError>
    where
        A: SqlAdapter + ?Sized,
    {
        for chunk in rows.chunks(self.batch_size) {
            let returned = adapter
                .insert_batch(InsertBatch {
                    entity: &entity.name,
                    rows: chunk,
                })
                .await?;
            record_keys(
                &mut state.refs,
                &entity.name,
                key_column(entity),
                chunk,
                &returned,
            );
            debug!(entity = %entity.name, rows = chunk.len(), "batch inserted");
        }
        Ok(())
    }
}

fn key_column(entity: &EntitySchema) -> Option<&str> {
    entity.primary_key_columns().first().map(String::as_str)
}
