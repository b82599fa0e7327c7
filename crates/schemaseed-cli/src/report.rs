use std::fmt::Write as _;

use schemaseed_plan::{CycleStrategy, SeedPlan};
use schemaseed_runner::EffectReport;

const RULE: &str = "====================================";
const THIN_RULE: &str = "------------------------------------";

/// Human-readable run summary.
pub fn render_report(report: &EffectReport) -> String {
    let mut out = String::new();
    let status = if report.success { "success" } else { "failed" };
    let _ = writeln!(out, "\nSeed report{}", if report.dry_run { " (dry run)" } else { "" });
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Status:   {status}");
    let _ = writeln!(out, "Duration: {}ms", report.duration_ms);
    let _ = writeln!(out, "Seed:     {}", report.seed);
    let _ = writeln!(out, "{THIN_RULE}");

    let width = report
        .entities
        .iter()
        .map(|stats| stats.entity.len())
        .max()
        .unwrap_or(0)
        .max("Entity".len());
    let _ = writeln!(out, "{:<width$}  {:>8}  {:>8}  Status", "Entity", "Rows", "Time");
    for stats in &report.entities {
        let _ = writeln!(
            out,
            "{:<width$}  {:>8}  {:>8}  {}",
            stats.entity,
            stats.inserted_count,
            format!("{}ms", stats.duration_ms),
            if stats.error.is_some() { "failed" } else { "ok" }
        );
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out, "\nErrors:");
        for (index, error) in report.errors.iter().enumerate() {
            match &error.entity {
                Some(entity) => {
                    let _ = writeln!(out, "{}. [{entity}] {}", index + 1, error.message);
                }
                None => {
                    let _ = writeln!(out, "{}. {}", index + 1, error.message);
                }
            }
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for warning in &report.warnings {
            let _ = writeln!(out, "- {warning}");
        }
    }
    let _ = writeln!(out, "{RULE}");
    out
}

/// Preview rows per entity, already redacted by the runner.
pub fn render_previews(report: &EffectReport) -> String {
    let mut out = String::new();
    for (entity, rows) in &report.previews {
        let _ = writeln!(out, "\n{entity} ({} shown)", rows.len());
        for row in rows {
            let line = serde_json::to_string(row).unwrap_or_else(|err| format!("<{err}>"));
            let _ = writeln!(out, "  {line}");
        }
    }
    out
}

pub fn render_plan(plan: &SeedPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Graph: {} entities, {} foreign-key edges",
        plan.summary.nodes, plan.summary.edges
    );
    let _ = writeln!(out, "\nInsert order:");
    for (index, entity) in plan.insert_order.iter().enumerate() {
        let _ = writeln!(out, "{:>4}. {entity}", index + 1);
    }

    if !plan.resolutions.is_empty() {
        let _ = writeln!(out, "\nCycles:");
        for resolution in &plan.resolutions {
            let how = match &resolution.strategy {
                Some(CycleStrategy::Deferred) => "deferred constraints".to_string(),
                Some(CycleStrategy::NullableForeignKey {
                    entity, columns, ..
                }) => format!("{entity}.{} left null on insert", columns.join(",")),
                None => "unresolved".to_string(),
            };
            let _ = writeln!(out, "- {} -> {how}", resolution.cycle.join(" -> "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaseed_core::{Column, EntitySchema, ForeignKey, NormalizedType, SchemaGraph};
    use schemaseed_plan::{PlanOptions, create_seed_plan};
    use schemaseed_runner::{EntityStats, ReportError};

    #[test]
    fn lists_entities_and_numbered_errors() {
        let mut report = EffectReport::new("42".to_string(), false);
        report.success = false;
        report.entities.push(EntityStats {
            entity: "users".to_string(),
            inserted_count: 10,
            duration_ms: 3,
            error: None,
        });
        report.entities.push(EntityStats {
            entity: "posts".to_string(),
            inserted_count: 0,
            duration_ms: 1,
            error: Some("boom".to_string()),
        });
        report.errors.push(ReportError {
            entity: Some("posts".to_string()),
            message: "boom".to_string(),
        });

        let text = render_report(&report);
        assert!(text.contains("Status:   failed"));
        assert!(text.contains("users         10       3ms  ok"));
        assert!(text.contains("1. [posts] boom"));
    }

    #[test]
    fn shows_cycle_breaks() {
        let schema = SchemaGraph::from_entities([
            EntitySchema::new("a")
                .with_column(Column::new("id", NormalizedType::Int))
                .with_column(Column::new("b_id", NormalizedType::Int).nullable())
                .with_primary_key(&["id"])
                .with_foreign_key(ForeignKey::new("b_id", "b", "id")),
            EntitySchema::new("b")
                .with_column(Column::new("id", NormalizedType::Int))
                .with_column(Column::new("a_id", NormalizedType::Int))
                .with_primary_key(&["id"])
                .with_foreign_key(ForeignKey::new("a_id", "a", "id")),
        ]);
        let plan = create_seed_plan(&schema, &PlanOptions::default(), false).unwrap();

        let text = render_plan(&plan);
        assert!(text.contains("Graph: 2 entities, 2 foreign-key edges"));
        assert!(text.contains("a.b_id left null on insert"));
        assert!(text.contains("   1. a\n   2. b"));
    }
}
