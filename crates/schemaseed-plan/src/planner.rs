use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use schemaseed_core::{DependencyGraph, GraphSummary, SchemaGraph};

use crate::cycles::{CycleResolution, CycleStrategy, resolve_cycles};
use crate::errors::{PlanError, Result};

/// Filters applied to the sorted entity order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanOptions {
    /// Explicit entities to seed; empty means all.
    pub include: Vec<String>,
    /// Entities removed after every other filter.
    pub exclude: Vec<String>,
    /// Expand `include` with transitive dependencies.
    pub include_parents: bool,
}

/// Authoritative insertion order for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedPlan {
    pub insert_order: Vec<String>,
    /// Every cycle found and how it was resolved.
    pub resolutions: Vec<CycleResolution>,
    pub summary: GraphSummary,
}

impl SeedPlan {
    /// `(entity, column)` pairs that must stay null on first insert because a
    /// cycle was broken there.
    pub fn null_columns(&self) -> BTreeSet<(String, String)> {
        self.resolutions
            .iter()
            .filter_map(|resolution| match &resolution.strategy {
                Some(CycleStrategy::NullableForeignKey {
                    entity, columns, ..
                }) => Some(
                    columns
                        .iter()
                        .map(|column| (entity.clone(), column.clone()))
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.insert_order.iter().any(|name| name == entity)
    }
}

/// Build the dependency graph, sort it, resolve cycles and apply filters.
///
/// Nullable-key breaks that null every key to the referenced entity remove
/// the broken edge and re-sort, so the breaking entity is inserted before the
/// entity it would otherwise wait for. Partial breaks and deferred cycles keep
/// the order the sort produced.
pub fn create_seed_plan(
    schema: &SchemaGraph,
    options: &PlanOptions,
    supports_deferrable: bool,
) -> Result<SeedPlan> {
    let full_graph = DependencyGraph::build(schema);
    let summary = full_graph.summary();
    let mut graph = full_graph.clone();
    let mut sorted = graph.topological_sort();
    let mut resolutions = Vec::new();

    while sorted.has_cycles() {
        let batch = resolve_cycles(&sorted.cycles, schema, supports_deferrable);
        let unresolved: Vec<Vec<String>> = batch
            .iter()
            .filter(|resolution| !resolution.is_resolved())
            .map(|resolution| resolution.cycle.clone())
            .collect();
        if !unresolved.is_empty() {
            return Err(PlanError::UnresolvableCycles { cycles: unresolved });
        }

        let mut removed = false;
        for resolution in batch {
            if resolutions.contains(&resolution) {
                continue;
            }
            info!(cycle = ?resolution.cycle, strategy = ?resolution.strategy, "cycle resolved");
            if let Some(CycleStrategy::NullableForeignKey {
                entity,
                referenced_entity,
                detached: true,
                ..
            }) = &resolution.strategy
            {
                removed |= graph.remove_edge(entity, referenced_entity);
            }
            resolutions.push(resolution);
        }

        if !removed {
            break;
        }
        sorted = graph.topological_sort();
    }

    let insert_order = apply_filters(sorted.order, options, |roots| {
        full_graph.dependency_closure(roots)
    });
    debug!(entities = insert_order.len(), "seed plan created");

    Ok(SeedPlan {
        insert_order,
        resolutions,
        summary,
    })
}

/// Narrow `order` by include (optionally expanded through `expand`) and
/// exclude, preserving relative order.
pub(crate) fn apply_filters(
    mut order: Vec<String>,
    options: &PlanOptions,
    expand: impl FnOnce(&[String]) -> BTreeSet<String>,
) -> Vec<String> {
    if !options.include.is_empty() {
        let keep: BTreeSet<String> = if options.include_parents {
            expand(&options.include)
        } else {
            options.include.iter().cloned().collect()
        };
        order.retain(|entity| keep.contains(entity));
    }

    if !options.exclude.is_empty() {
        order.retain(|entity| !options.exclude.contains(entity));
    }

    order
}
