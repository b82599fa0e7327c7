use serde::Serialize;

use schemaseed_core::SchemaGraph;

/// How a dependency cycle is made insertable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleStrategy {
    /// The store defers constraint checks to commit; order stays as sorted.
    Deferred,
    /// `entity` is inserted with `columns` left null. When `detached` is set
    /// every key to `referenced_entity` is nulled, so `entity` no longer needs
    /// it to exist first; otherwise the sorted order is kept.
    NullableForeignKey {
        entity: String,
        referenced_entity: String,
        columns: Vec<String>,
        detached: bool,
    },
}

impl CycleStrategy {
    /// The column named as the break point, when nulling is the strategy.
    pub fn breaking_column(&self) -> Option<&str> {
        match self {
            CycleStrategy::Deferred => None,
            CycleStrategy::NullableForeignKey { columns, .. } => {
                columns.first().map(String::as_str)
            }
        }
    }
}

/// A detected cycle and the strategy chosen for it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleResolution {
    pub cycle: Vec<String>,
    pub strategy: Option<CycleStrategy>,
}

impl CycleResolution {
    pub fn is_resolved(&self) -> bool {
        self.strategy.is_some()
    }
}

/// Classify each cycle as deferred, broken at a nullable foreign key, or
/// unresolved.
pub fn resolve_cycles(
    cycles: &[Vec<String>],
    schema: &SchemaGraph,
    supports_deferrable: bool,
) -> Vec<CycleResolution> {
    cycles
        .iter()
        .map(|cycle| {
            let strategy = if supports_deferrable {
                Some(CycleStrategy::Deferred)
            } else {
                find_nullable_break(cycle, schema)
            };
            CycleResolution {
                cycle: cycle.clone(),
                strategy,
            }
        })
        .collect()
}

// Walks consecutive pairs (wrapping at the end). The first pair with a
// foreign key whose owning columns are all nullable breaks the cycle.
fn find_nullable_break(cycle: &[String], schema: &SchemaGraph) -> Option<CycleStrategy> {
    for (idx, from) in cycle.iter().enumerate() {
        let to = &cycle[(idx + 1) % cycle.len()];
        let Some(entity) = schema.entity(from) else {
            continue;
        };

        let (nullable, required): (Vec<_>, Vec<_>) = entity
            .foreign_keys
            .iter()
            .filter(|fk| &fk.referenced_entity == to)
            .partition(|fk| {
                fk.columns.iter().all(|column| {
                    entity
                        .column(column)
                        .is_some_and(|descriptor| descriptor.nullable)
                })
            });
        if nullable.is_empty() {
            continue;
        }

        let columns = nullable
            .iter()
            .flat_map(|fk| fk.columns.iter().cloned())
            .collect();
        return Some(CycleStrategy::NullableForeignKey {
            entity: from.clone(),
            referenced_entity: to.clone(),
            columns,
            detached: required.is_empty(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaseed_core::{Column, EntitySchema, ForeignKey, NormalizedType};

    fn pair(a_nullable: bool, b_nullable: bool) -> SchemaGraph {
        let mut a_col = Column::new("b_id", NormalizedType::Int);
        a_col.nullable = a_nullable;
        let mut b_col = Column::new("a_id", NormalizedType::Int);
        b_col.nullable = b_nullable;

        SchemaGraph::from_entities([
            EntitySchema::new("a")
                .with_column(Column::new("id", NormalizedType::Int))
                .with_column(a_col)
                .with_foreign_key(ForeignKey::new("b_id", "b", "id")),
            EntitySchema::new("b")
                .with_column(Column::new("id", NormalizedType::Int))
                .with_column(b_col)
                .with_foreign_key(ForeignKey::new("a_id", "a", "id")),
        ])
    }

    fn cycle() -> Vec<Vec<String>> {
        vec![vec!["a".to_string(), "b".to_string()]]
    }

    #[test]
    fn deferrable_support_wins() {
        let resolutions = resolve_cycles(&cycle(), &pair(false, false), true);
        assert_eq!(resolutions[0].strategy, Some(CycleStrategy::Deferred));
    }

    #[test]
    fn breaks_at_nullable_key_across_wraparound() {
        let resolutions = resolve_cycles(&cycle(), &pair(false, true), false);
        let strategy = resolutions[0].strategy.clone().expect("resolved");
        assert_eq!(
            strategy,
            CycleStrategy::NullableForeignKey {
                entity: "b".to_string(),
                referenced_entity: "a".to_string(),
                columns: vec!["a_id".to_string()],
                detached: true,
            }
        );
        assert_eq!(strategy.breaking_column(), Some("a_id"));
    }

    #[test]
    fn one_nullable_key_breaks_even_beside_a_required_one() {
        let mut schema = pair(false, false);
        if let Some(a) = schema.entities.remove("a") {
            schema.insert(
                a.with_column(Column::new("spare_b_id", NormalizedType::Int).nullable())
                    .with_foreign_key(ForeignKey::new("spare_b_id", "b", "id")),
            );
        }

        let resolutions = resolve_cycles(&cycle(), &schema, false);
        assert_eq!(
            resolutions[0].strategy,
            Some(CycleStrategy::NullableForeignKey {
                entity: "a".to_string(),
                referenced_entity: "b".to_string(),
                columns: vec!["spare_b_id".to_string()],
                detached: false,
            })
        );
    }

    #[test]
    fn leaves_non_nullable_cycle_unresolved() {
        let resolutions = resolve_cycles(&cycle(), &pair(false, false), false);
        assert!(!resolutions[0].is_resolved());
    }
}
