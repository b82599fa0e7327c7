use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::SchemaGraph;

/// One entity with its inbound and outbound foreign-key edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub entity: String,
    /// Entities this one references (must be inserted first).
    pub dependencies: BTreeSet<String>,
    /// Entities referencing this one.
    pub dependents: BTreeSet<String>,
}

impl DependencyNode {
    fn new(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }
}

/// Summary of graph structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Output of the depth-first sort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopoSort {
    /// Insertion order; dependencies precede dependents outside of cycles.
    pub order: Vec<String>,
    /// Each detected cycle, starting at the first repeated entity.
    pub cycles: Vec<Vec<String>>,
}

impl TopoSort {
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// Entity-to-entity dependency graph derived from foreign keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, DependencyNode>,
}

impl DependencyGraph {
    /// Build the graph. Self-references and keys pointing outside the schema
    /// produce no edge.
    pub fn build(schema: &SchemaGraph) -> Self {
        let mut nodes: BTreeMap<String, DependencyNode> = schema
            .entity_names()
            .map(|name| (name.to_string(), DependencyNode::new(name)))
            .collect();

        for (name, entity) in &schema.entities {
            for fk in &entity.foreign_keys {
                let target = &fk.referenced_entity;
                if fk.is_self_reference(name) || !nodes.contains_key(target) {
                    continue;
                }
                if let Some(node) = nodes.get_mut(name) {
                    node.dependencies.insert(target.clone());
                }
                if let Some(node) = nodes.get_mut(target) {
                    node.dependents.insert(name.clone());
                }
            }
        }

        Self { nodes }
    }

    pub fn node(&self, entity: &str) -> Option<&DependencyNode> {
        self.nodes.get(entity)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.dependencies.len()).sum()
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.len(),
            edges: self.edge_count(),
        }
    }

    /// Drop the `from -> to` dependency. Returns false when no such edge exists.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        let removed = self
            .nodes
            .get_mut(from)
            .is_some_and(|node| node.dependencies.remove(to));
        if removed && let Some(node) = self.nodes.get_mut(to) {
            node.dependents.remove(from);
        }
        removed
    }

    /// Roots plus every entity reachable through their dependencies.
    pub fn dependency_closure<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a String>,
    ) -> BTreeSet<String> {
        let mut closure = BTreeSet::new();
        let mut stack: Vec<String> = roots.into_iter().cloned().collect();

        while let Some(entity) = stack.pop() {
            if !closure.insert(entity.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&entity) {
                stack.extend(
                    node.dependencies
                        .iter()
                        .filter(|dep| !closure.contains(*dep))
                        .cloned(),
                );
            }
        }

        closure
    }

    /// Depth-first, post-order sort. Cycles are recorded rather than treated
    /// as errors; entities inside a cycle keep the order the walk produced.
    pub fn topological_sort(&self) -> TopoSort {
        let mut walk = Walk::default();
        for entity in self.nodes.keys() {
            self.visit(entity, &mut walk);
        }
        TopoSort {
            order: walk.order,
            cycles: walk.cycles,
        }
    }

    fn visit(&self, entity: &str, walk: &mut Walk) {
        if walk.on_stack.contains(entity) {
            if let Some(start) = walk.path.iter().position(|item| item == entity) {
                walk.cycles.push(walk.path[start..].to_vec());
            }
            return;
        }
        if !walk.visited.insert(entity.to_string()) {
            return;
        }

        walk.on_stack.insert(entity.to_string());
        walk.path.push(entity.to_string());

        if let Some(node) = self.nodes.get(entity) {
            for dependency in &node.dependencies {
                self.visit(dependency, walk);
            }
        }

        walk.path.pop();
        walk.on_stack.remove(entity);
        walk.order.push(entity.to_string());
    }
}

#[derive(Default)]
struct Walk {
    visited: BTreeSet<String>,
    on_stack: BTreeSet<String>,
    path: Vec<String>,
    order: Vec<String>,
    cycles: Vec<Vec<String>>,
}
