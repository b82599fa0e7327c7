use std::collections::HashMap;

use serde_json::Value;

use crate::random::SeedRandom;

/// Primary-key values generated so far in a run, per entity.
#[derive(Debug, Default, Clone)]
pub struct ReferenceRegistry {
    references: HashMap<String, Vec<Value>>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reference(&mut self, entity: &str, value: Value) {
        self.references
            .entry(entity.to_string())
            .or_default()
            .push(value);
    }

    /// Uniform pick among the recorded keys. `None` means the entity has no
    /// keys yet; no RNG draw happens in that case.
    pub fn get_random_reference(&self, entity: &str, rng: &mut SeedRandom) -> Option<Value> {
        let values = self.references.get(entity)?;
        rng.pick(values, None).cloned()
    }

    pub fn get_references(&self, entity: &str) -> &[Value] {
        self.references.get(entity).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self, entity: &str) -> usize {
        self.get_references(entity).len()
    }

    pub fn clear(&mut self) {
        self.references.clear();
    }
}
