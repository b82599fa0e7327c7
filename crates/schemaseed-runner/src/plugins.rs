use std::sync::Arc;

use tracing::info;

use schemaseed_generate::{FieldOverride, Generator, GeneratorRegistry, Overrides};

use crate::hooks::{HookChain, SeedHooks};

/// Bundle of generators, overrides and hooks added to a run.
#[derive(Clone)]
pub struct Plugin {
    pub name: String,
    pub generators: Vec<Arc<dyn Generator>>,
    pub overrides: Overrides,
    pub hooks: Option<Arc<dyn SeedHooks>>,
}

impl Plugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            generators: Vec::new(),
            overrides: Overrides::new(),
            hooks: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generators.push(generator);
        self
    }

    pub fn with_override(mut self, entity: &str, field: &str, value: FieldOverride) -> Self {
        self.overrides.set(entity, field, value);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn SeedHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field(
                "generators",
                &self.generators.iter().map(|g| g.id()).collect::<Vec<_>>(),
            )
            .field("overrides", &self.overrides)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Fold plugins into the run's registry, overrides and hook chain, in
/// order. Plugin overrides win over earlier entries; plugin hooks run after
/// the caller's.
pub(crate) fn apply_plugins(
    plugins: Vec<Plugin>,
    registry: &mut GeneratorRegistry,
    overrides: &mut Overrides,
    hooks: &mut HookChain,
) {
    for plugin in plugins {
        info!(
            plugin = %plugin.name,
            generators = plugin.generators.len(),
            hooks = plugin.hooks.is_some(),
            "plugin loaded"
        );
        for generator in plugin.generators {
            registry.register_shared(generator);
        }
        overrides.merge(plugin.overrides);
        if let Some(plugin_hooks) = plugin.hooks {
            hooks.push(plugin_hooks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaseed_generate::FnGenerator;
    use serde_json::json;

    #[test]
    fn plugins_contribute_generators_and_overrides() {
        let mut registry = GeneratorRegistry::empty();
        let mut overrides = Overrides::new();
        overrides.set("users", "role", FieldOverride::Literal(json!("member")));
        let mut hooks = HookChain::new();

        let plugin = Plugin::new("acme")
            .with_generator(Arc::new(FnGenerator::new("sku", |_| Ok(json!("SKU")))))
            .with_override("users", "role", FieldOverride::Literal(json!("admin")));
        apply_plugins(vec![plugin], &mut registry, &mut overrides, &mut hooks);

        assert!(registry.get("sku").is_some());
        assert!(matches!(
            overrides.lookup("users", "role"),
            Some(FieldOverride::Literal(value)) if value == &json!("admin")
        ));
        assert!(hooks.is_empty());
    }
}
