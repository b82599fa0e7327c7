use std::sync::Arc;

use chrono::{DateTime, Utc};

use schemaseed_core::Seed;
use schemaseed_generate::Overrides;
use schemaseed_plan::{DEFAULT_BATCH_SIZE, DEFAULT_ROW_COUNT, PlanOptions, RowCount, SeedConfig};

use crate::errors::SeedError;
use crate::hooks::{HookChain, SeedHooks};
use crate::plugins::Plugin;

/// Everything a run needs besides the adapter, schema and plan.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub rows: RowCount,
    /// `None` derives a seed from the clock; it is logged and reported.
    pub seed: Option<Seed>,
    pub dry_run: bool,
    pub batch_size: usize,
    pub allow_production: bool,
    pub include_parents: bool,
    pub truncate: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub overrides: Overrides,
    pub hooks: HookChain,
    pub plugins: Vec<Plugin>,
    /// Anchor for generated dates; `None` pins the run start time.
    pub reference_time: Option<DateTime<Utc>>,
    /// Rows per entity copied into the report preview.
    pub preview_rows: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            rows: RowCount::Uniform(DEFAULT_ROW_COUNT),
            seed: None,
            dry_run: false,
            batch_size: DEFAULT_BATCH_SIZE,
            allow_production: false,
            include_parents: false,
            truncate: false,
            include: Vec::new(),
            exclude: Vec::new(),
            overrides: Overrides::new(),
            hooks: HookChain::new(),
            plugins: Vec::new(),
            reference_time: None,
            preview_rows: 0,
        }
    }
}

impl SeedOptions {
    /// Options described by a validated config file.
    pub fn from_config(config: &SeedConfig) -> Result<Self, SeedError> {
        let overrides = Overrides::from_config(config)?;
        let reference_time = match config.reference_time.as_deref() {
            Some(raw) => Some(config.reference_time().ok_or_else(|| {
                SeedError::Config(format!("reference_time '{raw}' is not a valid instant"))
            })?),
            None => None,
        };
        Ok(Self {
            rows: config
                .rows
                .clone()
                .unwrap_or(RowCount::Uniform(DEFAULT_ROW_COUNT)),
            seed: config.seed.clone(),
            dry_run: config.dry_run,
            batch_size: config.batch_size(),
            allow_production: config.allow_production,
            include_parents: config.include_parents,
            truncate: config.truncate,
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            overrides,
            reference_time,
            ..Self::default()
        })
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            include_parents: self.include_parents,
        }
    }

    pub fn row_count(&self, entity: &str) -> usize {
        self.rows.for_entity(entity) as usize
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn SeedHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), SeedError> {
        if self.batch_size == 0 {
            return Err(SeedError::Config("batch_size must be greater than zero".to_string()));
        }
        Ok(())
    }
}
