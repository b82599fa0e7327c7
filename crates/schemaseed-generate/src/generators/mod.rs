use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use schemaseed_core::NormalizedType;

use crate::errors::GenerationError;
use crate::random::SeedRandom;
use crate::refs::ReferenceRegistry;

pub mod builtin;
pub mod inference;

pub use inference::infer_generator;

/// Everything a generator may draw from for one value.
pub struct GeneratorCall<'a> {
    pub rng: &'a mut SeedRandom,
    pub refs: &'a ReferenceRegistry,
    pub entity: &'a str,
    pub field: &'a str,
    pub row_index: usize,
    pub options: Option<&'a Value>,
    /// Anchor for relative dates; fixed for the whole run.
    pub reference_time: DateTime<Utc>,
}

impl GeneratorCall<'_> {
    pub fn option_f64(&self, key: &str) -> Option<f64> {
        self.options.and_then(|options| options.get(key)).and_then(Value::as_f64)
    }

    pub fn option_i64(&self, key: &str) -> Option<i64> {
        self.options.and_then(|options| options.get(key)).and_then(Value::as_i64)
    }
}

/// A named value generator.
pub trait Generator: Send + Sync {
    fn id(&self) -> &str;

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError>;
}

/// Generator backed by a closure, used for plugin-provided generators.
pub struct FnGenerator<F> {
    id: String,
    func: F,
}

impl<F> FnGenerator<F>
where
    F: Fn(&mut GeneratorCall<'_>) -> Result<Value, GenerationError> + Send + Sync,
{
    pub fn new(id: impl Into<String>, func: F) -> Self {
        Self {
            id: id.into(),
            func,
        }
    }
}

impl<F> Generator for FnGenerator<F>
where
    F: Fn(&mut GeneratorCall<'_>) -> Result<Value, GenerationError> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError> {
        (self.func)(call)
    }
}

/// Result of name/type inference: which generator to call and with what.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredGenerator {
    pub generator_id: String,
    pub options: Option<Value>,
}

impl InferredGenerator {
    pub fn new(generator_id: &str) -> Self {
        Self {
            generator_id: generator_id.to_string(),
            options: None,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

type InferenceFn = dyn Fn(&str, NormalizedType) -> Option<InferredGenerator> + Send + Sync;

/// Generators by id plus the inference function mapping a field to one.
#[derive(Clone)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, Arc<dyn Generator>>,
    inference: Arc<InferenceFn>,
}

impl GeneratorRegistry {
    /// No generators, default inference rules.
    pub fn empty() -> Self {
        Self {
            generators: BTreeMap::new(),
            inference: Arc::new(infer_generator),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        builtin::register(&mut registry);
        registry
    }

    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        self.register_shared(Arc::from(generator));
    }

    /// Register under the generator's own id, replacing any previous one.
    pub fn register_shared(&mut self, generator: Arc<dyn Generator>) {
        self.generators.insert(generator.id().to_string(), generator);
    }

    pub fn register_fn<F>(&mut self, id: &str, func: F)
    where
        F: Fn(&mut GeneratorCall<'_>) -> Result<Value, GenerationError> + Send + Sync + 'static,
    {
        self.register_generator(Box::new(FnGenerator::new(id, func)));
    }

    pub fn set_inference<F>(&mut self, inference: F)
    where
        F: Fn(&str, NormalizedType) -> Option<InferredGenerator> + Send + Sync + 'static,
    {
        self.inference = Arc::new(inference);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Generator>> {
        self.generators.get(id)
    }

    pub fn infer(&self, field: &str, data_type: NormalizedType) -> Option<InferredGenerator> {
        (self.inference)(field, data_type)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
