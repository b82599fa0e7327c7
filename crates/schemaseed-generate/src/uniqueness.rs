use std::collections::{HashMap, HashSet};
use std::future::Future;

use serde_json::Value;

/// Attempts per value before falling back to a suffixed value.
pub const DEFAULT_MAX_RETRIES: usize = 100;

/// Values already handed out per `(entity, field)`.
#[derive(Debug, Default)]
pub struct UniquenessRegistry {
    used: HashMap<(String, String), HashSet<String>>,
}

impl UniquenessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `generate` until it yields an unseen value, at most
    /// `max_retries` times. After that one more value is drawn and suffixed
    /// with the number of values already recorded for the key.
    pub fn ensure_unique_sync<F, E>(
        &mut self,
        entity: &str,
        field: &str,
        mut generate: F,
        max_retries: usize,
    ) -> Result<Value, E>
    where
        F: FnMut() -> Result<Value, E>,
    {
        for _ in 0..max_retries {
            let candidate = generate()?;
            if self.try_record(entity, field, &candidate) {
                return Ok(candidate);
            }
        }
        let last = generate()?;
        Ok(self.record_fallback(entity, field, &last))
    }

    /// Async form of [`ensure_unique_sync`](Self::ensure_unique_sync) for
    /// generators that suspend.
    pub async fn ensure_unique<F, Fut, E>(
        &mut self,
        entity: &str,
        field: &str,
        mut generate: F,
        max_retries: usize,
    ) -> Result<Value, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        for _ in 0..max_retries {
            let candidate = generate().await?;
            if self.try_record(entity, field, &candidate) {
                return Ok(candidate);
            }
        }
        let last = generate().await?;
        Ok(self.record_fallback(entity, field, &last))
    }

    /// Forget one key, or everything when `key` is `None`.
    pub fn clear(&mut self, key: Option<(&str, &str)>) {
        match key {
            Some((entity, field)) => {
                self.used.remove(&(entity.to_string(), field.to_string()));
            }
            None => self.used.clear(),
        }
    }

    pub fn used_count(&self, entity: &str, field: &str) -> usize {
        self.used
            .get(&(entity.to_string(), field.to_string()))
            .map_or(0, HashSet::len)
    }

    fn try_record(&mut self, entity: &str, field: &str, value: &Value) -> bool {
        self.used
            .entry((entity.to_string(), field.to_string()))
            .or_default()
            .insert(fingerprint(value))
    }

    fn record_fallback(&mut self, entity: &str, field: &str, value: &Value) -> Value {
        let used = self
            .used
            .entry((entity.to_string(), field.to_string()))
            .or_default();
        let fallback = Value::String(format!("{}_{}", render(value), used.len()));
        used.insert(fingerprint(&fallback));
        fallback
    }
}

fn fingerprint(value: &Value) -> String {
    value.to_string()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::convert::Infallible;

    #[test]
    fn returns_first_unseen_value() {
        let mut registry = UniquenessRegistry::new();
        let mut next = 0;
        let mut generate = || -> Result<Value, Infallible> {
            next += 1;
            Ok(json!(next % 3))
        };
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(
                registry
                    .ensure_unique_sync("users", "code", &mut generate, 10)
                    .unwrap(),
            );
        }
        assert_eq!(seen, vec![json!(1), json!(2), json!(0)]);
        assert_eq!(registry.used_count("users", "code"), 3);
    }

    #[test]
    fn exhausted_retries_fall_back_to_suffix() {
        let mut registry = UniquenessRegistry::new();
        let calls = Cell::new(0);
        let constant = || -> Result<Value, Infallible> {
            calls.set(calls.get() + 1);
            Ok(json!("same"))
        };

        let first = registry.ensure_unique_sync("users", "email", constant, 5).unwrap();
        assert_eq!(first, json!("same"));
        assert_eq!(calls.get(), 1);

        calls.set(0);
        let second = registry.ensure_unique_sync("users", "email", constant, 5).unwrap();
        assert_eq!(second, json!("same_1"));
        assert_eq!(calls.get(), 6);

        calls.set(0);
        let third = registry.ensure_unique_sync("users", "email", constant, 5).unwrap();
        assert_eq!(third, json!("same_2"));
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn keys_are_independent_and_clearable() {
        let mut registry = UniquenessRegistry::new();
        let constant = || -> Result<Value, Infallible> { Ok(json!(7)) };
        registry.ensure_unique_sync("a", "x", constant, 3).unwrap();
        assert_eq!(registry.ensure_unique_sync("b", "x", constant, 3).unwrap(), json!(7));

        registry.clear(Some(("a", "x")));
        assert_eq!(registry.used_count("a", "x"), 0);
        assert_eq!(registry.used_count("b", "x"), 1);

        registry.clear(None);
        assert_eq!(registry.used_count("b", "x"), 0);
    }

    #[test]
    fn generator_errors_propagate() {
        let mut registry = UniquenessRegistry::new();
        let failing = || -> Result<Value, String> { Err("boom".to_string()) };
        assert_eq!(
            registry.ensure_unique_sync("a", "x", failing, 3),
            Err("boom".to_string())
        );
    }

    #[tokio::test]
    async fn async_generators_share_the_contract() {
        let mut registry = UniquenessRegistry::new();
        let first = registry
            .ensure_unique("users", "slug", || async { Ok::<_, Infallible>(json!("post")) }, 4)
            .await
            .unwrap();
        let second = registry
            .ensure_unique("users", "slug", || async { Ok::<_, Infallible>(json!("post")) }, 4)
            .await
            .unwrap();
        assert_eq!(first, json!("post"));
        assert_eq!(second, json!("post_1"));
    }
}
