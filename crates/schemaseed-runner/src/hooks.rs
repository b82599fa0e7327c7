use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use schemaseed_generate::Row;

use crate::report::EntityStats;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hook failed: {0}")]
pub struct HookError(pub String);

/// Lifecycle callbacks around each entity's insert. Both default to no-ops.
#[async_trait]
pub trait SeedHooks: Send + Sync {
    /// May rewrite the rows about to be inserted.
    async fn before_insert(&self, _entity: &str, rows: Vec<Row>) -> Result<Vec<Row>, HookError> {
        Ok(rows)
    }

    async fn after_insert(&self, _entity: &str, _stats: &EntityStats) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hooks run in registration order; each `before_insert` sees the previous
/// one's output.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn SeedHooks>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hooks: Arc<dyn SeedHooks>) {
        self.hooks.push(hooks);
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }
}

impl std::fmt::Debug for HookChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("len", &self.hooks.len())
            .finish()
    }
}

#[async_trait]
impl SeedHooks for HookChain {
    async fn before_insert(&self, entity: &str, rows: Vec<Row>) -> Result<Vec<Row>, HookError> {
        let mut rows = rows;
        for hooks in &self.hooks {
            rows = hooks.before_insert(entity, rows).await?;
        }
        Ok(rows)
    }

    async fn after_insert(&self, entity: &str, stats: &EntityStats) -> Result<(), HookError> {
        for hooks in &self.hooks {
            hooks.after_insert(entity, stats).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Tag(&'static str);

    #[async_trait]
    impl SeedHooks for Tag {
        async fn before_insert(&self, _entity: &str, rows: Vec<Row>) -> Result<Vec<Row>, HookError> {
            Ok(rows
                .into_iter()
                .map(|mut row| {
                    let trail = row
                        .get("trail")
                        .and_then(|value| value.as_str())
                        .unwrap_or("")
                        .to_string();
                    row.insert("trail".to_string(), json!(format!("{trail}{}", self.0)));
                    row
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct Seen(Mutex<Vec<String>>);

    #[async_trait]
    impl SeedHooks for Seen {
        async fn after_insert(&self, entity: &str, stats: &EntityStats) -> Result<(), HookError> {
            if let Ok(mut seen) = self.0.lock() {
                seen.push(format!("{entity}:{}", stats.inserted_count));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn before_insert_hooks_compose_in_order() {
        let mut chain = HookChain::new();
        chain.push(Arc::new(Tag("a")));
        chain.push(Arc::new(Tag("b")));
        let rows = chain.before_insert("users", vec![Row::new()]).await.unwrap();
        assert_eq!(rows[0]["trail"], json!("ab"));
    }

    #[tokio::test]
    async fn after_insert_reaches_every_hook() {
        let seen = Arc::new(Seen::default());
        let mut chain = HookChain::new();
        chain.push(seen.clone());
        chain.push(Arc::new(Tag("x")));
        let stats = EntityStats {
            entity: "users".to_string(),
            inserted_count: 3,
            duration_ms: 1,
            error: None,
        };
        chain.after_insert("users", &stats).await.unwrap();
        assert_eq!(*seen.0.lock().unwrap(), vec!["users:3".to_string()]);
    }
}
