use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use schemaseed_core::SchemaGraph;
use schemaseed_generate::Row;

/// Backend features the planner and runner consult.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterCapabilities {
    pub enums: bool,
    /// Constraint checks can be postponed to commit.
    pub deferrable_constraints: bool,
    /// Inserts can hand back store-assigned keys.
    pub returning: bool,
    /// Explicit values for identity columns need a session switch.
    pub identity_insert: bool,
}

/// Rows for one entity, sent in a single insert call.
#[derive(Debug, Clone, Copy)]
pub struct InsertBatch<'a> {
    pub entity: &'a str,
    pub rows: &'a [Row],
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("transaction failed: {0}")]
    Transaction(String),
    #[error("insert into '{entity}' failed: {message}")]
    Insert { entity: String, message: String },
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Relational store.
#[async_trait]
pub trait SqlAdapter: Send {
    /// Short engine name for logs and reports.
    fn engine(&self) -> &str;

    /// Target checked by the production safety gate.
    fn connection_target(&self) -> Option<String> {
        None
    }

    fn capabilities(&self) -> AdapterCapabilities;

    async fn connect(&mut self) -> Result<(), AdapterError>;

    async fn disconnect(&mut self) -> Result<(), AdapterError>;

    async fn begin(&mut self) -> Result<(), AdapterError>;

    async fn commit(&mut self) -> Result<(), AdapterError>;

    async fn rollback(&mut self) -> Result<(), AdapterError>;

    async fn introspect_schema(&mut self) -> Result<SchemaGraph, AdapterError>;

    /// Insert rows and return any keys the store assigned, in row order.
    /// An empty vector means no keys were reported.
    async fn insert_batch(&mut self, batch: InsertBatch<'_>) -> Result<Vec<Value>, AdapterError>;

    /// Empty the given entities, in the order given.
    async fn truncate(&mut self, entities: &[String]) -> Result<(), AdapterError>;
}

/// Document store. Transactions default to no-ops.
#[async_trait]
pub trait DocumentAdapter: Send {
    fn engine(&self) -> &str;

    fn connection_target(&self) -> Option<String> {
        None
    }

    async fn connect(&mut self) -> Result<(), AdapterError>;

    async fn disconnect(&mut self) -> Result<(), AdapterError>;

    async fn begin(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Insert documents and return the ids the store assigned, if any.
    async fn insert_many(
        &mut self,
        collection: &str,
        documents: &[Row],
    ) -> Result<Vec<Value>, AdapterError>;

    async fn introspect_collections(&mut self) -> Result<Vec<String>, AdapterError> {
        Ok(Vec::new())
    }

    async fn validator_schema(&mut self, _collection: &str) -> Result<Option<Value>, AdapterError> {
        Ok(None)
    }

    fn supports_truncate(&self) -> bool {
        false
    }

    async fn truncate_collections(&mut self, _collections: &[String]) -> Result<(), AdapterError> {
        Err(AdapterError::Unsupported(format!(
            "{} cannot truncate collections",
            self.engine()
        )))
    }
}
