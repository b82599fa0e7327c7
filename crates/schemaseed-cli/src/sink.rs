use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use schemaseed_core::SchemaGraph;
use schemaseed_generate::Row;
use schemaseed_runner::{
    AdapterCapabilities, AdapterError, DocumentAdapter, InsertBatch, SqlAdapter,
};

const ENGINE: &str = "jsonl";
const DOCUMENT_ID: &str = "_id";

/// File-backed store: one `<entity>.jsonl` per entity under `out_dir`.
///
/// Rows are staged per transaction and appended on commit; a rollback
/// discards them. Auto-increment keys and missing `_id`s are assigned here,
/// continuing from the number of rows already on disk.
#[derive(Debug)]
pub struct JsonlSink {
    out_dir: PathBuf,
    schema: Option<SchemaGraph>,
    target: Option<String>,
    staged: BTreeMap<String, Vec<Row>>,
    sequences: BTreeMap<String, u64>,
}

impl JsonlSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            schema: None,
            target: None,
            staged: BTreeMap::new(),
            sequences: BTreeMap::new(),
        }
    }

    /// Schema used to find auto-increment key columns.
    pub fn with_schema(mut self, schema: SchemaGraph) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Connection target reported to the production safety gate.
    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    pub fn entity_path(&self, entity: &str) -> PathBuf {
        self.out_dir.join(format!("{entity}.jsonl"))
    }

    fn open(&mut self) -> Result<(), AdapterError> {
        fs::create_dir_all(&self.out_dir)?;
        debug!(out_dir = %self.out_dir.display(), "sink opened");
        Ok(())
    }

    fn close(&mut self) {
        if !self.staged.is_empty() {
            debug!(entities = self.staged.len(), "discarding uncommitted rows");
        }
        self.staged.clear();
    }

    fn next_sequence(&mut self, entity: &str) -> Result<u64, AdapterError> {
        let current = match self.sequences.get(entity) {
            Some(current) => *current,
            None => count_lines(&self.entity_path(entity))?,
        };
        let next = current + 1;
        self.sequences.insert(entity.to_string(), next);
        Ok(next)
    }

    fn auto_key_column(&self, entity: &str) -> Option<String> {
        let entity = self.schema.as_ref()?.entity(entity)?;
        entity
            .primary_key_columns()
            .iter()
            .find(|column| {
                entity
                    .column(column)
                    .is_some_and(|column| column.auto_increment)
            })
            .cloned()
    }

    fn stage_rows(&mut self, entity: &str, rows: &[Row]) -> Result<Vec<Value>, AdapterError> {
        let key_column = self.auto_key_column(entity);
        let mut keys = Vec::with_capacity(rows.len());
        let mut staged = Vec::with_capacity(rows.len());
        for row in rows {
            let mut row = row.clone();
            let key = match key_column.as_deref() {
                Some(column) => match row.get(column).filter(|value| !value.is_null()) {
                    Some(value) => value.clone(),
                    None => {
                        let key = Value::from(self.next_sequence(entity)?);
                        row.insert(column.to_string(), key.clone());
                        key
                    }
                },
                None => Value::Null,
            };
            keys.push(key);
            staged.push(row);
        }
        self.staged.entry(entity.to_string()).or_default().extend(staged);
        Ok(keys)
    }

    fn stage_documents(
        &mut self,
        collection: &str,
        documents: &[Row],
    ) -> Result<Vec<Value>, AdapterError> {
        let mut ids = Vec::with_capacity(documents.len());
        let mut staged = Vec::with_capacity(documents.len());
        for document in documents {
            let mut document = document.clone();
            let id = match document.get(DOCUMENT_ID).filter(|value| !value.is_null()) {
                Some(id) => id.clone(),
                None => {
                    let id = Value::String(format!("{:024x}", self.next_sequence(collection)?));
                    document.insert(DOCUMENT_ID.to_string(), id.clone());
                    id
                }
            };
            ids.push(id);
            staged.push(document);
        }
        self.staged
            .entry(collection.to_string())
            .or_default()
            .extend(staged);
        Ok(ids)
    }

    fn flush(&mut self) -> Result<(), AdapterError> {
        let staged = std::mem::take(&mut self.staged);
        for (entity, rows) in &staged {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.entity_path(entity))?;
            let mut writer = BufWriter::new(file);
            for row in rows {
                serde_json::to_writer(&mut writer, row)
                    .map_err(|err| AdapterError::Other(err.to_string()))?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            info!(entity = %entity, rows = rows.len(), "rows written");
        }
        Ok(())
    }

    fn discard(&mut self) {
        let rows: usize = self.staged.values().map(Vec::len).sum();
        self.staged.clear();
        // Keys handed out for discarded rows are reused by the next insert.
        self.sequences.clear();
        debug!(rows, "staged rows discarded");
    }

    fn remove(&mut self, entities: &[String]) -> Result<(), AdapterError> {
        for entity in entities {
            match fs::remove_file(self.entity_path(entity)) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
            self.sequences.remove(entity);
            self.staged.remove(entity);
        }
        Ok(())
    }

    fn entities_on_disk(&self) -> Result<Vec<String>, AdapterError> {
        let mut names = Vec::new();
        let entries = match fs::read_dir(&self.out_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(names),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "jsonl")
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn count_lines(path: &Path) -> Result<u64, AdapterError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err.into()),
    };
    let mut count = 0;
    for line in BufReader::new(file).lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

#[async_trait]
impl SqlAdapter for JsonlSink {
    fn engine(&self) -> &str {
        ENGINE
    }

    fn connection_target(&self) -> Option<String> {
        self.target.clone()
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            returning: true,
            ..AdapterCapabilities::default()
        }
    }

    async fn connect(&mut self) -> Result<(), AdapterError> {
        self.open()
    }

    async fn disconnect(&mut self) -> Result<(), AdapterError> {
        self.close();
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), AdapterError> {
        self.staged.clear();
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), AdapterError> {
        self.flush()
    }

    async fn rollback(&mut self) -> Result<(), AdapterError> {
        self.discard();
        Ok(())
    }

    async fn introspect_schema(&mut self) -> Result<SchemaGraph, AdapterError> {
        self.schema.clone().ok_or_else(|| {
            AdapterError::Unsupported("the jsonl sink has no schema of its own".to_string())
        })
    }

    async fn insert_batch(&mut self, batch: InsertBatch<'_>) -> Result<Vec<Value>, AdapterError> {
        self.stage_rows(batch.entity, batch.rows)
    }

    async fn truncate(&mut self, entities: &[String]) -> Result<(), AdapterError> {
        self.remove(entities)
    }
}

#[async_trait]
impl DocumentAdapter for JsonlSink {
    fn engine(&self) -> &str {
        ENGINE
    }

    fn connection_target(&self) -> Option<String> {
        self.target.clone()
    }

    async fn connect(&mut self) -> Result<(), AdapterError> {
        self.open()
    }

    async fn disconnect(&mut self) -> Result<(), AdapterError> {
        self.close();
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), AdapterError> {
        self.staged.clear();
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), AdapterError> {
        self.flush()
    }

    async fn rollback(&mut self) -> Result<(), AdapterError> {
        self.discard();
        Ok(())
    }

    async fn insert_many(
        &mut self,
        collection: &str,
        documents: &[Row],
    ) -> Result<Vec<Value>, AdapterError> {
        self.stage_documents(collection, documents)
    }

    async fn introspect_collections(&mut self) -> Result<Vec<String>, AdapterError> {
        self.entities_on_disk()
    }

    fn supports_truncate(&self) -> bool {
        true
    }

    async fn truncate_collections(&mut self, collections: &[String]) -> Result<(), AdapterError> {
        self.remove(collections)
    }
}
