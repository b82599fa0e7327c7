use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use schemaseed_core::Seed;
use schemaseed_generate::{GeneratorRegistry, Row};
use schemaseed_plan::{DocumentConfig, RowCount};
use schemaseed_runner::{AdapterError, DocumentAdapter, SeedError, SeedOptions, run_seed_documents};

#[derive(Default)]
struct MemoryStore {
    calls: Vec<String>,
    documents: Vec<(String, Row)>,
    truncatable: bool,
    fail_on: Option<String>,
    next_id: u64,
}

impl MemoryStore {
    fn collection(&self, name: &str) -> Vec<&Row> {
        self.documents
            .iter()
            .filter(|(collection, _)| collection == name)
            .map(|(_, document)| document)
            .collect()
    }
}

#[async_trait]
impl DocumentAdapter for MemoryStore {
    fn engine(&self) -> &str {
        "memory"
    }

    async fn connect(&mut self) -> Result<(), AdapterError> {
        self.calls.push("connect".to_string());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), AdapterError> {
        self.calls.push("disconnect".to_string());
        Ok(())
    }

    async fn insert_many(
        &mut self,
        collection: &str,
        documents: &[Row],
    ) -> Result<Vec<Value>, AdapterError> {
        self.calls
            .push(format!("insert:{collection}:{}", documents.len()));
        if self.fail_on.as_deref() == Some(collection) {
            return Err(AdapterError::Insert {
                entity: collection.to_string(),
                message: "duplicate key".to_string(),
            });
        }
        let mut ids = Vec::new();
        for document in documents {
            self.next_id += 1;
            let id = json!(format!("{:024x}", self.next_id));
            let mut stored = document.clone();
            stored.insert("_id".to_string(), id.clone());
            self.documents.push((collection.to_string(), stored));
            ids.push(id);
        }
        Ok(ids)
    }

    fn supports_truncate(&self) -> bool {
        self.truncatable
    }

    async fn truncate_collections(&mut self, collections: &[String]) -> Result<(), AdapterError> {
        self.calls.push(format!("truncate:{}", collections.join(",")));
        Ok(())
    }
}

fn shop() -> DocumentConfig {
    serde_json::from_value(json!({
        "collections": {
            "customers": {
                "rows": 3,
                "fields": {
                    "name": "fullName",
                    "email": { "type": "email", "unique": true },
                    "code": { "type": "int", "min": 1, "max": 1000000, "unique": true }
                }
            },
            "orders": {
                "fields": {
                    "customer": { "ref": "customers._id" },
                    "customer_code": { "ref": "customers.code" },
                    "status": { "type": "enum", "values": ["new", "paid"], "weights": [1, 3] },
                    "lines": {
                        "type": "array",
                        "of": { "type": "object", "fields": {
                            "qty": { "type": "int", "min": 1, "max": 9 }
                        }},
                        "minItems": 1,
                        "maxItems": 3
                    }
                }
            }
        }
    }))
    .unwrap()
}

fn options() -> SeedOptions {
    SeedOptions {
        rows: RowCount::Uniform(4),
        seed: Some(Seed::from("shop")),
        reference_time: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
        ..SeedOptions::default()
    }
}

#[tokio::test]
async fn referenced_collections_are_seeded_first() {
    let mut store = MemoryStore::default();

    let report = run_seed_documents(&mut store, &shop(), options(), GeneratorRegistry::default())
        .await
        .unwrap();

    assert!(report.success, "{:?}", report.errors);
    assert_eq!(
        store.calls,
        vec!["connect", "insert:customers:3", "insert:orders:4", "disconnect"]
    );
    assert_eq!(report.entity("customers").map(|stats| stats.inserted_count), Some(3));

    let customers = store.collection("customers");
    let ids: Vec<&Value> = customers.iter().map(|customer| &customer["_id"]).collect();
    let codes: Vec<&Value> = customers.iter().map(|customer| &customer["code"]).collect();
    for order in store.collection("orders") {
        assert!(ids.contains(&&order["customer"]));
        assert!(codes.contains(&&order["customer_code"]));
        assert!(["new", "paid"].contains(&order["status"].as_str().unwrap()));
        let lines = order["lines"].as_array().unwrap();
        assert!((1..=3).contains(&lines.len()));
        for line in lines {
            assert!((1..=9).contains(&line["qty"].as_i64().unwrap()));
        }
    }
}

#[tokio::test]
async fn dry_run_generates_without_touching_the_store() {
    let mut store = MemoryStore {
        truncatable: true,
        ..MemoryStore::default()
    };
    let options = SeedOptions {
        dry_run: true,
        truncate: true,
        preview_rows: 2,
        ..options()
    };

    let report = run_seed_documents(&mut store, &shop(), options, GeneratorRegistry::default())
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(store.calls, vec!["connect", "disconnect"]);
    assert_eq!(report.entity("orders").map(|stats| stats.inserted_count), Some(4));
    assert_eq!(report.previews["orders"].len(), 2);
}

#[tokio::test]
async fn truncation_is_skipped_with_a_warning_when_unsupported() {
    let mut store = MemoryStore::default();
    let options = SeedOptions {
        truncate: true,
        ..options()
    };

    let report = run_seed_documents(&mut store, &shop(), options, GeneratorRegistry::default())
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.warnings.len(), 1);
    assert!(!store.calls.iter().any(|call| call.starts_with("truncate")));
}

#[tokio::test]
async fn truncates_dependents_first_when_supported() {
    let mut store = MemoryStore {
        truncatable: true,
        ..MemoryStore::default()
    };
    let options = SeedOptions {
        truncate: true,
        ..options()
    };

    run_seed_documents(&mut store, &shop(), options, GeneratorRegistry::default())
        .await
        .unwrap();

    assert_eq!(store.calls[1], "truncate:orders,customers");
}

#[tokio::test]
async fn insert_failure_stops_the_run() {
    let mut store = MemoryStore {
        fail_on: Some("customers".to_string()),
        ..MemoryStore::default()
    };

    let report = run_seed_documents(&mut store, &shop(), options(), GeneratorRegistry::default())
        .await
        .unwrap();

    assert!(!report.success);
    assert!(report.entity("orders").is_none());
    assert_eq!(
        store.calls,
        vec!["connect", "insert:customers:3", "disconnect"]
    );
    assert!(report.errors[0].message.contains("duplicate key"));
}

#[tokio::test]
async fn invalid_configs_fail_before_connecting() {
    let mut store = MemoryStore::default();

    let empty = DocumentConfig::default();
    let result = run_seed_documents(&mut store, &empty, options(), GeneratorRegistry::default()).await;
    assert!(matches!(result, Err(SeedError::Config(_))));

    let mismatched: DocumentConfig = serde_json::from_value(json!({
        "collections": { "orders": { "fields": {
            "status": { "type": "enum", "values": ["a", "b"], "weights": [1] }
        }}}
    }))
    .unwrap();
    let result =
        run_seed_documents(&mut store, &mismatched, options(), GeneratorRegistry::default()).await;
    assert!(matches!(result, Err(SeedError::Config(_))));

    let dangling: DocumentConfig = serde_json::from_value(json!({
        "collections": { "orders": { "fields": { "customer": { "ref": "customers._id" } } } }
    }))
    .unwrap();
    let result =
        run_seed_documents(&mut store, &dangling, options(), GeneratorRegistry::default()).await;
    assert!(matches!(result, Err(SeedError::Plan(_))));

    assert!(store.calls.is_empty());
}

#[tokio::test]
async fn production_uri_is_refused() {
    let mut store = MemoryStore::default();
    let mut config = shop();
    config.uri = Some("mongodb://app:pw@cluster0.live-db.example.net/shop".to_string());

    let result = run_seed_documents(&mut store, &config, options(), GeneratorRegistry::default()).await;

    assert!(matches!(result, Err(SeedError::Safety(_))));
    assert!(store.calls.is_empty());
}
