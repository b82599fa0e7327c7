use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use schemaseed_core::{Column, EntitySchema, ForeignKey, NormalizedType, Seed};
use schemaseed_generate::{
    FieldOverride, GenerationContext, GenerationState, GeneratorRegistry, Overrides, Row,
    generate_rows, override_fn,
};

fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap()
}

fn users() -> EntitySchema {
    EntitySchema::new("users")
        .with_column(Column::new("id", NormalizedType::Int).auto_increment())
        .with_column(Column::new("email", NormalizedType::String))
        .with_column(Column::new("first_name", NormalizedType::String))
        .with_column(Column::new("created_at", NormalizedType::Datetime))
        .with_column(Column::new("is_admin", NormalizedType::Boolean))
        .with_column(
            Column::new("status", NormalizedType::Enum).with_enum_values(&["active", "banned"]),
        )
        .with_column(Column::new("settings", NormalizedType::Json))
        .with_primary_key(&["id"])
        .with_unique(&["email"])
}

fn posts() -> EntitySchema {
    EntitySchema::new("posts")
        .with_column(Column::new("id", NormalizedType::Uuid))
        .with_column(Column::new("author_id", NormalizedType::Int))
        .with_column(Column::new("title", NormalizedType::String))
        .with_primary_key(&["id"])
        .with_foreign_key(ForeignKey::new("author_id", "users", "id"))
}

fn digest(rows: &[Row]) -> String {
    let bytes = serde_json::to_vec(rows).unwrap();
    hex::encode(Sha256::digest(&bytes))
}

async fn run_once(seed: Seed) -> String {
    let registry = GeneratorRegistry::with_builtins();
    let overrides = Overrides::new();
    let ctx = GenerationContext::new(&registry, &overrides, reference_time());
    let mut state = GenerationState::new(&seed);

    let users = generate_rows(&users(), 25, &ctx, &mut state).await.unwrap();
    for (index, _) in users.iter().enumerate() {
        state.refs.add_reference("users", json!(index + 1));
    }
    let posts = generate_rows(&posts(), 40, &ctx, &mut state).await.unwrap();

    let mut all = users;
    all.extend(posts);
    digest(&all)
}

#[tokio::test]
async fn same_seed_produces_identical_rows() {
    for seed in [Seed::Int(42), Seed::Int(-7), Seed::from("staging-fixtures")] {
        let first = run_once(seed.clone()).await;
        let second = run_once(seed).await;
        assert_eq!(first, second);
    }
    assert_ne!(run_once(Seed::Int(1)).await, run_once(Seed::Int(2)).await);
}

#[tokio::test]
async fn auto_increment_columns_are_skipped_and_references_used() {
    let registry = GeneratorRegistry::with_builtins();
    let overrides = Overrides::new();
    let ctx = GenerationContext::new(&registry, &overrides, reference_time());
    let mut state = GenerationState::new(&Seed::Int(3));

    let users = generate_rows(&users(), 5, &ctx, &mut state).await.unwrap();
    assert!(users.iter().all(|row| !row.contains_key("id")));
    assert!(users.iter().all(|row| row["email"].as_str().unwrap().contains('@')));

    for id in [10, 20, 30] {
        state.refs.add_reference("users", json!(id));
    }
    let posts = generate_rows(&posts(), 20, &ctx, &mut state).await.unwrap();
    for post in &posts {
        let author = post["author_id"].as_i64().unwrap();
        assert!([10, 20, 30].contains(&author));
        assert_eq!(post["id"].as_str().unwrap().len(), 36);
    }
}

#[tokio::test]
async fn missing_parent_falls_back_to_inference() {
    let registry = GeneratorRegistry::with_builtins();
    let overrides = Overrides::new();
    let ctx = GenerationContext::new(&registry, &overrides, reference_time());
    let mut state = GenerationState::new(&Seed::Int(3));

    let posts = generate_rows(&posts(), 3, &ctx, &mut state).await.unwrap();
    for post in &posts {
        let author = post["author_id"].as_i64().unwrap();
        assert!((1..=1_000_000).contains(&author));
    }
}

#[tokio::test]
async fn overrides_take_every_shape() {
    let registry = GeneratorRegistry::with_builtins();
    let mut overrides = Overrides::new();
    overrides.set(
        "users",
        "status",
        FieldOverride::EnumChoice {
            values: vec![json!("active"), json!("banned")],
            weights: Some(vec![1.0, 0.0]),
        },
    );
    overrides.set(
        "users",
        "created_at",
        FieldOverride::DateRange {
            start: Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2022, 1, 31, 0, 0, 0).unwrap(),
        },
    );
    overrides.set_global("settings", FieldOverride::Literal(json!({"theme": "dark"})));
    overrides.set(
        "users",
        "first_name",
        FieldOverride::Function(override_fn(|input| Ok(json!(format!("user-{}", input.row_index))))),
    );
    let ctx = GenerationContext::new(&registry, &overrides, reference_time());
    let mut state = GenerationState::new(&Seed::Int(9));

    let rows = generate_rows(&users(), 4, &ctx, &mut state).await.unwrap();
    for (index, row) in rows.iter().enumerate() {
        assert_eq!(row["status"], json!("active"));
        assert!(row["created_at"].as_str().unwrap().starts_with("2022-01-"));
        assert_eq!(row["settings"], json!({"theme": "dark"}));
        assert_eq!(row["first_name"], json!(format!("user-{index}")));
    }
}

#[tokio::test]
async fn unique_columns_fall_back_to_suffixes() {
    let mut registry = GeneratorRegistry::with_builtins();
    registry.register_fn("email", |_| Ok(json!("dup@example.com")));
    let overrides = Overrides::new();
    let ctx = GenerationContext::new(&registry, &overrides, reference_time());
    let mut state = GenerationState::new(&Seed::Int(1));

    let rows = generate_rows(&users(), 3, &ctx, &mut state).await.unwrap();
    let emails: Vec<&Value> = rows.iter().map(|row| &row["email"]).collect();
    assert_eq!(
        emails,
        vec![
            &json!("dup@example.com"),
            &json!("dup@example.com_1"),
            &json!("dup@example.com_2"),
        ]
    );
}

#[tokio::test]
async fn cycle_break_columns_are_left_null() {
    let profiles = EntitySchema::new("profiles")
        .with_column(Column::new("id", NormalizedType::Int))
        .with_column(Column::new("user_id", NormalizedType::Int).nullable())
        .with_primary_key(&["id"])
        .with_foreign_key(ForeignKey::new("user_id", "users", "id"));
    let registry = GeneratorRegistry::with_builtins();
    let overrides = Overrides::new();
    let null_columns = BTreeSet::from([("profiles".to_string(), "user_id".to_string())]);
    let ctx = GenerationContext::new(&registry, &overrides, reference_time())
        .with_null_columns(&null_columns);
    let mut state = GenerationState::new(&Seed::Int(1));
    state.refs.add_reference("users", json!(1));

    let rows = generate_rows(&profiles, 5, &ctx, &mut state).await.unwrap();
    assert!(rows.iter().all(|row| row["user_id"].is_null()));
}
