use schemaseed_core::{Column, EntitySchema, ForeignKey, NormalizedType, SchemaGraph};
use schemaseed_plan::{CycleStrategy, PlanError, PlanOptions, create_seed_plan};

fn entity(name: &str, refs: &[(&str, &str, bool)]) -> EntitySchema {
    let mut entity = EntitySchema::new(name)
        .with_column(Column::new("id", NormalizedType::Int).auto_increment())
        .with_primary_key(&["id"]);
    for (column, target, nullable) in refs {
        let mut descriptor = Column::new(column, NormalizedType::Int);
        descriptor.nullable = *nullable;
        entity = entity
            .with_column(descriptor)
            .with_foreign_key(ForeignKey::new(column, target, "id"));
    }
    entity
}

fn position(order: &[String], name: &str) -> usize {
    order
        .iter()
        .position(|item| item == name)
        .unwrap_or_else(|| panic!("{name} missing from {order:?}"))
}

fn blog_schema() -> SchemaGraph {
    SchemaGraph::from_entities([
        entity("comments", &[("post_id", "posts", false)]),
        entity("posts", &[("author_id", "users", false)]),
        entity("users", &[("profile_id", "profiles", false)]),
        entity("profiles", &[]),
        entity("tags", &[]),
    ])
}

#[test]
fn parents_precede_children() {
    let plan = create_seed_plan(&blog_schema(), &PlanOptions::default(), false).unwrap();
    let order = &plan.insert_order;
    assert_eq!(order.len(), 5);
    assert!(position(order, "profiles") < position(order, "users"));
    assert!(position(order, "users") < position(order, "posts"));
    assert!(position(order, "posts") < position(order, "comments"));
    assert!(plan.resolutions.is_empty());
}

#[test]
fn unresolvable_cycle_names_both_entities() {
    let schema = SchemaGraph::from_entities([
        entity("a", &[("b_id", "b", false)]),
        entity("b", &[("a_id", "a", false)]),
    ]);

    let err = create_seed_plan(&schema, &PlanOptions::default(), false).unwrap_err();
    assert!(matches!(err, PlanError::UnresolvableCycles { .. }));
    let message = err.to_string();
    assert!(message.contains("a -> b"), "{message}");
    assert!(message.contains("nullable"), "{message}");
}

#[test]
fn nullable_key_breaks_cycle() {
    let schema = SchemaGraph::from_entities([
        entity("users", &[("profile_id", "profiles", true)]),
        entity("profiles", &[("user_id", "users", false)]),
    ]);

    let plan = create_seed_plan(&schema, &PlanOptions::default(), false).unwrap();
    assert_eq!(
        plan.insert_order,
        vec!["users".to_string(), "profiles".to_string()]
    );
    assert_eq!(plan.resolutions.len(), 1);
    assert!(matches!(
        plan.resolutions[0].strategy,
        Some(CycleStrategy::NullableForeignKey { ref entity, .. }) if entity == "users"
    ));
    assert!(
        plan.null_columns()
            .contains(&("users".to_string(), "profile_id".to_string()))
    );
}

#[test]
fn nullable_key_breaks_cycle_beside_required_key() {
    let schema = SchemaGraph::from_entities([
        entity(
            "users",
            &[
                ("profile_id", "profiles", true),
                ("backup_profile_id", "profiles", false),
            ],
        ),
        entity("profiles", &[("user_id", "users", false)]),
    ]);

    let plan = create_seed_plan(&schema, &PlanOptions::default(), false).unwrap();
    assert_eq!(plan.resolutions.len(), 1);
    assert_eq!(
        plan.resolutions[0].strategy,
        Some(CycleStrategy::NullableForeignKey {
            entity: "users".to_string(),
            referenced_entity: "profiles".to_string(),
            columns: vec!["profile_id".to_string()],
            detached: false,
        })
    );
    assert_eq!(
        plan.insert_order,
        vec!["users".to_string(), "profiles".to_string()]
    );
    assert_eq!(
        plan.null_columns().into_iter().collect::<Vec<_>>(),
        vec![("users".to_string(), "profile_id".to_string())]
    );
}

#[test]
fn deferrable_store_keeps_sorted_order() {
    let schema = SchemaGraph::from_entities([
        entity("a", &[("b_id", "b", false)]),
        entity("b", &[("a_id", "a", false)]),
    ]);

    let plan = create_seed_plan(&schema, &PlanOptions::default(), true).unwrap();
    assert_eq!(plan.insert_order, vec!["b".to_string(), "a".to_string()]);
    assert_eq!(plan.resolutions[0].strategy, Some(CycleStrategy::Deferred));
    assert!(plan.null_columns().is_empty());
}

#[test]
fn include_with_parents_expands_dependencies() {
    let options = PlanOptions {
        include: vec!["posts".to_string()],
        include_parents: true,
        ..PlanOptions::default()
    };
    let plan = create_seed_plan(&blog_schema(), &options, false).unwrap();
    assert_eq!(
        plan.insert_order,
        vec!["profiles".to_string(), "users".to_string(), "posts".to_string()]
    );
}

#[test]
fn include_without_parents_is_exact() {
    let options = PlanOptions {
        include: vec!["posts".to_string()],
        ..PlanOptions::default()
    };
    let plan = create_seed_plan(&blog_schema(), &options, false).unwrap();
    assert_eq!(plan.insert_order, vec!["posts".to_string()]);
}

#[test]
fn exclude_applies_after_expansion() {
    let options = PlanOptions {
        include: vec!["posts".to_string()],
        exclude: vec!["profiles".to_string()],
        include_parents: true,
    };
    let plan = create_seed_plan(&blog_schema(), &options, false).unwrap();
    assert_eq!(plan.insert_order, vec!["users".to_string(), "posts".to_string()]);
}
