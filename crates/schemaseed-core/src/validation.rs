use crate::error::{Error, Result};
use crate::schema::SchemaGraph;

/// Validate internal consistency of a schema graph.
///
/// This checks:
/// - map keys match entity names
/// - primary key, unique and foreign key columns exist
/// - foreign keys have matching column counts and existing targets
pub fn validate_schema(schema: &SchemaGraph) -> Result<()> {
    for (key, entity) in &schema.entities {
        if key != &entity.name {
            return Err(Error::InvalidSchema(format!(
                "entity key '{}' does not match entity name '{}'",
                key, entity.name
            )));
        }

        for column in entity.primary_key_columns() {
            if entity.column(column).is_none() {
                return Err(Error::InvalidSchema(format!(
                    "primary key column not found: {}.{}",
                    entity.name, column
                )));
            }
        }

        for unique in &entity.unique_constraints {
            for column in &unique.columns {
                if entity.column(column).is_none() {
                    return Err(Error::InvalidSchema(format!(
                        "unique column not found: {}.{}",
                        entity.name, column
                    )));
                }
            }
        }

        for fk in &entity.foreign_keys {
            for column in &fk.columns {
                if entity.column(column).is_none() {
                    return Err(Error::InvalidSchema(format!(
                        "foreign key column not found: {}.{}",
                        entity.name, column
                    )));
                }
            }

            if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
                return Err(Error::InvalidSchema(format!(
                    "foreign key on {} has {} columns but references {}",
                    entity.name,
                    fk.columns.len(),
                    fk.referenced_columns.len()
                )));
            }

            let target = schema
                .entity(&fk.referenced_entity)
                .ok_or_else(|| Error::MissingReference {
                    entity: entity.name.clone(),
                    referenced: fk.referenced_entity.clone(),
                })?;

            for column in &fk.referenced_columns {
                if target.column(column).is_none() {
                    return Err(Error::InvalidSchema(format!(
                        "referenced column not found: {}.{}",
                        target.name, column
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ForeignKey;
    use crate::schema::{Column, EntitySchema};
    use crate::types::NormalizedType;

    fn users() -> EntitySchema {
        EntitySchema::new("users")
            .with_column(Column::new("id", NormalizedType::Int))
            .with_primary_key(&["id"])
    }

    #[test]
    fn accepts_consistent_schema() {
        let posts = EntitySchema::new("posts")
            .with_column(Column::new("id", NormalizedType::Int))
            .with_column(Column::new("author_id", NormalizedType::Int))
            .with_foreign_key(ForeignKey::new("author_id", "users", "id"));
        let schema = SchemaGraph::from_entities([users(), posts]);
        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn rejects_missing_reference_target() {
        let posts = EntitySchema::new("posts")
            .with_column(Column::new("author_id", NormalizedType::Int))
            .with_foreign_key(ForeignKey::new("author_id", "accounts", "id"));
        let schema = SchemaGraph::from_entities([users(), posts]);
        let err = validate_schema(&schema).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingReference { ref referenced, .. } if referenced == "accounts"
        ));
    }

    #[test]
    fn rejects_unknown_primary_key_column() {
        let schema = SchemaGraph::from_entities([EntitySchema::new("users").with_primary_key(&["id"])]);
        assert!(validate_schema(&schema).is_err());
    }
}
