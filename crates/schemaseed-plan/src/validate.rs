use std::collections::BTreeMap;

use jsonschema::JSONSchema;
use serde_json::Value;

use schemaseed_core::SchemaGraph;

use crate::document::{DocumentConfig, FieldConfig, FieldKind};
use crate::errors::{IssueSeverity, PlanError, ValidationIssue, ValidationReport};
use crate::model::{OverrideSpec, RowCount, SeedConfig, parse_instant};
use crate::schema::config_json_schema;

/// Parsed configuration with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: SeedConfig,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a configuration document against a JSON Schema.
pub fn validate_config_json(
    config_json: &Value,
    config_schema: &Value,
) -> Result<ValidationReport, PlanError> {
    let compiled =
        JSONSchema::compile(config_schema).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(config_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Semantic checks on a parsed configuration. Entity names are checked
/// against `schema` when one is available.
pub fn validate_config_against_schema(
    config: &SeedConfig,
    schema: Option<&SchemaGraph>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.batch_size == Some(0) {
        report.push_error(
            ValidationIssue::error("batch_size_zero", "/batch_size", "batch_size must be greater than zero")
                .with_hint("omit batch_size to use the default of 1000"),
        );
    }

    if let Some(reference_time) = &config.reference_time
        && parse_instant(reference_time).is_none()
    {
        report.push_error(ValidationIssue::error(
            "invalid_reference_time",
            "/reference_time",
            format!("'{reference_time}' is not an RFC 3339 timestamp or YYYY-MM-DD date"),
        ));
    }

    for (entity, fields) in &config.overrides {
        let base_path = format!("/overrides/{entity}");
        check_entity_name(schema, entity, &base_path, &mut report);
        for (field, value) in fields {
            let path = format!("{base_path}/{field}");
            if let Err(message) = OverrideSpec::parse(value) {
                report.push_error(ValidationIssue::error(
                    "invalid_override",
                    path.clone(),
                    format!("invalid override for '{entity}.{field}': {message}"),
                ));
            }
            let known_column = schema
                .and_then(|schema| schema.entity(entity))
                .map(|descriptor| descriptor.column(field).is_some());
            if known_column == Some(false) {
                report.push_warning(ValidationIssue::warning(
                    "unknown_column",
                    path,
                    format!("entity '{entity}' has no column '{field}'"),
                ));
            }
        }
    }

    for (field, value) in &config.global_overrides {
        if let Err(message) = OverrideSpec::parse(value) {
            report.push_error(ValidationIssue::error(
                "invalid_override",
                format!("/global_overrides/{field}"),
                format!("invalid global override for '{field}': {message}"),
            ));
        }
    }

    for (idx, entity) in config.include.iter().enumerate() {
        check_entity_name(schema, entity, &format!("/include/{idx}"), &mut report);
    }
    for (idx, entity) in config.exclude.iter().enumerate() {
        check_entity_name(schema, entity, &format!("/exclude/{idx}"), &mut report);
    }
    if let Some(RowCount::PerEntity(counts)) = &config.rows {
        for entity in counts.keys() {
            check_entity_name(schema, entity, &format!("/rows/{entity}"), &mut report);
        }
    }

    if let Some(documents) = &config.documents {
        validate_documents(documents, &mut report);
    }

    report
}

/// Validate the configuration end-to-end, returning structured issues on
/// failure.
pub fn validate_config(
    config_json: &Value,
    schema: Option<&SchemaGraph>,
) -> Result<ValidatedConfig, ValidationReport> {
    let structural = serde_json::to_value(config_json_schema())
        .map_err(PlanError::from)
        .and_then(|config_schema| validate_config_json(config_json, &config_schema));
    let structural = match structural {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::error(
                "schema_validation_error",
                "/",
                err.to_string(),
            ));
            return Err(report);
        }
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let config: SeedConfig = match serde_json::from_value(config_json.clone()) {
        Ok(config) => config,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::error("invalid_config_json", "/", err.to_string()));
            return Err(report);
        }
    };

    let semantic = validate_config_against_schema(&config, schema);
    if !semantic.is_ok() {
        return Err(semantic);
    }

    Ok(ValidatedConfig {
        config,
        warnings: semantic.warnings,
    })
}

fn check_entity_name(
    schema: Option<&SchemaGraph>,
    entity: &str,
    path: &str,
    report: &mut ValidationReport,
) {
    if let Some(schema) = schema
        && !schema.contains(entity)
    {
        report.push_warning(
            ValidationIssue::warning(
                "unknown_entity",
                path,
                format!("entity '{entity}' is not in the schema"),
            )
            .with_hint("check the spelling or regenerate schema.json"),
        );
    }
}

fn validate_documents(documents: &DocumentConfig, report: &mut ValidationReport) {
    if documents.collections.is_empty() {
        report.push_error(ValidationIssue::error(
            "collections_empty",
            "/documents/collections",
            "no collections defined",
        ));
        return;
    }

    for (name, collection) in &documents.collections {
        let base_path = format!("/documents/collections/{name}");
        if collection.rows == Some(0) {
            report.push_error(ValidationIssue::error(
                "rows_zero",
                format!("{base_path}/rows"),
                format!("collection '{name}' must have rows > 0"),
            ));
        }
        if collection.fields.is_empty() {
            report.push_error(ValidationIssue::error(
                "fields_empty",
                format!("{base_path}/fields"),
                format!("collection '{name}' must have fields defined"),
            ));
        }
        validate_fields(
            &collection.fields,
            &documents.collections,
            &format!("{base_path}/fields"),
            report,
        );
    }
}

fn validate_fields<T>(
    fields: &BTreeMap<String, FieldConfig>,
    collections: &BTreeMap<String, T>,
    base_path: &str,
    report: &mut ValidationReport,
) {
    for (field, config) in fields {
        validate_field(config, collections, &format!("{base_path}/{field}"), report);
    }
}

fn validate_field<T>(
    config: &FieldConfig,
    collections: &BTreeMap<String, T>,
    path: &str,
    report: &mut ValidationReport,
) {
    let Some(spec) = config.spec() else {
        return;
    };

    if let Some(target) = spec.referenced_collection() {
        if !collections.contains_key(target) {
            report.push_error(ValidationIssue::error(
                "unknown_reference",
                format!("{path}/ref"),
                format!("reference '{target}' is not a defined collection"),
            ));
        }
        return;
    }

    match spec.kind() {
        None => report.push_error(ValidationIssue::error(
            "missing_type",
            path,
            "field needs a type or a ref",
        )),
        Some(FieldKind::Enum) => {
            let values = spec.values.as_deref().unwrap_or_default();
            if values.is_empty() {
                report.push_error(ValidationIssue::error(
                    "enum_values_empty",
                    format!("{path}/values"),
                    "enum fields need at least one value",
                ));
            }
            if let Some(weights) = &spec.weights
                && weights.len() != values.len()
            {
                report.push_error(ValidationIssue::error(
                    "enum_weights_mismatch",
                    format!("{path}/weights"),
                    format!(
                        "enum weights and values length mismatch ({} vs {})",
                        weights.len(),
                        values.len()
                    ),
                ));
            }
        }
        Some(FieldKind::Object) => {
            if let Some(fields) = &spec.fields {
                validate_fields(fields, collections, &format!("{path}/fields"), report);
            }
        }
        Some(FieldKind::Array) => {
            match &spec.of {
                Some(element) => validate_field(element, collections, &format!("{path}/of"), report),
                None => report.push_error(ValidationIssue::error(
                    "array_element_missing",
                    format!("{path}/of"),
                    "array fields need an element config in 'of'",
                )),
            }
            if let (Some(min), Some(max)) = (spec.min_items, spec.max_items)
                && min > max
            {
                report.push_error(ValidationIssue::error(
                    "array_bounds_inverted",
                    path,
                    format!("minItems {min} is greater than maxItems {max}"),
                ));
            }
        }
        Some(FieldKind::Int | FieldKind::Float | FieldKind::Decimal) => {
            if let (Some(min), Some(max)) = (spec.min, spec.max)
                && min > max
            {
                report.push_error(ValidationIssue::error(
                    "range_bounds_inverted",
                    path,
                    format!("min {min} is greater than max {max}"),
                ));
            }
        }
        Some(FieldKind::DateBetween) => {
            for (key, bound) in [("from", &spec.from), ("to", &spec.to)] {
                if let Some(bound) = bound
                    && parse_instant(bound).is_none()
                {
                    report.push_error(ValidationIssue::error(
                        "invalid_date_bound",
                        format!("{path}/{key}"),
                        format!("'{bound}' is not an RFC 3339 timestamp or YYYY-MM-DD date"),
                    ));
                }
            }
        }
        Some(_) => {}
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
