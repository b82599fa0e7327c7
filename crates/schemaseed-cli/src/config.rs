use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use clap::Args;
use serde_json::Value;
use tracing::warn;

use schemaseed_core::{SchemaGraph, Seed, validate_schema};
use schemaseed_plan::{RowCount, SeedConfig, ValidatedConfig, ValidationReport, validate_config};

use crate::CliError;

/// Flags shared by the seeding commands; each one overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct RunFlags {
    /// Seed for the random stream; integers and strings are both accepted.
    #[arg(long)]
    pub seed: Option<String>,
    /// Rows per entity.
    #[arg(long, conflicts_with = "rows_per_entity")]
    pub rows: Option<u64>,
    /// JSON map of entity name to row count, e.g. '{"users": 50}'.
    #[arg(long, value_name = "JSON")]
    pub rows_per_entity: Option<String>,
    /// Generate and report without writing anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
    /// Empty target entities before seeding.
    #[arg(long, default_value_t = false)]
    pub truncate: bool,
    /// Run even when the target looks like production.
    #[arg(long, default_value_t = false)]
    pub allow_production: bool,
    /// Only seed these entities.
    #[arg(long = "include", value_name = "ENTITY")]
    pub include: Vec<String>,
    /// Skip these entities.
    #[arg(long = "exclude", value_name = "ENTITY")]
    pub exclude: Vec<String>,
    /// Also seed every entity the included ones depend on.
    #[arg(long, alias = "with-parents", default_value_t = false)]
    pub include_parents: bool,
    /// Rows per insert call.
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl RunFlags {
    pub fn apply(&self, config: &mut SeedConfig) -> Result<(), CliError> {
        if let Some(seed) = &self.seed {
            config.seed = Some(parse_seed(seed));
        }
        if let Some(rows) = self.rows {
            config.rows = Some(RowCount::Uniform(rows));
        }
        if let Some(raw) = &self.rows_per_entity {
            let counts: BTreeMap<String, u64> = serde_json::from_str(raw).map_err(|err| {
                CliError::InvalidConfig(format!("--rows-per-entity must be a JSON object: {err}"))
            })?;
            config.rows = Some(RowCount::PerEntity(counts));
        }
        config.dry_run |= self.dry_run;
        config.truncate |= self.truncate;
        config.allow_production |= self.allow_production;
        config.include_parents |= self.include_parents;
        if !self.include.is_empty() {
            config.include = self.include.clone();
        }
        if !self.exclude.is_empty() {
            config.exclude = self.exclude.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = Some(batch_size);
        }
        Ok(())
    }
}

/// Integer seeds stay integers so `--seed 42` matches `seed = 42`.
pub fn parse_seed(raw: &str) -> Seed {
    raw.parse::<i64>()
        .map(Seed::Int)
        .unwrap_or_else(|_| Seed::Text(raw.to_string()))
}

/// Load a schema file and check its internal consistency.
pub fn load_schema(path: &Path) -> Result<(SchemaGraph, Vec<u8>), CliError> {
    let bytes = fs::read(path)?;
    let schema: SchemaGraph = serde_json::from_slice(&bytes)?;
    validate_schema(&schema)?;
    Ok((schema, bytes))
}

/// Read a TOML or JSON config (by extension) and validate it. No path means
/// an empty config.
pub fn load_config(
    path: Option<&Path>,
    schema: Option<&SchemaGraph>,
) -> Result<ValidatedConfig, CliError> {
    let raw = match path {
        Some(path) => read_config_value(path)?,
        None => Value::Object(Default::default()),
    };

    let validated = validate_config(&raw, schema).map_err(CliError::Validation)?;
    for issue in &validated.warnings {
        warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
    }
    Ok(validated)
}

fn read_config_value(path: &Path) -> Result<Value, CliError> {
    let text = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        let value: toml::Value = toml::from_str(&text)?;
        Ok(serde_json::to_value(value)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

/// One line per issue, errors first.
pub fn format_validation(report: &ValidationReport) -> String {
    report
        .errors
        .iter()
        .chain(&report.warnings)
        .map(|issue| {
            let mut line = format!("{:?} {} at {}: {}", issue.severity, issue.code, issue.path, issue.message);
            if let Some(hint) = &issue.hint {
                line.push_str(&format!(" (hint: {hint})"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("schemaseed_config_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_toml_config() {
        let path = write_temp(
            "schemaseed.toml",
            r#"
seed = "fixtures"
rows = { users = 5 }
batch_size = 50

[overrides.users]
role = { enum = ["admin", "member"], weights = [1, 9] }
"#,
        );

        let validated = load_config(Some(&path), None).unwrap();
        assert_eq!(validated.config.seed, Some(Seed::from("fixtures")));
        assert_eq!(validated.config.batch_size, Some(50));
        assert_eq!(
            validated.config.overrides["users"]["role"],
            json!({"enum": ["admin", "member"], "weights": [1, 9]})
        );

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn rejects_unknown_keys() {
        let path = write_temp("schemaseed.json", r#"{"rowz": 5}"#);
        let err = load_config(Some(&path), None).unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn flags_override_config() {
        let mut config = SeedConfig {
            seed: Some(Seed::Int(1)),
            rows: Some(RowCount::Uniform(3)),
            include: vec!["posts".to_string()],
            ..SeedConfig::default()
        };
        let flags = RunFlags {
            seed: Some("42".to_string()),
            rows_per_entity: Some(r#"{"users": 7}"#.to_string()),
            dry_run: true,
            exclude: vec!["audit_log".to_string()],
            ..RunFlags::default()
        };

        flags.apply(&mut config).unwrap();

        assert_eq!(config.seed, Some(Seed::Int(42)));
        assert_eq!(config.rows.as_ref().map(|rows| rows.for_entity("users")), Some(7));
        assert!(config.dry_run);
        assert_eq!(config.include, vec!["posts".to_string()]);
        assert_eq!(config.exclude, vec!["audit_log".to_string()]);
    }

    #[test]
    fn text_seeds_stay_text() {
        assert_eq!(parse_seed("-3"), Seed::Int(-3));
        assert_eq!(parse_seed("demo"), Seed::from("demo"));
    }
}
