use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::SeedConfig;

/// Emit the JSON Schema for the seed configuration file.
pub fn config_json_schema() -> RootSchema {
    schema_for!(SeedConfig)
}
