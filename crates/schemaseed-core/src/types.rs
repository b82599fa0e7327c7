use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Storage-independent column type used by inference and fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedType {
    String,
    Text,
    Int,
    Bigint,
    Float,
    Decimal,
    Boolean,
    Date,
    Datetime,
    Json,
    Uuid,
    Enum,
    Binary,
    ObjectId,
}

impl NormalizedType {
    /// Map a raw engine type (e.g. `character varying(255)`, `int4`) to a
    /// normalized type. Unknown types map to `String`.
    pub fn from_raw(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        let base = lowered
            .split(['(', '['])
            .next()
            .unwrap_or("")
            .trim()
            .trim_end_matches(" unsigned");

        match base {
            "bigserial" | "serial8" | "bigint" | "int8" => Self::Bigint,
            "serial" | "serial4" | "smallserial" | "serial2" | "int" | "integer" | "int4"
            | "int2" | "smallint" | "tinyint" | "mediumint" => Self::Int,
            "text" | "tinytext" | "mediumtext" | "longtext" | "clob" | "ntext" => Self::Text,
            "bool" | "boolean" | "bit" => Self::Boolean,
            "date" => Self::Date,
            "json" | "jsonb" => Self::Json,
            "numeric" | "decimal" | "money" | "number" => Self::Decimal,
            "float" | "float4" | "float8" | "real" | "double" | "double precision" => Self::Float,
            "uuid" | "uniqueidentifier" => Self::Uuid,
            "bytea" | "blob" | "binary" | "varbinary" | "longblob" | "image" => Self::Binary,
            "enum" | "user-defined" => Self::Enum,
            "objectid" => Self::ObjectId,
            other if other.starts_with("timestamp")
                || other.starts_with("datetime")
                || other.starts_with("time") =>
            {
                Self::Datetime
            }
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Int => "int",
            Self::Bigint => "bigint",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Json => "json",
            Self::Uuid => "uuid",
            Self::Enum => "enum",
            Self::Binary => "binary",
            Self::ObjectId => "object_id",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int | Self::Bigint)
    }
}

impl fmt::Display for NormalizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seed value for a run; strings are hashed into the RNG state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Seed {
    Int(i64),
    Text(String),
}

impl From<i64> for Seed {
    fn from(value: i64) -> Self {
        Seed::Int(value)
    }
}

impl From<&str> for Seed {
    fn from(value: &str) -> Self {
        Seed::Text(value.to_string())
    }
}

impl From<String> for Seed {
    fn from(value: String) -> Self {
        Seed::Text(value)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Int(value) => write!(f, "{value}"),
            Seed::Text(value) => f.write_str(value),
        }
    }
}
