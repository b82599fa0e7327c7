use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Replacement written in place of sensitive field values.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

const SENSITIVE_FIELD_TOKENS: &[&str] = &["auth", "authorization", "authentication"];

const SENSITIVE_FIELD_MARKERS: &[&str] = &[
    "password",
    "token",
    "secret",
    "apikey",
    "api_key",
    "cookie",
    "creditcard",
    "credit_card",
    "ssn",
];

/// Connection metadata with secrets redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub engine: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

/// Redact secrets from a connection target while extracting non-sensitive
/// metadata. Targets without a scheme are treated as SQLite file paths.
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    let Some(scheme_end) = conn.find("://") else {
        return RedactedConnection {
            engine: Some("sqlite".to_string()),
            user: None,
            host: None,
            port: None,
            database: Some(conn.to_string()).filter(|path| !path.is_empty()),
            redacted: conn.to_string(),
        };
    };

    let engine = Some(conn[..scheme_end].to_string());
    let after_scheme = &conn[scheme_end + 3..];
    let (auth_part, host_part) = match after_scheme.rfind('@') {
        Some(at_idx) => (&after_scheme[..at_idx], &after_scheme[at_idx + 1..]),
        None => ("", after_scheme),
    };

    let mut redacted = conn.to_string();
    let mut user = None;
    if let Some((name, _password)) = auth_part.split_once(':') {
        user = Some(name.to_string());
        let password_start = scheme_end + 3 + name.len() + 1;
        let password_end = scheme_end + 3 + auth_part.len();
        redacted.replace_range(password_start..password_end, "***");
    } else if !auth_part.is_empty() {
        user = Some(auth_part.to_string());
    }

    let host_part = host_part.split('?').next().unwrap_or("");
    let (host_port, path) = host_part.split_once('/').unwrap_or((host_part, ""));
    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().ok()),
        None => (host_port, None),
    };

    RedactedConnection {
        engine,
        user,
        host: Some(host.to_string()).filter(|host| !host.is_empty()),
        port,
        database: Some(path.to_string()).filter(|path| !path.is_empty()),
        redacted: redact_query_params(&redacted),
    }
}

fn redact_query_params(conn: &str) -> String {
    let Some(query_start) = conn.find('?') else {
        return conn.to_string();
    };

    let (base, query) = conn.split_at(query_start + 1);
    let params: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive_key(key) => format!("{key}=***"),
            Some((key, value)) if !value.is_empty() => format!("{key}={value}"),
            Some((key, _)) => key.to_string(),
            None => pair.to_string(),
        })
        .collect();

    format!("{base}{}", params.join("&"))
}

fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "password" | "pass" | "token" | "api_key" | "apikey"
    )
}

/// True when a field name looks like it holds credentials or personal secrets.
pub fn is_sensitive_field(name: &str) -> bool {
    let lowered = name.to_lowercase();
    SENSITIVE_FIELD_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
        || lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| SENSITIVE_FIELD_TOKENS.contains(&token))
}

/// Copy of `row` with sensitive fields replaced by [`REDACTED_PLACEHOLDER`].
pub fn redact_row(row: &Map<String, Value>) -> Map<String, Value> {
    row.iter()
        .map(|(key, value)| {
            let value = if is_sensitive_field(key) {
                Value::String(REDACTED_PLACEHOLDER.to_string())
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}
