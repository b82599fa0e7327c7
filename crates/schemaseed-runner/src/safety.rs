use thiserror::Error;
use tracing::warn;

use schemaseed_core::redact_connection_string;

/// Environment variables whose value `prod`/`production` marks a production
/// process, checked in order.
pub const ENVIRONMENT_VARIABLES: &[&str] = &["SCHEMASEED_ENV", "APP_ENV", "NODE_ENV"];

const PRODUCTION_KEYWORDS: &[&str] = &["prod", "production", "live", "cloud", "aws", "azure", "gcp"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyError {
    #[error(
        "refusing to run in a production environment ({variable}={value}); pass --allow-production to override"
    )]
    ProductionEnvironment { variable: String, value: String },
    #[error(
        "refusing to run against a potential production database ({target}); pass --allow-production to override"
    )]
    ProductionTarget { target: String },
}

/// Refuse suspected production targets unless `allow_production` is set.
pub fn check_production_safety(
    allow_production: bool,
    target: Option<&str>,
) -> Result<(), SafetyError> {
    if allow_production {
        if let Err(err) = detect_production(target, |name| std::env::var(name).ok()) {
            warn!(error = %err, "production safety gate overridden");
        }
        return Ok(());
    }
    detect_production(target, |name| std::env::var(name).ok())
}

/// Heuristic behind [`check_production_safety`] with an injectable
/// environment lookup.
pub fn detect_production<F>(target: Option<&str>, env: F) -> Result<(), SafetyError>
where
    F: Fn(&str) -> Option<String>,
{
    for variable in ENVIRONMENT_VARIABLES {
        if let Some(value) = env(variable) {
            let lowered = value.trim().to_lowercase();
            if lowered == "prod" || lowered == "production" {
                return Err(SafetyError::ProductionEnvironment {
                    variable: (*variable).to_string(),
                    value,
                });
            }
        }
    }

    let Some(target) = target else {
        return Ok(());
    };
    let connection = redact_connection_string(target);
    let haystack = connection
        .host
        .clone()
        .unwrap_or_else(|| target.to_string())
        .to_lowercase();
    if PRODUCTION_KEYWORDS
        .iter()
        .any(|keyword| haystack.contains(keyword))
    {
        return Err(SafetyError::ProductionTarget {
            target: connection.host.unwrap_or(connection.redacted),
        });
    }
    Ok(())
}
