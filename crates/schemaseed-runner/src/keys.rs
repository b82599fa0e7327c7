use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use schemaseed_core::{Seed, redact_row};
use schemaseed_generate::{ReferenceRegistry, Row};

/// Record each row's key: its own value in `key_column` when present, else
/// the key the store returned for that position.
pub(crate) fn record_keys(
    refs: &mut ReferenceRegistry,
    entity: &str,
    key_column: Option<&str>,
    rows: &[Row],
    returned: &[Value],
) {
    for (index, row) in rows.iter().enumerate() {
        let own = key_column
            .and_then(|column| row.get(column))
            .filter(|value| !value.is_null());
        if let Some(value) = own.or_else(|| returned.get(index)) {
            refs.add_reference(entity, value.clone());
        }
    }
}

/// The caller's seed, or one derived from the clock.
pub(crate) fn resolve_seed(seed: Option<Seed>) -> Seed {
    match seed {
        Some(seed) => seed,
        None => {
            let seed = Seed::Int(Utc::now().timestamp_millis());
            info!(seed = %seed, "no seed configured; pass this seed to reproduce the run");
            seed
        }
    }
}

pub(crate) fn preview(rows: &[Row], limit: usize) -> Vec<Row> {
    rows.iter().take(limit).map(redact_row).collect()
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
