//! Dumps of payloads that failed to save, for offline inspection.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Payload items copied into a dump
pub const DUMP_SAMPLE_SIZE: usize = 20;

/// Write `failed-save-<timestamp>.json` into `dir`
pub fn write_failed_save_dump(dir: &Path, error: &str, payload: &Value) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let now = chrono::Utc::now();
    let items = payload.as_array().map(Vec::as_slice).unwrap_or(&[]);
    let dump = json!({
        "timestamp": now.to_rfc3339(),
        "error": error,
        "receivedCount": items.len(),
        "sample": &items[..items.len().min(DUMP_SAMPLE_SIZE)],
    });

    let path = dir.join(format!(
        "failed-save-{}-{}.json",
        now.format("%Y%m%d-%H%M%S%.3f"),
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    ));
    std::fs::write(&path, serde_json::to_vec_pretty(&dump)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
