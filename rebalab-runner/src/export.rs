//! Result hand-off: JSON serialization with schema versioning.
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! than this build understands are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// Pretty JSON for one run, ready for a reporting tool.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result)
        .with_context(|| format!("encoding run '{}' as JSON", result.name))
}

/// Parse a run back from JSON.
///
/// Files written by a newer build (higher `schema_version`) are refused.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let parsed: BacktestResult = serde_json::from_str(json).context("decoding run JSON")?;
    let version = parsed.schema_version;
    if version > SCHEMA_VERSION {
        bail!("run file has schema version {version}, this build reads up to {SCHEMA_VERSION}");
    }
    Ok(parsed)
}

/// Save a result as `{output_dir}/{run_id}/result.json`.
///
/// Returns the path to the created directory.
pub fn save_result(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&result.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create result dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    let path = run_dir.join("result.json");
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("saved {} to {}", result.name, path.display());
    Ok(run_dir)
}

/// Load a `BacktestResult` from a directory written by [`save_result`].
pub fn load_result(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
