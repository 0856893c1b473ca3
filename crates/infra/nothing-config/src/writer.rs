//! Atomic writes for configuration files.

use anyhow::{Context, Result};
use atomicwrites::{AllowOverwrite, AtomicFile};
use serde_json::Value;
use std::io::Write;
use std::path::Path;

/// Write `value` to `path` as pretty JSON, creating parent directories.
///
/// The file is written to a temporary sibling and renamed into place.
pub fn write_pretty_json_atomic(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut json =
        serde_json::to_string_pretty(value).context("Failed to serialize config to JSON")?;
    json.push('\n');

    AtomicFile::new(path, AllowOverwrite)
        .write(|f| f.write_all(json.as_bytes()))
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}
