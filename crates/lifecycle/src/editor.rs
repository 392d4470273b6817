//! Source-list editor for the persisted configuration document.
//!
//! Operates on the raw YAML document (a generic keyed mapping, not the typed
//! schema) so every unrelated field and entry survives a rewrite verbatim.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{LifecycleError, Result};

/// Config field holding the subscription source list.
pub const SOURCES_KEY: &str = "sub-urls";

/// Remove the given source identifiers from the configuration's source list.
///
/// Returns the number of entries removed. Matching is exact-string and
/// case-sensitive; non-string list entries pass through unchanged. A missing
/// source-list field is a no-op success. When nothing matches, the file is
/// left untouched (no rewrite); otherwise the whole document is serialized
/// back and atomically replaces the file.
pub fn remove_sources(config_path: &Path, ids: &[String]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }

    let contents = fs::read_to_string(config_path)?;
    let mut doc: serde_yaml::Value = serde_yaml::from_str(&contents)?;

    let mapping = doc
        .as_mapping_mut()
        .ok_or(LifecycleError::MalformedDocument)?;

    let list = match mapping.get_mut(SOURCES_KEY) {
        Some(value) => value,
        None => return Ok(0),
    };
    let entries = list
        .as_sequence_mut()
        .ok_or_else(|| LifecycleError::MalformedSourceList(SOURCES_KEY.to_string()))?;

    let remove_set: HashSet<&str> = ids.iter().map(String::as_str).collect();

    let before = entries.len();
    entries.retain(|entry| match entry.as_str() {
        Some(s) => !remove_set.contains(s),
        None => true,
    });
    let removed = before - entries.len();
    let remaining = entries.len();

    if removed == 0 {
        return Ok(0);
    }

    let yaml = serde_yaml::to_string(&doc)?;
    write_atomic(config_path, &yaml)?;

    info!(removed, remaining, path = %config_path.display(), "removed sources from configuration");
    Ok(removed)
}

/// Write to a dotted `.tmp` sibling, then rename into place.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("config.yaml");
    let tmp_path = dir.join(format!(".{}.tmp", name));

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
