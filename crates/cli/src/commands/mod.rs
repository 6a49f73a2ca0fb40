//! CLI command implementations

pub mod policy;
pub mod recommend;

use anyhow::{Context, Result};
use engine_lib::ContainerSeries;
use std::path::Path;

/// Read a container series (JSON object keyed by RFC 3339 timestamp)
pub fn load_series(path: &Path) -> Result<ContainerSeries> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read series file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse series file {}", path.display()))
}
