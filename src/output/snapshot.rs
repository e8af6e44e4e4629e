//! Static JSON snapshot of the latest envelope.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::pipeline::envelope::ResponseEnvelope;

/// Write `envelope` as pretty-printed JSON, creating parent directories.
pub async fn write(path: &Path, envelope: &ResponseEnvelope) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(envelope).context("Failed to serialize envelope")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;

    info!(
        path = %path.display(),
        total_ratings = envelope.total_ratings(),
        error = envelope.is_error(),
        "Snapshot written"
    );
    Ok(())
}

/// Read a snapshot back as raw JSON.
pub async fn read(path: &Path) -> Result<serde_json::Value> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid snapshot JSON in {}", path.display()))
}
