//! Persistence layer.
//!
//! Properties are read from a JSON file maintained by the property
//! management side. Applied pricing rules are written to SQLite (see
//! `rules`). Both sit behind traits so the pipeline, applier, and HTTP
//! layer can be exercised against in-memory doubles.

pub mod rules;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{PricingRuleRecord, Property};

/// Read side: where active properties come from.
#[async_trait]
pub trait PropertySource: Send + Sync {
    async fn active_properties(&self) -> Result<Vec<Property>>;
}

/// Write side: where accepted suggestions become pricing rules.
#[async_trait]
pub trait PricingRuleSink: Send + Sync {
    /// Insert one record. A single-row write with no retry.
    async fn insert_rule(&self, record: &PricingRuleRecord) -> Result<()>;
}

// ---------------------------------------------------------------------------
// JSON property file
// ---------------------------------------------------------------------------

/// Load all properties from a JSON array file.
pub fn load_properties(path: &Path) -> Result<Vec<Property>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read properties from {}", path.display()))?;

    let properties: Vec<Property> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse properties from {}", path.display()))?;

    debug!(path = %path.display(), count = properties.len(), "Properties loaded");
    Ok(properties)
}

/// Write properties as a pretty-printed JSON array.
pub fn save_properties(path: &Path, properties: &[Property]) -> Result<()> {
    let json = serde_json::to_string_pretty(properties).context("Failed to serialise properties")?;

    std::fs::write(path, json)
        .with_context(|| format!("Failed to write properties to {}", path.display()))?;

    debug!(path = %path.display(), count = properties.len(), "Properties saved");
    Ok(())
}

/// Property source backed by a JSON file, re-read on every call so that
/// edits show up on the next refresh.
pub struct JsonPropertyStore {
    path: PathBuf,
}

impl JsonPropertyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PropertySource for JsonPropertyStore {
    async fn active_properties(&self) -> Result<Vec<Property>> {
        let all = load_properties(&self.path)?;
        let total = all.len();
        let active: Vec<Property> = all.into_iter().filter(|p| p.is_active).collect();

        info!(
            path = %self.path.display(),
            total,
            active = active.len(),
            "Active properties read"
        );
        Ok(active)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
