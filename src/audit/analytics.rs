//! Served-query analytics log.
//!
//! Write-once, read-many: the matching runtime appends one record per served
//! query and the console reads them back for reporting. Appends are whole
//! lines, so no locking is needed beyond the atomic write.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

use crate::matching::MatchMethod;
use crate::store::{Channel, FaqStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub query_text: String,
    pub served_qaid: String,
    pub match_method: MatchMethod,
    pub match_score: f64,
    pub brand: String,
    pub channel: Channel,
}

/// JSONL-backed append-only analytics collection.
pub struct AnalyticsLog {
    path: PathBuf,
}

impl AnalyticsLog {
    pub fn for_store(store: &FaqStore) -> Self {
        Self {
            path: store.paths().analytics_file(),
        }
    }

    pub fn record(&self, entry: &AnalyticsEntry) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Unable to open analytics log {:?}", self.path))?;
        file.write_all(serde_json::to_string(entry)?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    pub fn load(&self) -> Result<Vec<AnalyticsEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Unable to read analytics log {:?}", self.path))?;
        let mut entries = Vec::new();
        for line in data.lines().filter(|l| !l.trim().is_empty()) {
            let entry: AnalyticsEntry =
                serde_json::from_str(line).with_context(|| "Failed to parse analytics entry")?;
            entries.push(entry);
        }
        Ok(entries)
    }
}
