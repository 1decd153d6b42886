//! Append-only audit event trail.
//!
//! One JSONL line per mutation, written alongside the per-FAQ version
//! snapshot. The trail is never rewritten or pruned.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

use crate::store::FaqStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    PublishRequested,
    PublishApproved,
    PublishRejected,
    RolledBack,
    BulkImported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub qaid: String,
    pub action: AuditAction,
    pub actor: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl AuditEvent {
    pub fn new(qaid: &str, action: AuditAction, actor: &str, details: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            qaid: qaid.to_string(),
            action,
            actor: actor.to_string(),
            details,
        }
    }
}

/// JSONL-backed audit trail for a workspace.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn for_store(store: &FaqStore) -> Self {
        Self {
            path: store.paths().audit_events_file(),
        }
    }

    pub fn append_event(&self, event: &AuditEvent) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Unable to open audit log {:?}", self.path))?;
        file.write_all(serde_json::to_string(event)?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    pub fn load_events(&self) -> Result<Vec<AuditEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Unable to read audit log {:?}", self.path))?;
        let mut events = Vec::new();
        for line in data.lines().filter(|l| !l.trim().is_empty()) {
            let event: AuditEvent =
                serde_json::from_str(line).with_context(|| "Failed to parse audit event")?;
            events.push(event);
        }
        Ok(events)
    }

    pub fn events_for(&self, qaid: &str) -> Result<Vec<AuditEvent>> {
        Ok(self
            .load_events()?
            .into_iter()
            .filter(|e| e.qaid == qaid)
            .collect())
    }
}
