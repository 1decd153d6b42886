//! Persisted QAID counter.
//!
//! QAIDs are minted from a monotonically increasing sequence and are never
//! reused, even after a record is retired. Bulk validation only peeks at the
//! sequence (it is a pure function of the store); minting happens on create
//! and on confirmed import. `FaqStore` serializes every load-increment-write
//! cycle through its sequence lock; go through `FaqStore::mint_qaid` rather
//! than holding a handle directly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// First QAID number assigned in a fresh workspace (`QA1001`).
pub const FIRST_QAID_NUMBER: u64 = 1001;

#[derive(Debug, Serialize, Deserialize)]
struct SequenceState {
    next: u64,
}

/// Handle on the on-disk QAID sequence file.
pub struct QaidSequence {
    path: PathBuf,
}

impl QaidSequence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<SequenceState> {
        if !self.path.exists() {
            return Ok(SequenceState {
                next: FIRST_QAID_NUMBER,
            });
        }
        let data = fs::read(&self.path)
            .with_context(|| format!("Unable to read QAID sequence {:?}", self.path))?;
        let state = serde_json::from_slice(&data)
            .with_context(|| "Failed to parse QAID sequence state")?;
        Ok(state)
    }

    /// Next number that would be assigned, without persisting anything.
    pub fn peek(&self) -> Result<u64> {
        Ok(self.load()?.next)
    }

    /// Mints one QAID and persists the advanced counter.
    pub fn mint(&self) -> Result<String> {
        let mut state = self.load()?;
        let qaid = format_qaid(state.next);
        state.next += 1;
        fs::write(&self.path, serde_json::to_vec_pretty(&state)?)
            .with_context(|| format!("Failed to write QAID sequence {:?}", self.path))?;
        Ok(qaid)
    }
}

pub fn format_qaid(number: u64) -> String {
    format!("QA{number}")
}
