//! Bulk import validation.
//!
//! Validation is a pure function of the input rows plus the current store
//! snapshot: it can be re-run any number of times without side effects, and
//! only an explicit confirmed import commits anything. Malformed rows never
//! abort the batch; they come back classified `error` with a reason.

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::matching::{find_duplicates, DuplicateCandidate};
use crate::store::{format_qaid, Brand, Channel, Environment, Faq, MatchingSettings};

/// One candidate row from an uploaded batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRow {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ticket_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub similar_utterances: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Accepted,
    Duplicate,
    Error,
}

/// Per-row validation outcome. `row` is 1-based and matches input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResult {
    pub row: usize,
    pub question: String,
    pub status: RowStatus,
    /// Provisional QAID assigned to an accepted row.
    pub qaid: Option<String>,
    /// Best-matching QAID for a duplicate row.
    pub suggested_qaid: Option<String>,
    pub reason: Option<String>,
}

/// Derived batch counts; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub accepted: usize,
    pub duplicates: usize,
    pub errors: usize,
}

pub fn summarize(results: &[RowResult]) -> BatchSummary {
    BatchSummary {
        accepted: results.iter().filter(|r| r.status == RowStatus::Accepted).count(),
        duplicates: results.iter().filter(|r| r.status == RowStatus::Duplicate).count(),
        errors: results.iter().filter(|r| r.status == RowStatus::Error).count(),
    }
}

fn field_error(row: &BulkRow, brand_dir: &[Brand]) -> Option<(String, String)> {
    if row.question.trim().is_empty() {
        return Some(("question".into(), "Question field is required".into()));
    }
    if row.answer.trim().is_empty() {
        return Some(("answer".into(), "Answer field is required".into()));
    }
    if row.brands.is_empty() {
        return Some(("brands".into(), "At least one brand is required".into()));
    }
    let mut allowed: BTreeSet<Channel> = BTreeSet::new();
    for brand_id in &row.brands {
        match brand_dir.iter().find(|b| &b.id == brand_id) {
            Some(brand) => allowed.extend(brand.channels.iter().copied()),
            None => {
                return Some(("brands".into(), format!("Unknown brand: {brand_id}")));
            }
        }
    }
    for channel in &row.channels {
        if !allowed.contains(channel) {
            return Some((
                "channels".into(),
                format!("Channel {channel} is not allowed for the selected brands"),
            ));
        }
    }
    None
}

/// Materializes an accepted row as a Draft FAQ record (no version yet).
pub fn row_to_faq(row: &BulkRow, qaid: String, author: &str) -> Faq {
    Faq {
        id: Uuid::new_v4(),
        qaid,
        question: row.question.clone(),
        canonical_answer: row.answer.clone(),
        brands: row.brands.clone(),
        channels: row.channels.clone(),
        status: Environment::Draft,
        tags: row.tags.clone(),
        ticket_parameters: row.ticket_parameters.clone(),
        similar_utterances: row.similar_utterances.clone(),
        last_updated: Utc::now(),
        created_by: author.to_string(),
        versions: Vec::new(),
    }
}

/// Validates a batch against the store snapshot and the brand directory.
///
/// `next_qaid_number` is the peeked (not persisted) sequence value;
/// provisional QAIDs for accepted rows are numbered from it in row order.
/// Scoring against the store snapshot runs in parallel across rows; the
/// in-batch dedup pass is sequential so earlier rows win.
pub fn validate_batch(
    existing: &[Faq],
    brand_dir: &[Brand],
    rows: &[BulkRow],
    settings: &MatchingSettings,
    next_qaid_number: u64,
) -> Vec<RowResult> {
    let probe = MatchingSettings {
        top_k: 1,
        ..settings.clone()
    };

    let field_errors: Vec<Option<(String, String)>> =
        rows.iter().map(|row| field_error(row, brand_dir)).collect();

    let store_best: Vec<Option<DuplicateCandidate>> = rows
        .par_iter()
        .zip(field_errors.par_iter())
        .map(|(row, error)| {
            if error.is_some() {
                return None;
            }
            find_duplicates(existing, &row.question, &row.answer, None, &probe)
                .into_iter()
                .next()
        })
        .collect();

    let mut results = Vec::with_capacity(rows.len());
    let mut accepted_shadow: Vec<Faq> = Vec::new();
    let mut next_number = next_qaid_number;

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;
        if let Some((_, reason)) = &field_errors[index] {
            results.push(RowResult {
                row: row_number,
                question: row.question.clone(),
                status: RowStatus::Error,
                qaid: None,
                suggested_qaid: None,
                reason: Some(reason.clone()),
            });
            continue;
        }

        let mut best = store_best[index].clone();
        if let Some(batch_hit) =
            find_duplicates(&accepted_shadow, &row.question, &row.answer, None, &probe)
                .into_iter()
                .next()
        {
            let beats_store = best
                .as_ref()
                .map(|b| batch_hit.score > b.score)
                .unwrap_or(true);
            if beats_store {
                best = Some(batch_hit);
            }
        }

        match best {
            Some(candidate) if candidate.score >= settings.duplicate_threshold => {
                let reason = if candidate.score >= 1.0 {
                    "Exact match found".to_string()
                } else {
                    "Similar FAQ already exists".to_string()
                };
                results.push(RowResult {
                    row: row_number,
                    question: row.question.clone(),
                    status: RowStatus::Duplicate,
                    qaid: None,
                    suggested_qaid: Some(candidate.qaid),
                    reason: Some(reason),
                });
            }
            _ => {
                let qaid = format_qaid(next_number);
                next_number += 1;
                accepted_shadow.push(row_to_faq(row, qaid.clone(), "bulk-validation"));
                results.push(RowResult {
                    row: row_number,
                    question: row.question.clone(),
                    status: RowStatus::Accepted,
                    qaid: Some(qaid),
                    suggested_qaid: None,
                    reason: None,
                });
            }
        }
    }

    results
}
