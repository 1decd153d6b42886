//! Version snapshot helpers.
//!
//! Every mutating operation appends exactly one version in the same store
//! write as the mutation itself. History is append-only: rollbacks add a
//! `Reverted` snapshot instead of deleting anything.

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::store::{ChangeType, Faq, FaqVersion};

/// SHA-256 over the question + answer snapshot.
pub fn content_hash(question: &str, answer: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question.as_bytes());
    hasher.update(b"\n");
    hasher.update(answer.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Snapshots the FAQ's current content as its next version and returns the
/// new version number.
///
/// Version numbers are contiguous from 1; the next number is always
/// `last + 1` regardless of change type. Also bumps `last_updated`.
pub fn append_version(faq: &mut Faq, change_type: ChangeType, author: &str) -> u32 {
    let timestamp = Utc::now();
    let number = faq.current_version() + 1;
    let version = FaqVersion {
        id: Uuid::new_v4(),
        version: number,
        question: faq.question.clone(),
        canonical_answer: faq.canonical_answer.clone(),
        timestamp,
        author: author.to_string(),
        change_type,
        environment: faq.status,
        content_hash: content_hash(&faq.question, &faq.canonical_answer),
    };
    faq.last_updated = timestamp;
    faq.versions.push(version);
    number
}

/// Whether a record's history is contiguous from 1 and strictly increasing.
pub fn verify_contiguous(faq: &Faq) -> bool {
    faq.versions
        .iter()
        .enumerate()
        .all(|(i, v)| v.version == (i as u32) + 1)
}
