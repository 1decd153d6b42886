//! On-demand text diff between two version snapshots.
//!
//! Nothing here is stored; the console asks for a diff when rendering the
//! version comparison view.

use serde::Serialize;

use crate::store::FaqVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffTag {
    Context,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub text: String,
}

/// Diff of the question and answer fields between two versions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDiff {
    pub from_version: u32,
    pub to_version: u32,
    pub question: Vec<DiffLine>,
    pub answer: Vec<DiffLine>,
}

/// Line-based LCS diff of two texts.
pub fn diff_lines(before: &str, after: &str) -> Vec<DiffLine> {
    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();

    // LCS length table; inputs are answer-sized texts, so quadratic is fine.
    let mut table = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            table[i][j] = if old[i] == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut lines = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            lines.push(DiffLine {
                tag: DiffTag::Context,
                text: old[i].to_string(),
            });
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            lines.push(DiffLine {
                tag: DiffTag::Removed,
                text: old[i].to_string(),
            });
            i += 1;
        } else {
            lines.push(DiffLine {
                tag: DiffTag::Added,
                text: new[j].to_string(),
            });
            j += 1;
        }
    }
    for line in &old[i..] {
        lines.push(DiffLine {
            tag: DiffTag::Removed,
            text: line.to_string(),
        });
    }
    for line in &new[j..] {
        lines.push(DiffLine {
            tag: DiffTag::Added,
            text: line.to_string(),
        });
    }
    lines
}

pub fn diff_versions(from: &FaqVersion, to: &FaqVersion) -> VersionDiff {
    VersionDiff {
        from_version: from.version,
        to_version: to.version,
        question: diff_lines(&from.question, &to.question),
        answer: diff_lines(&from.canonical_answer, &to.canonical_answer),
    }
}
