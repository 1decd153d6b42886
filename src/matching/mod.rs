//! Duplicate/similarity matcher.
//!
//! Scores a candidate question/answer against every existing FAQ's question,
//! similar utterances, and canonical answer. Scoring is deterministic and
//! side-effect-free so tests can assert exact rankings: identical normalized
//! text scores 1.0, disjoint vocabulary scores near 0, and ties are broken by
//! QAID ascending.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strsim::jaro_winkler;

use crate::store::{Faq, MatchPolicy, MatchingSettings};

/// How the winning comparison was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// Normalized text identical to the FAQ's question or answer.
    Exact,
    /// Best hit came from a similar utterance (alternate phrasing).
    Semantic,
    /// Token overlap dominated the blended score.
    Keyword,
    /// Edit distance dominated the blended score.
    Fuzzy,
}

/// One ranked candidate returned by a duplicate check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCandidate {
    pub qaid: String,
    pub question: String,
    /// Similarity in [0, 1].
    pub score: f64,
    pub method: MatchMethod,
}

/// Case-folds, strips punctuation, and collapses whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokens(normalized: &str) -> BTreeSet<&str> {
    normalized.split_whitespace().collect()
}

fn token_jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Score of one normalized pair, plus whether the token term won.
fn score_pair(a: &str, b: &str, policy: MatchPolicy) -> (f64, bool) {
    if a.is_empty() || b.is_empty() {
        return (0.0, true);
    }
    if a == b {
        return (1.0, true);
    }
    let overlap = token_jaccard(&tokens(a), &tokens(b));
    match policy {
        MatchPolicy::Lexical => (overlap, true),
        MatchPolicy::Hybrid => {
            let edit = jaro_winkler(a, b);
            (0.6 * overlap + 0.4 * edit, overlap >= edit)
        }
    }
}

// Answer similarity alone is weaker evidence of duplication than a
// question hit, so it is down-weighted.
const ANSWER_WEIGHT: f64 = 0.85;

/// Scores one FAQ against the query, returning the best (score, method).
fn score_faq(
    faq: &Faq,
    question_norm: &str,
    answer_norm: &str,
    policy: MatchPolicy,
) -> (f64, MatchMethod) {
    let mut best = 0.0_f64;
    let mut method = MatchMethod::Keyword;

    let faq_question = normalize(&faq.question);
    let (score, token_won) = score_pair(question_norm, &faq_question, policy);
    if score > best {
        best = score;
        method = if score >= 1.0 {
            MatchMethod::Exact
        } else if token_won {
            MatchMethod::Keyword
        } else {
            MatchMethod::Fuzzy
        };
    }

    for utterance in &faq.similar_utterances {
        let utterance_norm = normalize(utterance);
        let (score, _) = score_pair(question_norm, &utterance_norm, policy);
        if score > best {
            best = score;
            method = MatchMethod::Semantic;
        }
    }

    if !answer_norm.is_empty() {
        let faq_answer = normalize(&faq.canonical_answer);
        let (score, token_won) = score_pair(answer_norm, &faq_answer, policy);
        let weighted = if score >= 1.0 { 1.0 } else { score * ANSWER_WEIGHT };
        if weighted > best {
            best = weighted;
            method = if score >= 1.0 {
                MatchMethod::Exact
            } else if token_won {
                MatchMethod::Keyword
            } else {
                MatchMethod::Fuzzy
            };
        }
    }

    (best, method)
}

/// Ranks existing FAQs by similarity to a draft question/answer.
///
/// An optional brand filter drops candidates whose brand set is disjoint
/// from it. Results are sorted by score descending, QAID ascending, and
/// truncated to `settings.top_k`.
pub fn find_duplicates(
    faqs: &[Faq],
    question: &str,
    answer: &str,
    brand_filter: Option<&[String]>,
    settings: &MatchingSettings,
) -> Vec<DuplicateCandidate> {
    let question_norm = normalize(question);
    let answer_norm = normalize(answer);

    let mut candidates: Vec<DuplicateCandidate> = faqs
        .par_iter()
        .filter(|faq| match brand_filter {
            Some(brands) => faq.brands.iter().any(|b| brands.contains(b)),
            None => true,
        })
        .map(|faq| {
            let (score, method) = score_faq(faq, &question_norm, &answer_norm, settings.policy);
            DuplicateCandidate {
                qaid: faq.qaid.clone(),
                question: faq.question.clone(),
                score,
                method,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.qaid.cmp(&b.qaid))
    });
    candidates.truncate(settings.top_k);
    candidates
}
