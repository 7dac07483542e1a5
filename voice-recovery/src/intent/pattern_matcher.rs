//! Pattern path: regular expressions and keyword lists per intent

use serde::{Deserialize, Serialize};

use crate::intent::patterns::PatternTable;
use crate::intent::types::IntentLabel;
use crate::normalizer::NormalizedText;

/// Score for the first pattern hit
pub const PATTERN_BASE_SCORE: f64 = 0.85;
/// Added per additional distinct pattern hit
pub const PATTERN_HIT_BONUS: f64 = 0.05;
pub const PATTERN_SCORE_CAP: f64 = 0.95;

pub const KEYWORD_BASE_SCORE: f64 = 0.5;
pub const KEYWORD_HIT_BONUS: f64 = 0.15;
pub const KEYWORD_SCORE_CAP: f64 = 0.8;
/// Ceiling for a single keyword in a short utterance
pub const SHORT_UTTERANCE_KEYWORD_CAP: f64 = 0.45;
pub const SHORT_UTTERANCE_TOKENS: usize = 4;

/// One intent's pattern-path evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCandidate {
    pub intent: IntentLabel,
    pub score: f64,
    /// Distinct regular expressions that matched
    pub pattern_hits: usize,
    /// Distinct keywords present
    pub keyword_hits: usize,
}

impl PatternCandidate {
    pub fn has_pattern_hit(&self) -> bool {
        self.pattern_hits > 0
    }
}

/// Score every intent in `table` against `text`; best candidate first.
///
/// Ties on score go to the candidate with more distinct pattern hits, then
/// to table order, so the ranking is deterministic.
pub fn match_patterns(text: &NormalizedText, table: &PatternTable) -> Vec<PatternCandidate> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<(usize, PatternCandidate)> = table
        .specs
        .iter()
        .enumerate()
        .filter_map(|(order, spec)| {
            let pattern_hits = spec
                .patterns
                .iter()
                .filter(|re| re.is_match(&text.lowered) || re.is_match(&text.folded))
                .count();
            let keyword_hits = spec
                .keywords
                .iter()
                .filter(|kw| text.contains_phrase(kw))
                .count();

            let score = score_hits(pattern_hits, keyword_hits, text.token_count())?;
            Some((
                order,
                PatternCandidate {
                    intent: spec.intent,
                    score,
                    pattern_hits,
                    keyword_hits,
                },
            ))
        })
        .collect();

    candidates.sort_by(|(oa, a), (ob, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.pattern_hits.cmp(&a.pattern_hits))
            .then(oa.cmp(ob))
    });

    candidates.into_iter().map(|(_, c)| c).collect()
}

/// Score from hit counts; `None` when nothing matched.
pub fn score_hits(pattern_hits: usize, keyword_hits: usize, token_count: usize) -> Option<f64> {
    if pattern_hits > 0 {
        let extra = (pattern_hits - 1) as f64 * PATTERN_HIT_BONUS;
        return Some((PATTERN_BASE_SCORE + extra).min(PATTERN_SCORE_CAP));
    }
    if keyword_hits > 0 {
        let mut score =
            (KEYWORD_BASE_SCORE + KEYWORD_HIT_BONUS * keyword_hits as f64).min(KEYWORD_SCORE_CAP);
        if token_count <= SHORT_UTTERANCE_TOKENS && keyword_hits == 1 {
            score = score.min(SHORT_UTTERANCE_KEYWORD_CAP);
        }
        return Some(score);
    }
    None
}
