//! Similarity path: term-frequency vectors compared by cosine similarity
//!
//! Weights are plain term frequency (count / token count). No inverse
//! document frequency is applied, so a rare discriminative keyword weighs
//! the same as a common one.

use std::collections::HashMap;

use crate::intent::patterns::PatternTable;
use crate::intent::types::IntentLabel;
use crate::normalizer::{NormalizedText, TextNormalizer};

/// Sparse term-frequency vector with a cached norm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    weights: HashMap<String, f64>,
    norm: f64,
}

impl TermVector {
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts: HashMap<String, f64> = HashMap::new();
        let mut total = 0.0;
        for token in tokens {
            *counts.entry(token.to_string()).or_insert(0.0) += 1.0;
            total += 1.0;
        }
        if total == 0.0 {
            return Self::default();
        }
        let weights: HashMap<String, f64> =
            counts.into_iter().map(|(t, c)| (t, c / total)).collect();
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        Self { weights, norm }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    pub fn cosine(&self, other: &TermVector) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.weights.len() <= other.weights.len() {
            (self, other)
        } else {
            (other, self)
        };
        let dot: f64 = small
            .weights
            .iter()
            .map(|(term, w)| w * large.weight(term))
            .sum();
        (dot / (self.norm * other.norm)).clamp(0.0, 1.0)
    }
}

/// Precomputed per-intent vectors, built once from the examples and
/// keywords of a pattern table
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    vectors: Vec<(IntentLabel, TermVector)>,
}

impl SimilarityIndex {
    pub fn build(table: &PatternTable, normalizer: &TextNormalizer) -> Self {
        let vectors = table
            .specs
            .iter()
            .map(|spec| {
                let mut tokens: Vec<String> = Vec::new();
                for example in spec.examples {
                    tokens.extend(normalizer.normalize(example).content_tokens);
                }
                for keyword in spec.keywords {
                    tokens.extend(normalizer.normalize(keyword).content_tokens);
                }
                (
                    spec.intent,
                    TermVector::from_tokens(tokens.iter().map(String::as_str)),
                )
            })
            .collect();
        Self { vectors }
    }

    /// Cosine score per intent, best first, zero scores dropped.
    pub fn score(&self, text: &NormalizedText) -> Vec<(IntentLabel, f64)> {
        let query = TermVector::from_tokens(text.content_tokens.iter().map(String::as_str));
        if query.is_empty() {
            return Vec::new();
        }
        let mut scores: Vec<(usize, IntentLabel, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(order, (intent, vector))| (order, *intent, query.cosine(vector)))
            .filter(|(_, _, s)| *s > 0.0)
            .collect();
        scores.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scores.into_iter().map(|(_, i, s)| (i, s)).collect()
    }
}
