//! Intent classifier combining the pattern and similarity paths
//!
//! Classification holds no mutable state: the similarity index is built once
//! in the constructor and the pattern tables are static, so the same text
//! always yields the same result.

use tracing::debug;

use crate::intent::ensemble::{fuse, PathVote, FAST_PATH_THRESHOLD};
use crate::intent::pattern_matcher::{match_patterns, PatternCandidate};
use crate::intent::patterns::{PatternTable, STANDARD_TABLE};
use crate::intent::similarity::SimilarityIndex;
use crate::intent::types::{Alternative, ClassificationMethod, ClassificationResult, IntentLabel};
use crate::normalizer::{NormalizedText, TextNormalizer};

/// Two-path intent classifier
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    normalizer: TextNormalizer,
    index: SimilarityIndex,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        let normalizer = TextNormalizer::new();
        let index = SimilarityIndex::build(&STANDARD_TABLE, &normalizer);
        Self { normalizer, index }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Classify an utterance. Empty or unreadable input yields `Unknown` at
    /// zero confidence.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let normalized = self.normalizer.normalize(text);
        if normalized.is_empty() {
            return ClassificationResult::unknown();
        }

        let patterns = match_patterns(&normalized, &STANDARD_TABLE);
        let similarities = self.index.score(&normalized);
        let alternatives = collect_alternatives(&patterns, &similarities);

        if let Some(best) = patterns.first() {
            if best.score >= FAST_PATH_THRESHOLD {
                debug!(
                    intent = %best.intent,
                    confidence = best.score,
                    pattern_hits = best.pattern_hits,
                    "Pattern fast path"
                );
                return ClassificationResult::new(
                    best.intent,
                    best.score,
                    ClassificationMethod::Pattern,
                    alternatives,
                );
            }
        }

        let fused = fuse(
            patterns.first().map(|c| PathVote::new(c.intent, c.score)),
            similarities.first().map(|(i, s)| PathVote::new(*i, *s)),
        );
        ClassificationResult::new(fused.intent, fused.confidence, fused.method, alternatives)
    }

    /// Classify, forcing `Unknown` when the confidence is below `threshold`.
    pub fn classify_with_threshold(&self, text: &str, threshold: f64) -> ClassificationResult {
        let result = self.classify(text);
        if result.confidence < threshold && !result.is_unknown() {
            debug!(
                intent = %result.intent,
                confidence = result.confidence,
                threshold,
                "Below threshold, forcing unknown"
            );
            return result.into_unknown();
        }
        result
    }

    /// Pattern-path candidates of `text` against an arbitrary table. Used by
    /// recovery strategies that retry with the expanded table.
    pub fn pattern_candidates(&self, text: &str, table: &PatternTable) -> Vec<PatternCandidate> {
        match_patterns(&self.normalizer.normalize(text), table)
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        self.normalizer.normalize(text)
    }
}

fn collect_alternatives(
    patterns: &[PatternCandidate],
    similarities: &[(IntentLabel, f64)],
) -> Vec<Alternative> {
    patterns
        .iter()
        .map(|c| Alternative {
            intent: c.intent,
            confidence: c.score,
        })
        .chain(similarities.iter().map(|(intent, score)| Alternative {
            intent: *intent,
            confidence: *score,
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::patterns::EXPANDED_TABLE;

    #[test]
    fn test_balance_fast_path() {
        let result = IntentClassifier::new().classify("qual é meu saldo");
        assert_eq!(result.intent, IntentLabel::CheckBalance);
        assert!(result.confidence >= 0.85);
        assert_eq!(result.method, ClassificationMethod::Pattern);
    }

    #[test]
    fn test_alternatives_exclude_primary_and_unknown() {
        let result = IntentClassifier::new().classify("quero pagar a conta de luz e ver meu saldo");
        assert!(result.alternatives.len() <= 3);
        assert!(result
            .alternatives
            .iter()
            .all(|a| a.intent != result.intent && !a.intent.is_unknown()));
        let confidences: Vec<f64> = result.alternatives.iter().map(|a| a.confidence).collect();
        assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_short_keyword_utterance_goes_through_ensemble() {
        let result = IntentClassifier::new().classify("transferir para");
        assert_eq!(result.intent, IntentLabel::TransferMoney);
        assert_eq!(result.method, ClassificationMethod::Ensemble);
        assert!((result.confidence - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_empty_and_punctuation_only_input() {
        let classifier = IntentClassifier::new();
        for text in ["", "   ", "?!..."] {
            let result = classifier.classify(text);
            assert!(result.is_unknown());
            assert_eq!(result.confidence, 0.0);
            assert!(result.alternatives.is_empty());
        }
    }

    #[test]
    fn test_threshold_forces_unknown_but_keeps_choice() {
        let result = IntentClassifier::new().classify_with_threshold("transferir para", 0.6);
        assert!(result.is_unknown());
        assert!(result
            .alternatives
            .iter()
            .any(|a| a.intent == IntentLabel::TransferMoney));
    }

    #[test]
    fn test_threshold_keeps_confident_result() {
        let result = IntentClassifier::new().classify_with_threshold("qual é meu saldo", 0.6);
        assert_eq!(result.intent, IntentLabel::CheckBalance);
    }

    #[test]
    fn test_classify_is_repeatable() {
        let classifier = IntentClassifier::new();
        let text = "quanto eu gastei esse mês no orçamento";
        assert_eq!(classifier.classify(text), classifier.classify(text));
    }

    #[test]
    fn test_pattern_candidates_against_expanded_table() {
        let classifier = IntentClassifier::new();
        let candidates = classifier.pattern_candidates("tô com quanto", &EXPANDED_TABLE);
        assert_eq!(candidates[0].intent, IntentLabel::CheckBalance);
    }
}
