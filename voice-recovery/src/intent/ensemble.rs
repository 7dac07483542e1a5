//! Ensemble voting between the pattern path and the similarity path
//!
//! Three rules, applied in order:
//! 1. Agreement: both paths name the same intent, the higher confidence wins.
//! 2. Override: a path at or above [`TRUST_THRESHOLD`] is trusted outright.
//! 3. Weighted blend: the path with the larger weighted score names the
//!    intent; the other path's weighted score is added at half weight.
//!
//! A path that produced no candidate casts no vote; the other path's vote is
//! returned unchanged.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::intent::types::{clamp_unit, ClassificationMethod, IntentLabel};

/// Confidence at which a single path is trusted regardless of the other
pub const TRUST_THRESHOLD: f64 = 0.85;
/// Pattern-path score that skips the ensemble entirely
pub const FAST_PATH_THRESHOLD: f64 = 0.7;
pub const PATTERN_WEIGHT: f64 = 0.6;
pub const SIMILARITY_WEIGHT: f64 = 0.4;
/// Share of the losing path's weighted score added to the winner
pub const BONUS_SHARE: f64 = 0.5;

/// One path's best answer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathVote {
    pub intent: IntentLabel,
    pub confidence: f64,
}

impl PathVote {
    pub fn new(intent: IntentLabel, confidence: f64) -> Self {
        Self {
            intent,
            confidence: clamp_unit(confidence),
        }
    }
}

/// Which rule decided a fused vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionRule {
    Agreement,
    PatternOverride,
    SimilarityOverride,
    WeightedBlend,
    PatternOnly,
    SimilarityOnly,
    NoVotes,
}

/// Outcome of fusing the two paths
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedVote {
    pub intent: IntentLabel,
    pub confidence: f64,
    pub method: ClassificationMethod,
    pub rule: FusionRule,
}

/// Fuse the best vote of each path.
pub fn fuse(pattern: Option<PathVote>, similarity: Option<PathVote>) -> FusedVote {
    let fused = match (pattern, similarity) {
        (None, None) => FusedVote {
            intent: IntentLabel::Unknown,
            confidence: 0.0,
            method: ClassificationMethod::Ensemble,
            rule: FusionRule::NoVotes,
        },
        (Some(p), None) => FusedVote {
            intent: p.intent,
            confidence: p.confidence,
            method: ClassificationMethod::Pattern,
            rule: FusionRule::PatternOnly,
        },
        (None, Some(s)) => FusedVote {
            intent: s.intent,
            confidence: s.confidence,
            method: ClassificationMethod::Similarity,
            rule: FusionRule::SimilarityOnly,
        },
        (Some(p), Some(s)) if p.intent == s.intent => FusedVote {
            intent: p.intent,
            confidence: p.confidence.max(s.confidence),
            method: ClassificationMethod::Ensemble,
            rule: FusionRule::Agreement,
        },
        (Some(p), Some(_)) if p.confidence >= TRUST_THRESHOLD => FusedVote {
            intent: p.intent,
            confidence: p.confidence,
            method: ClassificationMethod::Pattern,
            rule: FusionRule::PatternOverride,
        },
        (Some(_), Some(s)) if s.confidence >= TRUST_THRESHOLD => FusedVote {
            intent: s.intent,
            confidence: s.confidence,
            method: ClassificationMethod::Similarity,
            rule: FusionRule::SimilarityOverride,
        },
        (Some(p), Some(s)) => {
            let weighted_p = p.confidence * PATTERN_WEIGHT;
            let weighted_s = s.confidence * SIMILARITY_WEIGHT;
            let (intent, confidence) = if weighted_p >= weighted_s {
                (p.intent, weighted_p + weighted_s * BONUS_SHARE)
            } else {
                (s.intent, weighted_s + weighted_p * BONUS_SHARE)
            };
            FusedVote {
                intent,
                confidence: clamp_unit(confidence),
                method: ClassificationMethod::Ensemble,
                rule: FusionRule::WeightedBlend,
            }
        }
    };

    debug!(
        intent = %fused.intent,
        confidence = fused.confidence,
        rule = ?fused.rule,
        "Fused classifier paths"
    );
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(intent: IntentLabel, confidence: f64) -> Option<PathVote> {
        Some(PathVote::new(intent, confidence))
    }

    #[test]
    fn test_agreement_takes_max() {
        let fused = fuse(
            vote(IntentLabel::PayBill, 0.45),
            vote(IntentLabel::PayBill, 0.62),
        );
        assert_eq!(fused.intent, IntentLabel::PayBill);
        assert_eq!(fused.confidence, 0.62);
        assert_eq!(fused.rule, FusionRule::Agreement);
    }

    #[test]
    fn test_confident_pattern_overrides_disagreement() {
        let fused = fuse(
            vote(IntentLabel::CheckIncome, 0.9),
            vote(IntentLabel::CheckBudget, 0.95),
        );
        assert_eq!(fused.intent, IntentLabel::CheckIncome);
        assert_eq!(fused.confidence, 0.9);
        assert_eq!(fused.rule, FusionRule::PatternOverride);
    }

    #[test]
    fn test_confident_similarity_overrides_weak_pattern() {
        let fused = fuse(
            vote(IntentLabel::CheckIncome, 0.5),
            vote(IntentLabel::CheckBudget, 0.88),
        );
        assert_eq!(fused.intent, IntentLabel::CheckBudget);
        assert_eq!(fused.method, ClassificationMethod::Similarity);
    }

    #[test]
    fn test_weighted_blend() {
        let fused = fuse(
            vote(IntentLabel::TransferMoney, 0.5),
            vote(IntentLabel::CheckBalance, 0.6),
        );
        // pattern: 0.5 * 0.6 = 0.30, similarity: 0.6 * 0.4 = 0.24
        assert_eq!(fused.intent, IntentLabel::TransferMoney);
        assert!((fused.confidence - (0.30 + 0.12)).abs() < 1e-9);
        assert_eq!(fused.rule, FusionRule::WeightedBlend);
    }

    #[test]
    fn test_blend_can_favour_similarity() {
        let fused = fuse(
            vote(IntentLabel::TransferMoney, 0.3),
            vote(IntentLabel::CheckBalance, 0.8),
        );
        // pattern: 0.18, similarity: 0.32
        assert_eq!(fused.intent, IntentLabel::CheckBalance);
        assert!((fused.confidence - (0.32 + 0.09)).abs() < 1e-9);
    }

    #[test]
    fn test_single_path_passes_through() {
        let fused = fuse(None, vote(IntentLabel::CheckBudget, 0.33));
        assert_eq!(fused.intent, IntentLabel::CheckBudget);
        assert_eq!(fused.confidence, 0.33);
        assert_eq!(fused.rule, FusionRule::SimilarityOnly);

        let fused = fuse(None, None);
        assert!(fused.intent.is_unknown());
        assert_eq!(fused.confidence, 0.0);
    }
}
