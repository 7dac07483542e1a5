//! Recovery strategies and the engine that runs them
//!
//! Each strategy is a small type implementing [`RecoveryStrategy`]. The
//! [`RecoveryEngine`] keeps them in a typed registry, ranks the applicable
//! ones by priority and learned success rate, and tries them one at a time.

pub mod engine;
pub mod regional_terms;
pub mod strategies;

use serde::{Deserialize, Serialize};

use crate::context::RecoveryContext;
use crate::diagnosis::{ErrorDiagnosis, ErrorKind};
use crate::error::RecoveryResult;
use crate::intent::types::{clamp_unit, Alternative, ExtractedEntity, IntentLabel};

pub use engine::RecoveryEngine;
pub use strategies::{
    ContextualInferenceRecovery, EntityExtractionRecovery, PatternMatchingRecovery,
    RegionalVariationRecovery, UserHistoryRecovery,
};

/// The canonical strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    PatternMatching,
    EntityExtraction,
    ContextualInference,
    UserHistory,
    RegionalVariation,
}

impl StrategyId {
    pub const ALL: [StrategyId; 5] = [
        Self::PatternMatching,
        Self::EntityExtraction,
        Self::ContextualInference,
        Self::UserHistory,
        Self::RegionalVariation,
    ];
}

impl std::fmt::Display for StrategyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PatternMatching => write!(f, "pattern_matching"),
            Self::EntityExtraction => write!(f, "entity_extraction"),
            Self::ContextualInference => write!(f, "contextual_inference"),
            Self::UserHistory => write!(f, "user_history"),
            Self::RegionalVariation => write!(f, "regional_variation"),
        }
    }
}

/// Result of one strategy trial or of a whole episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    pub succeeded: bool,
    pub corrected_intent: Option<IntentLabel>,
    /// Confidence of the corrected intent
    pub corrected_confidence: Option<f64>,
    pub corrected_entities: Option<Vec<ExtractedEntity>>,
    pub confidence_gain: f64,
    /// `None` when no strategy ran
    pub strategy_id: Option<StrategyId>,
    pub reasoning: String,
    pub needs_user_confirmation: bool,
    pub suggested_prompt: Option<String>,
    pub alternatives: Option<Vec<Alternative>>,
}

impl RecoveryOutcome {
    pub fn failure(strategy: StrategyId, reasoning: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            corrected_intent: None,
            corrected_confidence: None,
            corrected_entities: None,
            confidence_gain: 0.0,
            strategy_id: Some(strategy),
            reasoning: reasoning.into(),
            needs_user_confirmation: false,
            suggested_prompt: None,
            alternatives: None,
        }
    }

    /// A successful intent correction
    pub fn intent(
        strategy: StrategyId,
        intent: IntentLabel,
        confidence: f64,
        gain: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            succeeded: true,
            corrected_intent: Some(intent),
            corrected_confidence: Some(clamp_unit(confidence)),
            confidence_gain: clamp_unit(gain),
            ..Self::failure(strategy, reasoning)
        }
    }

    /// An entity correction; an empty list is a failure
    pub fn entities(
        strategy: StrategyId,
        entities: Vec<ExtractedEntity>,
        gain: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            succeeded: !entities.is_empty(),
            corrected_entities: Some(entities),
            confidence_gain: clamp_unit(gain),
            ..Self::failure(strategy, reasoning)
        }
    }

    /// Terminal failure of an episode, no strategy credited
    pub fn unrecovered(reasoning: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            strategy_id: None,
            needs_user_confirmation: true,
            suggested_prompt: Some(prompt.into()),
            ..Self::failure(StrategyId::PatternMatching, reasoning)
        }
    }

    pub fn with_entities(mut self, entities: Vec<ExtractedEntity>) -> Self {
        if !entities.is_empty() {
            self.corrected_entities = Some(entities);
        }
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Alternative>) -> Self {
        if !alternatives.is_empty() {
            self.alternatives = Some(alternatives);
        }
        self
    }

    pub fn requiring_confirmation(mut self) -> Self {
        self.needs_user_confirmation = true;
        self
    }

    /// Whether the outcome carries an actual correction
    pub fn has_correction(&self) -> bool {
        self.corrected_intent.is_some()
            || self
                .corrected_entities
                .as_ref()
                .is_some_and(|e| !e.is_empty())
    }
}

/// A pluggable recovery routine
pub trait RecoveryStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Whether the strategy handles this kind of diagnosis
    fn applicable(&self, kind: ErrorKind) -> bool;

    /// Static priority; higher runs first
    fn priority(&self) -> u32;

    /// Success rate before any trial has been recorded
    fn initial_success_rate(&self) -> f64;

    /// Attempt a correction. `Err` means the strategy itself broke; the
    /// engine moves on to the next one.
    fn run(
        &self,
        diagnosis: &ErrorDiagnosis,
        context: &RecoveryContext,
    ) -> RecoveryResult<RecoveryOutcome>;
}

/// Gain of a correction over the confidence the classifier had
pub(crate) fn gain_over_prior(context: &RecoveryContext, confidence: f64) -> f64 {
    let prior = context
        .prior_result
        .as_ref()
        .map(|r| if r.is_unknown() { 0.0 } else { r.confidence })
        .unwrap_or(0.0);
    (confidence - prior).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::types::EntityKind;

    #[test]
    fn test_strategy_display_matches_serde() {
        for id in StrategyId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{id}\""));
        }
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = RecoveryOutcome::intent(
            StrategyId::PatternMatching,
            IntentLabel::CheckBalance,
            0.85,
            1.4,
            "matched",
        );
        assert!(ok.succeeded && ok.has_correction());
        assert_eq!(ok.confidence_gain, 1.0);

        let fail = RecoveryOutcome::failure(StrategyId::UserHistory, "no history");
        assert!(!fail.succeeded && !fail.has_correction());

        let ents = RecoveryOutcome::entities(
            StrategyId::EntityExtraction,
            vec![ExtractedEntity::new(EntityKind::Amount, "cem", "100.00", 0.5, (0, 3))],
            0.15,
            "loose",
        );
        assert!(ents.has_correction());

        let none = RecoveryOutcome::unrecovered("exhausted", "Pode repetir?");
        assert!(none.strategy_id.is_none());
        assert!(none.needs_user_confirmation);
    }

    #[test]
    fn test_empty_entity_list_is_not_a_correction() {
        let outcome = RecoveryOutcome::entities(StrategyId::EntityExtraction, vec![], 0.1, "x");
        assert!(!outcome.succeeded);
        assert!(!outcome.has_correction());
    }
}
