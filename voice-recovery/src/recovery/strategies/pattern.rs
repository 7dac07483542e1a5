//! Pattern-matching recovery: retry the pattern path with the expanded table

use std::sync::Arc;

use crate::context::RecoveryContext;
use crate::diagnosis::{ErrorDiagnosis, ErrorKind};
use crate::error::RecoveryResult;
use crate::intent::pattern_matcher::PatternCandidate;
use crate::intent::patterns::EXPANDED_TABLE;
use crate::intent::types::Alternative;
use crate::intent::IntentClassifier;
use crate::learning::SharedLearningStore;
use crate::recovery::{gain_over_prior, RecoveryOutcome, RecoveryStrategy, StrategyId};

/// Confidence assigned to a feedback-confirmed correction
const LEARNED_CORRECTION_CONFIDENCE: f64 = 0.75;

pub struct PatternMatchingRecovery {
    classifier: Arc<IntentClassifier>,
    store: Option<SharedLearningStore>,
}

impl PatternMatchingRecovery {
    pub fn new(classifier: Arc<IntentClassifier>) -> Self {
        Self {
            classifier,
            store: None,
        }
    }

    /// Fall back to feedback-confirmed corrections from `store`.
    pub fn with_store(mut self, store: SharedLearningStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Best expanded-table candidate with at least one regex hit. Keyword-only
    /// candidates do not count as a match.
    pub fn rematch(&self, text: &str) -> Option<PatternCandidate> {
        self.classifier
            .pattern_candidates(text, &EXPANDED_TABLE)
            .into_iter()
            .find(PatternCandidate::has_pattern_hit)
    }

    fn alternatives(&self, text: &str) -> Vec<Alternative> {
        self.classifier.classify(text).alternatives
    }
}

impl RecoveryStrategy for PatternMatchingRecovery {
    fn id(&self) -> StrategyId {
        StrategyId::PatternMatching
    }

    fn applicable(&self, kind: ErrorKind) -> bool {
        matches!(
            kind,
            ErrorKind::PatternMiss
                | ErrorKind::IntentConfusion
                | ErrorKind::LowConfidence
                | ErrorKind::ProcessingError
        )
    }

    fn priority(&self) -> u32 {
        5
    }

    fn initial_success_rate(&self) -> f64 {
        0.7
    }

    fn run(
        &self,
        _diagnosis: &ErrorDiagnosis,
        context: &RecoveryContext,
    ) -> RecoveryResult<RecoveryOutcome> {
        let text = &context.original_text;

        if let Some(candidate) = self.rematch(text) {
            return Ok(RecoveryOutcome::intent(
                self.id(),
                candidate.intent,
                candidate.score,
                gain_over_prior(context, candidate.score),
                format!(
                    "expanded patterns matched {} ({} hits)",
                    candidate.intent, candidate.pattern_hits
                ),
            )
            .with_alternatives(self.alternatives(text)));
        }

        if let Some(intent) = self.store.as_ref().and_then(|s| s.learned_correction(text)) {
            return Ok(RecoveryOutcome::intent(
                self.id(),
                intent,
                LEARNED_CORRECTION_CONFIDENCE,
                gain_over_prior(context, LEARNED_CORRECTION_CONFIDENCE),
                format!("feedback previously confirmed {intent} for this phrasing"),
            ));
        }

        Ok(RecoveryOutcome::failure(self.id(), "no expanded pattern matched"))
    }
}
