//! User-history recovery: fall back on the user's habitual intent

use std::collections::HashMap;

use crate::context::RecoveryContext;
use crate::diagnosis::{ErrorDiagnosis, ErrorKind};
use crate::error::RecoveryResult;
use crate::intent::types::IntentLabel;
use crate::recovery::{gain_over_prior, RecoveryOutcome, RecoveryStrategy, StrategyId};

/// Confidence ceiling; a habit is never as good as a match
const MAX_HISTORY_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy)]
pub struct UserHistoryRecovery {
    min_occurrences: usize,
}

impl Default for UserHistoryRecovery {
    fn default() -> Self {
        Self::new(3)
    }
}

impl UserHistoryRecovery {
    pub fn new(min_occurrences: usize) -> Self {
        Self {
            min_occurrences: min_occurrences.max(1),
        }
    }

    /// Most frequent known intent in the whole history with its count. Ties
    /// go to the intent seen most recently.
    fn dominant_intent(context: &RecoveryContext) -> Option<(IntentLabel, usize)> {
        let mut counts: HashMap<IntentLabel, (usize, usize)> = HashMap::new();
        for (position, turn) in context.conversation_history.iter().enumerate() {
            let intent = turn.intent();
            if intent.is_unknown() {
                continue;
            }
            let entry = counts.entry(intent).or_insert((0, 0));
            entry.0 += 1;
            entry.1 = position;
        }
        counts
            .into_iter()
            .max_by_key(|(_, (count, last))| (*count, *last))
            .map(|(intent, (count, _))| (intent, count))
    }
}

impl RecoveryStrategy for UserHistoryRecovery {
    fn id(&self) -> StrategyId {
        StrategyId::UserHistory
    }

    fn applicable(&self, kind: ErrorKind) -> bool {
        matches!(
            kind,
            ErrorKind::LowConfidence | ErrorKind::IntentConfusion | ErrorKind::PatternMiss
        )
    }

    fn priority(&self) -> u32 {
        2
    }

    fn initial_success_rate(&self) -> f64 {
        0.4
    }

    fn run(
        &self,
        _diagnosis: &ErrorDiagnosis,
        context: &RecoveryContext,
    ) -> RecoveryResult<RecoveryOutcome> {
        let Some((intent, count)) = Self::dominant_intent(context) else {
            return Ok(RecoveryOutcome::failure(self.id(), "no usable history"));
        };
        if count < self.min_occurrences {
            return Ok(RecoveryOutcome::failure(
                self.id(),
                format!("{intent} seen {count} times, below {}", self.min_occurrences),
            ));
        }

        let share = count as f64 / context.conversation_history.len() as f64;
        let confidence = (0.4 + 0.3 * share).min(MAX_HISTORY_CONFIDENCE);
        Ok(RecoveryOutcome::intent(
            self.id(),
            intent,
            confidence,
            gain_over_prior(context, confidence),
            format!("user asked for {intent} {count} times before"),
        )
        .requiring_confirmation())
    }
}
