//! Regional-variation recovery: rewrite slang, then retry the expanded
//! pattern path on the rewrite

use std::sync::Arc;

use tracing::debug;

use super::PatternMatchingRecovery;
use crate::context::RecoveryContext;
use crate::diagnosis::{ErrorDiagnosis, ErrorKind};
use crate::dialect::Region;
use crate::error::RecoveryResult;
use crate::intent::IntentClassifier;
use crate::recovery::regional_terms::rewrite;
use crate::recovery::{gain_over_prior, RecoveryOutcome, RecoveryStrategy, StrategyId};

pub struct RegionalVariationRecovery {
    matcher: PatternMatchingRecovery,
    gain_boost: f64,
}

impl RegionalVariationRecovery {
    pub fn new(classifier: Arc<IntentClassifier>, gain_boost: f64) -> Self {
        Self {
            matcher: PatternMatchingRecovery::new(classifier),
            gain_boost,
        }
    }

    /// Region from the diagnosis, else from the caller's tag
    fn region(diagnosis: &ErrorDiagnosis, context: &RecoveryContext) -> Region {
        diagnosis
            .dialect
            .as_ref()
            .map(|t| t.region)
            .filter(Region::is_known)
            .or_else(|| context.regional_tag.as_ref().map(|t| t.region))
            .unwrap_or(Region::Unknown)
    }
}

impl RecoveryStrategy for RegionalVariationRecovery {
    fn id(&self) -> StrategyId {
        StrategyId::RegionalVariation
    }

    fn applicable(&self, kind: ErrorKind) -> bool {
        matches!(
            kind,
            ErrorKind::RegionalMisunderstanding | ErrorKind::PatternMiss
        )
    }

    fn priority(&self) -> u32 {
        4
    }

    fn initial_success_rate(&self) -> f64 {
        0.65
    }

    fn run(
        &self,
        diagnosis: &ErrorDiagnosis,
        context: &RecoveryContext,
    ) -> RecoveryResult<RecoveryOutcome> {
        let region = Self::region(diagnosis, context);
        let Some(rewritten) = rewrite(&context.original_text, region) else {
            return Ok(RecoveryOutcome::failure(
                self.id(),
                format!("no {region} terms to rewrite"),
            ));
        };
        debug!(
            region = %region,
            rewritten = %rewritten.text,
            substitutions = rewritten.substitutions.len(),
            "Rewrote regional terms"
        );

        let Some(candidate) = self.matcher.rematch(&rewritten.text) else {
            return Ok(RecoveryOutcome::failure(
                self.id(),
                format!("rewrite \"{}\" matched no pattern", rewritten.text),
            ));
        };

        let gain = gain_over_prior(context, candidate.score) * self.gain_boost;
        let terms: Vec<String> = rewritten
            .substitutions
            .iter()
            .map(|(from, to)| {
                if to.is_empty() {
                    format!("-{from}")
                } else {
                    format!("{from}->{to}")
                }
            })
            .collect();
        Ok(RecoveryOutcome::intent(
            self.id(),
            candidate.intent,
            candidate.score,
            gain,
            format!(
                "rewrote [{}] to \"{}\", matched {}",
                terms.join(", "),
                rewritten.text,
                candidate.intent
            ),
        ))
    }
}
