//! Entity-extraction recovery: re-scan with the loose rules

use crate::context::RecoveryContext;
use crate::diagnosis::{ErrorDiagnosis, ErrorKind};
use crate::error::RecoveryResult;
use crate::intent::types::ExtractedEntity;
use crate::intent::EntityExtractor;
use crate::recovery::{RecoveryOutcome, RecoveryStrategy, StrategyId};

/// Gain credited per entity the strict pass missed
const GAIN_PER_ENTITY: f64 = 0.15;

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityExtractionRecovery {
    extractor: EntityExtractor,
}

impl EntityExtractionRecovery {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_entity(a: &ExtractedEntity, b: &ExtractedEntity) -> bool {
    a.kind == b.kind && a.span_start == b.span_start && a.span_end == b.span_end
}

impl RecoveryStrategy for EntityExtractionRecovery {
    fn id(&self) -> StrategyId {
        StrategyId::EntityExtraction
    }

    fn applicable(&self, kind: ErrorKind) -> bool {
        matches!(kind, ErrorKind::EntityExtraction | ErrorKind::LowConfidence)
    }

    fn priority(&self) -> u32 {
        4
    }

    fn initial_success_rate(&self) -> f64 {
        0.6
    }

    fn run(
        &self,
        _diagnosis: &ErrorDiagnosis,
        context: &RecoveryContext,
    ) -> RecoveryResult<RecoveryOutcome> {
        let text = &context.original_text;
        let strict = self.extractor.extract(text);
        let loose = self.extractor.extract_loose(text);

        let recovered: Vec<&ExtractedEntity> = loose
            .iter()
            .filter(|e| !strict.iter().any(|s| same_entity(s, e)))
            .collect();
        if recovered.is_empty() {
            return Ok(RecoveryOutcome::failure(
                self.id(),
                "loose extraction found nothing new",
            ));
        }

        let kinds: Vec<String> = recovered.iter().map(|e| e.kind.to_string()).collect();
        let prior = context.prior_result.as_ref().filter(|r| !r.is_unknown());
        if let Some(prior) = prior {
            let still_missing: Vec<String> = prior
                .intent
                .required_entities()
                .iter()
                .filter(|kind| !loose.iter().any(|e| e.kind == **kind))
                .map(|kind| kind.to_string())
                .collect();
            if !still_missing.is_empty() {
                return Ok(RecoveryOutcome::failure(
                    self.id(),
                    format!(
                        "loose extraction recovered {} but {} still missing",
                        kinds.join(", "),
                        still_missing.join(", ")
                    ),
                ));
            }
        }

        let gain = GAIN_PER_ENTITY * recovered.len() as f64;
        let mut outcome = RecoveryOutcome::entities(
            self.id(),
            loose.clone(),
            gain,
            format!("loose extraction recovered {}", kinds.join(", ")),
        );
        // keep the classifier's intent so callers can act on the merged result
        if let Some(prior) = prior {
            outcome.corrected_intent = Some(prior.intent);
            outcome.corrected_confidence = Some(prior.confidence);
        }
        Ok(outcome)
    }
}
