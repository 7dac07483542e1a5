//! Contextual-inference recovery: read the intent off recent turns and the
//! financial snapshot

use crate::context::RecoveryContext;
use crate::diagnosis::{ErrorDiagnosis, ErrorKind};
use crate::error::RecoveryResult;
use crate::intent::types::{EntityKind, ExtractedEntity, IntentLabel};
use crate::normalizer::{fold, NormalizedText, TextNormalizer};
use crate::recovery::{gain_over_prior, RecoveryOutcome, RecoveryStrategy, StrategyId};

const BALANCE_CUES: &[&str] = &["saldo", "sobrou", "restou", "ficou", "quanto tenho", "quanto ficou"];
const REPEAT_CUES: &[&str] = &["de novo", "outra vez", "mesmo", "mesma coisa", "repete", "igual"];

const BALANCE_AFTER_MOVEMENT_CONFIDENCE: f64 = 0.75;
const REPEAT_CONFIDENCE: f64 = 0.7;
const PENDING_BILL_CONFIDENCE: f64 = 0.7;
const KNOWN_RECIPIENT_CONFIDENCE: f64 = 0.65;

#[derive(Debug, Clone, Copy)]
pub struct ContextualInferenceRecovery {
    normalizer: TextNormalizer,
    window: usize,
}

impl Default for ContextualInferenceRecovery {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ContextualInferenceRecovery {
    /// `window` is the number of most recent turns inspected.
    pub fn new(window: usize) -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            window,
        }
    }

    fn any_cue(text: &NormalizedText, cues: &[&str]) -> bool {
        cues.iter().any(|c| text.contains_phrase(c))
    }

    fn infer(
        &self,
        text: &NormalizedText,
        context: &RecoveryContext,
    ) -> Option<(IntentLabel, f64, Vec<ExtractedEntity>, String)> {
        let recent: Vec<IntentLabel> = context
            .recent_turns(self.window)
            .map(|t| t.intent())
            .filter(|i| !i.is_unknown())
            .collect();

        if Self::any_cue(text, BALANCE_CUES)
            && recent
                .iter()
                .any(|i| matches!(i, IntentLabel::TransferMoney | IntentLabel::PayBill))
        {
            return Some((
                IntentLabel::CheckBalance,
                BALANCE_AFTER_MOVEMENT_CONFIDENCE,
                Vec::new(),
                "balance question right after a money movement".to_string(),
            ));
        }

        if Self::any_cue(text, REPEAT_CUES) {
            if let Some(last) = recent.first() {
                return Some((
                    *last,
                    REPEAT_CONFIDENCE,
                    Vec::new(),
                    format!("repeat request, last turn was {last}"),
                ));
            }
        }

        for bill in &context.financial_snapshot.pending_bills {
            if text.contains_phrase(&fold(&bill.bill_type)) {
                let entity = ExtractedEntity::new(
                    EntityKind::BillType,
                    bill.bill_type.clone(),
                    bill.bill_type.clone(),
                    PENDING_BILL_CONFIDENCE,
                    (0, 0),
                )
                .with_metadata("source", "pending_bills")
                .with_metadata("amount", format!("{:.2}", bill.amount));
                return Some((
                    IntentLabel::PayBill,
                    PENDING_BILL_CONFIDENCE,
                    vec![entity],
                    format!("mentions the pending {} bill", bill.bill_type),
                ));
            }
        }

        for transfer in &context.financial_snapshot.recent_transfers {
            let name = fold(&transfer.recipient);
            if !name.is_empty() && text.contains_phrase(&name) {
                let entity = ExtractedEntity::new(
                    EntityKind::Recipient,
                    transfer.recipient.clone(),
                    name,
                    KNOWN_RECIPIENT_CONFIDENCE,
                    (0, 0),
                )
                .with_metadata("source", "recent_transfers");
                return Some((
                    IntentLabel::TransferMoney,
                    KNOWN_RECIPIENT_CONFIDENCE,
                    vec![entity],
                    format!("mentions recent transfer recipient {}", transfer.recipient),
                ));
            }
        }

        None
    }
}

impl RecoveryStrategy for ContextualInferenceRecovery {
    fn id(&self) -> StrategyId {
        StrategyId::ContextualInference
    }

    fn applicable(&self, kind: ErrorKind) -> bool {
        matches!(
            kind,
            ErrorKind::IntentConfusion
                | ErrorKind::LowConfidence
                | ErrorKind::PatternMiss
                | ErrorKind::EntityExtraction
        )
    }

    fn priority(&self) -> u32 {
        3
    }

    fn initial_success_rate(&self) -> f64 {
        0.5
    }

    fn run(
        &self,
        _diagnosis: &ErrorDiagnosis,
        context: &RecoveryContext,
    ) -> RecoveryResult<RecoveryOutcome> {
        let text = self.normalizer.normalize(&context.original_text);
        match self.infer(&text, context) {
            Some((intent, confidence, entities, reasoning)) => Ok(RecoveryOutcome::intent(
                self.id(),
                intent,
                confidence,
                gain_over_prior(context, confidence),
                reasoning,
            )
            .with_entities(entities)),
            None => Ok(RecoveryOutcome::failure(self.id(), "no contextual cue matched")),
        }
    }
}
