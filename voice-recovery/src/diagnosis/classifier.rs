//! Error classifier
//!
//! Decision order:
//! 1. Fault code lookup.
//! 2. Prior classification: below the low threshold is low-confidence,
//!    `Unknown` is a pattern miss.
//! 3. Dialect tag: a known region turns a pattern miss or intent confusion
//!    into a regional misunderstanding.
//! 4. Contextual factors, informational only.
//!
//! Steps 1 and 2 only replace an earlier classification with a strictly more
//! severe one. Step 3 always applies when eligible.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{ErrorDiagnosis, ErrorKind, FailureSignal, FaultCode, Severity};
use crate::config::RecoveryConfig;
use crate::context::RecoveryContext;
use crate::dialect::{DialectTag, DialectTagger, LexiconDialectTagger};
use crate::error::RecoveryResult;
use crate::intent::types::ClassificationResult;

/// Kind, severity and root cause for a fault code
fn fault_entry(code: &FaultCode) -> (ErrorKind, Severity, &'static str) {
    match code {
        FaultCode::ClassificationFailed => (
            ErrorKind::IntentConfusion,
            Severity::High,
            "classifier could not settle on an intent",
        ),
        FaultCode::EntityExtractionFailed => (
            ErrorKind::EntityExtraction,
            Severity::Medium,
            "required entities missing from the utterance",
        ),
        FaultCode::Timeout => (
            ErrorKind::ProcessingError,
            Severity::Critical,
            "processing timed out",
        ),
        FaultCode::InvalidInput => (
            ErrorKind::PatternMiss,
            Severity::Low,
            "input did not look like a command",
        ),
        FaultCode::Other(_) => (
            ErrorKind::ProcessingError,
            Severity::Medium,
            "unrecognised fault",
        ),
    }
}

/// Maps failure signals onto [`ErrorDiagnosis`] values
#[derive(Clone)]
pub struct ErrorClassifier {
    low_confidence_threshold: f64,
    tagger: Arc<dyn DialectTagger>,
}

impl std::fmt::Debug for ErrorClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorClassifier")
            .field("low_confidence_threshold", &self.low_confidence_threshold)
            .finish_non_exhaustive()
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(&RecoveryConfig::default(), Arc::new(LexiconDialectTagger::new()))
    }
}

impl ErrorClassifier {
    pub fn new(config: &RecoveryConfig, tagger: Arc<dyn DialectTagger>) -> Self {
        Self {
            low_confidence_threshold: config.low_confidence_threshold,
            tagger,
        }
    }

    /// Diagnose a failure. Never fails: an internal fault yields a generic
    /// processing-error diagnosis.
    pub fn classify(
        &self,
        signal: &FailureSignal,
        original_text: &str,
        prior_result: Option<&ClassificationResult>,
        context: &RecoveryContext,
    ) -> ErrorDiagnosis {
        match self.try_classify(signal, original_text, prior_result, context) {
            Ok(diagnosis) => {
                debug!(
                    kind = %diagnosis.kind,
                    severity = %diagnosis.severity,
                    root_cause = %diagnosis.root_cause,
                    "Diagnosed failure"
                );
                diagnosis
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "Diagnosis failed, using processing error");
                ErrorDiagnosis::processing_error(format!("diagnosis failed: {e}"))
            }
        }
    }

    pub fn try_classify(
        &self,
        signal: &FailureSignal,
        original_text: &str,
        prior_result: Option<&ClassificationResult>,
        context: &RecoveryContext,
    ) -> RecoveryResult<ErrorDiagnosis> {
        let mut current: Option<ErrorDiagnosis> = None;

        // 1. fault table
        let prior = match signal {
            FailureSignal::Fault { code, message } => {
                let (kind, severity, cause) = fault_entry(code);
                let root_cause = if message.is_empty() {
                    cause.to_string()
                } else {
                    format!("{cause}: {message}")
                };
                let mut diagnosis = ErrorDiagnosis::new(kind, severity, root_cause);
                diagnosis.fault_code = Some(code.clone());
                current = Some(diagnosis);
                prior_result.or(context.prior_result.as_ref())
            }
            FailureSignal::LowConfidence { result } => Some(result),
        };

        // 2. prior classification
        if let Some(result) = prior {
            if result.confidence < self.low_confidence_threshold {
                upgrade(
                    &mut current,
                    ErrorKind::LowConfidence,
                    Severity::Medium,
                    format!(
                        "confidence {:.2} below {:.2}",
                        result.confidence, self.low_confidence_threshold
                    ),
                );
            }
            if result.is_unknown() {
                upgrade(
                    &mut current,
                    ErrorKind::PatternMiss,
                    Severity::High,
                    "no intent pattern matched".to_string(),
                );
            }
        }
        let mut diagnosis = match current {
            Some(d) => d,
            None => {
                let confidence = prior.map(|r| r.confidence).unwrap_or(0.0);
                ErrorDiagnosis::new(
                    ErrorKind::LowConfidence,
                    Severity::Low,
                    format!("confidence {confidence:.2} below the operating threshold"),
                )
            }
        };

        // 3. dialect
        let tag = self.resolve_tag(original_text, context)?;
        if tag.region.is_known() {
            if matches!(
                diagnosis.kind,
                ErrorKind::PatternMiss | ErrorKind::IntentConfusion
            ) {
                diagnosis.reclassify(
                    ErrorKind::RegionalMisunderstanding,
                    Severity::Medium,
                    format!("{} vocabulary not covered by the standard patterns", tag.region),
                );
            }
            diagnosis.regional_factors = vec![
                format!("region: {}", tag.region),
                format!("style: {}", tag.style),
            ];
        }
        diagnosis.dialect = Some(tag);

        // 4. context
        diagnosis.contextual_factors = contextual_factors(context);

        Ok(diagnosis)
    }

    /// Tagger output, falling back to the caller's tag when the tagger sees
    /// no region.
    fn resolve_tag(&self, text: &str, context: &RecoveryContext) -> RecoveryResult<DialectTag> {
        let tag = self.tagger.tag(text)?;
        if tag.region.is_known() {
            return Ok(tag);
        }
        match &context.regional_tag {
            Some(caller) if caller.region.is_known() => Ok(caller.clone()),
            _ => Ok(tag),
        }
    }
}

fn upgrade(current: &mut Option<ErrorDiagnosis>, kind: ErrorKind, severity: Severity, cause: String) {
    match current {
        None => *current = Some(ErrorDiagnosis::new(kind, severity, cause)),
        Some(d) if severity > d.severity => d.reclassify(kind, severity, cause),
        Some(_) => {}
    }
}

fn contextual_factors(context: &RecoveryContext) -> Vec<String> {
    let mut factors = Vec::new();
    if !context.conversation_history.is_empty() {
        factors.push(format!(
            "conversation history: {} turns",
            context.conversation_history.len()
        ));
    }
    if !context.user_preferences.is_empty() {
        factors.push("user preferences present".to_string());
    }
    if context.financial_snapshot.has_pending_bills() {
        factors.push(format!(
            "pending bills: {}",
            context.financial_snapshot.pending_bills.len()
        ));
    }
    if context.attempts_so_far > 0 {
        factors.push(format!("previous recovery attempts: {}", context.attempts_so_far));
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConversationTurn, UserPreferences};
    use crate::dialect::Region;
    use crate::error::RecoveryError;
    use crate::intent::types::{ClassificationMethod, IntentLabel};

    struct BrokenTagger;

    impl DialectTagger for BrokenTagger {
        fn tag(&self, _text: &str) -> RecoveryResult<DialectTag> {
            Err(RecoveryError::DialectTagging("model offline".into()))
        }
    }

    fn result(intent: IntentLabel, confidence: f64) -> ClassificationResult {
        ClassificationResult::new(intent, confidence, ClassificationMethod::Ensemble, vec![])
    }

    fn ctx(text: &str) -> RecoveryContext {
        RecoveryContext::new(text, "user-1", "session-1")
    }

    fn diagnose(signal: FailureSignal, text: &str) -> ErrorDiagnosis {
        ErrorClassifier::default().classify(&signal, text, None, &ctx(text))
    }

    #[test]
    fn test_fault_table() {
        let cases = [
            (FaultCode::ClassificationFailed, ErrorKind::IntentConfusion, Severity::High),
            (FaultCode::EntityExtractionFailed, ErrorKind::EntityExtraction, Severity::Medium),
            (FaultCode::Timeout, ErrorKind::ProcessingError, Severity::Critical),
            (FaultCode::InvalidInput, ErrorKind::PatternMiss, Severity::Low),
            (FaultCode::Other("X".into()), ErrorKind::ProcessingError, Severity::Medium),
        ];
        for (code, kind, severity) in cases {
            let d = diagnose(FailureSignal::fault(code.clone(), ""), "pagar conta");
            assert_eq!(d.kind, kind, "{code}");
            assert_eq!(d.severity, severity, "{code}");
            assert_eq!(d.fault_code, Some(code));
        }
    }

    #[test]
    fn test_entity_fault_with_mid_confidence_prior() {
        let prior = result(IntentLabel::TransferMoney, 0.45);
        let text = "transferir para";
        let d = ErrorClassifier::default().classify(
            &FailureSignal::fault(FaultCode::EntityExtractionFailed, "amount, recipient"),
            text,
            Some(&prior),
            &ctx(text),
        );
        assert_eq!(d.kind, ErrorKind::EntityExtraction);
        assert_eq!(d.severity, Severity::Medium);
    }

    #[test]
    fn test_unknown_prior_overrides_milder_fault() {
        let prior = result(IntentLabel::Unknown, 0.0);
        let d = ErrorClassifier::default().classify(
            &FailureSignal::fault(FaultCode::InvalidInput, ""),
            "xyz",
            Some(&prior),
            &ctx("xyz"),
        );
        assert_eq!(d.kind, ErrorKind::PatternMiss);
        assert_eq!(d.severity, Severity::High);
    }

    #[test]
    fn test_critical_fault_is_not_downgraded() {
        let prior = result(IntentLabel::Unknown, 0.0);
        let d = ErrorClassifier::default().classify(
            &FailureSignal::fault(FaultCode::Timeout, ""),
            "xyz",
            Some(&prior),
            &ctx("xyz"),
        );
        assert_eq!(d.kind, ErrorKind::ProcessingError);
        assert_eq!(d.severity, Severity::Critical);
    }

    #[test]
    fn test_low_confidence_signals() {
        let d = diagnose(
            FailureSignal::low_confidence(result(IntentLabel::CheckBudget, 0.3)),
            "orçamento talvez",
        );
        assert_eq!(d.kind, ErrorKind::LowConfidence);
        assert_eq!(d.severity, Severity::Medium);

        let d = diagnose(
            FailureSignal::low_confidence(result(IntentLabel::CheckBudget, 0.5)),
            "orçamento talvez",
        );
        assert_eq!(d.kind, ErrorKind::LowConfidence);
        assert_eq!(d.severity, Severity::Low);
    }

    #[test]
    fn test_unknown_result_is_pattern_miss() {
        let d = diagnose(FailureSignal::low_confidence(ClassificationResult::unknown()), "xpto");
        assert_eq!(d.kind, ErrorKind::PatternMiss);
        assert_eq!(d.severity, Severity::High);
        assert!(d.regional_factors.is_empty());
    }

    #[test]
    fn test_regional_upgrade() {
        let d = diagnose(
            FailureSignal::low_confidence(ClassificationResult::unknown()),
            "bah, quantos pila eu tenho",
        );
        assert_eq!(d.kind, ErrorKind::RegionalMisunderstanding);
        assert_eq!(d.severity, Severity::Medium);
        assert!(d.regional_factors.iter().any(|f| f == "region: Sul"));
        assert_eq!(d.dialect.map(|t| t.region), Some(Region::Sul));
    }

    #[test]
    fn test_region_does_not_change_entity_diagnosis() {
        let d = diagnose(
            FailureSignal::fault(FaultCode::EntityExtractionFailed, ""),
            "oxe, transferir para",
        );
        assert_eq!(d.kind, ErrorKind::EntityExtraction);
        assert!(!d.regional_factors.is_empty());
    }

    #[test]
    fn test_caller_tag_used_when_tagger_sees_nothing() {
        let context = ctx("xpto").with_regional_tag(DialectTag::new(Region::Nordeste, "regional"));
        let d = ErrorClassifier::default().classify(
            &FailureSignal::low_confidence(ClassificationResult::unknown()),
            "xpto",
            None,
            &context,
        );
        assert_eq!(d.kind, ErrorKind::RegionalMisunderstanding);
    }

    #[test]
    fn test_tagger_fault_yields_processing_error() {
        let classifier = ErrorClassifier::new(&RecoveryConfig::default(), Arc::new(BrokenTagger));
        let d = classifier.classify(
            &FailureSignal::low_confidence(ClassificationResult::unknown()),
            "xpto",
            None,
            &ctx("xpto"),
        );
        assert_eq!(d.kind, ErrorKind::ProcessingError);
        assert_eq!(d.severity, Severity::Medium);
        assert!(d.root_cause.contains("model offline"));
    }

    #[test]
    fn test_contextual_factors_do_not_change_kind() {
        let context = ctx("xpto")
            .with_history(vec![ConversationTurn::new(
                "qual é meu saldo",
                result(IntentLabel::CheckBalance, 0.9),
            )])
            .with_preferences(UserPreferences {
                form_of_address: Some("você".into()),
                ..Default::default()
            });
        let d = ErrorClassifier::default().classify(
            &FailureSignal::low_confidence(result(IntentLabel::CheckBudget, 0.3)),
            "xpto",
            None,
            &context,
        );
        assert_eq!(d.kind, ErrorKind::LowConfidence);
        assert_eq!(d.contextual_factors.len(), 2);
    }
}
