//! End-to-end facade: classify, and on failure diagnose, recover or ask
//!
//! ```rust,ignore
//! let pipeline = VoiceCommandPipeline::new(RecoveryConfig::from_env());
//! let mut context = RecoveryContext::new("", "user-1", "session-1");
//! match pipeline.process("qual é meu saldo", &mut context).await? {
//!     PipelineResponse::Understood { result, .. } => println!("{}", result.intent),
//!     other => println!("{other:?}"),
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clarification::{ClarificationGenerator, ClarificationRequest};
use crate::config::RecoveryConfig;
use crate::context::{ConversationTurn, RecoveryContext};
use crate::diagnosis::{ErrorClassifier, ErrorDiagnosis, ErrorKind, FailureSignal, FaultCode};
use crate::dialect::{DialectTagger, LexiconDialectTagger};
use crate::error::RecoveryResult;
use crate::intent::types::{
    ClassificationMethod, ClassificationResult, EntityKind, ExtractedEntity, IntentLabel,
};
use crate::intent::{EntityExtractor, IntentClassifier};
use crate::learning::{Feedback, LearningRecord, LearningStore, RecoveryStatistics, SharedLearningStore};
use crate::recovery::{RecoveryEngine, RecoveryOutcome, RecoveryStrategy};

/// What the caller gets back for one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResponse {
    /// Classified with enough confidence and every required entity
    Understood {
        result: ClassificationResult,
        entities: Vec<ExtractedEntity>,
    },
    /// Classification failed but a strategy corrected it
    Recovered {
        original: ClassificationResult,
        diagnosis: ErrorDiagnosis,
        outcome: RecoveryOutcome,
    },
    /// Recovery gave up; ask the user
    NeedsClarification {
        original: ClassificationResult,
        diagnosis: ErrorDiagnosis,
        outcome: RecoveryOutcome,
        clarification: ClarificationRequest,
    },
}

impl PipelineResponse {
    pub fn is_understood(&self) -> bool {
        matches!(self, Self::Understood { .. })
    }
}

pub struct VoiceCommandPipeline {
    config: RecoveryConfig,
    classifier: Arc<IntentClassifier>,
    extractor: EntityExtractor,
    diagnoser: ErrorClassifier,
    engine: RecoveryEngine,
    clarifier: ClarificationGenerator,
    store: SharedLearningStore,
}

impl VoiceCommandPipeline {
    /// Pipeline with the lexicon tagger and a store that keeps records in
    /// memory only
    pub fn new(config: RecoveryConfig) -> Self {
        let store = LearningStore::new(&config).shared();
        Self::with_components(config, Arc::new(LexiconDialectTagger::new()), store)
    }

    pub fn with_components(
        config: RecoveryConfig,
        tagger: Arc<dyn DialectTagger>,
        store: SharedLearningStore,
    ) -> Self {
        let classifier = Arc::new(IntentClassifier::new());
        Self {
            diagnoser: ErrorClassifier::new(&config, tagger),
            engine: RecoveryEngine::new(config.clone(), classifier.clone(), store.clone()),
            extractor: EntityExtractor::new(),
            clarifier: ClarificationGenerator::new(),
            classifier,
            store,
            config,
        }
    }

    /// Replace the built-in strategies; the learning store is kept.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn RecoveryStrategy>>) -> Self {
        self.engine =
            RecoveryEngine::with_strategies(self.config.clone(), self.store.clone(), strategies);
        self
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn engine(&self) -> &RecoveryEngine {
        &self.engine
    }

    pub fn store(&self) -> &SharedLearningStore {
        &self.store
    }

    /// Handle one utterance. `context.original_text` is replaced by `text`
    /// and the turn is appended to the conversation history.
    pub async fn process(
        &self,
        text: &str,
        context: &mut RecoveryContext,
    ) -> RecoveryResult<PipelineResponse> {
        context.next_utterance(text);
        let result = self.classifier.classify(text);
        let entities = self.extractor.extract(text);
        context.prior_result = Some(result.clone());

        let missing = missing_entities(result.intent, &entities);

        if !result.is_unknown()
            && result.confidence >= self.config.operating_threshold
            && missing.is_empty()
        {
            debug!(intent = %result.intent, confidence = result.confidence, "Understood");
            context.push_turn(ConversationTurn::new(text, result.clone()));
            context.mark_resolved();
            return Ok(PipelineResponse::Understood { result, entities });
        }

        let signal = if !result.is_unknown() && !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|k| k.to_string()).collect();
            FailureSignal::fault(FaultCode::EntityExtractionFailed, names.join(", "))
        } else {
            FailureSignal::low_confidence(result.clone())
        };

        let diagnosis = self.diagnoser.classify(&signal, text, Some(&result), context);
        let mut outcome = self.engine.attempt_recovery(&diagnosis, context).await?;
        if outcome.succeeded {
            let intent = outcome.corrected_intent.unwrap_or(result.intent);
            let merged = merge_entities(&entities, outcome.corrected_entities.as_deref());
            let still_missing = missing_entities(intent, &merged);
            if !still_missing.is_empty() {
                let names: Vec<String> = still_missing.iter().map(|k| k.to_string()).collect();
                debug!(
                    strategy = ?outcome.strategy_id,
                    missing = %names.join(", "),
                    "Correction lacks required entities"
                );
                outcome.succeeded = false;
                outcome.needs_user_confirmation = true;
                outcome.reasoning =
                    format!("{}; {} still missing", outcome.reasoning, names.join(", "));
                let mut ask = ErrorDiagnosis::new(
                    ErrorKind::EntityExtraction,
                    diagnosis.severity,
                    format!("{intent} without {}", names.join(", ")),
                );
                ask.dialect = diagnosis.dialect.clone();
                context.push_turn(ConversationTurn::new(text, result.clone()));
                let clarification = self.clarifier.generate(&ask, context);
                return Ok(PipelineResponse::NeedsClarification {
                    original: result,
                    diagnosis,
                    outcome,
                    clarification,
                });
            }

            // corrections short of the certainty bar are confirmed with the user
            if outcome
                .corrected_confidence
                .is_some_and(|c| c < self.config.high_confidence_threshold)
            {
                outcome.needs_user_confirmation = true;
            }
            let corrected = ClassificationResult::new(
                intent,
                outcome.corrected_confidence.unwrap_or(result.confidence),
                ClassificationMethod::Ensemble,
                result.alternatives.clone(),
            );
            context.push_turn(ConversationTurn::new(text, corrected));
            context.mark_resolved();
            info!(
                strategy = ?outcome.strategy_id,
                kind = %diagnosis.kind,
                "Utterance recovered"
            );
            return Ok(PipelineResponse::Recovered {
                original: result,
                diagnosis,
                outcome,
            });
        }

        context.push_turn(ConversationTurn::new(text, result.clone()));
        let clarification = self.clarifier.generate(&diagnosis, context);
        Ok(PipelineResponse::NeedsClarification {
            original: result,
            diagnosis,
            outcome,
            clarification,
        })
    }

    /// Forward user feedback on a correction to the learning store.
    pub async fn feedback(
        &self,
        original_text: &str,
        corrected_text: &str,
        feedback: Feedback,
        user_id: &str,
    ) -> LearningRecord {
        let prior = self.classifier.classify(original_text);
        let corrected = self.classifier.classify(corrected_text);
        self.store
            .ingest_feedback(
                original_text,
                Some(&prior),
                corrected_text,
                &corrected,
                feedback,
                user_id,
            )
            .await
    }

    pub fn statistics(&self) -> RecoveryStatistics {
        self.store.get_statistics()
    }
}

/// Required entity kinds of `intent` absent from `entities`
fn missing_entities(intent: IntentLabel, entities: &[ExtractedEntity]) -> Vec<EntityKind> {
    intent
        .required_entities()
        .iter()
        .copied()
        .filter(|kind| !entities.iter().any(|e| e.kind == *kind))
        .collect()
}

fn merge_entities(
    found: &[ExtractedEntity],
    corrected: Option<&[ExtractedEntity]>,
) -> Vec<ExtractedEntity> {
    let mut merged = found.to_vec();
    for entity in corrected.unwrap_or_default() {
        if !merged.iter().any(|e| e.kind == entity.kind) {
            merged.push(entity.clone());
        }
    }
    merged
}
