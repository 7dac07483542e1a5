//! Recovery engine: rank applicable strategies and try them in order
//!
//! Episode states: START, then zero or more strategy trials, then SUCCESS,
//! EXHAUSTED or MAX_ATTEMPTS. Trials run strictly one after another; the
//! learning store is the only shared state and it is updated once per trial.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::strategies::{
    ContextualInferenceRecovery, EntityExtractionRecovery, PatternMatchingRecovery,
    RegionalVariationRecovery, UserHistoryRecovery,
};
use super::{RecoveryOutcome, RecoveryStrategy, StrategyId};
use crate::config::RecoveryConfig;
use crate::context::RecoveryContext;
use crate::diagnosis::{ErrorDiagnosis, ErrorKind};
use crate::error::RecoveryResult;
use crate::flags::{StrategyFlagOverrides, StrategyFlags};
use crate::intent::IntentClassifier;
use crate::learning::SharedLearningStore;

pub const PRIORITY_WEIGHT: f64 = 0.6;
pub const SUCCESS_RATE_WEIGHT: f64 = 0.4;

/// Prompt used when recovery does not run at all
pub const GENERIC_REPHRASE_PROMPT: &str =
    "Desculpe, não consegui entender. Pode repetir de outro jeito?";

/// Prompt used when every applicable strategy failed
pub fn fallback_prompt(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::PatternMiss => {
            "Não entendi o que você quer fazer. Pode dizer, por exemplo, \"ver meu saldo\" ou \"pagar uma conta\"?"
        }
        ErrorKind::EntityExtraction => {
            "Faltou alguma informação. Qual é o valor e para quem?"
        }
        ErrorKind::IntentConfusion => {
            "Fiquei em dúvida sobre o que você quer. Pode explicar de outro jeito?"
        }
        ErrorKind::LowConfidence => "Não tenho certeza se entendi. Pode confirmar o que você quer fazer?",
        ErrorKind::RegionalMisunderstanding => {
            "Não reconheci algumas palavras. Pode repetir usando outras palavras?"
        }
        ErrorKind::ProcessingError => {
            "Tive um problema para processar seu pedido. Pode tentar de novo?"
        }
    }
}

/// A strategy with its ranking score for one episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedStrategy {
    pub id: StrategyId,
    pub priority: u32,
    pub success_rate: f64,
    pub score: f64,
}

/// Registry of strategies plus the episode loop
pub struct RecoveryEngine {
    config: RecoveryConfig,
    strategies: Vec<Box<dyn RecoveryStrategy>>,
    store: SharedLearningStore,
}

impl std::fmt::Debug for RecoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryEngine")
            .field("config", &self.config)
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl RecoveryEngine {
    /// Engine with the five canonical strategies registered
    pub fn new(
        config: RecoveryConfig,
        classifier: Arc<IntentClassifier>,
        store: SharedLearningStore,
    ) -> Self {
        let strategies: Vec<Box<dyn RecoveryStrategy>> = vec![
            Box::new(
                PatternMatchingRecovery::new(classifier.clone()).with_store(store.clone()),
            ),
            Box::new(EntityExtractionRecovery::new()),
            Box::new(ContextualInferenceRecovery::new(config.context_window_turns)),
            Box::new(UserHistoryRecovery::new(config.user_history_min_occurrences)),
            Box::new(RegionalVariationRecovery::new(
                classifier,
                config.regional_gain_boost,
            )),
        ];
        Self::with_strategies(config, store, strategies)
    }

    /// Engine with an explicit strategy set
    pub fn with_strategies(
        config: RecoveryConfig,
        store: SharedLearningStore,
        strategies: Vec<Box<dyn RecoveryStrategy>>,
    ) -> Self {
        let mut engine = Self {
            config,
            strategies: Vec::new(),
            store,
        };
        for strategy in strategies {
            engine.register(strategy);
        }
        engine
    }

    /// Add a strategy, replacing any registered under the same id.
    pub fn register(&mut self, strategy: Box<dyn RecoveryStrategy>) {
        let id = strategy.id();
        self.strategies.retain(|s| s.id() != id);
        self.strategies.push(strategy);
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedLearningStore {
        &self.store
    }

    pub fn strategy_ids(&self) -> Vec<StrategyId> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// Applicable and enabled strategies for `kind`, best first. Ties keep
    /// registration order.
    pub fn rank(&self, kind: ErrorKind, flags: &StrategyFlags) -> Vec<RankedStrategy> {
        let mut ranked: Vec<RankedStrategy> = self
            .strategies
            .iter()
            .filter(|s| s.applicable(kind) && flags.is_enabled(s.id()))
            .map(|s| {
                let success_rate = self.store.success_rate(s.id(), s.initial_success_rate());
                RankedStrategy {
                    id: s.id(),
                    priority: s.priority(),
                    success_rate,
                    score: s.priority() as f64 * PRIORITY_WEIGHT
                        + success_rate * SUCCESS_RATE_WEIGHT,
                }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    /// Run one recovery episode with the configured flags.
    pub async fn attempt_recovery(
        &self,
        diagnosis: &ErrorDiagnosis,
        context: &mut RecoveryContext,
    ) -> RecoveryResult<RecoveryOutcome> {
        self.attempt_recovery_with_overrides(diagnosis, context, &StrategyFlagOverrides::default())
            .await
    }

    /// Run one recovery episode with per-run flag overrides applied on top
    /// of the configured flags.
    ///
    /// Only a malformed context is an error. Strategy faults are logged and
    /// treated as failed trials.
    pub async fn attempt_recovery_with_overrides(
        &self,
        diagnosis: &ErrorDiagnosis,
        context: &mut RecoveryContext,
        overrides: &StrategyFlagOverrides,
    ) -> RecoveryResult<RecoveryOutcome> {
        context.validate()?;

        let max_attempts = self.config.max_recovery_attempts;
        if !self.config.enabled || context.attempts_so_far >= max_attempts {
            info!(
                enabled = self.config.enabled,
                attempts = context.attempts_so_far,
                max_attempts,
                "Recovery skipped"
            );
            let reason = if self.config.enabled {
                format!("maximum of {max_attempts} recovery attempts reached")
            } else {
                "recovery disabled".to_string()
            };
            return Ok(RecoveryOutcome::unrecovered(reason, GENERIC_REPHRASE_PROMPT));
        }

        context.attempts_so_far = (context.attempts_so_far + 1).min(max_attempts);
        context.prior_diagnoses.push(diagnosis.clone());

        let mut flags = self.config.strategies.clone();
        flags.apply_overrides(overrides);
        let ranked = self.rank(diagnosis.kind, &flags);
        debug!(
            kind = %diagnosis.kind,
            attempts = context.attempts_so_far,
            candidates = ranked.len(),
            "Starting recovery episode"
        );

        let mut tried = Vec::with_capacity(ranked.len());
        for entry in &ranked {
            let Some(strategy) = self.strategies.iter().find(|s| s.id() == entry.id) else {
                continue;
            };
            tried.push(entry.id.to_string());
            debug!(strategy = %entry.id, score = entry.score, "Trying strategy");

            let outcome = match strategy.run(diagnosis, context) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(strategy = %entry.id, error = %e, "Strategy raised, trying next");
                    self.store.record_trial(
                        entry.id,
                        strategy.initial_success_rate(),
                        false,
                        0.0,
                        self.config.success_rate_learning_rate,
                    );
                    continue;
                }
            };

            let accepted = outcome.succeeded && outcome.has_correction();
            if outcome.succeeded && !accepted {
                warn!(strategy = %entry.id, "Strategy reported success without a correction");
            }
            let rate = self.store.record_trial(
                entry.id,
                strategy.initial_success_rate(),
                accepted,
                outcome.confidence_gain,
                self.config.success_rate_learning_rate,
            );

            if !accepted {
                debug!(strategy = %entry.id, success_rate = rate, reason = %outcome.reasoning, "Strategy failed");
                continue;
            }

            let mut outcome = outcome;
            outcome.strategy_id = Some(entry.id);
            if diagnosis.severity.requires_confirmation() {
                outcome.needs_user_confirmation = true;
            }
            if outcome.alternatives.is_none() {
                outcome.alternatives = context
                    .prior_result
                    .as_ref()
                    .map(|r| r.alternatives.clone())
                    .filter(|a| !a.is_empty());
            }
            info!(
                strategy = %entry.id,
                kind = %diagnosis.kind,
                intent = ?outcome.corrected_intent,
                confidence_gain = outcome.confidence_gain,
                success_rate = rate,
                "Recovery succeeded"
            );
            self.store.record(&outcome, context, diagnosis).await;
            return Ok(outcome);
        }

        let reason = if tried.is_empty() {
            format!("no enabled strategy handles {}", diagnosis.kind)
        } else {
            format!("all strategies failed: {}", tried.join(", "))
        };
        info!(kind = %diagnosis.kind, tried = tried.len(), "Recovery exhausted");
        let mut outcome = RecoveryOutcome::unrecovered(reason, fallback_prompt(diagnosis.kind));
        outcome.alternatives = context
            .prior_result
            .as_ref()
            .map(|r| r.alternatives.clone())
            .filter(|a| !a.is_empty());
        self.store.record(&outcome, context, diagnosis).await;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::diagnosis::Severity;
    use crate::error::RecoveryError;
    use crate::intent::types::{ClassificationResult, IntentLabel};
    use crate::learning::LearningStore;

    /// Scripted strategy counting its invocations
    struct Scripted {
        id: StrategyId,
        priority: u32,
        behaviour: Behaviour,
        calls: Arc<AtomicUsize>,
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fail,
        Raise,
        EmptySuccess,
    }

    impl RecoveryStrategy for Scripted {
        fn id(&self) -> StrategyId {
            self.id
        }
        fn applicable(&self, _kind: ErrorKind) -> bool {
            true
        }
        fn priority(&self) -> u32 {
            self.priority
        }
        fn initial_success_rate(&self) -> f64 {
            0.5
        }
        fn run(
            &self,
            _diagnosis: &ErrorDiagnosis,
            _context: &RecoveryContext,
        ) -> RecoveryResult<RecoveryOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Succeed => Ok(RecoveryOutcome::intent(
                    self.id,
                    IntentLabel::CheckBalance,
                    0.8,
                    0.3,
                    "scripted",
                )),
                Behaviour::Fail => Ok(RecoveryOutcome::failure(self.id, "scripted")),
                Behaviour::Raise => Err(RecoveryError::strategy(self.id.to_string(), "boom")),
                Behaviour::EmptySuccess => Ok(RecoveryOutcome {
                    succeeded: true,
                    ..RecoveryOutcome::failure(self.id, "claims success")
                }),
            }
        }
    }

    fn scripted(
        id: StrategyId,
        priority: u32,
        behaviour: Behaviour,
    ) -> (Box<dyn RecoveryStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Scripted {
                id,
                priority,
                behaviour,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn engine_with(strategies: Vec<Box<dyn RecoveryStrategy>>) -> RecoveryEngine {
        RecoveryEngine::with_strategies(
            RecoveryConfig::default(),
            LearningStore::default().shared(),
            strategies,
        )
    }

    fn diag(severity: Severity) -> ErrorDiagnosis {
        ErrorDiagnosis::new(ErrorKind::LowConfidence, severity, "test")
    }

    fn ctx() -> RecoveryContext {
        RecoveryContext::new("hmm", "u1", "s1")
    }

    #[tokio::test]
    async fn test_raising_strategy_does_not_abort() {
        let (raise, raise_calls) = scripted(StrategyId::PatternMatching, 5, Behaviour::Raise);
        let (ok, ok_calls) = scripted(StrategyId::UserHistory, 1, Behaviour::Succeed);
        let engine = engine_with(vec![raise, ok]);

        let mut context = ctx();
        let outcome = engine.attempt_recovery(&diag(Severity::Low), &mut context).await.unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.strategy_id, Some(StrategyId::UserHistory));
        assert_eq!(raise_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
        assert!(!outcome.needs_user_confirmation);

        let stats = engine.store().strategy_stats(StrategyId::PatternMatching).unwrap();
        assert!((stats.success_rate - 0.45).abs() < 1e-9);
        assert_eq!(context.attempts_so_far, 1);
        assert_eq!(context.prior_diagnoses.len(), 1);
    }

    #[tokio::test]
    async fn test_first_success_stops_the_loop() {
        let (first, first_calls) = scripted(StrategyId::PatternMatching, 5, Behaviour::Succeed);
        let (second, second_calls) = scripted(StrategyId::UserHistory, 1, Behaviour::Succeed);
        let engine = engine_with(vec![second, first]);

        let outcome = engine
            .attempt_recovery(&diag(Severity::Low), &mut ctx())
            .await
            .unwrap();
        assert_eq!(outcome.strategy_id, Some(StrategyId::PatternMatching));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        let rate = engine.store().success_rate(StrategyId::PatternMatching, 0.5);
        assert!((rate - 0.55).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_high_severity_requires_confirmation() {
        let (ok, _) = scripted(StrategyId::PatternMatching, 5, Behaviour::Succeed);
        let engine = engine_with(vec![ok]);
        for severity in [Severity::High, Severity::Critical] {
            let outcome = engine
                .attempt_recovery(&diag(severity), &mut ctx())
                .await
                .unwrap();
            assert!(outcome.succeeded);
            assert!(outcome.needs_user_confirmation);
        }
    }

    #[tokio::test]
    async fn test_success_without_correction_counts_as_failure() {
        let (empty, _) = scripted(StrategyId::PatternMatching, 5, Behaviour::EmptySuccess);
        let engine = engine_with(vec![empty]);
        let outcome = engine
            .attempt_recovery(&diag(Severity::Low), &mut ctx())
            .await
            .unwrap();
        assert!(!outcome.succeeded);
        assert!(outcome.needs_user_confirmation);
        assert!(outcome.suggested_prompt.is_some());
    }

    #[tokio::test]
    async fn test_exhaustion_returns_kind_prompt() {
        let (a, _) = scripted(StrategyId::PatternMatching, 5, Behaviour::Fail);
        let (b, _) = scripted(StrategyId::EntityExtraction, 4, Behaviour::Raise);
        let engine = engine_with(vec![a, b]);
        let outcome = engine
            .attempt_recovery(&diag(Severity::Medium), &mut ctx())
            .await
            .unwrap();
        assert!(!outcome.succeeded);
        assert!(outcome.strategy_id.is_none());
        assert_eq!(
            outcome.suggested_prompt.as_deref(),
            Some(fallback_prompt(ErrorKind::LowConfidence))
        );
        assert_eq!(engine.store().get_statistics().total_errors, 1);
    }

    #[tokio::test]
    async fn test_max_attempts_short_circuits() {
        let (ok, calls) = scripted(StrategyId::PatternMatching, 5, Behaviour::Succeed);
        let engine = engine_with(vec![ok]);
        let mut context = ctx().with_attempts(3);
        let outcome = engine
            .attempt_recovery(&diag(Severity::Low), &mut context)
            .await
            .unwrap();
        assert!(!outcome.succeeded);
        assert!(outcome.needs_user_confirmation);
        assert_eq!(outcome.suggested_prompt.as_deref(), Some(GENERIC_REPHRASE_PROMPT));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(context.attempts_so_far, 3);
        assert_eq!(engine.store().get_statistics().total_errors, 0);
    }

    #[tokio::test]
    async fn test_disabled_engine_short_circuits() {
        let (ok, calls) = scripted(StrategyId::PatternMatching, 5, Behaviour::Succeed);
        let engine = RecoveryEngine::with_strategies(
            RecoveryConfig::disabled(),
            LearningStore::default().shared(),
            vec![ok],
        );
        let outcome = engine
            .attempt_recovery(&diag(Severity::Low), &mut ctx())
            .await
            .unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_flag_override_skips_strategy() {
        let (ok, calls) = scripted(StrategyId::PatternMatching, 5, Behaviour::Succeed);
        let engine = engine_with(vec![ok]);
        let overrides = StrategyFlagOverrides {
            pattern_matching_enabled: Some(false),
            ..Default::default()
        };
        let outcome = engine
            .attempt_recovery_with_overrides(&diag(Severity::Low), &mut ctx(), &overrides)
            .await
            .unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(outcome.reasoning.contains("no enabled strategy"));
    }

    #[tokio::test]
    async fn test_malformed_context_is_an_error() {
        let engine = engine_with(vec![]);
        let mut context = RecoveryContext::new("x", "", "s1");
        let err = engine
            .attempt_recovery(&diag(Severity::Low), &mut context)
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::MalformedContext(_)));
    }

    #[test]
    fn test_canonical_ranking() {
        let engine = RecoveryEngine::new(
            RecoveryConfig::default(),
            Arc::new(IntentClassifier::new()),
            LearningStore::default().shared(),
        );
        let flags = StrategyFlags::default();
        let order: Vec<StrategyId> = engine
            .rank(ErrorKind::PatternMiss, &flags)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(
            order,
            vec![
                StrategyId::PatternMatching,
                StrategyId::RegionalVariation,
                StrategyId::ContextualInference,
                StrategyId::UserHistory,
            ]
        );

        let order: Vec<StrategyId> = engine
            .rank(ErrorKind::LowConfidence, &flags)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(order[0], StrategyId::PatternMatching);
        assert_eq!(order[1], StrategyId::EntityExtraction);
        assert!(!order.contains(&StrategyId::RegionalVariation));
    }

    #[tokio::test]
    async fn test_prior_alternatives_carried_on_exhaustion() {
        let (fail, _) = scripted(StrategyId::PatternMatching, 5, Behaviour::Fail);
        let engine = engine_with(vec![fail]);
        let prior = ClassificationResult::new(
            IntentLabel::CheckBudget,
            0.35,
            crate::intent::ClassificationMethod::Ensemble,
            vec![crate::intent::Alternative {
                intent: IntentLabel::CheckIncome,
                confidence: 0.3,
            }],
        );
        let mut context = ctx().with_prior_result(prior);
        let outcome = engine
            .attempt_recovery(&diag(Severity::Medium), &mut context)
            .await
            .unwrap();
        let alternatives = outcome.alternatives.unwrap();
        assert_eq!(alternatives[0].intent, IntentLabel::CheckIncome);
    }
}
