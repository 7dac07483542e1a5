//! Recovery engine and learning store properties
//!
//! Tests verify:
//! - Success rates stay in the unit interval under any trial sequence
//! - Episodes terminate and never exceed the attempt cap
//! - Regional recovery succeeds exactly when the rewrite matches a pattern
//! - A shared store stays consistent under concurrent episodes

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use voice_recovery::recovery::regional_terms::rewrite;
use voice_recovery::recovery::{PatternMatchingRecovery, RegionalVariationRecovery};
use voice_recovery::{
    DialectTag, ErrorDiagnosis, ErrorKind, Feedback, IntentClassifier, IntentLabel, LearningStore,
    RecoveryConfig, RecoveryContext, RecoveryEngine, RecoveryError, RecoveryOutcome,
    RecoveryResult, RecoveryStrategy, Region, Severity, StrategyFlagOverrides, StrategyId,
};

/// Deterministic pseudo-random bits for trial sequences
struct Lcg(u64);

impl Lcg {
    fn next_bool(&mut self) -> bool {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) & 1 == 1
    }
}

#[derive(Clone, Copy)]
enum Behaviour {
    Fail,
    Raise,
}

struct Scripted {
    id: StrategyId,
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
}

impl RecoveryStrategy for Scripted {
    fn id(&self) -> StrategyId {
        self.id
    }
    fn applicable(&self, _kind: ErrorKind) -> bool {
        true
    }
    fn priority(&self) -> u32 {
        2
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
            Behaviour::Fail => Ok(RecoveryOutcome::failure(self.id, "scripted failure")),
            Behaviour::Raise => Err(RecoveryError::strategy(self.id.to_string(), "boom")),
        }
    }
}

fn scripted_engine(config: &RecoveryConfig, calls: &Arc<AtomicUsize>) -> RecoveryEngine {
    let strategies: Vec<Box<dyn RecoveryStrategy>> = StrategyId::ALL
        .iter()
        .enumerate()
        .map(|(i, id)| {
            Box::new(Scripted {
                id: *id,
                behaviour: if i % 2 == 0 { Behaviour::Fail } else { Behaviour::Raise },
                calls: calls.clone(),
            }) as Box<dyn RecoveryStrategy>
        })
        .collect();
    RecoveryEngine::with_strategies(
        config.clone(),
        LearningStore::new(config).shared(),
        strategies,
    )
}

fn pattern_miss() -> ErrorDiagnosis {
    ErrorDiagnosis::new(ErrorKind::PatternMiss, Severity::High, "no intent pattern matched")
}

#[test]
fn test_success_rate_stays_in_unit_interval() {
    let store = LearningStore::new(&RecoveryConfig::default());
    let mut bits = Lcg(42);
    for (i, rate) in [0.0, 0.05, 0.1, 0.5, 1.0, 1.7, -0.3].into_iter().enumerate() {
        let id = StrategyId::ALL[i % StrategyId::ALL.len()];
        for _ in 0..500 {
            let value = store.record_trial(id, 0.5, bits.next_bool(), 0.4, rate);
            assert!((0.0..=1.0).contains(&value), "{id} at lr {rate}: {value}");
        }
    }
    for id in StrategyId::ALL {
        let rate = store.success_rate(id, 0.5);
        assert!((0.0..=1.0).contains(&rate));
    }
}

#[test]
fn test_success_rate_moves_towards_outcomes() {
    let store = LearningStore::new(&RecoveryConfig::default());
    let mut previous = store.success_rate(StrategyId::UserHistory, 0.4);
    for _ in 0..50 {
        let next = store.record_trial(StrategyId::UserHistory, 0.4, true, 0.2, 0.1);
        assert!(next >= previous);
        previous = next;
    }
    assert!(previous > 0.99);

    for _ in 0..50 {
        let next = store.record_trial(StrategyId::UserHistory, 0.4, false, 0.0, 0.1);
        assert!(next <= previous);
        previous = next;
    }
    assert!(previous < 0.01);
}

#[tokio::test]
async fn test_failing_episodes_terminate_within_cap() -> anyhow::Result<()> {
    let config = RecoveryConfig::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = scripted_engine(&config, &calls);
    let mut context = RecoveryContext::new("xpto", "u1", "s1");

    for _ in 0..10 {
        let outcome = engine.attempt_recovery(&pattern_miss(), &mut context).await?;
        assert!(!outcome.succeeded);
        assert!(outcome.needs_user_confirmation);
        assert!(context.attempts_so_far <= config.max_recovery_attempts);
    }

    let max = config.max_recovery_attempts as usize;
    assert_eq!(calls.load(Ordering::SeqCst), max * StrategyId::ALL.len());
    assert_eq!(context.prior_diagnoses.len(), max);
    assert_eq!(engine.store().get_statistics().total_errors, max as u64);
    Ok(())
}

#[tokio::test]
async fn test_raising_strategy_lowers_its_rate() -> anyhow::Result<()> {
    let config = RecoveryConfig::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = scripted_engine(&config, &calls);
    let mut context = RecoveryContext::new("xpto", "u1", "s1");

    engine.attempt_recovery(&pattern_miss(), &mut context).await?;

    let raised = engine
        .store()
        .strategy_stats(StrategyId::EntityExtraction)
        .expect("trial recorded");
    assert_eq!(raised.attempts, 1);
    assert_eq!(raised.successes, 0);
    assert!(raised.success_rate < 0.5);
    Ok(())
}

#[tokio::test]
async fn test_malformed_context_is_rejected_before_any_trial() {
    let config = RecoveryConfig::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = scripted_engine(&config, &calls);
    let mut context = RecoveryContext::new("xpto", "", "s1");

    let err = engine
        .attempt_recovery(&pattern_miss(), &mut context)
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::MalformedContext(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(context.attempts_so_far, 0);
}

#[tokio::test]
async fn test_regional_recovery_iff_rewrite_matches() -> anyhow::Result<()> {
    let config = RecoveryConfig::default();
    let classifier = Arc::new(IntentClassifier::new());
    let probe = PatternMatchingRecovery::new(classifier.clone());
    let engine = RecoveryEngine::with_strategies(
        config.clone(),
        LearningStore::new(&config).shared(),
        vec![Box::new(RegionalVariationRecovery::new(
            classifier,
            config.regional_gain_boost,
        ))],
    );

    let cases = [
        ("quanto de bufunfa eu tenho", Region::Unknown),
        ("a bufunfa sumiu", Region::Unknown),
        ("uai, quanto de grana eu tenho", Region::Sudeste),
        ("bah, quantos pila eu tenho", Region::Sul),
        ("oxe, quanto eu apurei", Region::Nordeste),
        ("égua, manda o dindin", Region::Norte),
        ("xpto abc", Region::Sul),
    ];

    let mut successes = 0;
    for (text, region) in cases {
        let expected = rewrite(text, region)
            .and_then(|r| probe.rematch(&r.text))
            .is_some();

        let mut diagnosis = ErrorDiagnosis::new(
            ErrorKind::RegionalMisunderstanding,
            Severity::Medium,
            "regional vocabulary",
        );
        diagnosis.dialect = Some(DialectTag::new(region, "regional"));
        let mut context = RecoveryContext::new(text, "u1", "s1");

        let outcome = engine.attempt_recovery(&diagnosis, &mut context).await?;
        assert_eq!(outcome.succeeded, expected, "{text}");
        if expected {
            successes += 1;
            assert_eq!(outcome.strategy_id, Some(StrategyId::RegionalVariation));
        }
    }
    assert_eq!(successes, 4);
    Ok(())
}

#[tokio::test]
async fn test_disabled_strategy_never_selected() -> anyhow::Result<()> {
    let config = RecoveryConfig::default();
    let engine = RecoveryEngine::new(
        config.clone(),
        Arc::new(IntentClassifier::new()),
        LearningStore::new(&config).shared(),
    );
    let overrides = StrategyFlagOverrides {
        pattern_matching_enabled: Some(false),
        ..Default::default()
    };
    let mut context = RecoveryContext::new("tô com quanto", "u1", "s1");

    let outcome = engine
        .attempt_recovery_with_overrides(&pattern_miss(), &mut context, &overrides)
        .await?;
    assert_ne!(outcome.strategy_id, Some(StrategyId::PatternMatching));
    assert!(engine
        .store()
        .strategy_stats(StrategyId::PatternMatching)
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_feedback_teaches_pattern_strategy() -> anyhow::Result<()> {
    let config = RecoveryConfig::default();
    let classifier = Arc::new(IntentClassifier::new());
    let store = LearningStore::new(&config).shared();
    let engine = RecoveryEngine::new(config, classifier.clone(), store.clone());

    let corrected = classifier.classify("qual é meu saldo");
    for _ in 0..2 {
        store
            .ingest_feedback("abc xyz", None, "qual é meu saldo", &corrected, Feedback::Positive, "u1")
            .await;
    }

    let mut context = RecoveryContext::new("abc xyz", "u1", "s1");
    let outcome = engine.attempt_recovery(&pattern_miss(), &mut context).await?;
    assert!(outcome.succeeded);
    assert_eq!(outcome.strategy_id, Some(StrategyId::PatternMatching));
    assert_eq!(outcome.corrected_intent, Some(IntentLabel::CheckBalance));
    assert!(outcome.needs_user_confirmation);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_episodes_share_store() -> anyhow::Result<()> {
    let config = RecoveryConfig::default();
    let store = LearningStore::new(&config).shared();
    let engine = Arc::new(RecoveryEngine::new(
        config,
        Arc::new(IntentClassifier::new()),
        store.clone(),
    ));

    let episodes = (0..32).map(|i| {
        let engine = engine.clone();
        async move {
            let text = if i % 2 == 0 { "tô com quanto" } else { "xpto blarg" };
            let diagnosis = pattern_miss();
            let mut context = RecoveryContext::new(text, format!("user-{i}"), "s1");
            engine.attempt_recovery(&diagnosis, &mut context).await
        }
    });
    let outcomes = join_all(episodes).await;

    let mut recovered = 0;
    for outcome in outcomes {
        if outcome?.succeeded {
            recovered += 1;
        }
    }
    assert_eq!(recovered, 16);

    let stats = store.get_statistics();
    assert_eq!(stats.total_errors, 32);
    assert_eq!(stats.successful_recoveries, 16);
    assert!((stats.recovery_rate - 0.5).abs() < 1e-9);
    assert_eq!(store.records().len(), 32);

    let pattern = store
        .strategy_stats(StrategyId::PatternMatching)
        .expect("pattern strategy tried");
    assert_eq!(pattern.attempts, 32);
    assert_eq!(pattern.successes, 16);
    Ok(())
}
