//! Process-wide learning state
//!
//! One [`LearningStore`] is shared by every concurrent episode. Each
//! read-modify-write happens under a single `std::sync::Mutex` lock, and the
//! lock is always released before the durable sink is awaited.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    DurableSink, Feedback, LearningRecord, NullSink, RecoveryStatistics, StrategyStats,
};
use crate::config::RecoveryConfig;
use crate::context::RecoveryContext;
use crate::diagnosis::{ErrorDiagnosis, ErrorKind};
use crate::dialect::Region;
use crate::error::RecoveryResult;
use crate::intent::types::{clamp_unit, ClassificationResult, IntentLabel};
use crate::normalizer::fold;
use crate::recovery::{RecoveryOutcome, StrategyId};

/// Shared handle to the learning store
pub type SharedLearningStore = Arc<LearningStore>;

/// Feedback weight an intent needs before it is offered as a correction
pub const LEARNED_CORRECTION_MIN_WEIGHT: i64 = 2;

#[derive(Debug, Clone, Default)]
struct PatternEntry {
    seen: u64,
    last_touched: u64,
    intent_weights: HashMap<IntentLabel, i64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct RegionTally {
    attempts: u64,
    successes: u64,
}

#[derive(Debug, Default)]
struct LearningState {
    strategies: HashMap<StrategyId, StrategyStats>,
    patterns: HashMap<String, PatternEntry>,
    records: VecDeque<LearningRecord>,
    total_errors: u64,
    successful_recoveries: u64,
    per_kind: HashMap<ErrorKind, u64>,
    per_region: HashMap<Region, RegionTally>,
    tick: u64,
}

impl LearningState {
    /// Count one sighting of `pattern`, evicting the least-seen other
    /// pattern when over capacity.
    fn touch_pattern(&mut self, pattern: &str, max_patterns: usize) -> &mut PatternEntry {
        self.tick += 1;
        let tick = self.tick;

        if !self.patterns.contains_key(pattern) && self.patterns.len() >= max_patterns {
            let victim = self
                .patterns
                .iter()
                .min_by_key(|(_, e)| (e.seen, e.last_touched))
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                debug!(pattern = %victim, "Evicting least-seen error pattern");
                self.patterns.remove(&victim);
            }
        }

        let entry = self.patterns.entry(pattern.to_string()).or_default();
        entry.seen += 1;
        entry.last_touched = tick;
        entry
    }

    /// Append a record, evicting records of the least-seen pattern first
    /// (oldest among equals) when over capacity.
    fn push_record(&mut self, record: LearningRecord, max_records: usize) {
        self.records.push_back(record);
        while self.records.len() > max_records.max(1) {
            let victim = self
                .records
                .iter()
                .enumerate()
                .min_by_key(|(i, r)| {
                    let seen = self.patterns.get(&r.input_pattern).map_or(0, |e| e.seen);
                    (seen, *i)
                })
                .map(|(i, _)| i);
            match victim {
                Some(i) => {
                    self.records.remove(i);
                }
                None => break,
            }
        }
    }
}

/// In-process learning store
pub struct LearningStore {
    max_error_patterns: usize,
    max_learning_records: usize,
    state: Mutex<LearningState>,
    sink: Arc<dyn DurableSink>,
}

impl std::fmt::Debug for LearningStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningStore")
            .field("max_error_patterns", &self.max_error_patterns)
            .field("max_learning_records", &self.max_learning_records)
            .finish_non_exhaustive()
    }
}

impl Default for LearningStore {
    fn default() -> Self {
        Self::new(&RecoveryConfig::default())
    }
}

impl LearningStore {
    /// Store that discards records after buffering them
    pub fn new(config: &RecoveryConfig) -> Self {
        Self::with_sink(config, Arc::new(NullSink))
    }

    pub fn with_sink(config: &RecoveryConfig, sink: Arc<dyn DurableSink>) -> Self {
        Self {
            max_error_patterns: config.max_error_patterns.max(1),
            max_learning_records: config.max_learning_records.max(1),
            state: Mutex::new(LearningState::default()),
            sink,
        }
    }

    pub fn shared(self) -> SharedLearningStore {
        Arc::new(self)
    }

    fn lock(&self) -> MutexGuard<'_, LearningState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current success rate, or `initial` if the strategy never ran
    pub fn success_rate(&self, strategy: StrategyId, initial: f64) -> f64 {
        self.lock()
            .strategies
            .get(&strategy)
            .map_or(clamp_unit(initial), |s| s.success_rate)
    }

    pub fn strategy_stats(&self, strategy: StrategyId) -> Option<StrategyStats> {
        self.lock().strategies.get(&strategy).copied()
    }

    /// Move a strategy's success rate toward 1 (success) or 0 (failure) by
    /// exponential moving average. Returns the new rate.
    pub fn record_trial(
        &self,
        strategy: StrategyId,
        initial: f64,
        succeeded: bool,
        confidence_gain: f64,
        learning_rate: f64,
    ) -> f64 {
        let rate = clamp_unit(learning_rate);
        let target = if succeeded { 1.0 } else { 0.0 };

        let mut state = self.lock();
        let stats = state
            .strategies
            .entry(strategy)
            .or_insert_with(|| StrategyStats::new(initial));
        stats.success_rate = clamp_unit(stats.success_rate + rate * (target - stats.success_rate));
        stats.attempts += 1;
        if succeeded {
            stats.successes += 1;
            stats.avg_confidence_gain +=
                (confidence_gain - stats.avg_confidence_gain) / stats.successes as f64;
        }
        stats.success_rate
    }

    /// Record the outcome of a recovery episode and forward it to the sink.
    pub async fn record(
        &self,
        outcome: &RecoveryOutcome,
        context: &RecoveryContext,
        diagnosis: &ErrorDiagnosis,
    ) -> LearningRecord {
        let tag = diagnosis.dialect.as_ref().or(context.regional_tag.as_ref());
        let region = tag.map(|t| t.region);
        let record = LearningRecord {
            record_id: Uuid::new_v4(),
            input_pattern: fold(&context.original_text),
            correction_applied: describe_correction(outcome),
            strategy_id: outcome.strategy_id,
            error_kind: Some(diagnosis.kind),
            corrected_intent: outcome.corrected_intent,
            succeeded: outcome.succeeded,
            confidence_gain: outcome.confidence_gain,
            user_feedback: None,
            regional_tag: region,
            style: tag.map(|t| t.style.clone()),
            timestamp: Utc::now(),
            user_id: context.user_id.clone(),
        };

        {
            let mut state = self.lock();
            state.total_errors += 1;
            if outcome.succeeded {
                state.successful_recoveries += 1;
            }
            *state.per_kind.entry(diagnosis.kind).or_insert(0) += 1;
            if let Some(region) = region.filter(Region::is_known) {
                let tally = state.per_region.entry(region).or_default();
                tally.attempts += 1;
                if outcome.succeeded {
                    tally.successes += 1;
                }
            }
            state.touch_pattern(&record.input_pattern, self.max_error_patterns);
            state.push_record(record.clone(), self.max_learning_records);
        }

        self.forward(&record).await;
        record
    }

    /// Ingest user feedback on a correction. Positive and negative feedback
    /// adjust the intent weights of the original pattern; neutral feedback
    /// is only recorded.
    pub async fn ingest_feedback(
        &self,
        original_text: &str,
        prior_result: Option<&ClassificationResult>,
        corrected_text: &str,
        corrected_result: &ClassificationResult,
        feedback: Feedback,
        user_id: &str,
    ) -> LearningRecord {
        let prior_intent = prior_result.map_or(IntentLabel::Unknown, |r| r.intent);
        let prior_confidence = prior_result.map_or(0.0, |r| r.confidence);
        let record = LearningRecord {
            record_id: Uuid::new_v4(),
            input_pattern: fold(original_text),
            correction_applied: format!(
                "{prior_intent} -> {} via \"{}\"",
                corrected_result.intent,
                fold(corrected_text)
            ),
            strategy_id: None,
            error_kind: None,
            corrected_intent: Some(corrected_result.intent),
            succeeded: feedback != Feedback::Negative,
            confidence_gain: (corrected_result.confidence - prior_confidence).max(0.0),
            user_feedback: Some(feedback),
            regional_tag: None,
            style: None,
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
        };

        {
            let mut state = self.lock();
            let entry = state.touch_pattern(&record.input_pattern, self.max_error_patterns);
            if !corrected_result.is_unknown() {
                let delta = match feedback {
                    Feedback::Positive => 1,
                    Feedback::Negative => -1,
                    Feedback::Neutral => 0,
                };
                if delta != 0 {
                    *entry.intent_weights.entry(corrected_result.intent).or_insert(0) += delta;
                }
            }
            state.push_record(record.clone(), self.max_learning_records);
        }

        info!(
            feedback = %feedback,
            intent = %corrected_result.intent,
            user_id,
            "Ingested feedback"
        );
        self.forward(&record).await;
        record
    }

    /// Intent that feedback has confirmed for this input, if any
    pub fn learned_correction(&self, text: &str) -> Option<IntentLabel> {
        let pattern = fold(text);
        let state = self.lock();
        let entry = state.patterns.get(&pattern)?;
        entry
            .intent_weights
            .iter()
            .filter(|(_, w)| **w >= LEARNED_CORRECTION_MIN_WEIGHT)
            .max_by(|(ia, wa), (ib, wb)| wa.cmp(wb).then(ib.cmp(ia)))
            .map(|(intent, _)| *intent)
    }

    pub fn get_statistics(&self) -> RecoveryStatistics {
        let state = self.lock();
        let recovery_rate = if state.total_errors == 0 {
            0.0
        } else {
            state.successful_recoveries as f64 / state.total_errors as f64
        };
        RecoveryStatistics {
            total_errors: state.total_errors,
            successful_recoveries: state.successful_recoveries,
            recovery_rate,
            per_strategy: state.strategies.clone(),
            per_region_accuracy: state
                .per_region
                .iter()
                .filter(|(_, t)| t.attempts > 0)
                .map(|(r, t)| (*r, t.successes as f64 / t.attempts as f64))
                .collect(),
            per_kind: state.per_kind.clone(),
            buffered_records: state.records.len(),
            tracked_patterns: state.patterns.len(),
        }
    }

    /// Buffered records, oldest first
    pub fn records(&self) -> Vec<LearningRecord> {
        self.lock().records.iter().cloned().collect()
    }

    /// Replay the buffered records into `sink`, oldest first. Stops at the
    /// first record the sink rejects.
    pub async fn flush_to(&self, sink: &dyn DurableSink) -> RecoveryResult<usize> {
        let records = self.records();
        for record in &records {
            sink.append(record).await?;
        }
        info!(count = records.len(), "Learning records flushed");
        Ok(records.len())
    }

    /// Drop all learned state, success rates included.
    pub fn reset(&self) {
        *self.lock() = LearningState::default();
        info!("Learning store reset");
    }

    async fn forward(&self, record: &LearningRecord) {
        if let Err(e) = self.sink.append(record).await {
            warn!(record_id = %record.record_id, error = %e, "Durable sink append failed");
        }
    }
}

fn describe_correction(outcome: &RecoveryOutcome) -> String {
    let strategy = outcome
        .strategy_id
        .map_or_else(|| "none".to_string(), |s| s.to_string());
    match (&outcome.corrected_intent, &outcome.corrected_entities) {
        (Some(intent), Some(entities)) => {
            format!("{strategy}: intent {intent}, {} entities", entities.len())
        }
        (Some(intent), None) => format!("{strategy}: intent {intent}"),
        (None, Some(entities)) => format!("{strategy}: {} entities", entities.len()),
        (None, None) => format!("{strategy}: no correction"),
    }
}
