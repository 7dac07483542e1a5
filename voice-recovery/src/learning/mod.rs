//! Learning: outcome records, success-rate state and statistics
//!
//! "Learning" is bookkeeping. Strategy success rates are exponential moving
//! averages, feedback nudges per-pattern intent weights, and every record is
//! forwarded to an external [`DurableSink`] for offline analysis.

pub mod sink;
pub mod store;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::diagnosis::ErrorKind;
use crate::dialect::Region;
use crate::error::RecoveryResult;
use crate::intent::types::IntentLabel;
use crate::recovery::StrategyId;

pub use sink::{DurableSink, MemorySink, NullSink};
pub use store::{LearningStore, SharedLearningStore};

/// User feedback on a correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Positive,
    Negative,
    Neutral,
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// One append-only learning record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub record_id: Uuid,
    /// Folded input text
    pub input_pattern: String,
    /// Human-readable description of the correction
    pub correction_applied: String,
    pub strategy_id: Option<StrategyId>,
    pub error_kind: Option<ErrorKind>,
    pub corrected_intent: Option<IntentLabel>,
    pub succeeded: bool,
    pub confidence_gain: f64,
    pub user_feedback: Option<Feedback>,
    pub regional_tag: Option<Region>,
    pub style: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
}

/// Running statistics for one strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    /// Exponential moving average of trial outcomes
    pub success_rate: f64,
    /// Mean confidence gain over successful trials
    pub avg_confidence_gain: f64,
    pub attempts: u64,
    pub successes: u64,
}

impl StrategyStats {
    pub fn new(initial_success_rate: f64) -> Self {
        Self {
            success_rate: crate::intent::types::clamp_unit(initial_success_rate),
            avg_confidence_gain: 0.0,
            attempts: 0,
            successes: 0,
        }
    }
}

/// Snapshot returned by [`LearningStore::get_statistics`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStatistics {
    pub total_errors: u64,
    pub successful_recoveries: u64,
    /// `successful_recoveries / total_errors`, 0 when nothing was recorded
    pub recovery_rate: f64,
    pub per_strategy: HashMap<StrategyId, StrategyStats>,
    /// Share of successful recoveries per tagged region
    pub per_region_accuracy: HashMap<Region, f64>,
    pub per_kind: HashMap<ErrorKind, u64>,
    pub buffered_records: usize,
    pub tracked_patterns: usize,
}

impl RecoveryStatistics {
    pub fn to_json(&self) -> RecoveryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
