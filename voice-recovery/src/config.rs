//! Engine configuration
//!
//! Thresholds and caps are policy defaults, not invariants; every one of them
//! can be changed through `VOICE_RECOVERY_*` environment variables or by
//! building the struct directly.

use serde::{Deserialize, Serialize};

use crate::flags::StrategyFlags;

/// Configuration shared by the classifier, diagnosis, recovery and learning
/// components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Global recovery switch
    pub enabled: bool,
    /// Recovery episodes allowed per context before asking the user
    pub max_recovery_attempts: u32,
    /// Below this a classification is diagnosed as low-confidence
    pub low_confidence_threshold: f64,
    /// Below this a classification is not acted upon without recovery
    pub operating_threshold: f64,
    /// At or above this a classification is considered certain
    pub high_confidence_threshold: f64,
    /// Exponential moving average rate for strategy success rates
    pub success_rate_learning_rate: f64,
    /// Cap on distinct input patterns tracked by the learning store
    pub max_error_patterns: usize,
    /// Cap on buffered learning records
    pub max_learning_records: usize,
    /// Conversation turns inspected by contextual inference
    pub context_window_turns: usize,
    /// Occurrences of one intent in history before user-history recovery trusts it
    pub user_history_min_occurrences: usize,
    /// Multiplier applied to the gain of a regional rewrite
    pub regional_gain_boost: f64,
    /// Per-strategy toggles
    pub strategies: StrategyFlags,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_recovery_attempts: 3,
            low_confidence_threshold: 0.4,
            operating_threshold: 0.6,
            high_confidence_threshold: 0.8,
            success_rate_learning_rate: 0.1,
            max_error_patterns: 1000,
            max_learning_records: 5000,
            context_window_turns: 3,
            user_history_min_occurrences: 3,
            regional_gain_boost: 1.1,
            strategies: StrategyFlags::default(),
        }
    }
}

impl RecoveryConfig {
    /// Build a config from defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VOICE_RECOVERY_ENABLED") {
            config.enabled = !(val.to_lowercase() == "false" || val == "0");
        }
        if let Some(n) = parse_env("VOICE_RECOVERY_MAX_ATTEMPTS") {
            config.max_recovery_attempts = n;
        }
        if let Some(v) = parse_env::<f64>("VOICE_RECOVERY_LOW_CONFIDENCE") {
            config.low_confidence_threshold = v.clamp(0.0, 1.0);
        }
        if let Some(v) = parse_env::<f64>("VOICE_RECOVERY_OPERATING_THRESHOLD") {
            config.operating_threshold = v.clamp(0.0, 1.0);
        }
        if let Some(v) = parse_env::<f64>("VOICE_RECOVERY_HIGH_CONFIDENCE") {
            config.high_confidence_threshold = v.clamp(0.0, 1.0);
        }
        if let Some(v) = parse_env::<f64>("VOICE_RECOVERY_LEARNING_RATE") {
            config.success_rate_learning_rate = v.clamp(0.0, 1.0);
        }
        if let Some(n) = parse_env("VOICE_RECOVERY_MAX_PATTERNS") {
            config.max_error_patterns = n;
        }
        if let Some(n) = parse_env("VOICE_RECOVERY_MAX_RECORDS") {
            config.max_learning_records = n;
        }
        if let Some(n) = parse_env("VOICE_RECOVERY_CONTEXT_WINDOW") {
            config.context_window_turns = n;
        }
        if let Some(n) = parse_env("VOICE_RECOVERY_HISTORY_MIN_OCCURRENCES") {
            config.user_history_min_occurrences = n;
        }
        if let Some(v) = parse_env::<f64>("VOICE_RECOVERY_REGIONAL_BOOST") {
            if v.is_finite() && v > 0.0 {
                config.regional_gain_boost = v;
            }
        }
        config.strategies = StrategyFlags::from_env();

        config
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_recovery_attempts = max;
        self
    }

    pub fn with_strategies(mut self, strategies: StrategyFlags) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| r#"{"error":"serialization failed"}"#.to_string())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy_constants() {
        let config = RecoveryConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_recovery_attempts, 3);
        assert_eq!(config.low_confidence_threshold, 0.4);
        assert_eq!(config.operating_threshold, 0.6);
        assert_eq!(config.high_confidence_threshold, 0.8);
        assert_eq!(config.max_error_patterns, 1000);
        assert_eq!(config.max_learning_records, 5000);
    }

    #[test]
    fn test_from_env_reads_recovery_tuning() {
        std::env::set_var("VOICE_RECOVERY_CONTEXT_WINDOW", "5");
        std::env::set_var("VOICE_RECOVERY_HISTORY_MIN_OCCURRENCES", "2");
        std::env::set_var("VOICE_RECOVERY_REGIONAL_BOOST", "1.25");
        let config = RecoveryConfig::from_env();
        std::env::remove_var("VOICE_RECOVERY_CONTEXT_WINDOW");
        std::env::remove_var("VOICE_RECOVERY_HISTORY_MIN_OCCURRENCES");
        std::env::remove_var("VOICE_RECOVERY_REGIONAL_BOOST");

        assert_eq!(config.context_window_turns, 5);
        assert_eq!(config.user_history_min_occurrences, 2);
        assert_eq!(config.regional_gain_boost, 1.25);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = RecoveryConfig::from_json(r#"{"max_recovery_attempts": 5}"#).unwrap();
        assert_eq!(config.max_recovery_attempts, 5);
        assert_eq!(config.context_window_turns, 3);
        assert_eq!(config.strategies, StrategyFlags::all_enabled());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = RecoveryConfig::disabled().with_max_attempts(1);
        let restored = RecoveryConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(config, restored);
    }
}
