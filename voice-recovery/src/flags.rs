//! Strategy flags: independent strategy toggles
//!
//! Each canonical recovery strategy can be switched off on its own, either
//! through environment variables or per-run overrides. A strategy that is
//! flag-disabled is never selected by the engine, whatever its learned
//! success rate.
//!
//! # Environment Variables
//!
//! | Variable | Default | Strategy |
//! |---|---|---|
//! | `VOICE_RECOVERY_PATTERN_MATCHING_ENABLED` | `true` | Expanded pattern retry |
//! | `VOICE_RECOVERY_ENTITY_EXTRACTION_ENABLED` | `true` | Loose entity re-scan |
//! | `VOICE_RECOVERY_CONTEXTUAL_INFERENCE_ENABLED` | `true` | Conversation/snapshot inference |
//! | `VOICE_RECOVERY_USER_HISTORY_ENABLED` | `true` | Most frequent historical intent |
//! | `VOICE_RECOVERY_REGIONAL_VARIATION_ENABLED` | `true` | Regional slang rewrite |
//!
//! # Per-Run Overrides
//!
//! ```rust,ignore
//! use voice_recovery::flags::{StrategyFlags, StrategyFlagOverrides};
//!
//! let mut flags = StrategyFlags::from_env();
//! flags.apply_overrides(&StrategyFlagOverrides {
//!     user_history_enabled: Some(false),
//!     ..Default::default()
//! });
//! ```

use serde::{Deserialize, Serialize};

use crate::recovery::StrategyId;

/// Independent toggle for each canonical recovery strategy. All default to
/// enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyFlags {
    /// Env: `VOICE_RECOVERY_PATTERN_MATCHING_ENABLED`
    pub pattern_matching_enabled: bool,

    /// Env: `VOICE_RECOVERY_ENTITY_EXTRACTION_ENABLED`
    pub entity_extraction_enabled: bool,

    /// Env: `VOICE_RECOVERY_CONTEXTUAL_INFERENCE_ENABLED`
    pub contextual_inference_enabled: bool,

    /// Env: `VOICE_RECOVERY_USER_HISTORY_ENABLED`
    pub user_history_enabled: bool,

    /// Env: `VOICE_RECOVERY_REGIONAL_VARIATION_ENABLED`
    pub regional_variation_enabled: bool,
}

impl Default for StrategyFlags {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl StrategyFlags {
    /// Total number of strategy flags.
    const FLAG_COUNT: usize = 5;

    /// Read flags from environment variables.
    ///
    /// A missing variable keeps the strategy enabled. "0", "false", "no" and
    /// "off" (case-insensitive) disable it; anything else enables it.
    pub fn from_env() -> Self {
        Self {
            pattern_matching_enabled: parse_flag_env("VOICE_RECOVERY_PATTERN_MATCHING_ENABLED"),
            entity_extraction_enabled: parse_flag_env("VOICE_RECOVERY_ENTITY_EXTRACTION_ENABLED"),
            contextual_inference_enabled: parse_flag_env(
                "VOICE_RECOVERY_CONTEXTUAL_INFERENCE_ENABLED",
            ),
            user_history_enabled: parse_flag_env("VOICE_RECOVERY_USER_HISTORY_ENABLED"),
            regional_variation_enabled: parse_flag_env(
                "VOICE_RECOVERY_REGIONAL_VARIATION_ENABLED",
            ),
        }
    }

    pub fn all_enabled() -> Self {
        Self {
            pattern_matching_enabled: true,
            entity_extraction_enabled: true,
            contextual_inference_enabled: true,
            user_history_enabled: true,
            regional_variation_enabled: true,
        }
    }

    pub fn all_disabled() -> Self {
        Self {
            pattern_matching_enabled: false,
            entity_extraction_enabled: false,
            contextual_inference_enabled: false,
            user_history_enabled: false,
            regional_variation_enabled: false,
        }
    }

    /// Whether the given strategy may be selected.
    pub fn is_enabled(&self, id: StrategyId) -> bool {
        match id {
            StrategyId::PatternMatching => self.pattern_matching_enabled,
            StrategyId::EntityExtraction => self.entity_extraction_enabled,
            StrategyId::ContextualInference => self.contextual_inference_enabled,
            StrategyId::UserHistory => self.user_history_enabled,
            StrategyId::RegionalVariation => self.regional_variation_enabled,
        }
    }

    /// Apply per-run overrides. Only `Some` values are applied.
    pub fn apply_overrides(&mut self, overrides: &StrategyFlagOverrides) {
        if let Some(v) = overrides.pattern_matching_enabled {
            self.pattern_matching_enabled = v;
        }
        if let Some(v) = overrides.entity_extraction_enabled {
            self.entity_extraction_enabled = v;
        }
        if let Some(v) = overrides.contextual_inference_enabled {
            self.contextual_inference_enabled = v;
        }
        if let Some(v) = overrides.user_history_enabled {
            self.user_history_enabled = v;
        }
        if let Some(v) = overrides.regional_variation_enabled {
            self.regional_variation_enabled = v;
        }
    }

    /// Enabled strategies, in canonical order.
    pub fn enabled_strategies(&self) -> Vec<StrategyId> {
        StrategyId::ALL
            .iter()
            .copied()
            .filter(|id| self.is_enabled(*id))
            .collect()
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled_strategies().len()
    }

    /// Format as a human-readable summary line.
    pub fn summary(&self) -> String {
        let enabled = self.enabled_strategies();
        if enabled.is_empty() {
            "Recovery strategies: all disabled".to_string()
        } else {
            format!(
                "Recovery strategies: {}/{} enabled [{}]",
                enabled.len(),
                Self::FLAG_COUNT,
                enabled
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
    }
}

impl std::fmt::Display for StrategyFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pattern={} entity={} contextual={} history={} regional={}",
            flag_str(self.pattern_matching_enabled),
            flag_str(self.entity_extraction_enabled),
            flag_str(self.contextual_inference_enabled),
            flag_str(self.user_history_enabled),
            flag_str(self.regional_variation_enabled),
        )
    }
}

/// Per-run overrides for strategy flags.
///
/// `None` means "don't override", `Some(true/false)` explicitly sets the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFlagOverrides {
    pub pattern_matching_enabled: Option<bool>,
    pub entity_extraction_enabled: Option<bool>,
    pub contextual_inference_enabled: Option<bool>,
    pub user_history_enabled: Option<bool>,
    pub regional_variation_enabled: Option<bool>,
}

impl StrategyFlagOverrides {
    pub fn has_overrides(&self) -> bool {
        self.pattern_matching_enabled.is_some()
            || self.entity_extraction_enabled.is_some()
            || self.contextual_inference_enabled.is_some()
            || self.user_history_enabled.is_some()
            || self.regional_variation_enabled.is_some()
    }
}

fn parse_flag_env(var: &str) -> bool {
    std::env::var(var)
        .map(|v| parse_flag_value(&v))
        .unwrap_or(true)
}

fn parse_flag_value(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    !(v == "0" || v == "false" || v == "no" || v == "off")
}

fn flag_str(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_all_enabled() {
        let flags = StrategyFlags::default();
        assert_eq!(flags.enabled_count(), 5);
        assert!(StrategyId::ALL.iter().all(|id| flags.is_enabled(*id)));
    }

    #[test]
    fn test_parse_flag_value() {
        assert!(!parse_flag_value("0"));
        assert!(!parse_flag_value("false"));
        assert!(!parse_flag_value("OFF"));
        assert!(!parse_flag_value(" No "));

        assert!(parse_flag_value("1"));
        assert!(parse_flag_value("true"));
        assert!(parse_flag_value("yes"));
    }

    #[test]
    fn test_apply_overrides_partial() {
        let mut flags = StrategyFlags::default();
        flags.apply_overrides(&StrategyFlagOverrides {
            user_history_enabled: Some(false),
            ..Default::default()
        });

        assert!(!flags.is_enabled(StrategyId::UserHistory));
        assert!(flags.is_enabled(StrategyId::PatternMatching));
        assert_eq!(flags.enabled_count(), 4);
    }

    #[test]
    fn test_overrides_can_reenable() {
        let mut flags = StrategyFlags::all_disabled();
        flags.apply_overrides(&StrategyFlagOverrides {
            regional_variation_enabled: Some(true),
            ..Default::default()
        });
        assert_eq!(
            flags.enabled_strategies(),
            vec![StrategyId::RegionalVariation]
        );
    }

    #[test]
    fn test_display() {
        let mut flags = StrategyFlags::all_enabled();
        flags.contextual_inference_enabled = false;
        assert_eq!(
            flags.to_string(),
            "pattern=ON entity=ON contextual=OFF history=ON regional=ON"
        );
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            StrategyFlags::all_disabled().summary(),
            "Recovery strategies: all disabled"
        );
        let summary = StrategyFlags::default().summary();
        assert!(summary.contains("5/5 enabled"));
        assert!(summary.contains("regional_variation"));
    }

    #[test]
    fn test_overrides_has_overrides() {
        assert!(!StrategyFlagOverrides::default().has_overrides());
        let partial = StrategyFlagOverrides {
            entity_extraction_enabled: Some(true),
            ..Default::default()
        };
        assert!(partial.has_overrides());
    }
}
