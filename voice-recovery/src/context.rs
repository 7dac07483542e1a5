//! Per-episode recovery context
//!
//! A context belongs to the caller for the length of one recovery episode.
//! Nothing here is shared between episodes, so nothing here is locked.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnosis::ErrorDiagnosis;
use crate::dialect::DialectTag;
use crate::error::{RecoveryError, RecoveryResult};
use crate::intent::types::{ClassificationResult, IntentLabel};

/// One earlier utterance in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub text: String,
    pub result: ClassificationResult,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(text: impl Into<String>, result: ClassificationResult) -> Self {
        Self {
            text: text.into(),
            result,
            timestamp: Utc::now(),
        }
    }

    pub fn intent(&self) -> IntentLabel {
        self.result.intent
    }
}

/// Caller-supplied preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Preferred form of address, e.g. "você" or "senhor"
    pub form_of_address: Option<String>,
    /// Region the user declared, independent of any tagger output
    pub declared_region: Option<String>,
    /// Whether corrections may be applied without explicit confirmation
    pub allow_auto_correction: bool,
    pub extra: HashMap<String, String>,
}

impl UserPreferences {
    pub fn is_empty(&self) -> bool {
        self.form_of_address.is_none()
            && self.declared_region.is_none()
            && !self.allow_auto_correction
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBill {
    /// Canonical bill type (`luz`, `agua`, ...)
    pub bill_type: String,
    pub amount: f64,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTransfer {
    pub recipient: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Read-only financial state the caller shares with recovery
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialSnapshot {
    pub balance: Option<f64>,
    pub pending_bills: Vec<PendingBill>,
    pub recent_transfers: Vec<RecentTransfer>,
}

impl FinancialSnapshot {
    pub fn has_pending_bills(&self) -> bool {
        !self.pending_bills.is_empty()
    }
}

/// Everything a recovery episode may consult
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryContext {
    pub original_text: String,
    pub prior_result: Option<ClassificationResult>,
    pub user_id: String,
    pub session_id: String,
    /// Oldest first
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    #[serde(default)]
    pub user_preferences: UserPreferences,
    #[serde(default)]
    pub financial_snapshot: FinancialSnapshot,
    pub regional_tag: Option<DialectTag>,
    #[serde(default)]
    pub attempts_so_far: u32,
    #[serde(default)]
    pub prior_diagnoses: Vec<ErrorDiagnosis>,
}

impl RecoveryContext {
    pub fn new(
        original_text: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            original_text: original_text.into(),
            prior_result: None,
            user_id: user_id.into(),
            session_id: session_id.into(),
            conversation_history: Vec::new(),
            user_preferences: UserPreferences::default(),
            financial_snapshot: FinancialSnapshot::default(),
            regional_tag: None,
            attempts_so_far: 0,
            prior_diagnoses: Vec::new(),
        }
    }

    pub fn with_prior_result(mut self, result: ClassificationResult) -> Self {
        self.prior_result = Some(result);
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_preferences(mut self, preferences: UserPreferences) -> Self {
        self.user_preferences = preferences;
        self
    }

    pub fn with_snapshot(mut self, snapshot: FinancialSnapshot) -> Self {
        self.financial_snapshot = snapshot;
        self
    }

    pub fn with_regional_tag(mut self, tag: DialectTag) -> Self {
        self.regional_tag = Some(tag);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts_so_far = attempts;
        self
    }

    /// Start a new utterance within the same session; attempts and prior
    /// diagnoses carry over until [`Self::mark_resolved`].
    pub fn next_utterance(&mut self, text: impl Into<String>) {
        self.original_text = text.into();
        self.prior_result = None;
    }

    /// The current utterance was understood or recovered; the next failure
    /// starts a fresh run of attempts.
    pub fn mark_resolved(&mut self) {
        self.attempts_so_far = 0;
        self.prior_diagnoses.clear();
    }

    /// The last `n` turns, newest first
    pub fn recent_turns(&self, n: usize) -> impl Iterator<Item = &ConversationTurn> {
        self.conversation_history.iter().rev().take(n)
    }

    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.conversation_history.push(turn);
    }

    /// Reject contexts recovery cannot work with.
    pub fn validate(&self) -> RecoveryResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(RecoveryError::MalformedContext("empty user_id".into()));
        }
        if self.session_id.trim().is_empty() {
            return Err(RecoveryError::MalformedContext("empty session_id".into()));
        }
        Ok(())
    }
}
