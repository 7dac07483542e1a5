//! Intent classification data model

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Supported intents plus the `Unknown` sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    CheckBalance,
    PayBill,
    TransferMoney,
    CheckBudget,
    CheckIncome,
    FinancialProjection,
    Unknown,
}

impl IntentLabel {
    /// Every supported intent, `Unknown` excluded, in table order.
    pub const SUPPORTED: [IntentLabel; 6] = [
        Self::CheckBalance,
        Self::PayBill,
        Self::TransferMoney,
        Self::CheckBudget,
        Self::CheckIncome,
        Self::FinancialProjection,
    ];

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Entity kinds the intent cannot be executed without
    pub fn required_entities(&self) -> &'static [EntityKind] {
        match self {
            Self::TransferMoney => &[EntityKind::Amount, EntityKind::Recipient],
            Self::PayBill => &[EntityKind::BillType],
            _ => &[],
        }
    }

    /// Portuguese description used in prompts
    pub fn description_pt(&self) -> &'static str {
        match self {
            Self::CheckBalance => "consultar o saldo",
            Self::PayBill => "pagar uma conta",
            Self::TransferMoney => "fazer uma transferência",
            Self::CheckBudget => "ver o orçamento",
            Self::CheckIncome => "consultar a renda",
            Self::FinancialProjection => "fazer uma projeção financeira",
            Self::Unknown => "algo que não entendi",
        }
    }
}

impl std::fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CheckBalance => write!(f, "check_balance"),
            Self::PayBill => write!(f, "pay_bill"),
            Self::TransferMoney => write!(f, "transfer_money"),
            Self::CheckBudget => write!(f, "check_budget"),
            Self::CheckIncome => write!(f, "check_income"),
            Self::FinancialProjection => write!(f, "financial_projection"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which classifier path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Pattern,
    Similarity,
    Ensemble,
}

impl std::fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern => write!(f, "pattern"),
            Self::Similarity => write!(f, "similarity"),
            Self::Ensemble => write!(f, "ensemble"),
        }
    }
}

/// An alternative reading of the utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub intent: IntentLabel,
    pub confidence: f64,
}

/// Maximum alternatives attached to a classification
pub const MAX_ALTERNATIVES: usize = 3;

/// Immutable result of one classification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: IntentLabel,
    /// Clamped to [0, 1]
    pub confidence: f64,
    pub method: ClassificationMethod,
    /// At most three, sorted descending, never `Unknown`
    pub alternatives: Vec<Alternative>,
}

impl ClassificationResult {
    pub fn new(
        intent: IntentLabel,
        confidence: f64,
        method: ClassificationMethod,
        alternatives: Vec<Alternative>,
    ) -> Self {
        Self {
            intent,
            confidence: clamp_unit(confidence),
            method,
            alternatives: sanitize_alternatives(intent, alternatives),
        }
    }

    /// `Unknown` at zero confidence, for empty or unreadable input
    pub fn unknown() -> Self {
        Self {
            intent: IntentLabel::Unknown,
            confidence: 0.0,
            method: ClassificationMethod::Pattern,
            alternatives: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.intent.is_unknown()
    }

    /// Same result with the intent forced to `Unknown`; alternatives survive
    /// so callers can still offer choices.
    pub fn into_unknown(self) -> Self {
        let mut alternatives = self.alternatives;
        if !self.intent.is_unknown() {
            alternatives.push(Alternative {
                intent: self.intent,
                confidence: self.confidence,
            });
        }
        Self {
            intent: IntentLabel::Unknown,
            confidence: self.confidence,
            method: self.method,
            alternatives: sanitize_alternatives(IntentLabel::Unknown, alternatives),
        }
    }
}

/// Drop `Unknown`, the primary intent and duplicates; sort descending; cap.
fn sanitize_alternatives(primary: IntentLabel, mut alternatives: Vec<Alternative>) -> Vec<Alternative> {
    alternatives.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.intent.cmp(&b.intent))
    });
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for alt in alternatives {
        if alt.intent.is_unknown() || alt.intent == primary || seen.contains(&alt.intent) {
            continue;
        }
        seen.push(alt.intent);
        out.push(Alternative {
            intent: alt.intent,
            confidence: clamp_unit(alt.confidence),
        });
        if out.len() == MAX_ALTERNATIVES {
            break;
        }
    }
    out
}

/// Kind of a typed value pulled out of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Amount,
    BillType,
    Recipient,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amount => write!(f, "amount"),
            Self::BillType => write!(f, "bill_type"),
            Self::Recipient => write!(f, "recipient"),
        }
    }
}

/// A typed value with its source span. Several entities of the same kind may
/// coexist; picking between them is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub kind: EntityKind,
    pub raw_value: String,
    pub normalized_value: String,
    pub confidence: f64,
    /// Byte offsets into the text the entity was extracted from
    pub span_start: usize,
    pub span_end: usize,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl ExtractedEntity {
    pub fn new(
        kind: EntityKind,
        raw_value: impl Into<String>,
        normalized_value: impl Into<String>,
        confidence: f64,
        span: (usize, usize),
    ) -> Self {
        Self {
            kind,
            raw_value: raw_value.into(),
            normalized_value: normalized_value.into(),
            confidence: clamp_unit(confidence),
            span_start: span.0,
            span_end: span.1,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Clamp a score into the unit interval; NaN becomes 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
