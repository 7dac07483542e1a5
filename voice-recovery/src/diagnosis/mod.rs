//! Error diagnosis: mapping failure signals onto the error taxonomy
//!
//! A [`FailureSignal`] is either a raised fault carrying a [`FaultCode`] or a
//! classification that came back weak. [`ErrorClassifier`] turns it into an
//! [`ErrorDiagnosis`] that recovery and clarification work from.

pub mod classifier;
pub mod templates;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectTag;
use crate::intent::types::ClassificationResult;

pub use classifier::ErrorClassifier;

/// Error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PatternMiss,
    EntityExtraction,
    IntentConfusion,
    LowConfidence,
    RegionalMisunderstanding,
    ProcessingError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        Self::PatternMiss,
        Self::EntityExtraction,
        Self::IntentConfusion,
        Self::LowConfidence,
        Self::RegionalMisunderstanding,
        Self::ProcessingError,
    ];
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PatternMiss => write!(f, "pattern_miss"),
            Self::EntityExtraction => write!(f, "entity_extraction"),
            Self::IntentConfusion => write!(f, "intent_confusion"),
            Self::LowConfidence => write!(f, "low_confidence"),
            Self::RegionalMisunderstanding => write!(f, "regional_misunderstanding"),
            Self::ProcessingError => write!(f, "processing_error"),
        }
    }
}

/// Ordered severity; `High` and `Critical` always require confirmation of
/// any automated correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn requires_confirmation(&self) -> bool {
        *self >= Self::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Machine-readable fault code carried by a raised fault
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FaultCode {
    ClassificationFailed,
    EntityExtractionFailed,
    Timeout,
    InvalidInput,
    /// Any code outside the fixed table
    Other(String),
}

impl FaultCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ClassificationFailed => "CLASSIFICATION_FAILED",
            Self::EntityExtractionFailed => "ENTITY_EXTRACTION_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Other(code) => code,
        }
    }

    /// Parse a code; matching is case-insensitive.
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "CLASSIFICATION_FAILED" => Self::ClassificationFailed,
            "ENTITY_EXTRACTION_FAILED" => Self::EntityExtractionFailed,
            "TIMEOUT" => Self::Timeout,
            "INVALID_INPUT" => Self::InvalidInput,
            _ => Self::Other(code.trim().to_string()),
        }
    }
}

impl std::fmt::Display for FaultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for FaultCode {
    fn from(code: String) -> Self {
        Self::parse(&code)
    }
}

impl From<FaultCode> for String {
    fn from(code: FaultCode) -> Self {
        code.as_str().to_string()
    }
}

/// What went wrong, as reported to the error classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureSignal {
    /// A raised fault
    Fault { code: FaultCode, message: String },
    /// A classification below the operating threshold or `Unknown`
    LowConfidence { result: ClassificationResult },
}

impl FailureSignal {
    pub fn fault(code: FaultCode, message: impl Into<String>) -> Self {
        Self::Fault {
            code,
            message: message.into(),
        }
    }

    pub fn low_confidence(result: ClassificationResult) -> Self {
        Self::LowConfidence { result }
    }
}

/// Structured account of a failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDiagnosis {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub root_cause: String,
    pub suggested_fixes: Vec<String>,
    pub learning_opportunities: Vec<String>,
    pub contextual_factors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regional_factors: Vec<String>,
    /// Fault code of the originating signal, if it was a fault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_code: Option<FaultCode>,
    /// Tag reported by the dialect tagger for the original text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<DialectTag>,
}

impl ErrorDiagnosis {
    /// A diagnosis with the per-kind templates attached and no factors
    pub fn new(kind: ErrorKind, severity: Severity, root_cause: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            root_cause: root_cause.into(),
            suggested_fixes: templates::suggested_fixes(kind),
            learning_opportunities: templates::learning_opportunities(kind),
            contextual_factors: Vec::new(),
            regional_factors: Vec::new(),
            fault_code: None,
            dialect: None,
        }
    }

    /// Fallback used whenever diagnosing itself fails
    pub fn processing_error(root_cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProcessingError, Severity::Medium, root_cause)
    }

    /// Replace kind and severity, refreshing the templates.
    pub(crate) fn reclassify(&mut self, kind: ErrorKind, severity: Severity, root_cause: String) {
        self.kind = kind;
        self.severity = severity;
        self.root_cause = root_cause;
        self.suggested_fixes = templates::suggested_fixes(kind);
        self.learning_opportunities = templates::learning_opportunities(kind);
    }
}
