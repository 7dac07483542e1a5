//! Voice command understanding and recovery for Portuguese financial
//! assistants
//!
//! This library provides:
//! - Intent classification over a pattern path and a similarity path, fused
//!   by ensemble voting
//! - Entity extraction for amounts, recipients and bill types
//! - Error diagnosis of failed classifications, dialect aware
//! - Adaptive recovery through ranked strategies whose success rates are
//!   learned online
//! - Clarification questions when recovery gives up
//!
//! # Modules
//!
//! - [`intent`]: classifier, pattern tables, similarity index, extractor
//! - [`diagnosis`]: error kinds, severities and the error classifier
//! - [`recovery`]: strategy trait, the five strategies and the engine
//! - [`learning`]: learning records, statistics and durable sinks
//! - [`pipeline`]: classify, diagnose, recover, clarify in one call

pub mod clarification;
pub mod config;
pub mod context;
pub mod diagnosis;
pub mod dialect;
pub mod error;
pub mod flags;
pub mod intent;
pub mod learning;
pub mod normalizer;
pub mod pipeline;
pub mod recovery;

// Re-export configuration and errors
pub use config::RecoveryConfig;
pub use error::{RecoveryError, RecoveryResult, SinkError};
pub use flags::{StrategyFlagOverrides, StrategyFlags};

// Re-export classification types
pub use intent::{
    ClassificationMethod, ClassificationResult, EntityExtractor, EntityKind, ExtractedEntity,
    IntentClassifier, IntentLabel,
};
pub use normalizer::{NormalizedText, TextNormalizer};

// Re-export diagnosis and dialect types
pub use diagnosis::{ErrorClassifier, ErrorDiagnosis, ErrorKind, FailureSignal, FaultCode, Severity};
pub use dialect::{DialectTag, DialectTagger, LexiconDialectTagger, NoopDialectTagger, Region};

// Re-export recovery types
pub use context::{
    ConversationTurn, FinancialSnapshot, PendingBill, RecentTransfer, RecoveryContext,
    UserPreferences,
};
pub use recovery::{RecoveryEngine, RecoveryOutcome, RecoveryStrategy, StrategyId};

// Re-export learning types
pub use learning::{
    DurableSink, Feedback, LearningRecord, LearningStore, MemorySink, NullSink,
    RecoveryStatistics, SharedLearningStore, StrategyStats,
};

pub use clarification::{ClarificationGenerator, ClarificationRequest};
pub use pipeline::{PipelineResponse, VoiceCommandPipeline};
