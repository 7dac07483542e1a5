//! Intent understanding: classification and entity extraction
//!
//! - [`types`]: result and entity data model
//! - [`patterns`]: static regex/keyword/example tables
//! - [`pattern_matcher`]: pattern path scoring
//! - [`similarity`]: term-frequency cosine path
//! - [`ensemble`]: fusion of the two paths
//! - [`classifier`]: the public classifier
//! - [`entities`]: strict and loose entity extraction

pub mod classifier;
pub mod ensemble;
pub mod entities;
pub mod pattern_matcher;
pub mod patterns;
pub mod similarity;
pub mod types;

pub use classifier::IntentClassifier;
pub use ensemble::{fuse, FusedVote, FusionRule, PathVote};
pub use entities::EntityExtractor;
pub use pattern_matcher::PatternCandidate;
pub use patterns::{PatternTable, EXPANDED_TABLE, STANDARD_TABLE};
pub use types::{
    Alternative, ClassificationMethod, ClassificationResult, EntityKind, ExtractedEntity,
    IntentLabel,
};
