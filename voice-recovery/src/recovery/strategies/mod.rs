//! The five canonical recovery strategies

mod contextual;
mod entity;
mod history;
mod pattern;
mod regional;

pub use contextual::ContextualInferenceRecovery;
pub use entity::EntityExtractionRecovery;
pub use history::UserHistoryRecovery;
pub use pattern::PatternMatchingRecovery;
pub use regional::RegionalVariationRecovery;
