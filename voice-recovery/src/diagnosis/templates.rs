//! Static per-kind advice attached to every diagnosis
//!
//! These strings feed logging and the clarification generator; control flow
//! never branches on them.

use super::ErrorKind;

pub fn suggested_fixes(kind: ErrorKind) -> Vec<String> {
    let fixes: &[&str] = match kind {
        ErrorKind::PatternMiss => &[
            "retry with the expanded pattern table",
            "ask the user to rephrase with a standard command",
        ],
        ErrorKind::EntityExtraction => &[
            "re-scan with looser entity rules",
            "ask for the missing amount or recipient",
        ],
        ErrorKind::IntentConfusion => &[
            "infer the intent from recent conversation turns",
            "offer the top alternatives as a choice",
        ],
        ErrorKind::LowConfidence => &[
            "cross-check against the user's most frequent intents",
            "confirm the best guess with the user",
        ],
        ErrorKind::RegionalMisunderstanding => &[
            "rewrite regional vocabulary to standard terms",
            "add the regional phrasing to the expanded table",
        ],
        ErrorKind::ProcessingError => &[
            "retry the request once",
            "fall back to a generic rephrase prompt",
        ],
    };
    fixes.iter().map(|s| s.to_string()).collect()
}

pub fn learning_opportunities(kind: ErrorKind) -> Vec<String> {
    let items: &[&str] = match kind {
        ErrorKind::PatternMiss => &["record the utterance as an uncovered phrasing"],
        ErrorKind::EntityExtraction => &["collect the entity formats the strict pass missed"],
        ErrorKind::IntentConfusion => &["track which intent pairs are confused"],
        ErrorKind::LowConfidence => &["review keyword weights for the guessed intent"],
        ErrorKind::RegionalMisunderstanding => &[
            "extend the regional substitution table",
            "measure accuracy per region",
        ],
        ErrorKind::ProcessingError => &["inspect the fault code distribution"],
    };
    items.iter().map(|s| s.to_string()).collect()
}
