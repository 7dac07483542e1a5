//! Text normalization for transcribed utterances
//!
//! Lowercases, folds Portuguese diacritics, strips punctuation and splits
//! into tokens. Separators inside numbers (`150,00`, `1.200`) and the
//! currency marker `$` survive so entity extraction can still read amounts.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Words that carry no intent signal on their own.
const STOP_WORDS: &[&str] = &[
    "o", "a", "os", "as", "um", "uma", "uns", "umas", "de", "do", "da", "dos", "das", "e", "em",
    "no", "na", "nos", "nas", "para", "pra", "pro", "por", "com", "que", "meu", "minha", "meus",
    "minhas", "eu", "me", "se", "ao", "aos", "qual", "favor", "ai", "la", "ta",
];

/// An utterance after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedText {
    /// Input as received
    pub original: String,
    /// Lowercased, otherwise untouched
    pub lowered: String,
    /// Lowercased, accent-free, punctuation replaced by spaces
    pub folded: String,
    /// Every token of `folded`
    pub tokens: Vec<String>,
    /// `tokens` without stop words
    pub content_tokens: Vec<String>,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Whether `phrase` (already folded) occurs as a whole-word sequence.
    pub fn contains_phrase(&self, phrase: &str) -> bool {
        let haystack = format!(" {} ", self.tokens.join(" "));
        haystack.contains(&format!(" {} ", phrase.trim()))
    }
}

/// Stateless normalizer
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        let lowered = text.trim().to_lowercase();
        let folded = fold(&lowered);
        let tokens: Vec<String> = folded.split_whitespace().map(String::from).collect();
        let content_tokens = tokens
            .iter()
            .filter(|t| !is_stop_word(t))
            .cloned()
            .collect();

        NormalizedText {
            original: text.to_string(),
            lowered,
            folded,
            tokens,
            content_tokens,
        }
    }
}

/// Fold a single word or phrase the same way utterances are folded.
pub fn fold(text: &str) -> String {
    let stripped: Vec<char> = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut out = String::with_capacity(stripped.len());
    for (i, c) in stripped.iter().enumerate() {
        let keep = if c.is_alphanumeric() || *c == '$' {
            true
        } else if *c == ',' || *c == '.' {
            let before = i > 0 && stripped[i - 1].is_ascii_digit();
            let after = stripped.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            before && after
        } else {
            false
        };
        out.push(if keep { *c } else { ' ' });
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}
