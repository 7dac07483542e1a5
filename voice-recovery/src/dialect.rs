//! Brazilian dialect tagging
//!
//! The tagger is a collaborator: the error classifier and the regional
//! recovery strategy only read its output. [`LexiconDialectTagger`] is the
//! default, a marker-word lookup good enough for tests and small
//! deployments; callers with a real tagger implement [`DialectTagger`].

use serde::{Deserialize, Serialize};

use crate::error::RecoveryResult;
use crate::normalizer::TextNormalizer;

/// Brazilian macro-region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Norte,
    Nordeste,
    CentroOeste,
    Sudeste,
    Sul,
    Unknown,
}

impl Region {
    pub const KNOWN: [Region; 5] = [
        Self::Norte,
        Self::Nordeste,
        Self::CentroOeste,
        Self::Sudeste,
        Self::Sul,
    ];

    /// Parse a tagger label. Anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match crate::normalizer::fold(label).replace([' ', '-', '_'], "").as_str() {
            "norte" => Self::Norte,
            "nordeste" => Self::Nordeste,
            "centrooeste" => Self::CentroOeste,
            "sudeste" => Self::Sudeste,
            "sul" => Self::Sul,
            _ => Self::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Norte => write!(f, "Norte"),
            Self::Nordeste => write!(f, "Nordeste"),
            Self::CentroOeste => write!(f, "Centro-Oeste"),
            Self::Sudeste => write!(f, "Sudeste"),
            Self::Sul => write!(f, "Sul"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Output of a dialect tagger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectTag {
    pub region: Region,
    /// Free-form speaking style label, e.g. "colloquial"
    pub style: String,
}

impl DialectTag {
    pub fn new(region: Region, style: impl Into<String>) -> Self {
        Self {
            region,
            style: style.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(Region::Unknown, "standard")
    }

    /// Build from the raw `{ region, style }` strings a tagger reports.
    pub fn from_labels(region: &str, style: &str) -> Self {
        Self::new(Region::from_label(region), style)
    }
}

impl Default for DialectTag {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Labels text with a regional dialect
pub trait DialectTagger: Send + Sync {
    fn tag(&self, text: &str) -> RecoveryResult<DialectTag>;
}

/// Folded marker words per region
const REGION_MARKERS: &[(Region, &[&str])] = &[
    (Region::Sul, &["bah", "tche", "guri", "guria", "pila", "pilas", "tri", "capaz"]),
    (
        Region::Nordeste,
        &["oxe", "oxente", "visse", "arretado", "arretada", "apurei", "mainha", "painho"],
    ),
    (Region::Sudeste, &["uai", "trem", "mano", "meu", "conto", "contos", "pau"]),
    (Region::Norte, &["egua", "maninho", "mana", "degua"]),
    (Region::CentroOeste, &["trem bao", "oce", "cerrado"]),
];

/// Slang that marks a colloquial style without pinning a region
const COLLOQUIAL_MARKERS: &[&str] = &["grana", "bufunfa", "dindin", "tipo", "ta", "to", "pra", "pro"];

/// Marker-word tagger. Regions need at least one marker that is not also a
/// common Portuguese word; `meu` alone never tags Sudeste.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconDialectTagger {
    normalizer: TextNormalizer,
}

impl LexiconDialectTagger {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Markers too common to tag a region on their own
const WEAK_MARKERS: &[&str] = &["meu", "mana", "pau", "trem", "conto", "contos", "capaz", "tri"];

impl DialectTagger for LexiconDialectTagger {
    fn tag(&self, text: &str) -> RecoveryResult<DialectTag> {
        let normalized = self.normalizer.normalize(text);
        if normalized.is_empty() {
            return Ok(DialectTag::unknown());
        }

        let mut best: Option<(Region, usize)> = None;
        for (region, markers) in REGION_MARKERS {
            let hits: Vec<&&str> = markers
                .iter()
                .filter(|m| normalized.contains_phrase(m))
                .collect();
            if !hits.iter().any(|m| !WEAK_MARKERS.contains(*m)) {
                continue;
            }
            if best.map_or(true, |(_, n)| hits.len() > n) {
                best = Some((*region, hits.len()));
            }
        }

        Ok(match best {
            Some((region, _)) => DialectTag::new(region, "regional"),
            None if COLLOQUIAL_MARKERS
                .iter()
                .any(|m| normalized.contains_phrase(m)) =>
            {
                DialectTag::new(Region::Unknown, "colloquial")
            }
            None => DialectTag::unknown(),
        })
    }
}

/// Tagger that never recognises a region
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDialectTagger;

impl DialectTagger for NoopDialectTagger {
    fn tag(&self, _text: &str) -> RecoveryResult<DialectTag> {
        Ok(DialectTag::unknown())
    }
}
