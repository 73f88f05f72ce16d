//! Morphological analyzer boundary
//!
//! The classifier can optionally consume part-of-speech tags from a Korean
//! morphological analyzer. The analyzer is a pluggable collaborator behind
//! a trait; its absence (or failure) only weakens confidence signals and
//! never changes which query types are reachable.

/// One (surface form, POS tag) pair from morphological analysis.
///
/// POS tags follow the common Sejong-style conventions: `N*` nouns,
/// `V*` verbs, `J*` particles, `X*` affixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    pub surface: String,
    pub pos: String,
}

impl Morpheme {
    pub fn new(surface: impl Into<String>, pos: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            pos: pos.into(),
        }
    }

    /// True for verb/noun content morphemes.
    pub fn is_content_word(&self) -> bool {
        self.pos.starts_with('V') || self.pos.starts_with('N')
    }
}

/// Trait for Korean morphological analyzers.
///
/// Implementations can wrap any external tagger; tests use a fixed-output
/// mock. `analyze` is best-effort: an `Err` is treated the same as having
/// no analyzer at all.
pub trait MorphAnalyzer: Send + Sync {
    /// Tag the text, returning morphemes in surface order.
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>, String>;
}
