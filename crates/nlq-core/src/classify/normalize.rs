//! Query normalization
//!
//! Pre-pass applied before any pattern matching: collapse whitespace, strip
//! characters outside Hangul/Latin/digits/basic punctuation, and rewrite
//! polite-speech suffixes to their plain-speech equivalents so the scoring
//! patterns stay suffix-insensitive.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^가-힣a-zA-Z0-9\s.,?!%:'"-]"#).expect("disallowed-char regex"));

/// Polite suffix → plain suffix substitution table.
///
/// Ordered longest-first so a longer suffix is never shadowed by one of its
/// own substrings.
pub static POLITE_SUFFIXES: &[(&str, &str)] = &[
    ("보여주시겠어요", "보여줘"),
    ("알려주시겠어요", "알려줘"),
    ("찾아주세요", "찾아줘"),
    ("보여주세요", "보여줘"),
    ("알려주세요", "알려줘"),
    ("해주세요", "해줘"),
    ("해주시겠어요", "해줘"),
    ("주세요", "줘"),
    ("입니까", "이야"),
    ("합니까", "해"),
    ("하세요", "해"),
    ("습니까", "어"),
];

/// Normalize a raw query for classification.
pub fn normalize(query: &str) -> String {
    let stripped = DISALLOWED_RE.replace_all(query, " ");
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    let mut text = collapsed.trim().to_string();
    for (polite, plain) in POLITE_SUFFIXES {
        if text.contains(polite) {
            text = text.replace(polite, plain);
        }
    }
    text
}

/// True when the character is in the Hangul syllable block.
pub fn is_hangul(c: char) -> bool {
    ('가'..='힣').contains(&c)
}
