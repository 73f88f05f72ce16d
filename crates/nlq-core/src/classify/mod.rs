//! Intent classification
//!
//! Maps a raw Korean natural-language query to a query type, extracted
//! entities, intent keywords and a complexity score. Classification is
//! pattern-driven; an optional morphological analyzer strengthens the
//! signals but is never required.
//!
//! The classifier never fails past its boundary: empty or degenerate input
//! produces a minimum-confidence `SIMPLE_QUERY` result with the cause noted
//! in `reasoning`.

pub mod morph;
pub mod normalize;
pub mod patterns;
pub mod types;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use morph::{MorphAnalyzer, Morpheme};
use normalize::{is_hangul, normalize};
pub use types::{ClassificationResult, EntityCategory, QueryType};

/// Intent classifier service.
///
/// Construct once at startup (patterns are compiled on first use and shared
/// process-wide) and pass by reference to request handlers.
pub struct IntentClassifier {
    analyzer: Option<Arc<dyn MorphAnalyzer>>,
}

impl IntentClassifier {
    /// Classifier without morphological analysis.
    pub fn new() -> Self {
        Self { analyzer: None }
    }

    /// Classifier backed by a morphological analyzer.
    pub fn with_analyzer(analyzer: Arc<dyn MorphAnalyzer>) -> Self {
        Self {
            analyzer: Some(analyzer),
        }
    }

    /// Classify a raw query. Never fails; see module docs.
    pub fn classify(&self, query: &str) -> ClassificationResult {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return Self::fallback_result("empty query after normalization");
        }

        let morphemes = self.tag(&normalized);

        let (query_type, confidence, score_trace) =
            Self::score_types(&normalized, morphemes.as_deref());
        let entities = Self::extract_entities(&normalized);
        let intent_keywords = Self::extract_intent_keywords(&normalized, morphemes.as_deref());
        let complexity_score = Self::complexity(
            &normalized,
            morphemes.as_deref(),
            entities.values().map(|s| s.len()).sum(),
            query_type,
        );

        let reasoning = format!(
            "type={} confidence={:.2} ({}) morph={}",
            query_type,
            confidence,
            score_trace,
            if morphemes.is_some() { "on" } else { "off" },
        );
        tracing::debug!(%query_type, confidence, complexity_score, "classified query");

        ClassificationResult {
            query_type,
            confidence,
            reasoning,
            entities,
            intent_keywords,
            complexity_score,
        }
    }

    /// Minimum-confidence default used when classification cannot proceed.
    fn fallback_result(reason: &str) -> ClassificationResult {
        ClassificationResult {
            query_type: QueryType::SimpleQuery,
            confidence: patterns::DEFAULT_CONFIDENCE,
            reasoning: format!("fallback: {}", reason),
            entities: BTreeMap::new(),
            intent_keywords: BTreeSet::new(),
            complexity_score: QueryType::SimpleQuery.complexity_weight(),
        }
    }

    /// Best-effort morphological tagging. Analyzer failure degrades to
    /// "no tags", it never aborts classification.
    fn tag(&self, text: &str) -> Option<Vec<Morpheme>> {
        let analyzer = self.analyzer.as_ref()?;
        match analyzer.analyze(text) {
            Ok(morphemes) => Some(morphemes),
            Err(e) => {
                tracing::warn!(error = %e, "morphological analysis failed, continuing without tags");
                None
            }
        }
    }

    /// Score all four types and pick the winner.
    ///
    /// Score = pattern hits / pattern count, plus a fixed bonus when a
    /// type-specific morphological cue is present. Ties break in
    /// [`QueryType::ALL`] order; an all-zero board defaults to SIMPLE_QUERY.
    fn score_types(text: &str, morphemes: Option<&[Morpheme]>) -> (QueryType, f64, String) {
        let mut best: Option<(QueryType, f64)> = None;
        let mut trace = String::new();

        for query_type in QueryType::ALL {
            let pats = patterns::type_patterns(query_type);
            let hits = pats.iter().filter(|re| re.is_match(text)).count();
            let mut score = hits as f64 / pats.len() as f64;

            if let Some(tags) = morphemes {
                let cue_hit = patterns::morph_cues(query_type).iter().any(|(surface, prefix)| {
                    tags.iter()
                        .any(|m| m.surface == *surface && m.pos.starts_with(prefix))
                });
                if cue_hit {
                    score += patterns::MORPH_BONUS;
                }
            }

            if !trace.is_empty() {
                trace.push_str(", ");
            }
            trace.push_str(&format!("{}={}/{}", query_type, hits, pats.len()));

            // Strictly-greater keeps the earlier type on ties.
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((query_type, score));
            }
        }

        match best {
            Some((t, s)) if s > 0.0 => (t, s.min(1.0), trace),
            _ => (QueryType::SimpleQuery, patterns::DEFAULT_CONFIDENCE, trace),
        }
    }

    /// Run each category's pattern list and collect deduplicated matches.
    ///
    /// Matches of a single character are dropped unless that character is
    /// Hangul; generic role nouns are filtered out of customer names.
    fn extract_entities(text: &str) -> BTreeMap<EntityCategory, BTreeSet<String>> {
        let mut entities = BTreeMap::new();

        for category in EntityCategory::ALL {
            let mut values = BTreeSet::new();
            for re in patterns::entity_patterns(category) {
                for caps in re.captures_iter(text) {
                    let m = caps.get(1).or_else(|| caps.get(0));
                    let value = match m {
                        Some(m) => m.as_str().trim(),
                        None => continue,
                    };
                    if !Self::is_valid_entity(category, value) {
                        continue;
                    }
                    values.insert(value.to_string());
                }
            }
            if !values.is_empty() {
                entities.insert(category, values);
            }
        }

        entities
    }

    fn is_valid_entity(category: EntityCategory, value: &str) -> bool {
        let mut chars = value.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => return false,
        };
        if chars.next().is_none() && !is_hangul(first) {
            return false;
        }
        if category == EntityCategory::CustomerName
            && patterns::NAME_STOPWORDS.contains(&value)
        {
            return false;
        }
        true
    }

    /// Fixed action vocabulary, found verbatim or inside a tagged
    /// verb/noun morpheme.
    fn extract_intent_keywords(
        text: &str,
        morphemes: Option<&[Morpheme]>,
    ) -> BTreeSet<String> {
        let mut keywords = BTreeSet::new();
        for word in patterns::INTENT_VOCABULARY {
            let verbatim = text.contains(word);
            let tagged = morphemes
                .map(|tags| {
                    tags.iter()
                        .any(|m| m.is_content_word() && m.surface.contains(word))
                })
                .unwrap_or(false);
            if verbatim || tagged {
                keywords.insert((*word).to_string());
            }
        }
        keywords
    }

    /// Weighted complexity in [0, 1]: token volume + entity count + type
    /// base weight + special conjunctions, each term capped.
    fn complexity(
        text: &str,
        morphemes: Option<&[Morpheme]>,
        entity_count: usize,
        query_type: QueryType,
    ) -> f64 {
        let token_count = morphemes
            .map(|m| m.len())
            .unwrap_or_else(|| text.split_whitespace().count());
        let conjunctions = patterns::SPECIAL_CONJUNCTIONS
            .iter()
            .filter(|c| text.contains(*c))
            .count();

        let score = (token_count as f64 * patterns::MORPHEME_WEIGHT).min(patterns::MORPHEME_CAP)
            + (entity_count as f64 * patterns::ENTITY_WEIGHT).min(patterns::ENTITY_CAP)
            + query_type.complexity_weight()
            + (conjunctions as f64 * patterns::CONJUNCTION_WEIGHT).min(patterns::CONJUNCTION_CAP);
        score.min(1.0)
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAnalyzer(Vec<Morpheme>);

    impl MorphAnalyzer for FixedAnalyzer {
        fn analyze(&self, _text: &str) -> Result<Vec<Morpheme>, String> {
            Ok(self.0.clone())
        }
    }

    struct FailingAnalyzer;

    impl MorphAnalyzer for FailingAnalyzer {
        fn analyze(&self, _text: &str) -> Result<Vec<Morpheme>, String> {
            Err("analyzer unavailable".to_string())
        }
    }

    #[test]
    fn test_simple_query_scenario() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("고객 목록을 보여주세요");
        assert_eq!(result.query_type, QueryType::SimpleQuery);
        assert!(result.confidence > 0.0);
    }

    #[test]
    fn test_filtering_scenario() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("30대 고객들을 찾아주세요");
        assert_eq!(result.query_type, QueryType::Filtering);
        assert!(result.complexity_score > 0.1);
    }

    #[test]
    fn test_aggregation_query() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("이번 달 가입한 고객이 몇 명이야");
        assert_eq!(result.query_type, QueryType::Aggregation);
    }

    #[test]
    fn test_join_query() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("고객별로 메모와 함께 보여줘");
        assert_eq!(result.query_type, QueryType::Join);
    }

    #[test]
    fn test_empty_query_falls_back() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("   ");
        assert_eq!(result.query_type, QueryType::SimpleQuery);
        assert_eq!(result.confidence, patterns::DEFAULT_CONFIDENCE);
        assert!(result.reasoning.contains("fallback"));
    }

    #[test]
    fn test_unmatched_query_defaults_to_simple() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("안녕하세요");
        assert_eq!(result.query_type, QueryType::SimpleQuery);
        assert_eq!(result.confidence, patterns::DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = IntentClassifier::new();
        let a = classifier.classify("서울 사는 30대 고객을 찾아줘");
        let b = classifier.classify("서울 사는 30대 고객을 찾아줘");
        assert_eq!(a.query_type, b.query_type);
        assert_eq!(a.entities, b.entities);
        assert_eq!(a.complexity_score, b.complexity_score);
    }

    #[test]
    fn test_entity_extraction() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("서울 사는 김민수님의 지난 주 메모를 찾아줘");
        assert!(result.entities[&EntityCategory::CustomerName].contains("김민수"));
        assert!(result.entities[&EntityCategory::Location].contains("서울"));
        assert!(result.entities.contains_key(&EntityCategory::Date));
    }

    #[test]
    fn test_name_stopwords_filtered() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("고객님 목록을 보여줘");
        assert!(!result.entities.contains_key(&EntityCategory::CustomerName));
    }

    #[test]
    fn test_intent_keywords_verbatim() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("이번 달 가입 고객을 조회해줘");
        assert!(result.intent_keywords.contains("가입"));
        assert!(result.intent_keywords.contains("조회"));
    }

    #[test]
    fn test_morph_bonus_raises_confidence_only() {
        let plain = IntentClassifier::new();
        let tagged = IntentClassifier::with_analyzer(Arc::new(FixedAnalyzer(vec![
            Morpheme::new("고객", "NNG"),
            Morpheme::new("별", "XSN"),
            Morpheme::new("메모", "NNG"),
            Morpheme::new("와", "JKB"),
        ])));
        let query = "고객별로 메모와 함께 보여줘";
        let a = plain.classify(query);
        let b = tagged.classify(query);
        // Same reachable type with and without the analyzer.
        assert_eq!(a.query_type, QueryType::Join);
        assert_eq!(b.query_type, QueryType::Join);
        assert!(b.confidence >= a.confidence);
    }

    #[test]
    fn test_failing_analyzer_degrades_gracefully() {
        let classifier = IntentClassifier::with_analyzer(Arc::new(FailingAnalyzer));
        let result = classifier.classify("고객 목록을 보여줘");
        assert_eq!(result.query_type, QueryType::SimpleQuery);
        assert!(result.reasoning.contains("morph=off"));
    }

    #[test]
    fn test_complexity_ordering_by_type() {
        let classifier = IntentClassifier::new();
        let simple = classifier.classify("고객 목록 보여줘");
        let join = classifier.classify("고객별로 메모와 함께 보여줘");
        assert!(join.complexity_score > simple.complexity_score);
    }
}
