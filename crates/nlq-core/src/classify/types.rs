//! Classification result structures
//!
//! These structures represent the extracted intent from a natural-language
//! CRM query. They are constructed fresh per classification call, immutable
//! once returned and never persisted by the core.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The four query shapes the classifier can recognize.
///
/// Declaration order doubles as the tie-break order when two types score
/// equally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    /// Plain listing, e.g. "고객 목록을 보여줘"
    SimpleQuery,
    /// Conditioned lookup, e.g. "30대 고객을 찾아줘"
    Filtering,
    /// Counting/statistics, e.g. "이번 달 가입한 고객이 몇 명이야"
    Aggregation,
    /// Cross-table question, e.g. "고객별 메모를 같이 보여줘"
    Join,
}

impl QueryType {
    /// All types in scoring/tie-break order.
    pub const ALL: [QueryType; 4] = [
        QueryType::SimpleQuery,
        QueryType::Filtering,
        QueryType::Aggregation,
        QueryType::Join,
    ];

    /// Base weight this type contributes to the complexity score.
    pub fn complexity_weight(&self) -> f64 {
        match self {
            QueryType::SimpleQuery => 0.1,
            QueryType::Filtering => 0.3,
            QueryType::Aggregation => 0.6,
            QueryType::Join => 0.8,
        }
    }

    /// Name for display and reasoning traces.
    pub fn name(&self) -> &'static str {
        match self {
            QueryType::SimpleQuery => "SIMPLE_QUERY",
            QueryType::Filtering => "FILTERING",
            QueryType::Aggregation => "AGGREGATION",
            QueryType::Join => "JOIN",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Semantic categories an extracted substring can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    CustomerName,
    Date,
    ProductName,
    Amount,
    Location,
    Keyword,
}

impl EntityCategory {
    /// All categories in extraction order.
    pub const ALL: [EntityCategory; 6] = [
        EntityCategory::CustomerName,
        EntityCategory::Date,
        EntityCategory::ProductName,
        EntityCategory::Amount,
        EntityCategory::Location,
        EntityCategory::Keyword,
    ];

    /// Bind-parameter name used by the rule-based generator.
    pub fn param_name(&self) -> &'static str {
        match self {
            EntityCategory::CustomerName => "customer_name",
            EntityCategory::Date => "start_date",
            EntityCategory::ProductName => "product_name",
            EntityCategory::Amount => "amount",
            EntityCategory::Location => "location",
            EntityCategory::Keyword => "keyword",
        }
    }
}

/// Output of the intent classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Winning query type.
    pub query_type: QueryType,

    /// Confidence of the winning type, clamped to [0, 1].
    pub confidence: f64,

    /// Free-text trace of how the decision was made.
    pub reasoning: String,

    /// Extracted entities, sparse: categories with no match are absent.
    pub entities: BTreeMap<EntityCategory, BTreeSet<String>>,

    /// Action words found in the query.
    pub intent_keywords: BTreeSet<String>,

    /// Weighted complexity estimate in [0, 1].
    pub complexity_score: f64,
}

impl ClassificationResult {
    /// Total number of extracted entity values across all categories.
    pub fn entity_count(&self) -> usize {
        self.entities.values().map(|s| s.len()).sum()
    }

    /// First extracted value for a category, if any.
    pub fn first_entity(&self, category: EntityCategory) -> Option<&str> {
        self.entities
            .get(&category)
            .and_then(|s| s.iter().next())
            .map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_order_is_tie_break_order() {
        assert_eq!(QueryType::ALL[0], QueryType::SimpleQuery);
        assert_eq!(QueryType::ALL[3], QueryType::Join);
    }

    #[test]
    fn test_complexity_weights_are_monotonic() {
        let weights: Vec<f64> = QueryType::ALL.iter().map(|t| t.complexity_weight()).collect();
        for pair in weights.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_serde_tags() {
        let json = serde_json::to_string(&QueryType::SimpleQuery).unwrap();
        assert_eq!(json, "\"SIMPLE_QUERY\"");
        let json = serde_json::to_string(&EntityCategory::CustomerName).unwrap();
        assert_eq!(json, "\"customer_name\"");
    }

    #[test]
    fn test_first_entity() {
        let mut entities = BTreeMap::new();
        let mut set = BTreeSet::new();
        set.insert("김민수".to_string());
        entities.insert(EntityCategory::CustomerName, set);
        let result = ClassificationResult {
            query_type: QueryType::Filtering,
            confidence: 0.5,
            reasoning: String::new(),
            entities,
            intent_keywords: BTreeSet::new(),
            complexity_score: 0.3,
        };
        assert_eq!(result.first_entity(EntityCategory::CustomerName), Some("김민수"));
        assert_eq!(result.first_entity(EntityCategory::Date), None);
        assert_eq!(result.entity_count(), 1);
    }
}
