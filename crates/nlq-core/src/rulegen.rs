//! Rule-based SQL generation
//!
//! Deterministic template synthesis from a classification result. No
//! external calls, no uncertainty: this path exists to guarantee that a
//! safe, always-available candidate exists under every strategy, not to be
//! a sophisticated planner. Conditions are always parameterized - entity
//! values never reach the statement text.

use std::collections::BTreeMap;

use crate::classify::{ClassificationResult, EntityCategory, QueryType};
use crate::error::GenerationError;
use crate::generation::{GenerationMethod, SqlGenerationResult};
use crate::schema::DEFAULT_TABLE;

/// Fixed confidence for rule-based results: the templates always apply,
/// they just carry no uncertainty signal.
const RULE_CONFIDENCE: f64 = 0.7;
const RULE_COMPLEXITY: f64 = 0.5;
const ROW_LIMIT: usize = 100;

/// Rule-based SQL generator.
pub struct RuleBasedSqlGenerator;

impl RuleBasedSqlGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a SQL candidate for the classified query.
    pub fn generate(
        &self,
        classification: &ClassificationResult,
    ) -> Result<SqlGenerationResult, GenerationError> {
        let (sql, parameters, explanation) = match classification.query_type {
            QueryType::SimpleQuery => self.simple_query(),
            QueryType::Filtering => self.filtering_query(classification),
            QueryType::Aggregation => self.aggregation_query(classification),
            QueryType::Join => self.join_query(),
        };

        Ok(SqlGenerationResult {
            sql,
            parameters,
            explanation,
            confidence: RULE_CONFIDENCE,
            complexity_score: RULE_COMPLEXITY,
            generation_method: GenerationMethod::RuleBased,
        })
    }

    fn simple_query(&self) -> (String, BTreeMap<String, String>, String) {
        (
            format!("SELECT * FROM {} LIMIT {}", DEFAULT_TABLE, ROW_LIMIT),
            BTreeMap::new(),
            "전체 고객 목록 조회 쿼리입니다".to_string(),
        )
    }

    /// One parameterized condition per populated entity category, joined
    /// conjunctively. With no usable entities this degrades to the simple
    /// listing.
    fn filtering_query(
        &self,
        classification: &ClassificationResult,
    ) -> (String, BTreeMap<String, String>, String) {
        let (conditions, parameters) = self.build_conditions(classification);
        if conditions.is_empty() {
            return self.simple_query();
        }
        (
            format!(
                "SELECT * FROM {} WHERE {} LIMIT {}",
                DEFAULT_TABLE,
                conditions.join(" AND "),
                ROW_LIMIT
            ),
            parameters,
            format!("{}개 조건으로 고객을 필터링하는 쿼리입니다", conditions.len()),
        )
    }

    fn aggregation_query(
        &self,
        classification: &ClassificationResult,
    ) -> (String, BTreeMap<String, String>, String) {
        let mut conditions = Vec::new();
        let mut parameters = BTreeMap::new();
        if let Some(date) = classification.first_entity(EntityCategory::Date) {
            conditions.push("created_at >= :start_date".to_string());
            parameters.insert("start_date".to_string(), date.to_string());
        }
        let where_clause = if conditions.is_empty() {
            "1 = 1".to_string()
        } else {
            conditions.join(" AND ")
        };
        (
            format!(
                "SELECT COUNT(*) AS cnt FROM {} WHERE {}",
                DEFAULT_TABLE, where_clause
            ),
            parameters,
            "고객 수를 집계하는 쿼리입니다".to_string(),
        )
    }

    /// Fixed two-table template: customers with their memos.
    fn join_query(&self) -> (String, BTreeMap<String, String>, String) {
        (
            format!(
                "SELECT customers.name, memos.content, memos.created_at \
                 FROM customers LEFT JOIN memos ON customers.id = memos.customer_id \
                 LIMIT {}",
                ROW_LIMIT
            ),
            BTreeMap::new(),
            "고객과 메모를 함께 조회하는 쿼리입니다".to_string(),
        )
    }

    /// Map each populated entity category to its fixed column condition.
    fn build_conditions(
        &self,
        classification: &ClassificationResult,
    ) -> (Vec<String>, BTreeMap<String, String>) {
        let mut conditions = Vec::new();
        let mut parameters = BTreeMap::new();

        for category in EntityCategory::ALL {
            let value = match classification.first_entity(category) {
                Some(v) => v,
                None => continue,
            };
            let param = category.param_name();
            let (condition, param_value) = match category {
                EntityCategory::CustomerName => {
                    (format!("name = :{}", param), value.to_string())
                }
                EntityCategory::Date => {
                    (format!("created_at >= :{}", param), value.to_string())
                }
                EntityCategory::ProductName => {
                    (format!("product = :{}", param), value.to_string())
                }
                EntityCategory::Amount => {
                    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
                    if digits.is_empty() {
                        continue;
                    }
                    (format!("monthly_fee >= :{}", param), digits)
                }
                EntityCategory::Location => {
                    (format!("address LIKE :{}", param), format!("%{}%", value))
                }
                EntityCategory::Keyword => {
                    (format!("name LIKE :{}", param), format!("%{}%", value))
                }
            };
            conditions.push(condition);
            parameters.insert(param.to_string(), param_value);
        }

        (conditions, parameters)
    }
}

impl Default for RuleBasedSqlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;

    fn classification(query_type: QueryType) -> ClassificationResult {
        ClassificationResult {
            query_type,
            confidence: 0.5,
            reasoning: String::new(),
            entities: BTreeMap::new(),
            intent_keywords: BTreeSet::new(),
            complexity_score: 0.3,
        }
    }

    fn with_entity(
        mut c: ClassificationResult,
        category: EntityCategory,
        value: &str,
    ) -> ClassificationResult {
        c.entities
            .entry(category)
            .or_insert_with(BTreeSet::new)
            .insert(value.to_string());
        c
    }

    #[test]
    fn test_simple_query_template() {
        let generator = RuleBasedSqlGenerator::new();
        let result = generator.generate(&classification(QueryType::SimpleQuery)).unwrap();
        assert_eq!(result.sql, "SELECT * FROM customers LIMIT 100");
        assert!(result.parameters.is_empty());
        assert_eq!(result.generation_method, GenerationMethod::RuleBased);
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn test_filtering_builds_parameterized_conditions() {
        let generator = RuleBasedSqlGenerator::new();
        let c = with_entity(
            with_entity(
                classification(QueryType::Filtering),
                EntityCategory::CustomerName,
                "김민수",
            ),
            EntityCategory::Location,
            "서울",
        );
        let result = generator.generate(&c).unwrap();
        assert!(result.sql.contains("name = :customer_name"));
        assert!(result.sql.contains("address LIKE :location"));
        assert!(result.sql.contains(" AND "));
        assert!(result.sql.ends_with("LIMIT 100"));
        assert_eq!(result.parameters["customer_name"], "김민수");
        assert_eq!(result.parameters["location"], "%서울%");
        // Entity values never appear in the statement text.
        assert!(!result.sql.contains("김민수"));
    }

    #[test]
    fn test_filtering_without_entities_degrades_to_simple() {
        let generator = RuleBasedSqlGenerator::new();
        let result = generator.generate(&classification(QueryType::Filtering)).unwrap();
        assert_eq!(result.sql, "SELECT * FROM customers LIMIT 100");
    }

    #[test]
    fn test_aggregation_with_date_entity() {
        let generator = RuleBasedSqlGenerator::new();
        let c = with_entity(
            classification(QueryType::Aggregation),
            EntityCategory::Date,
            "이번 달",
        );
        let result = generator.generate(&c).unwrap();
        assert!(result.sql.contains("COUNT"));
        assert!(result.sql.contains("created_at >= :start_date"));
        assert_eq!(result.parameters["start_date"], "이번 달");
        assert_eq!(result.generation_method, GenerationMethod::RuleBased);
    }

    #[test]
    fn test_aggregation_without_entities_counts_all() {
        let generator = RuleBasedSqlGenerator::new();
        let result = generator.generate(&classification(QueryType::Aggregation)).unwrap();
        assert!(result.sql.contains("WHERE 1 = 1"));
    }

    #[test]
    fn test_join_template() {
        let generator = RuleBasedSqlGenerator::new();
        let result = generator.generate(&classification(QueryType::Join)).unwrap();
        assert!(result.sql.contains("LEFT JOIN memos"));
        assert!(result.sql.contains("customers.id = memos.customer_id"));
    }

    #[test]
    fn test_amount_is_reduced_to_digits() {
        let generator = RuleBasedSqlGenerator::new();
        let c = with_entity(
            classification(QueryType::Filtering),
            EntityCategory::Amount,
            "50,000원",
        );
        let result = generator.generate(&c).unwrap();
        assert_eq!(result.parameters["amount"], "50000");
    }

    #[test]
    fn test_always_returns_non_empty_sql() {
        let generator = RuleBasedSqlGenerator::new();
        for query_type in QueryType::ALL {
            let result = generator.generate(&classification(query_type)).unwrap();
            assert!(!result.sql.is_empty());
        }
    }
}
