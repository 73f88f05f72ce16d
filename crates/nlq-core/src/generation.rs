//! SQL generation result structures
//!
//! Shared output shape for the rule-based and LLM generators. The `sql`
//! field is never empty: generators that fail internally hand back a
//! syntactically valid placeholder so downstream stages always have a
//! statement to validate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Innocuous statement substituted when generation fails or validation
/// rejects the real candidate.
pub const PLACEHOLDER_SQL: &str = "SELECT 1 AS placeholder";

/// How a SQL candidate was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    RuleBased,
    Llm,
    Hybrid,
    ErrorFallback,
}

impl GenerationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationMethod::RuleBased => "rule_based",
            GenerationMethod::Llm => "llm",
            GenerationMethod::Hybrid => "hybrid",
            GenerationMethod::ErrorFallback => "error_fallback",
        }
    }
}

impl std::fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Output of either generator. Not guaranteed safe until validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlGenerationResult {
    /// Generated statement text. Invariant: non-empty.
    pub sql: String,

    /// Bind-parameter name → value.
    pub parameters: BTreeMap<String, String>,

    /// Human-readable explanation of the generated statement.
    pub explanation: String,

    /// Generator confidence in [0, 1].
    pub confidence: f64,

    /// Complexity estimate in [0, 1], carried from classification.
    pub complexity_score: f64,

    pub generation_method: GenerationMethod,
}

impl SqlGenerationResult {
    /// Placeholder result used when generation fails entirely.
    pub fn placeholder(reason: &str) -> Self {
        Self {
            sql: PLACEHOLDER_SQL.to_string(),
            parameters: BTreeMap::new(),
            explanation: format!("생성 실패로 기본 쿼리를 반환합니다: {}", reason),
            confidence: 0.0,
            complexity_score: 0.0,
            generation_method: GenerationMethod::ErrorFallback,
        }
    }

    /// Replace the statement with the placeholder, keeping provenance.
    ///
    /// Used by the orchestrator when validation disallows execution.
    pub fn neutralize(&mut self, reason: &str) {
        self.sql = PLACEHOLDER_SQL.to_string();
        self.parameters.clear();
        self.explanation = format!("검증 실패로 쿼리를 대체했습니다: {}", reason);
        self.confidence = self.confidence.min(0.1);
    }
}
