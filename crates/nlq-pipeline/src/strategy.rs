//! Generation strategy selection

use serde::{Deserialize, Serialize};

/// Which generator(s) produce the SQL candidate for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStrategy {
    /// LLM only; generation fails if the model does.
    LlmOnly,
    /// Rule-based generator only; no model call is made.
    RuleOnly,
    /// LLM with retry, falling back to the rule generator on exhaustion.
    #[default]
    LlmFirst,
    /// Run both concurrently and keep the higher-confidence candidate.
    Hybrid,
}

impl GenerationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationStrategy::LlmOnly => "LLM_ONLY",
            GenerationStrategy::RuleOnly => "RULE_ONLY",
            GenerationStrategy::LlmFirst => "LLM_FIRST",
            GenerationStrategy::Hybrid => "HYBRID",
        }
    }
}

impl std::fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
