//! Core engine for Korean natural-language CRM queries
//!
//! This crate holds the pure, synchronous parts of the NL→SQL pipeline:
//! intent classification, rule-based SQL generation, security validation
//! and result formatting. It performs no I/O - the LLM boundary lives in
//! `nlq-agentic` and orchestration in `nlq-pipeline`.
//!
//! ## Architecture
//!
//! ```text
//! Query → IntentClassifier → RuleBasedSqlGenerator → SqlValidator → ResultFormatter
//! ```
//!
//! Each component returns an explicit result type instead of raising:
//! the classifier degrades to a minimum-confidence default, the validator
//! always produces a complete report, and the formatter hands back the
//! original rows on internal failure.

pub mod classify;
pub mod error;
pub mod format;
pub mod generation;
pub mod rulegen;
pub mod schema;
pub mod validator;

// Re-exports for convenience
pub use classify::{ClassificationResult, EntityCategory, IntentClassifier, QueryType};
pub use classify::morph::{MorphAnalyzer, Morpheme};
pub use format::{FormatConfig, FormattedResult, ResultFormatter};
pub use generation::{GenerationMethod, SqlGenerationResult};
pub use rulegen::RuleBasedSqlGenerator;
pub use validator::{SqlValidationReport, SqlValidator, ThreatLevel, ValidationIssue, ValidationVerdict};
