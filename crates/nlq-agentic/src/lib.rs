//! LLM-powered SQL generation for Korean CRM queries
//!
//! This crate owns the LLM boundary of the NL→SQL pipeline: prompt
//! construction grounded in the live (or fallback) schema, few-shot
//! examples, client abstraction over chat-completion APIs, and parsing of
//! model output into [`nlq_core::SqlGenerationResult`].
//!
//! Nothing here touches a database - schema introspection and SQL
//! execution stay behind collaborator traits implemented elsewhere.

pub mod few_shot;
pub mod generator;
pub mod llm_client;
pub mod openai_client;
pub mod schema_cache;

// Re-exports for convenience
pub use generator::LlmSqlGenerator;
pub use llm_client::LlmClient;
pub use openai_client::OpenAiClient;
pub use schema_cache::{ColumnDescription, SchemaCache, SchemaIntrospector, TableDescription};
