//! LLM-backed SQL generator
//!
//! Builds a schema-grounded prompt from the classified question, calls the
//! configured [`LlmClient`], and parses the model's JSON reply into a
//! [`SqlGenerationResult`]. Model output is treated as untrusted: malformed
//! JSON degrades to raw-text SQL at reduced confidence, and an empty reply
//! degrades to the neutral placeholder statement. Validation happens
//! downstream; this module only shapes the result.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use tokio::sync::mpsc;

use nlq_core::{ClassificationResult, GenerationMethod, SqlGenerationResult};

use crate::few_shot;
use crate::llm_client::LlmClient;
use crate::schema_cache::SchemaCache;

const SYSTEM_PROMPT: &str = include_str!("prompts/sql_generation_system.md");

/// Confidence assigned when the reply is usable SQL but not valid JSON.
const RAW_TEXT_CONFIDENCE: f64 = 0.8;

/// SQL generator backed by a chat-completion model.
pub struct LlmSqlGenerator {
    client: Arc<dyn LlmClient>,
    schema_cache: Arc<SchemaCache>,
}

/// Shape of the JSON object the model is instructed to emit.
#[derive(Debug, Deserialize)]
struct ModelOutput {
    sql: String,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    confidence: f64,
}

impl LlmSqlGenerator {
    pub fn new(client: Arc<dyn LlmClient>, schema_cache: Arc<SchemaCache>) -> Self {
        Self {
            client,
            schema_cache,
        }
    }

    /// Generate SQL for a classified question.
    pub async fn generate(
        &self,
        question: &str,
        classification: &ClassificationResult,
    ) -> Result<SqlGenerationResult> {
        let user_prompt = self.build_user_prompt(question, classification).await;
        tracing::debug!(
            model = self.client.model_name(),
            query_type = %classification.query_type,
            "requesting SQL generation"
        );
        let reply = self.client.chat_json(SYSTEM_PROMPT, &user_prompt).await?;
        Ok(self.parse_reply(&reply, classification))
    }

    /// Generate SQL while forwarding raw model chunks over `tx`.
    pub async fn generate_streaming(
        &self,
        question: &str,
        classification: &ClassificationResult,
        tx: mpsc::Sender<String>,
    ) -> Result<SqlGenerationResult> {
        let user_prompt = self.build_user_prompt(question, classification).await;
        let reply = self
            .client
            .chat_streaming(SYSTEM_PROMPT, &user_prompt, tx)
            .await?;
        Ok(self.parse_reply(&reply, classification))
    }

    async fn build_user_prompt(
        &self,
        question: &str,
        classification: &ClassificationResult,
    ) -> String {
        let schema = self.schema_cache.describe().await;
        let mut prompt = String::new();
        prompt.push_str("## 스키마\n\n");
        prompt.push_str(&schema);
        prompt.push('\n');
        prompt.push_str(&few_shot::render());
        prompt.push_str("## 질문 분석\n\n");
        prompt.push_str(&format!("- 질의 유형: {}\n", classification.query_type));
        prompt.push_str(&format!(
            "- 분류 근거: {}\n",
            classification.reasoning
        ));
        if !classification.entities.is_empty() {
            prompt.push_str("- 추출된 엔티티:\n");
            for (category, values) in &classification.entities {
                let joined: Vec<&str> = values.iter().map(|v| v.as_str()).collect();
                prompt.push_str(&format!(
                    "  - {}: {}\n",
                    category.param_name(),
                    joined.join(", ")
                ));
            }
        }
        prompt.push_str(&format!("\n## 질문\n\n{}\n", question));
        prompt
    }

    /// Parse the model reply, degrading gracefully on malformed output.
    fn parse_reply(
        &self,
        reply: &str,
        classification: &ClassificationResult,
    ) -> SqlGenerationResult {
        let cleaned = strip_code_blocks(reply);
        if cleaned.is_empty() {
            tracing::warn!("model returned an empty reply");
            return SqlGenerationResult::placeholder("모델 응답이 비어 있습니다");
        }

        if let Some(json_text) = extract_json(cleaned) {
            if let Ok(parsed) = serde_json::from_str::<ModelOutput>(json_text) {
                let sql = parsed.sql.trim().to_string();
                if sql.is_empty() {
                    return SqlGenerationResult::placeholder("모델이 SQL을 생성하지 못했습니다");
                }
                return SqlGenerationResult {
                    sql,
                    parameters: parsed.parameters,
                    explanation: if parsed.explanation.is_empty() {
                        "LLM이 생성한 쿼리입니다".to_string()
                    } else {
                        parsed.explanation
                    },
                    confidence: parsed.confidence.clamp(0.0, 1.0),
                    complexity_score: classification.complexity_score,
                    generation_method: GenerationMethod::Llm,
                };
            }
        }

        // Not valid JSON. Some models reply with bare SQL; accept it at
        // reduced confidence rather than discarding a usable statement.
        tracing::warn!("model reply was not valid JSON, treating as raw SQL");
        SqlGenerationResult {
            sql: cleaned.to_string(),
            parameters: BTreeMap::new(),
            explanation: "LLM이 생성한 쿼리입니다".to_string(),
            confidence: RAW_TEXT_CONFIDENCE,
            complexity_score: classification.complexity_score,
            generation_method: GenerationMethod::Llm,
        }
    }
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_blocks(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Find the outermost JSON object in the text, tracking string literals so
/// braces inside SQL string values do not unbalance the scan.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nlq_core::IntentClassifier;

    struct CannedClient {
        reply: String,
    }

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.reply.clone())
        }

        async fn chat_json(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "canned"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    fn generator_with(reply: &str) -> LlmSqlGenerator {
        LlmSqlGenerator::new(
            Arc::new(CannedClient {
                reply: reply.to_string(),
            }),
            Arc::new(SchemaCache::fallback_only()),
        )
    }

    fn classify(question: &str) -> ClassificationResult {
        IntentClassifier::new().classify(question)
    }

    #[tokio::test]
    async fn test_well_formed_json_reply() {
        let generator = generator_with(
            r#"{"sql": "SELECT * FROM customers WHERE name = :customer_name LIMIT 100",
                "parameters": {"customer_name": "김철수"},
                "explanation": "이름으로 고객을 조회합니다",
                "confidence": 0.92}"#,
        );
        let classification = classify("김철수님 정보 찾아줘");
        let result = generator
            .generate("김철수님 정보 찾아줘", &classification)
            .await
            .unwrap();
        assert!(result.sql.contains(":customer_name"));
        assert_eq!(
            result.parameters.get("customer_name").map(String::as_str),
            Some("김철수")
        );
        assert!((result.confidence - 0.92).abs() < 1e-9);
        assert_eq!(result.generation_method, GenerationMethod::Llm);
    }

    #[tokio::test]
    async fn test_fenced_json_reply() {
        let generator = generator_with(
            "```json\n{\"sql\": \"SELECT COUNT(*) AS cnt FROM customers\", \"confidence\": 0.9}\n```",
        );
        let classification = classify("고객이 몇 명이야?");
        let result = generator
            .generate("고객이 몇 명이야?", &classification)
            .await
            .unwrap();
        assert_eq!(result.sql, "SELECT COUNT(*) AS cnt FROM customers");
    }

    #[tokio::test]
    async fn test_raw_sql_reply_degrades_with_reduced_confidence() {
        let generator = generator_with("SELECT * FROM customers LIMIT 100");
        let classification = classify("고객 목록 보여줘");
        let result = generator
            .generate("고객 목록 보여줘", &classification)
            .await
            .unwrap();
        assert_eq!(result.sql, "SELECT * FROM customers LIMIT 100");
        assert!((result.confidence - RAW_TEXT_CONFIDENCE).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_reply_yields_placeholder() {
        let generator = generator_with("   ");
        let classification = classify("고객 목록 보여줘");
        let result = generator
            .generate("고객 목록 보여줘", &classification)
            .await
            .unwrap();
        assert_eq!(result.sql, nlq_core::generation::PLACEHOLDER_SQL);
        assert_eq!(result.generation_method, GenerationMethod::ErrorFallback);
    }

    #[tokio::test]
    async fn test_json_with_empty_sql_yields_placeholder() {
        let generator = generator_with(r#"{"sql": "", "confidence": 0.5}"#);
        let classification = classify("고객 목록 보여줘");
        let result = generator
            .generate("고객 목록 보여줘", &classification)
            .await
            .unwrap();
        assert_eq!(result.sql, nlq_core::generation::PLACEHOLDER_SQL);
    }

    #[tokio::test]
    async fn test_confidence_clamped_to_unit_interval() {
        let generator =
            generator_with(r#"{"sql": "SELECT * FROM customers", "confidence": 3.5}"#);
        let classification = classify("고객 목록 보여줘");
        let result = generator
            .generate("고객 목록 보여줘", &classification)
            .await
            .unwrap();
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_streaming_forwards_chunks() {
        let generator = generator_with(r#"{"sql": "SELECT * FROM customers", "confidence": 0.9}"#);
        let classification = classify("고객 목록 보여줘");
        let (tx, mut rx) = mpsc::channel(4);
        let result = generator
            .generate_streaming("고객 목록 보여줘", &classification, tx)
            .await
            .unwrap();
        assert_eq!(result.sql, "SELECT * FROM customers");
        assert!(rx.recv().await.is_some());
    }

    #[test]
    fn test_extract_json_ignores_braces_in_strings() {
        let text = r#"prefix {"sql": "SELECT '{' FROM x", "confidence": 0.1} suffix"#;
        let json = extract_json(text).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
        assert!(serde_json::from_str::<serde_json::Value>(json).is_ok());
    }

    #[test]
    fn test_strip_code_blocks_without_fence_is_identity() {
        assert_eq!(strip_code_blocks("  SELECT 1  "), "SELECT 1");
    }
}
