//! LLM client abstraction
//!
//! Chat-completion boundary used by the SQL generator. Implementations can
//! wrap any provider; tests use canned-response mocks.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for chat-completion LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Plain chat completion.
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Chat completion with JSON output requested.
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Chat completion with incremental chunks forwarded over `tx`.
    ///
    /// The default implementation performs a plain completion and emits the
    /// whole text as a single chunk; providers with true token streaming
    /// should override. The full response is also returned.
    async fn chat_streaming(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tx: mpsc::Sender<String>,
    ) -> Result<String> {
        let text = self.chat(system_prompt, user_prompt).await?;
        let _ = tx.send(text.clone()).await;
        Ok(text)
    }

    fn model_name(&self) -> &str;

    fn provider_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn chat(&self, _system: &str, user: &str) -> Result<String> {
            Ok(user.to_string())
        }

        async fn chat_json(&self, system: &str, user: &str) -> Result<String> {
            self.chat(system, user).await
        }

        fn model_name(&self) -> &str {
            "echo"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn test_default_streaming_emits_single_chunk() {
        let client = EchoClient;
        let (tx, mut rx) = mpsc::channel(4);
        let full = client.chat_streaming("sys", "hello", tx).await.unwrap();
        assert_eq!(full, "hello");
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
        assert!(rx.recv().await.is_none());
    }
}
