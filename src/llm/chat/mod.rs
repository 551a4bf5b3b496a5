pub mod fallback;
pub mod gemini;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use self::fallback::StaticChatClient;
use self::gemini::GeminiChatClient;
use super::{ LlmConfig, LlmType };
use crate::error::AgentError;
use crate::models::chat::ChatMessage;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// One completion per call over the full conversation. The provider is never
/// streamed from; the streaming endpoint chunks the complete text itself.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, AgentError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, AgentError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config);
            Arc::new(specific_client)
        }
        LlmType::Static => {
            let specific_client = StaticChatClient::new();
            Arc::new(specific_client)
        }
    };
    Ok(client)
}
