use async_trait::async_trait;
use log::info;

use super::{ ChatClient, CompletionResponse };
use crate::config::prompt::PromptConfig;
use crate::error::AgentError;
use crate::models::chat::ChatMessage;

/// Deterministic offline provider. Answers with the canned diagnostic
/// blocks, keyed on conversation length the same way the canned-fallback
/// policy is. Useful for development and for running without a credential.
pub struct StaticChatClient {
    prompts: PromptConfig,
}

impl StaticChatClient {
    pub fn new() -> Self {
        info!("Static chat client configured (no provider calls will be made)");
        Self { prompts: PromptConfig::default() }
    }
}

impl Default for StaticChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for StaticChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, AgentError> {
        if messages.is_empty() {
            return Err(AgentError::Validation(
                "messages array is required and must not be empty".to_string()
            ));
        }
        let response = self.prompts.fallback_for(messages.len()).to_string();
        Ok(CompletionResponse { response })
    }

    fn get_model(&self) -> String {
        "static".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}
