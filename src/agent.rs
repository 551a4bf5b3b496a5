use log::{ info, warn };
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::error::AgentError;
use crate::llm::chat::{ new_client as new_chat_client, ChatClient };
use crate::llm::{ parse_llm_type, LlmConfig };
use crate::models::chat::ChatMessage;

/// What to do when the provider call fails: surface the typed error to the
/// caller, or substitute the canned diagnostic blocks. Validation and
/// configuration errors always surface regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    Surface,
    Canned,
}

pub fn parse_fallback_policy(s: &str) -> Result<FallbackPolicy, AgentError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "surface" => Ok(FallbackPolicy::Surface),
        "canned" => Ok(FallbackPolicy::Canned),
        other => Err(AgentError::Configuration(
            format!("Unknown fallback policy '{}'. Supported policies: surface, canned", other)
        )),
    }
}

pub struct ConsultAgent {
    chat_client: Arc<dyn ChatClient>,
    prompts: RwLock<Arc<PromptConfig>>,
    fallback_policy: FallbackPolicy,
}

impl ConsultAgent {
    pub fn new(args: &Args) -> Result<Self, AgentError> {
        let llm_type = parse_llm_type(&args.chat_llm_type)?;
        let api_key = if args.chat_api_key.is_empty() {
            None
        } else {
            Some(args.chat_api_key.clone())
        };
        let chat_config = LlmConfig {
            llm_type,
            base_url: args.chat_base_url.clone(),
            api_key,
            completion_model: args.chat_model.clone(),
            temperature: args.chat_temperature,
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={:?}",
            args.chat_llm_type,
            chat_client.get_model(),
            chat_config.base_url.as_deref().unwrap_or("adapter default")
        );

        let prompts = match &args.prompts_path {
            Some(path) => prompt::load_prompts(path)?,
            None => Arc::new(PromptConfig::default()),
        };
        let fallback_policy = parse_fallback_policy(&args.fallback_policy)?;

        Ok(Self::with_client(chat_client, prompts, fallback_policy))
    }

    pub fn with_client(
        chat_client: Arc<dyn ChatClient>,
        prompts: Arc<PromptConfig>,
        fallback_policy: FallbackPolicy
    ) -> Self {
        Self {
            chat_client,
            prompts: RwLock::new(prompts),
            fallback_policy,
        }
    }

    pub async fn prompts(&self) -> Arc<PromptConfig> {
        self.prompts.read().await.clone()
    }

    pub fn model(&self) -> String {
        self.chat_client.get_model()
    }

    /// One reply for the conversation so far. The system instruction is
    /// concatenated onto the first user turn before the adapter is invoked
    /// exactly once; there are no retries.
    pub async fn respond(&self, messages: &[ChatMessage]) -> Result<String, AgentError> {
        if messages.is_empty() {
            return Err(AgentError::Validation(
                "messages array is required and must not be empty".to_string()
            ));
        }

        let prompts = self.prompts().await;
        let composed = prompt::with_system_instruction(&prompts, messages);

        match self.chat_client.complete(&composed).await {
            Ok(completion) => Ok(completion.response),
            Err(err @ (AgentError::Validation(_) | AgentError::Configuration(_))) => Err(err),
            Err(err) => match self.fallback_policy {
                FallbackPolicy::Surface => Err(err),
                FallbackPolicy::Canned => {
                    warn!("Provider call failed, substituting canned response: {}", err);
                    Ok(prompts.fallback_for(messages.len()).to_string())
                }
            },
        }
    }

    /// Re-read the prompts file if it changed on disk. No-op when the
    /// deployment runs on built-in prompts.
    pub async fn reload_prompts_if_changed(&self, args: &Args) -> Result<bool, AgentError> {
        let Some(path) = &args.prompts_path else {
            return Ok(false);
        };
        let current = self.prompts().await;
        match prompt::reload_prompts_if_changed(path, &current)? {
            Some(new_config) => {
                *self.prompts.write().await = new_config;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::CompletionResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    /// Scripted provider: counts invocations and returns a fixed outcome.
    struct ScriptedClient {
        calls: AtomicUsize,
        outcome: Result<String, (u16, String)>,
    }

    impl ScriptedClient {
        fn ok(text: &str) -> Self {
            Self { calls: AtomicUsize::new(0), outcome: Ok(text.to_string()) }
        }

        fn failing(status: u16, message: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: Err((status, message.to_string())),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn complete(
            &self,
            _messages: &[ChatMessage]
        ) -> Result<CompletionResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(text) => Ok(CompletionResponse { response: text.clone() }),
                Err((status, message)) => Err(AgentError::Provider {
                    message: message.clone(),
                    status: *status,
                    details: None,
                }),
            }
        }

        fn get_model(&self) -> String {
            "scripted".to_string()
        }

        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    fn agent_with(client: Arc<ScriptedClient>, policy: FallbackPolicy) -> ConsultAgent {
        ConsultAgent::with_client(client, Arc::new(PromptConfig::default()), policy)
    }

    #[tokio::test]
    async fn empty_conversation_never_reaches_the_provider() {
        let client = Arc::new(ScriptedClient::ok("unused"));
        let agent = agent_with(client.clone(), FallbackPolicy::Surface);
        let err = agent.respond(&[]).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn successful_reply_passes_through() {
        let client = Arc::new(ScriptedClient::ok("Sounds like a tension headache."));
        let agent = agent_with(client.clone(), FallbackPolicy::Surface);
        let reply = agent.respond(&[ChatMessage::user("I have a headache")]).await.unwrap();
        assert_eq!(reply, "Sounds like a tension headache.");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn surface_policy_propagates_provider_errors() {
        let client = Arc::new(ScriptedClient::failing(503, "overloaded"));
        let agent = agent_with(client, FallbackPolicy::Surface);
        let err = agent.respond(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert_eq!(err.kind(), "provider");
        assert_eq!(err.status(), 503);
    }

    #[tokio::test]
    async fn canned_policy_substitutes_blocks_by_length() {
        let client = Arc::new(ScriptedClient::failing(500, "down"));
        let agent = agent_with(client, FallbackPolicy::Canned);
        let prompts = PromptConfig::default();

        let first = agent.respond(&[ChatMessage::user("I have a headache")]).await.unwrap();
        assert_eq!(first, prompts.fallback_initial);

        let longer = vec![
            ChatMessage::user("I have a headache"),
            ChatMessage::assistant("How long?"),
            ChatMessage::user("Three days")
        ];
        let follow_up = agent.respond(&longer).await.unwrap();
        assert_eq!(follow_up, prompts.fallback_follow_up);
    }

    #[tokio::test]
    async fn canned_policy_never_masks_configuration_errors() {
        struct Unconfigured;

        #[async_trait]
        impl ChatClient for Unconfigured {
            async fn complete(
                &self,
                _messages: &[ChatMessage]
            ) -> Result<CompletionResponse, AgentError> {
                Err(AgentError::Configuration("no key".to_string()))
            }

            fn get_model(&self) -> String {
                "unconfigured".to_string()
            }

            fn get_base_url(&self) -> Option<String> {
                None
            }
        }

        let agent = ConsultAgent::with_client(
            Arc::new(Unconfigured),
            Arc::new(PromptConfig::default()),
            FallbackPolicy::Canned
        );
        let err = agent.respond(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn fallback_policy_parsing() {
        assert_eq!(parse_fallback_policy("surface").unwrap(), FallbackPolicy::Surface);
        assert_eq!(parse_fallback_policy("Canned").unwrap(), FallbackPolicy::Canned);
        assert!(parse_fallback_policy("retry").is_err());
    }
}
