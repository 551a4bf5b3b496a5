use async_trait::async_trait;
use log::info;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ ChatClient, CompletionResponse };
use crate::error::AgentError;
use crate::llm::LlmConfig;
use crate::models::chat::{ ChatMessage, Role };

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const TOP_P: f32 = 0.8;
const TOP_K: u32 = 40;
const MAX_ERROR_DETAILS: usize = 512;

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    text: Option<String>,
    candidates: Option<Vec<GoogleCandidate>>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    parts: Option<Vec<GooglePart>>,
}

#[derive(Deserialize)]
struct GooglePart {
    text: Option<String>,
}

fn provider_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn build_payload(messages: &[ChatMessage], temperature: f32) -> GenerateContentRequest {
    let contents = messages
        .iter()
        .map(|msg| GeminiContent {
            role: provider_role(msg.role),
            parts: vec![GeminiPart { text: msg.content.clone() }],
        })
        .collect();

    GenerateContentRequest {
        contents,
        generation_config: GenerationConfig {
            temperature,
            top_p: TOP_P,
            top_k: TOP_K,
            response_mime_type: "text/plain",
        },
    }
}

fn extract_text(resp: GenerateContentResponse) -> Result<String, AgentError> {
    if let Some(text) = resp.text {
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    let candidate_text = resp.candidates.and_then(|candidates|
        candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|parts| parts.into_iter().next())
            .and_then(|p| p.text)
    );
    match candidate_text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AgentError::InvalidResponse(
            "Provider response carried no text field or candidate parts".to_string()
        )),
    }
}

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        "missing".to_string()
    } else {
        format!("{}...", key.chars().take(5).collect::<String>())
    }
}

pub struct GeminiChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        temperature: f32
    ) -> Self {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        info!(
            "Gemini chat client configured: model={} base_url={} key={}",
            chat_model,
            url,
            mask_key(&api_key)
        );

        Self {
            http: HttpClient::new(),
            api_key,
            model: chat_model,
            base_url: url,
            temperature,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.completion_model.clone(),
            config.base_url.clone(),
            config.temperature
        )
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, AgentError> {
        // Credential precondition: checked before any network I/O so the
        // caller gets a 4xx-class configuration failure, not a 5xx.
        if self.api_key.trim().is_empty() {
            return Err(AgentError::Configuration(
                "No provider API key configured (set CHAT_API_KEY)".to_string()
            ));
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let payload = build_payload(messages, self.temperature);

        let resp = self.http
            .post(&url)
            .json(&payload)
            .send().await
            .map_err(|e| AgentError::provider(format!("Provider request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            body.truncate(MAX_ERROR_DETAILS);
            return Err(AgentError::Provider {
                message: format!("Provider returned HTTP {}", status),
                status: status.as_u16(),
                details: if body.is_empty() {
                    None
                } else {
                    Some(body)
                },
            });
        }

        let parsed = resp
            .json::<GenerateContentResponse>().await
            .map_err(|e|
                AgentError::InvalidResponse(format!("Failed to decode provider response: {}", e))
            )?;
        extract_text(parsed)
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, AgentError> {
        info!(
            "GeminiChatClient::complete() \u{2192} model={} messages={}",
            self.model,
            messages.len()
        );
        let text = self.generate(messages).await?;
        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
