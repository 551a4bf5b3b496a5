pub mod chat;

use std::fmt;

use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmType {
    Gemini,
    Static,
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmType::Gemini => write!(f, "gemini"),
            LlmType::Static => write!(f, "static"),
        }
    }
}

pub fn parse_llm_type(s: &str) -> Result<LlmType, AgentError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "gemini" => Ok(LlmType::Gemini),
        "static" => Ok(LlmType::Static),
        other => Err(AgentError::Configuration(
            format!("Unknown chat LLM type '{}'. Supported types: gemini, static", other)
        )),
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub temperature: f32,
}
