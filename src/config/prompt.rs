use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::AgentError;
use crate::models::chat::ChatMessage;

const SYSTEM_INSTRUCTION: &str = "You are an AI doctor. Your job is to help users identify the most likely cause of their symptoms or pain.
- Start by asking 5 key diagnostic questions
- Then continue asking until you're confident enough to suggest the most likely disease or cause
- If multiple causes are likely, explain top 2\u{2013}3 and why
- Use clear, layman-friendly language and avoid jargon
- Warn users of serious symptoms and advise seeing a doctor or ER when needed
- Stay calm, professional, and empathetic
- Respond like a real doctor in a natural, conversational tone";

const GREETING: &str =
    "Hello! I'm here to help with your health concerns. What symptoms are you experiencing?";

const FALLBACK_INITIAL: [&str; 6] = [
    "Thank you for sharing your symptoms. To help me better understand your condition, I need to ask a few questions:",
    "1. How long have you been experiencing these symptoms?",
    "2. Is the pain constant, or does it come and go?",
    "3. Have you taken any medication for this?",
    "4. Are you experiencing any other symptoms?",
    "5. Do these symptoms affect your daily activities?",
];

const FALLBACK_FOLLOW_UP: [&str; 10] = [
    "Based on what you've described, there are a few potential causes to consider:",
    "1. Tension headache: This is the most common type of headache and can be caused by stress, poor posture, or dehydration. The pain typically feels like pressure or tightness around your head.",
    "2. Migraine: These cause moderate to severe throbbing pain, often on one side of the head, and can be accompanied by nausea, sensitivity to light and sound.",
    "If you've had this headache for 3 days continuously with no relief, I would recommend seeing a doctor, especially if this is an unusual pattern for you. Persistent headaches should be evaluated by a healthcare professional.",
    "In the meantime, you might try:",
    "- Over-the-counter pain relievers like ibuprofen or acetaminophen",
    "- Rest in a quiet, dark room",
    "- Apply a cold or warm compress to your forehead or neck",
    "- Stay hydrated",
    "Is there anything specific about the headache that concerns you most?",
];

fn default_system_instruction() -> String {
    SYSTEM_INSTRUCTION.to_string()
}

fn default_greeting() -> String {
    GREETING.to_string()
}

fn default_fallback_initial() -> String {
    FALLBACK_INITIAL.join("\n\n")
}

fn default_fallback_follow_up() -> String {
    FALLBACK_FOLLOW_UP.join("\n\n")
}

/// Prompt texts for the assistant: the system instruction prepended to the
/// conversation, the greeting the client seeds a new consultation with, and
/// the two canned blocks substituted when the provider is unavailable under
/// the canned-fallback policy.
///
/// Built-in defaults can be overridden per deployment with a JSON file
/// (`--prompts-path`); any field left out keeps its default.
#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_fallback_initial")]
    pub fallback_initial: String,
    #[serde(default = "default_fallback_follow_up")]
    pub fallback_follow_up: String,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_system_instruction(),
            greeting: default_greeting(),
            fallback_initial: default_fallback_initial(),
            fallback_follow_up: default_fallback_follow_up(),
            last_loaded: None,
        }
    }
}

impl PromptConfig {
    /// The canned block keyed on conversation length: the diagnostic
    /// questions for an opening turn, the worked follow-up otherwise.
    pub fn fallback_for(&self, turns: usize) -> &str {
        if turns <= 1 { &self.fallback_initial } else { &self.fallback_follow_up }
    }
}

pub fn load_prompts(path: &str) -> Result<Arc<PromptConfig>, AgentError> {
    let file_content = fs::read_to_string(path).map_err(|e|
        AgentError::Configuration(format!("Failed to read prompts file '{}': {}", path, e))
    )?;
    let mut config: PromptConfig = serde_json::from_str(&file_content).map_err(|e|
        AgentError::Configuration(format!("Failed to parse prompts file '{}': {}", path, e))
    )?;
    config.last_loaded = Some(SystemTime::now());
    Ok(Arc::new(config))
}

pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, AgentError> {
    let path_str = path.as_ref().display().to_string();
    let metadata = fs::metadata(&path).map_err(|e|
        AgentError::Configuration(format!("Failed to stat prompts file '{}': {}", path_str, e))
    )?;

    if let Ok(modified) = metadata.modified() {
        match current_config.last_loaded {
            Some(last_loaded) if modified <= last_loaded => {}
            _ => {
                info!("Prompts file changed, reloading...");
                return Ok(Some(load_prompts(&path_str)?));
            }
        }
    }
    Ok(None)
}

/// Project the conversation for the provider: the system instruction is
/// concatenated onto the first user turn. Turns before it (a seeded
/// assistant greeting) are left untouched.
pub fn with_system_instruction(
    config: &PromptConfig,
    messages: &[ChatMessage]
) -> Vec<ChatMessage> {
    let mut out = messages.to_vec();
    if let Some(first_user) = out.iter_mut().find(|m| m.role.is_user()) {
        first_user.content = format!("{}\n\n{}", config.system_instruction, first_user.content);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_prepended_to_first_user_turn() {
        let config = PromptConfig::default();
        let messages = vec![
            ChatMessage::user("I have a headache"),
            ChatMessage::assistant("How long has it lasted?"),
            ChatMessage::user("Three days")
        ];
        let composed = with_system_instruction(&config, &messages);
        assert!(composed[0].content.starts_with(&config.system_instruction));
        assert!(composed[0].content.ends_with("I have a headache"));
        assert_eq!(composed[1].content, "How long has it lasted?");
        assert_eq!(composed[2].content, "Three days");
    }

    #[test]
    fn seeded_greeting_is_skipped_over() {
        let config = PromptConfig::default();
        let messages = vec![ChatMessage::assistant(GREETING), ChatMessage::user("Hi")];
        let composed = with_system_instruction(&config, &messages);
        assert_eq!(composed[0].content, GREETING);
        assert!(composed[1].content.starts_with(&config.system_instruction));
    }

    #[test]
    fn no_user_turn_leaves_conversation_unchanged() {
        let config = PromptConfig::default();
        let messages = vec![ChatMessage::assistant("hello")];
        let composed = with_system_instruction(&config, &messages);
        assert_eq!(composed[0].content, "hello");
    }

    #[test]
    fn fallback_selection_keyed_on_length() {
        let config = PromptConfig::default();
        assert!(config.fallback_for(1).starts_with("Thank you for sharing your symptoms"));
        assert!(config.fallback_for(3).starts_with("Based on what you've described"));
    }

    #[test]
    fn initial_fallback_is_the_six_line_block() {
        let config = PromptConfig::default();
        assert_eq!(config.fallback_initial.split("\n\n").count(), 6);
        assert_eq!(config.fallback_for(0), config.fallback_initial);
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let config: PromptConfig =
            serde_json::from_str(r#"{"greeting": "Welcome to the clinic."}"#).unwrap();
        assert_eq!(config.greeting, "Welcome to the clinic.");
        assert_eq!(config.system_instruction, PromptConfig::default().system_instruction);
    }

    #[test]
    fn load_and_reload_from_disk() {
        let path = std::env::temp_dir().join("consult_agent_prompts_test.json");
        fs::write(&path, r#"{"greeting": "File greeting"}"#).unwrap();
        let path_str = path.display().to_string();

        let loaded = load_prompts(&path_str).unwrap();
        assert_eq!(loaded.greeting, "File greeting");
        assert!(loaded.last_loaded.is_some());

        // Unchanged file: nothing to reload.
        assert!(reload_prompts_if_changed(&path, &loaded).unwrap().is_none());

        // A config without a load timestamp always reloads.
        let stale = Arc::new(PromptConfig::default());
        assert!(reload_prompts_if_changed(&path, &stale).unwrap().is_some());

        fs::remove_file(&path).ok();
    }
}
