use serde::{ Serialize, Deserialize };

/// Conversation role vocabulary at the HTTP boundary. The provider-side
/// vocabulary (`user`/`model`) is mapped inside the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Request body shared by the batch and streaming endpoints. A missing
/// `messages` field deserializes to an empty list so both absence and
/// emptiness fail the same validation check.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsultRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsultResponse {
    pub response: String,
}
