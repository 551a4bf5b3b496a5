use chrono::{ DateTime, Utc };
use uuid::Uuid;

use crate::models::chat::{ ChatMessage, Role };

#[derive(Clone, Debug)]
pub struct SessionMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
}

/// Exclusively-owned conversation state for one client session. All
/// mutation goes through the transitions below; nothing else touches the
/// log. One send may be in flight at a time, guarded by [`Phase::Sending`].
///
/// Every send gets a stream id. `reset` bumps it, so chunks and results of
/// a send that was orphaned by a reset carry a stale id and are dropped:
/// in-flight sends are fire-and-forget once the conversation is gone.
pub struct ChatSession {
    messages: Vec<SessionMessage>,
    input: String,
    phase: Phase,
    current_stream_id: u64,
    greeting: Option<String>,
}

impl ChatSession {
    pub fn new(greeting: Option<String>) -> Self {
        let mut session = Self {
            messages: Vec::new(),
            input: String::new(),
            phase: Phase::Idle,
            current_stream_id: 0,
            greeting,
        };
        session.seed_greeting();
        session
    }

    fn seed_greeting(&mut self) {
        if let Some(greeting) = &self.greeting {
            self.messages.push(SessionMessage::new(Role::Assistant, greeting.clone()));
        }
    }

    pub fn messages(&self) -> &[SessionMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_sending(&self) -> bool {
        self.phase == Phase::Sending
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id == stream_id
    }

    /// The read-only wire projection of the log.
    pub fn wire_messages(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| ChatMessage { role: m.role, content: m.content.clone() })
            .collect()
    }

    /// Submit the pending input: append the user turn, clear the input and
    /// enter `Sending`. Returns the wire projection to send plus this
    /// send's stream id. Blank input and submits while a send is already in
    /// flight are ignored.
    pub fn submit(&mut self) -> Option<(Vec<ChatMessage>, u64)> {
        if self.phase == Phase::Sending {
            return None;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }

        self.messages.push(SessionMessage::new(Role::User, text));
        self.input.clear();
        self.phase = Phase::Sending;
        self.current_stream_id += 1;
        Some((self.wire_messages(), self.current_stream_id))
    }

    /// Append the empty assistant placeholder that streamed chunks land in.
    /// Exists before the first chunk arrives, so updates are pure appends.
    pub fn push_placeholder(&mut self) -> Uuid {
        let msg = SessionMessage::new(Role::Assistant, String::new());
        let id = msg.id;
        self.messages.push(msg);
        id
    }

    pub fn append_chunk(&mut self, stream_id: u64, id: Uuid, chunk: &str) {
        if !self.is_current_stream(stream_id) {
            return;
        }
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
            msg.content.push_str(chunk);
        }
    }

    /// Batch-mode result: one assistant message, success and error text
    /// alike, then back to `Idle`.
    pub fn complete(&mut self, stream_id: u64, text: String) {
        if !self.is_current_stream(stream_id) {
            return;
        }
        self.messages.push(SessionMessage::new(Role::Assistant, text));
        self.phase = Phase::Idle;
    }

    /// Streaming failure: the placeholder is overwritten in place with the
    /// error text.
    pub fn fail_stream(&mut self, stream_id: u64, id: Uuid, error_text: String) {
        if !self.is_current_stream(stream_id) {
            return;
        }
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
            msg.content = error_text;
        }
        self.phase = Phase::Idle;
    }

    /// Streaming completed; the placeholder already holds the full reply.
    pub fn finish(&mut self, stream_id: u64) {
        if !self.is_current_stream(stream_id) {
            return;
        }
        self.phase = Phase::Idle;
    }

    /// New consultation, from any state: clear the log and the pending
    /// input, re-seed the greeting, and orphan any in-flight send.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.input.clear();
        self.phase = Phase::Idle;
        self.current_stream_id += 1;
        self.seed_greeting();
    }
}
