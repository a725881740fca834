use chrono::{DateTime, Utc};
use insight_chat_api::{MessageId, MessageRecord, MessageSender};

/// Fallback reply appended when a send round-trip fails.
pub const SEND_FAILURE_MESSAGE: &str =
    "Sorry, I encountered an error processing your request. Please try again.";
/// Shown in place of history when the session state could not be resolved.
pub const SESSION_LOAD_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't load this conversation. Please start a new one to continue.";

/// Author of a rendered chat bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    System,
}

impl From<MessageSender> for Sender {
    fn from(value: MessageSender) -> Self {
        match value {
            MessageSender::User => Self::User,
            MessageSender::System => Self::System,
        }
    }
}

/// One chat bubble. `id` is present only once the backend has persisted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Option<MessageId>,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            sender,
            content: content.into(),
            timestamp,
        }
    }

    /// Optimistic user message, stamped with the local clock.
    pub fn user_now(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content, Utc::now())
    }

    pub fn system_now(content: impl Into<String>) -> Self {
        Self::new(Sender::System, content, Utc::now())
    }

    /// Converts a persisted record, falling back to `now` when the backend sent no timestamp.
    pub fn from_record(record: MessageRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            sender: record.sender.into(),
            content: record.content,
            timestamp: record.created_at.unwrap_or(now),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Ordered message sequence rendered by the panel.
///
/// Within a conversation the log only grows; `reset` is reserved for phase resolution
/// and session bootstrap, which replace the whole list. Every replacement bumps
/// `generation`, so observers can tell a swapped list from one that merely grew.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    messages: Vec<Message>,
    generation: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn reset(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.reset(Vec::new());
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.clone()
    }
}
