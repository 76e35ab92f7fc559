use serde::{Deserialize, Serialize};

/// Who said a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An ordered message history, supplied by the caller at the start of a turn.
///
/// Never mutated in place during a run — appending a message produces the
/// effective history handed to the planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Produce a new conversation with `message` appended.
    pub fn with_message(&self, message: Message) -> Self {
        let mut messages = self.messages.clone();
        messages.push(message);
        Self { messages }
    }
}

/// Side effect the caller should carry out alongside delivering a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalAction {
    #[default]
    None,
    EndConversation,
}

/// The unit returned to the caller after a planner run.
///
/// `markup` is always a rendering of `text` (see [`crate::markup`]); the two
/// are never edited independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub markup: String,
    pub external_action: ExternalAction,
}

/// One action pick produced by the completion port per loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSelection {
    pub action_name: String,
    pub arg: Option<String>,
}

/// Static metadata for one planner action.
///
/// Declarative record, separate from the behavior — each built-in action
/// exposes one `static` descriptor.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActionDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub trigger_guidance: &'static str,
    pub usage_guidance: &'static str,
    pub notes: &'static str,
}
