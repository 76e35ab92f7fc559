//! Per-run scratchpad for one planner invocation.

use serde::Serialize;

use crate::types::{ActionSelection, ChatResponse, Conversation};

/// Mutable scratch state for a single conversational turn.
///
/// Owned exclusively by one planner invocation and destroyed at the end of
/// the turn. Thoughts, action history, and suggested responses only grow —
/// mutation goes through the appending methods, so the append-only invariants
/// hold by construction.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    conversation: Conversation,
    internal_thoughts: Vec<String>,
    action_history: Vec<ActionSelection>,
    suggested_responses: Vec<ChatResponse>,
}

impl RunState {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            internal_thoughts: Vec::new(),
            action_history: Vec::new(),
            suggested_responses: Vec::new(),
        }
    }

    /// The conversation under consideration. Read-only for the whole run.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn thoughts(&self) -> &[String] {
        &self.internal_thoughts
    }

    pub fn action_history(&self) -> &[ActionSelection] {
        &self.action_history
    }

    pub fn suggested_responses(&self) -> &[ChatResponse] {
        &self.suggested_responses
    }

    /// Append an internal thought to short-term memory. Thoughts persist only
    /// for the current exchange.
    pub fn add_thought(&mut self, thought: impl Into<String>) {
        self.internal_thoughts.push(thought.into());
    }

    /// Record a selection made by the completion port.
    pub fn record_selection(&mut self, selection: ActionSelection) {
        self.action_history.push(selection);
    }

    /// Add a candidate response for the selector to consider.
    pub fn add_candidate(&mut self, response: ChatResponse) {
        self.suggested_responses.push(response);
    }
}
