//! Planner — the bounded action-selection loop.
//!
//! One turn runs as: seed a fresh [`RunState`], repeatedly ask the completion
//! port to pick an action from the permitted set, execute it, and stop on a
//! terminal candidate or when the iteration budget is exhausted. The response
//! selector then surfaces the best candidate, or the fixed fallback when the
//! run produced none.
//!
//! [`RunState`]: parlance_core::run::RunState

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use parlance_actions::ActionRegistry;
use parlance_core::error::Result;
use parlance_core::types::{ChatResponse, Conversation};
use parlance_ports::Completion;

pub mod runtime;
pub mod selector;

pub use selector::{FALLBACK_TEXT, fallback_response};

pub struct Planner {
    registry: ActionRegistry,
    completion: Arc<dyn Completion>,
    max_iterations: u32,
    timeout: Duration,
}

impl Planner {
    pub fn new(
        registry: ActionRegistry,
        completion: Arc<dyn Completion>,
        max_iterations: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            completion,
            max_iterations,
            timeout,
        }
    }

    /// Run one conversational turn. Always yields a well-formed response:
    /// a completion failure, a timeout, or an empty candidate pool all fall
    /// back to the fixed fallback response.
    pub async fn respond(&self, conversation: Conversation) -> ChatResponse {
        match tokio::time::timeout(self.timeout, self.run(conversation)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(%e, "Planner run aborted");
                fallback_response()
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Planner run timed out");
                fallback_response()
            }
        }
    }

    /// The fallible inner turn: loop, then select. Exposed for tests; errors
    /// only on a completion failure during action selection.
    pub async fn run(&self, conversation: Conversation) -> Result<ChatResponse> {
        let run = runtime::run_loop(
            &self.registry,
            self.completion.as_ref(),
            conversation,
            self.max_iterations,
        )
        .await?;

        Ok(selector::select(
            self.completion.as_ref(),
            run.conversation(),
            run.suggested_responses(),
        )
        .await)
    }
}
