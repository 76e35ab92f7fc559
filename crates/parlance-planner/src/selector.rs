//! Response selection after the loop reaches its end.

use tracing::{debug, warn};

use parlance_core::markup::render_ssml;
use parlance_core::types::{ChatResponse, Conversation, ExternalAction};
use parlance_ports::Completion;

/// Surfaced when a run produces no usable candidate.
pub const FALLBACK_TEXT: &str = "<<That was too hard to think>>";

/// The fixed fallback response. Built locally — never from a completion call,
/// so a failing completion port cannot cascade into retries.
pub fn fallback_response() -> ChatResponse {
    ChatResponse {
        text: FALLBACK_TEXT.to_string(),
        markup: render_ssml(FALLBACK_TEXT),
        external_action: ExternalAction::None,
    }
}

/// Pick the response to surface to the user from the run's candidates.
///
/// Delegates the ranking to the completion port; an empty candidate pool or a
/// failed ranking call yields the fixed fallback.
pub async fn select(
    completion: &dyn Completion,
    conversation: &Conversation,
    candidates: &[ChatResponse],
) -> ChatResponse {
    if candidates.is_empty() {
        debug!("No candidates suggested, returning fallback");
        return fallback_response();
    }

    match completion.select_response(conversation, candidates).await {
        Ok(response) => response,
        Err(e) => {
            warn!(%e, "Response selection failed, returning fallback");
            fallback_response()
        }
    }
}
