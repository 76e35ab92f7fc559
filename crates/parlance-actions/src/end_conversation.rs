use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use parlance_core::markup::render_ssml;
use parlance_core::run::RunState;
use parlance_core::types::{ActionDescriptor, ChatResponse, ExternalAction};
use parlance_ports::Completion;

use crate::Action;

static DESCRIPTOR: ActionDescriptor = ActionDescriptor {
    name: "End conversation",
    description: "Ends the conversation and stops listening to the user",
    trigger_guidance: "When the user says goodbye or quit. DO NOT QUIT THE CONVERSATION UNLESS THEY ASK YOU TO QUIT.",
    usage_guidance: "Simply choose to run this action",
    notes: "This action will prevent the app from listening to this conversation further",
};

const FAREWELL_INSTRUCTION: &str = "Generate a friendly farewell for this conversation.";

pub struct EndConversationAction {
    completion: Arc<dyn Completion>,
}

impl EndConversationAction {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Action for EndConversationAction {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &DESCRIPTOR
    }

    async fn act(&self, _arg: Option<&str>, run: &mut RunState) -> anyhow::Result<()> {
        // A generation failure here is a capability failure inside an action:
        // degrade to a thought and let the loop continue.
        let text = match self
            .completion
            .generate_text(run.conversation(), FAREWELL_INSTRUCTION)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(%e, "Farewell generation failed");
                run.add_thought(format!("<<farewell generation failed: {e}>>"));
                return Ok(());
            }
        };

        run.add_candidate(ChatResponse {
            markup: render_ssml(&text),
            text,
            external_action: ExternalAction::EndConversation,
        });
        Ok(())
    }
}
