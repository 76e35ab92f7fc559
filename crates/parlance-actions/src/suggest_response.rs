use async_trait::async_trait;

use parlance_core::markup::render_ssml;
use parlance_core::run::RunState;
use parlance_core::types::{ActionDescriptor, ChatResponse, ExternalAction};

use crate::Action;

static DESCRIPTOR: ActionDescriptor = ActionDescriptor {
    name: "Suggest response",
    description: "Suggests a response to the user",
    trigger_guidance: "When you think you have enough information or want to respond.",
    usage_guidance: "Put your suggested response in the action arg",
    notes: "This action will add a suggested response to consider returning",
};

pub struct SuggestResponseAction;

#[async_trait]
impl Action for SuggestResponseAction {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &DESCRIPTOR
    }

    async fn act(&self, arg: Option<&str>, run: &mut RunState) -> anyhow::Result<()> {
        let text = arg.ok_or_else(|| anyhow::anyhow!("missing response arg"))?;
        run.add_candidate(ChatResponse {
            text: text.to_string(),
            markup: render_ssml(text),
            external_action: ExternalAction::None,
        });
        Ok(())
    }
}
