use async_trait::async_trait;

use parlance_core::run::RunState;
use parlance_core::types::ActionDescriptor;

use crate::Action;

static DESCRIPTOR: ActionDescriptor = ActionDescriptor {
    name: "Think",
    description: "Think internal thought",
    trigger_guidance: "When you have a question or thought you want to record.",
    usage_guidance: "Put your thought in the action arg",
    notes: "This will save the thought to short-term memory; it will only persist in the current exchange",
};

pub struct ThinkAction;

#[async_trait]
impl Action for ThinkAction {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &DESCRIPTOR
    }

    async fn act(&self, arg: Option<&str>, run: &mut RunState) -> anyhow::Result<()> {
        let thought = arg.ok_or_else(|| anyhow::anyhow!("missing thought arg"))?;
        run.add_thought(thought);
        Ok(())
    }
}
