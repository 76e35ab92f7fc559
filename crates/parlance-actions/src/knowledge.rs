use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use parlance_core::run::RunState;
use parlance_core::types::ActionDescriptor;
use parlance_ports::KnowledgeQuery;

use crate::Action;

static DESCRIPTOR: ActionDescriptor = ActionDescriptor {
    name: "Query knowledge",
    description: "Queries an external knowledge engine",
    trigger_guidance: "When you are asked or have a question about current events or something you don't know.",
    usage_guidance: "Put your query (natural language question or something to learn more about) in the action arg",
    notes: "Results will be plaintext formatted",
};

pub struct KnowledgeQueryAction {
    knowledge: Arc<dyn KnowledgeQuery>,
}

impl KnowledgeQueryAction {
    pub fn new(knowledge: Arc<dyn KnowledgeQuery>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Action for KnowledgeQueryAction {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &DESCRIPTOR
    }

    async fn act(&self, arg: Option<&str>, run: &mut RunState) -> anyhow::Result<()> {
        let query = arg.ok_or_else(|| anyhow::anyhow!("missing query arg"))?;

        match self.knowledge.query(query).await {
            Ok(results) => {
                run.add_thought(format!("Knowledge results for {query}\n\n{results}"));
            }
            Err(e) => {
                warn!(%e, query, "Knowledge query failed");
                run.add_thought(format!("<<knowledge query failed: {e}>>"));
            }
        }
        Ok(())
    }
}
