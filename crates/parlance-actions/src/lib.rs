//! Built-in planner actions.
//!
//! Actions are the units of work the completion port can pick each loop
//! iteration. Each action implements the [`Action`] trait: side effects are
//! confined to the passed [`RunState`] plus at most one outbound capability
//! call, and a capability failure degrades into a thought rather than an
//! error so the loop keeps making progress.

use std::sync::Arc;

use async_trait::async_trait;

use parlance_core::run::RunState;
use parlance_core::types::ActionDescriptor;
use parlance_ports::{Completion, KnowledgeQuery};

pub mod end_conversation;
pub mod knowledge;
pub mod suggest_response;
pub mod think;

pub use end_conversation::EndConversationAction;
pub use knowledge::KnowledgeQueryAction;
pub use suggest_response::SuggestResponseAction;
pub use think::ThinkAction;

/// The core action trait. Every built-in action implements this.
#[async_trait]
pub trait Action: Send + Sync {
    /// Static metadata record for this action.
    fn descriptor(&self) -> &'static ActionDescriptor;

    /// Action name as exposed to the completion port.
    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Execute the action against the run state.
    ///
    /// `Err` is reserved for a missing required argument; the planner absorbs
    /// it as a diagnostic thought and continues.
    async fn act(&self, arg: Option<&str>, run: &mut RunState) -> anyhow::Result<()>;
}

/// Ordered registry of available actions. Built once at startup, read-only
/// afterwards.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Box<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: Box<dyn Action>) {
        self.actions.push(action);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Action> {
        self.actions
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }

    pub fn descriptors(&self) -> Vec<&'static ActionDescriptor> {
        self.actions.iter().map(|a| a.descriptor()).collect()
    }

    /// The permitted set for the next iteration: the full registry minus the
    /// action executed immediately before. A single action may not run twice
    /// consecutively; non-consecutive repeats are fine.
    pub fn permitted(&self, last_executed: Option<&str>) -> Vec<&'static ActionDescriptor> {
        self.actions
            .iter()
            .map(|a| a.descriptor())
            .filter(|d| Some(d.name) != last_executed)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Build the standard registry. The knowledge action is registered only when
/// a knowledge port is configured.
pub fn builtin(
    completion: Arc<dyn Completion>,
    knowledge: Option<Arc<dyn KnowledgeQuery>>,
) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(Box::new(EndConversationAction::new(completion)));
    if let Some(knowledge) = knowledge {
        registry.register(Box::new(KnowledgeQueryAction::new(knowledge)));
    }
    registry.register(Box::new(ThinkAction));
    registry.register(Box::new(SuggestResponseAction));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_by_name() {
        let mut registry = ActionRegistry::new();
        registry.register(Box::new(ThinkAction));
        registry.register(Box::new(SuggestResponseAction));

        assert!(registry.get("Think").is_some());
        assert!(registry.get("Suggest response").is_some());
        assert!(registry.get("Dance").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_permitted_excludes_last_executed() {
        let mut registry = ActionRegistry::new();
        registry.register(Box::new(ThinkAction));
        registry.register(Box::new(SuggestResponseAction));

        let all = registry.permitted(None);
        assert_eq!(all.len(), 2);

        let without_think = registry.permitted(Some("Think"));
        assert_eq!(without_think.len(), 1);
        assert_eq!(without_think[0].name, "Suggest response");
    }

    #[test]
    fn test_permitted_with_unknown_last_is_full_set() {
        let mut registry = ActionRegistry::new();
        registry.register(Box::new(ThinkAction));

        // An invalid selection still becomes "last executed" context but
        // removes nothing from the registry.
        let permitted = registry.permitted(Some("Dance"));
        assert_eq!(permitted.len(), 1);
    }

    #[test]
    fn test_descriptors_preserve_registration_order() {
        let mut registry = ActionRegistry::new();
        registry.register(Box::new(SuggestResponseAction));
        registry.register(Box::new(ThinkAction));

        let names: Vec<&str> = registry.descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, ["Suggest response", "Think"]);
    }
}
