//! The planner loop state machine.

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use parlance_actions::ActionRegistry;
use parlance_core::error::Result;
use parlance_core::run::RunState;
use parlance_core::types::{Conversation, ExternalAction};
use parlance_ports::Completion;

/// Run the bounded action-selection loop and return the accumulated state.
///
/// Per iteration: compute the permitted set (full registry minus the action
/// executed immediately before), ask the completion port for a selection,
/// resolve and execute it. An unresolved name costs the iteration and is
/// recorded as a diagnostic thought; only a completion failure aborts the
/// run. The loop stops early when an action produces a terminal candidate,
/// otherwise after `max_iterations`.
pub async fn run_loop(
    registry: &ActionRegistry,
    completion: &dyn Completion,
    conversation: Conversation,
    max_iterations: u32,
) -> Result<RunState> {
    let run_id = Uuid::new_v4();
    let mut run = RunState::new(conversation);
    run.add_thought(format!("Today (and the time) is {}", Utc::now()));

    let mut last_executed: Option<String> = None;

    for iteration in 0..max_iterations {
        let permitted = registry.permitted(last_executed.as_deref());

        // The only externally-mediated, nondeterministic step. A failure here
        // is fatal to the run; the caller falls back.
        let selection = completion.select_action(&run, &permitted).await?;
        debug!(%run_id, iteration, action = %selection.action_name, "Action selected");

        match registry.get(&selection.action_name) {
            Some(action) => {
                let name = action.name();
                let arg = selection.arg.clone();
                run.record_selection(selection);
                if let Err(e) = action.act(arg.as_deref(), &mut run).await {
                    warn!(%run_id, action = name, %e, "Action could not run");
                    run.add_thought(format!("<<The action {name} could not run: {e}>>"));
                }
                last_executed = Some(name.to_string());
            }
            None => {
                warn!(%run_id, action = %selection.action_name, "Unknown action selected");
                run.add_thought(format!(
                    "<<The action {} does not exist>>",
                    selection.action_name
                ));
                // The invalid name still becomes "last executed" context so
                // it is not immediately retried.
                last_executed = Some(selection.action_name);
            }
        }

        let terminal = run
            .suggested_responses()
            .last()
            .is_some_and(|r| r.external_action == ExternalAction::EndConversation);
        if terminal {
            debug!(%run_id, iteration, "Terminal candidate produced, ending run");
            break;
        }
    }

    debug!(
        %run_id,
        actions = run.action_history().len(),
        thoughts = run.thoughts().len(),
        candidates = run.suggested_responses().len(),
        "Planner loop done"
    );

    Ok(run)
}
