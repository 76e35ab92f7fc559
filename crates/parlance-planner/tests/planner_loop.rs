//! End-to-end planner loop tests with stub ports.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use parlance_actions::builtin;
use parlance_core::error::{ParlanceError, Result};
use parlance_core::markup::render_ssml;
use parlance_core::run::RunState;
use parlance_core::types::{
    ActionDescriptor, ActionSelection, ChatResponse, Conversation, ExternalAction, Message,
};
use parlance_planner::{FALLBACK_TEXT, Planner};
use parlance_ports::{Completion, KnowledgeQuery};

fn pick(action_name: &str, arg: Option<&str>) -> ActionSelection {
    ActionSelection {
        action_name: action_name.to_string(),
        arg: arg.map(str::to_string),
    }
}

fn greeting() -> Conversation {
    Conversation::new(vec![Message::user("hi there")])
}

/// How the stub behaves when asked to rank candidates.
enum RankBehavior {
    /// Return the first candidate.
    First,
    /// Panic — used to prove no ranking call is made.
    Panic,
}

/// Replays a fixed script of selections, cycling when exhausted, and records
/// every permitted set it was offered.
struct ScriptedCompletion {
    script: Vec<ActionSelection>,
    next: AtomicUsize,
    permitted_log: Mutex<Vec<Vec<String>>>,
    select_response_calls: AtomicUsize,
    rank: RankBehavior,
}

impl ScriptedCompletion {
    fn new(script: Vec<ActionSelection>) -> Arc<Self> {
        Arc::new(Self {
            script,
            next: AtomicUsize::new(0),
            permitted_log: Mutex::new(Vec::new()),
            select_response_calls: AtomicUsize::new(0),
            rank: RankBehavior::First,
        })
    }

    fn ranking_panics(script: Vec<ActionSelection>) -> Arc<Self> {
        Arc::new(Self {
            script,
            next: AtomicUsize::new(0),
            permitted_log: Mutex::new(Vec::new()),
            select_response_calls: AtomicUsize::new(0),
            rank: RankBehavior::Panic,
        })
    }

    fn select_action_calls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }

    fn permitted_sets(&self) -> Vec<Vec<String>> {
        self.permitted_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn select_action(
        &self,
        _run: &RunState,
        permitted: &[&ActionDescriptor],
    ) -> Result<ActionSelection> {
        self.permitted_log
            .lock()
            .unwrap()
            .push(permitted.iter().map(|d| d.name.to_string()).collect());
        let index = self.next.fetch_add(1, Ordering::SeqCst) % self.script.len();
        Ok(self.script[index].clone())
    }

    async fn generate_text(
        &self,
        _conversation: &Conversation,
        _instruction: &str,
    ) -> Result<String> {
        Ok("Goodbye!".to_string())
    }

    async fn select_response(
        &self,
        _conversation: &Conversation,
        candidates: &[ChatResponse],
    ) -> Result<ChatResponse> {
        self.select_response_calls.fetch_add(1, Ordering::SeqCst);
        match self.rank {
            RankBehavior::First => Ok(candidates[0].clone()),
            RankBehavior::Panic => panic!("selector must not rank in this scenario"),
        }
    }
}

/// Fails the first action-selection call, counting everything.
struct FailingCompletion {
    select_action_calls: AtomicUsize,
    select_response_calls: AtomicUsize,
}

impl FailingCompletion {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            select_action_calls: AtomicUsize::new(0),
            select_response_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Completion for FailingCompletion {
    async fn select_action(
        &self,
        _run: &RunState,
        _permitted: &[&ActionDescriptor],
    ) -> Result<ActionSelection> {
        self.select_action_calls.fetch_add(1, Ordering::SeqCst);
        Err(ParlanceError::CompletionFailed("provider down".into()))
    }

    async fn generate_text(
        &self,
        _conversation: &Conversation,
        _instruction: &str,
    ) -> Result<String> {
        Err(ParlanceError::CompletionFailed("provider down".into()))
    }

    async fn select_response(
        &self,
        _conversation: &Conversation,
        _candidates: &[ChatResponse],
    ) -> Result<ChatResponse> {
        self.select_response_calls.fetch_add(1, Ordering::SeqCst);
        Err(ParlanceError::CompletionFailed("provider down".into()))
    }
}

/// Hangs on action selection — used for the timeout test.
struct HangingCompletion;

#[async_trait]
impl Completion for HangingCompletion {
    async fn select_action(
        &self,
        _run: &RunState,
        _permitted: &[&ActionDescriptor],
    ) -> Result<ActionSelection> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        unreachable!()
    }

    async fn generate_text(
        &self,
        _conversation: &Conversation,
        _instruction: &str,
    ) -> Result<String> {
        unreachable!()
    }

    async fn select_response(
        &self,
        _conversation: &Conversation,
        _candidates: &[ChatResponse],
    ) -> Result<ChatResponse> {
        unreachable!()
    }
}

struct StubKnowledge;

#[async_trait]
impl KnowledgeQuery for StubKnowledge {
    async fn query(&self, question: &str) -> Result<String> {
        Ok(format!("Facts about {question}"))
    }
}

fn planner_with(completion: Arc<dyn Completion>, max_iterations: u32) -> Planner {
    let registry = builtin(completion.clone(), Some(Arc::new(StubKnowledge)));
    Planner::new(registry, completion, max_iterations, Duration::from_secs(5))
}

#[tokio::test]
async fn test_scenario_think_then_suggest_yields_hello() {
    let completion = ScriptedCompletion::new(vec![
        pick("Think", Some("the user greeted me")),
        pick("Suggest response", Some("Hello")),
    ]);
    let planner = planner_with(completion.clone(), 8);

    let response = planner.respond(greeting()).await;

    assert_eq!(response.text, "Hello");
    assert_eq!(response.markup, render_ssml("Hello"));
    assert_eq!(response.external_action, ExternalAction::None);
    assert_eq!(completion.select_response_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scenario_end_conversation_terminates_first_iteration() {
    let completion = ScriptedCompletion::new(vec![pick("End conversation", None)]);
    let planner = planner_with(completion.clone(), 8);

    let response = planner.respond(greeting()).await;

    // One selection, one terminal candidate, no further iterations.
    assert_eq!(completion.select_action_calls(), 1);
    assert_eq!(response.text, "Goodbye!");
    assert_eq!(response.external_action, ExternalAction::EndConversation);
}

#[tokio::test]
async fn test_scenario_completion_failure_aborts_to_fallback() {
    let completion = FailingCompletion::new();
    let planner = planner_with(completion.clone(), 8);

    let response = planner.respond(greeting()).await;

    assert_eq!(response.text, FALLBACK_TEXT);
    assert_eq!(response.markup, render_ssml(FALLBACK_TEXT));
    assert_eq!(completion.select_action_calls.load(Ordering::SeqCst), 1);
    assert_eq!(completion.select_response_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scenario_budget_exhausted_without_candidates() {
    // Never suggests or ends: alternates thinking and querying. The panicking
    // rank behavior proves the selector makes no completion call afterwards.
    let completion = ScriptedCompletion::ranking_panics(vec![
        pick("Think", Some("hmm")),
        pick("Query knowledge", Some("weather")),
    ]);
    let planner = planner_with(completion.clone(), 8);

    let response = planner.respond(greeting()).await;

    assert_eq!(completion.select_action_calls(), 8);
    assert_eq!(response.text, FALLBACK_TEXT);
}

#[tokio::test]
async fn test_action_history_bounded_by_budget() {
    let completion = ScriptedCompletion::new(vec![
        pick("Think", Some("a")),
        pick("Query knowledge", Some("b")),
    ]);
    let registry = builtin(completion.clone(), Some(Arc::new(StubKnowledge)));

    let run = parlance_planner::runtime::run_loop(
        &registry,
        completion.as_ref(),
        greeting(),
        3,
    )
    .await
    .unwrap();

    assert_eq!(run.action_history().len(), 3);
    // Seeded date thought comes first.
    assert!(run.thoughts()[0].starts_with("Today (and the time) is"));
}

#[tokio::test]
async fn test_permitted_set_excludes_previous_action() {
    let completion = ScriptedCompletion::new(vec![
        pick("Think", Some("a")),
        pick("Suggest response", Some("Hi")),
    ]);
    let planner = planner_with(completion.clone(), 4);

    planner.respond(greeting()).await;

    let sets = completion.permitted_sets();
    assert_eq!(sets.len(), 4);
    // First iteration offers the full registry.
    assert!(sets[0].iter().any(|n| n == "Think"));
    assert!(sets[0].iter().any(|n| n == "Suggest response"));
    // After Think ran, Think is excluded; after Suggest response, it is back.
    assert!(!sets[1].iter().any(|n| n == "Think"));
    assert!(sets[2].iter().any(|n| n == "Think"));
    assert!(!sets[2].iter().any(|n| n == "Suggest response"));
}

#[tokio::test]
async fn test_unknown_action_adds_one_diagnostic_and_continues() {
    let completion = ScriptedCompletion::ranking_panics(vec![
        pick("Dance", Some("tango")),
        pick("Think", Some("that didn't work")),
    ]);
    let registry = builtin(completion.clone(), None);

    let run = parlance_planner::runtime::run_loop(
        &registry,
        completion.as_ref(),
        greeting(),
        4,
    )
    .await
    .unwrap();

    // Loop consumed all four iterations despite two invalid selections.
    assert_eq!(completion.select_action_calls(), 4);

    let diagnostics: Vec<&String> = run
        .thoughts()
        .iter()
        .filter(|t| t.contains("does not exist"))
        .collect();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics[0].contains("Dance"));

    // Only resolved selections enter the history.
    assert_eq!(run.action_history().len(), 2);
    assert!(run
        .action_history()
        .iter()
        .all(|s| s.action_name == "Think"));
}

#[tokio::test]
async fn test_missing_arg_is_absorbed_as_thought() {
    let completion = ScriptedCompletion::ranking_panics(vec![pick("Think", None)]);
    let registry = builtin(completion.clone(), None);

    let run = parlance_planner::runtime::run_loop(
        &registry,
        completion.as_ref(),
        greeting(),
        2,
    )
    .await
    .unwrap();

    let degraded: Vec<&String> = run
        .thoughts()
        .iter()
        .filter(|t| t.contains("could not run"))
        .collect();
    assert_eq!(degraded.len(), 2);
}

#[tokio::test]
async fn test_timeout_returns_fallback() {
    let completion: Arc<dyn Completion> = Arc::new(HangingCompletion);
    let registry = builtin(completion.clone(), None);
    let planner = Planner::new(
        registry,
        completion,
        8,
        Duration::from_millis(50),
    );

    let response = planner.respond(greeting()).await;

    assert_eq!(response.text, FALLBACK_TEXT);
    assert_eq!(response.external_action, ExternalAction::None);
}
