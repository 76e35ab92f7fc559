//! OpenAI-compatible chat completions backing the [`Completion`] port.
//!
//! Non-streaming `/v1/chat/completions` calls. Action selection and response
//! selection request a strict JSON object back; generation returns free text.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use parlance_core::error::{ParlanceError, Result};
use parlance_core::run::RunState;
use parlance_core::types::{ActionDescriptor, ActionSelection, ChatResponse, Conversation, Role};

use crate::Completion;
use async_trait::async_trait;

const OPENAI_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiCompletion {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompletion {
    pub fn new(
        base_url: Option<&str>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// One round-trip to the chat completions endpoint, returning the
    /// assistant message content.
    async fn complete(&self, messages: Vec<serde_json::Value>, json_mode: bool) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        debug!(model = %self.model, base_url = %self.base_url, "Calling chat completions");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ParlanceError::CompletionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ParlanceError::CompletionFailed(format!(
                "API error {status}: {body}"
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ParlanceError::CompletionFailed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ParlanceError::CompletionFailed("empty choices".into()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

/// System prompt for the action-selection call.
fn action_selection_prompt(permitted: &[&ActionDescriptor]) -> String {
    let mut prompt = String::from(
        "You are a friendly voice chatbot. Select an internal action to think \
         or act toward responding to the user. Consider what you have already \
         thought about (your internal thoughts). Do not select the action you \
         just performed. Let's think step by step.\n\nAvailable actions:\n",
    );
    for action in permitted {
        prompt.push_str(&format!(
            "\n## {}\n{}\nWhen to run: {}\nHow to run: {}\nNotes: {}\n",
            action.name,
            action.description,
            action.trigger_guidance,
            action.usage_guidance,
            action.notes,
        ));
    }
    prompt.push_str(
        "\nRespond with a JSON object: {\"action_name\": \"<name>\", \"arg\": \"<argument or null>\"}",
    );
    prompt
}

/// User message carrying the run state for the action-selection call.
fn run_context_message(run: &RunState) -> String {
    let mut context = String::from("Conversation so far:\n");
    for message in &run.conversation().messages {
        let who = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        context.push_str(&format!("{who}: {}\n", message.content));
    }

    if !run.thoughts().is_empty() {
        context.push_str("\nYour internal thoughts:\n");
        for thought in run.thoughts() {
            context.push_str(&format!("- {thought}\n"));
        }
    }

    if !run.action_history().is_empty() {
        context.push_str("\nActions you already performed:\n");
        for selection in run.action_history() {
            context.push_str(&format!(
                "- {} ({})\n",
                selection.action_name,
                selection.arg.as_deref().unwrap_or("no arg")
            ));
        }
    }

    context
}

/// Map a conversation to chat-completions messages.
fn conversation_messages(conversation: &Conversation) -> Vec<serde_json::Value> {
    conversation
        .messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            json!({ "role": role, "content": m.content })
        })
        .collect()
}

/// Models occasionally wrap JSON in markdown fences despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn parse_action_selection(raw: &str) -> Result<ActionSelection> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| ParlanceError::CompletionFailed(format!("unparseable action selection: {e}")))
}

#[derive(Debug, Deserialize)]
struct ChoiceIndex {
    choice: usize,
}

fn parse_choice_index(raw: &str, candidate_count: usize) -> Result<usize> {
    let parsed: ChoiceIndex = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| ParlanceError::CompletionFailed(format!("unparseable choice: {e}")))?;
    if parsed.choice >= candidate_count {
        return Err(ParlanceError::CompletionFailed(format!(
            "choice {} out of range for {} candidates",
            parsed.choice, candidate_count
        )));
    }
    Ok(parsed.choice)
}

#[async_trait]
impl Completion for OpenAiCompletion {
    async fn select_action(
        &self,
        run: &RunState,
        permitted: &[&ActionDescriptor],
    ) -> Result<ActionSelection> {
        let messages = vec![
            json!({ "role": "system", "content": action_selection_prompt(permitted) }),
            json!({ "role": "user", "content": run_context_message(run) }),
        ];
        let raw = self.complete(messages, true).await?;
        parse_action_selection(&raw)
    }

    async fn generate_text(
        &self,
        conversation: &Conversation,
        instruction: &str,
    ) -> Result<String> {
        let mut messages = vec![json!({ "role": "system", "content": instruction })];
        messages.extend(conversation_messages(conversation));
        let text = self.complete(messages, false).await?;
        Ok(text.trim().to_string())
    }

    async fn select_response(
        &self,
        conversation: &Conversation,
        candidates: &[ChatResponse],
    ) -> Result<ChatResponse> {
        let mut prompt = String::from(
            "Choose the most appropriate response to this conversation from \
             the numbered candidates. Respond with a JSON object: \
             {\"choice\": <number>}\n\nCandidates:\n",
        );
        for (i, candidate) in candidates.iter().enumerate() {
            prompt.push_str(&format!("{i}. {}\n", candidate.text));
        }

        let mut messages = vec![json!({ "role": "system", "content": prompt })];
        messages.extend(conversation_messages(conversation));

        let raw = self.complete(messages, true).await?;
        let index = parse_choice_index(&raw, candidates.len())?;
        Ok(candidates[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance_core::types::{ExternalAction, Message};

    static THINK: ActionDescriptor = ActionDescriptor {
        name: "Think",
        description: "Think internal thought",
        trigger_guidance: "When you have a question or thought you want to record.",
        usage_guidance: "Put your thought in the action arg",
        notes: "Saves the thought to short-term memory",
    };

    #[test]
    fn test_action_selection_prompt_lists_actions() {
        let prompt = action_selection_prompt(&[&THINK]);
        assert!(prompt.contains("## Think"));
        assert!(prompt.contains("When to run:"));
        assert!(prompt.contains("action_name"));
    }

    #[test]
    fn test_run_context_includes_thoughts_and_history() {
        let mut run = RunState::new(Conversation::new(vec![Message::user("hi there")]));
        run.add_thought("user greeted me");
        run.record_selection(ActionSelection {
            action_name: "Think".into(),
            arg: Some("user greeted me".into()),
        });
        let context = run_context_message(&run);
        assert!(context.contains("user: hi there"));
        assert!(context.contains("user greeted me"));
        assert!(context.contains("Think"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_action_selection() {
        let selection =
            parse_action_selection(r#"{"action_name": "Think", "arg": "hmm"}"#).unwrap();
        assert_eq!(selection.action_name, "Think");
        assert_eq!(selection.arg.as_deref(), Some("hmm"));

        let no_arg = parse_action_selection(r#"{"action_name": "End conversation", "arg": null}"#)
            .unwrap();
        assert!(no_arg.arg.is_none());

        assert!(parse_action_selection("not json").is_err());
    }

    #[test]
    fn test_parse_choice_index_bounds() {
        assert_eq!(parse_choice_index(r#"{"choice": 1}"#, 3).unwrap(), 1);
        assert!(parse_choice_index(r#"{"choice": 3}"#, 3).is_err());
        assert!(parse_choice_index("garbage", 3).is_err());
    }

    #[test]
    fn test_conversation_messages_roles() {
        let conversation = Conversation::new(vec![
            Message::user("question"),
            Message::assistant("answer"),
        ]);
        let messages = conversation_messages(&conversation);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let port = OpenAiCompletion::new(Some("https://proxy.example.com/"), "m", "k");
        assert_eq!(port.base_url, "https://proxy.example.com");
    }

    #[test]
    fn test_candidate_prompt_numbering() {
        // Exercised indirectly through select_response; the numbering scheme
        // must match what parse_choice_index expects (0-based).
        let candidates = [ChatResponse {
            text: "Hello".into(),
            markup: "<speak>Hello</speak>".into(),
            external_action: ExternalAction::None,
        }];
        assert_eq!(parse_choice_index(r#"{"choice": 0}"#, candidates.len()).unwrap(), 0);
    }
}
