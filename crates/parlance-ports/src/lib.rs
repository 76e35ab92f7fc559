//! Capability-port abstractions.
//!
//! The planner treats speech, search, and language-model completion as opaque
//! collaborators behind these traits. Implementations are constructed
//! explicitly and injected at startup, which also makes the planner trivially
//! testable with stub ports.

use async_trait::async_trait;

use parlance_core::error::Result;
use parlance_core::run::RunState;
use parlance_core::types::{ActionDescriptor, ActionSelection, ChatResponse, Conversation};

pub mod elevenlabs;
pub mod openai;
pub mod search;
pub mod whisper;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use openai::OpenAiCompletion;
pub use search::SearchKnowledge;
pub use whisper::WhisperTranscriber;

/// Speech-to-text port.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe raw audio bytes to text.
    ///
    /// Fails with [`ParlanceError::TranscriptionFailed`] on any transport or
    /// provider error.
    ///
    /// [`ParlanceError::TranscriptionFailed`]: parlance_core::error::ParlanceError::TranscriptionFailed
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Text-to-speech port. Accepts plain text or speech-synthesis markup.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, markup: &str) -> Result<Vec<u8>>;
}

/// Language-model completion port.
///
/// Three distinct calls with one failure signal: a `CompletionFailed` from
/// `select_action` or `select_response` is fatal to the current run, while
/// a failure from `generate_text` inside an action is absorbed locally.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Pick the next action given the run state and the permitted set.
    async fn select_action(
        &self,
        run: &RunState,
        permitted: &[&ActionDescriptor],
    ) -> Result<ActionSelection>;

    /// Generate free text from the conversation (e.g. a farewell).
    async fn generate_text(&self, conversation: &Conversation, instruction: &str)
    -> Result<String>;

    /// Rank the candidate responses and return the single best one. A
    /// selection call, not a generation call.
    async fn select_response(
        &self,
        conversation: &Conversation,
        candidates: &[ChatResponse],
    ) -> Result<ChatResponse>;
}

/// Knowledge-engine port: natural-language query in, plaintext results out.
#[async_trait]
pub trait KnowledgeQuery: Send + Sync {
    async fn query(&self, question: &str) -> Result<String>;
}
