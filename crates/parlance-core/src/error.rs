use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParlanceError {
    /// The completion port could not produce a result. Fatal to the current
    /// run: the planner aborts and the caller receives the fixed fallback.
    #[error("Completion failed: {0}")]
    CompletionFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Knowledge query failed: {0}")]
    QueryFailed(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ParlanceError>;
