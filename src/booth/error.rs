use crate::booth::traits::{ImageGenerationError, UploadError};
use crate::themes::PromptError;

#[derive(Debug, thiserror::Error)]
pub enum BoothError {
    #[error("Session '{0}' not found")]
    SessionNotFound(String),
    #[error("Cannot {action} while the booth is at stage '{stage}'")]
    InvalidStage {
        action: &'static str,
        stage: &'static str,
    },
    #[error("Unknown keyword '{0}'")]
    UnknownKeyword(String),
    #[error("Exactly {expected} keywords are required, got {got}")]
    KeywordCount { expected: usize, got: usize },
    #[error("Keyword '{0}' was selected more than once")]
    DuplicateKeyword(String),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("The session was restarted while the request was running")]
    Superseded,
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Generation(#[from] ImageGenerationError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}
