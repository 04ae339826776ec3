mod remote;

use futures::future::BoxFuture;
use std::path::PathBuf;

pub use remote::RemoteTtsClient;

use crate::util::is_http_retryable;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateRequest {
    pub text: String,
    pub voice_name: String,
    pub out_path: PathBuf,
}

impl GenerateRequest {
    pub fn new(
        text: impl Into<String>,
        voice_name: impl Into<String>,
        out_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            text: text.into(),
            voice_name: voice_name.into(),
            out_path: out_path.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TtsError {
    #[error("voice not found: {0}")]
    VoiceNotFound(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("http error {0}: {1}")]
    HttpStatus(u16, String),

    #[error("failed to write {path}: {source}")]
    FileIo {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl TtsError {
    /// Whether a caller-side retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            TtsError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            TtsError::HttpStatus(status, _) => is_http_retryable(*status),
            TtsError::VoiceNotFound(_) | TtsError::FileIo { .. } => false,
        }
    }
}

/// Turns text into an audio file on disk.
pub trait Synthesizer: Send + Sync {
    fn generate(&self, request: GenerateRequest) -> BoxFuture<'_, Result<(), TtsError>>;
}
