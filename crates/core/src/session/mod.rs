//! Interactive text-to-speech session.
//!
//! [`Session`] is a pure state machine: it consumes [`Event`]s one at a time
//! and answers with [`Effect`]s, never doing I/O itself. [`terminal`] owns the
//! real event loop and runs effects; [`jobs`] runs one synthesis request and
//! produces its [`Completion`]. Background work only reaches the transcript
//! through a completion event.

mod controller;
mod input;
pub mod jobs;
pub mod terminal;
pub mod view;

use crate::playback::PlaybackError;
use crate::tts::TtsError;
use std::path::{Path, PathBuf};

pub use controller::Session;
pub use input::TextInput;
pub use jobs::{run_synthesis_job, spawn_synthesis_job, JobContext};
pub use terminal::run_interactive;

pub const PROCESSING_TEXT: &str = "Processing...";
pub const DONE_TEXT: &str = "Generated";
pub const FAILED_TEXT: &str = "Failed to generate audio";

const LOG_TARGET: &str = "session";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    SelectingVoice,
    TypingText,
    Processing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    None,
    Processing,
    Done,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub status: Status,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            status: Status::None,
        }
    }

    pub fn processing() -> Self {
        Self {
            role: Role::System,
            text: PROCESSING_TEXT.to_owned(),
            status: Status::Processing,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.role == Role::System && self.status == Status::Processing
    }
}

/// Append-only log of the session's exchanges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Rewrites the placeholder at `index`. Anything that is not a pending
    /// system message is left alone.
    fn resolve(&mut self, index: usize, success: bool) -> bool {
        match self.messages.get_mut(index) {
            Some(message) if message.is_pending() => {
                if success {
                    message.text = DONE_TEXT.to_owned();
                    message.status = Status::Done;
                } else {
                    message.text = FAILED_TEXT.to_owned();
                    message.status = Status::Failed;
                }
                true
            }
            _ => false,
        }
    }

    /// Highest-index pending system message accepted by `eligible`.
    fn last_pending_where(&self, eligible: impl Fn(usize) -> bool) -> Option<usize> {
        self.messages
            .iter()
            .enumerate()
            .rev()
            .find(|(i, m)| m.is_pending() && eligible(*i))
            .map(|(i, _)| i)
    }
}

/// Correlates a dispatched synthesis job with its completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Up,
    Down,
    Enter,
    Esc,
    CtrlC,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub job: JobId,
    pub success: bool,
    pub text: String,
    /// The written audio file; `None` when synthesis failed.
    pub path: Option<PathBuf>,
}

impl Completion {
    pub fn failed(job: JobId, text: String) -> Self {
        Self {
            job,
            success: false,
            text,
            path: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Key(Key),
    Tick,
    JobCompleted(Completion),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRequest {
    pub job: JobId,
    pub text: String,
    pub voice_name: String,
    pub out_path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Synthesize(JobRequest),
    Quit,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

/// Where background failures go. They never reach the transcript.
pub trait DiagnosticSink: Send + Sync {
    fn synthesis_failed(&self, job: JobId, error: &TtsError);
    fn playback_failed(&self, path: &Path, error: &PlaybackError);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn synthesis_failed(&self, job: JobId, error: &TtsError) {
        tracing::warn!(target: LOG_TARGET, %job, error = %error, "synthesis failed");
    }

    fn playback_failed(&self, path: &Path, error: &PlaybackError) {
        if error.is_device_error() {
            tracing::error!(
                target: LOG_TARGET,
                path = %path.display(),
                error = %error,
                "audio output lost"
            );
        } else {
            tracing::warn!(
                target: LOG_TARGET,
                path = %path.display(),
                error = %error,
                "playback failed"
            );
        }
    }
}
