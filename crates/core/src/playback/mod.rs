mod audio;
mod dummy;

use crate::decode::DecodeError;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

pub use audio::RodioPlayer;
pub use dummy::DummyPlayer;

#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    #[error("cannot decode audio: {0}")]
    Decode(#[from] DecodeError),

    #[error("audio output unavailable: {details}")]
    AudioOutputUnavailable { details: String },

    #[error("playback task failed: {0}")]
    TaskFailed(String),
}

impl PlaybackError {
    pub fn is_device_error(&self) -> bool {
        matches!(self, PlaybackError::AudioOutputUnavailable { .. })
    }
}

/// A playback running on a background blocking task.
///
/// Dropping the handle detaches the playback; it keeps running until the
/// stream is exhausted.
pub struct PlaybackHandle {
    task: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl PlaybackHandle {
    /// Runs `play` on tokio's blocking pool. `play` must return once the stream
    /// is exhausted or the flag it receives becomes `true`.
    pub fn spawn_blocking<F>(play: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let task = tokio::task::spawn_blocking(move || play(flag));
        Self { task, stop }
    }

    /// A handle for a playback that has nothing left to do.
    pub fn finished() -> Self {
        Self::spawn_blocking(|_| {})
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub async fn wait(self) -> Result<(), PlaybackError> {
        self.task
            .await
            .map_err(|e| PlaybackError::TaskFailed(e.to_string()))
    }
}

/// Stop flags of the playbacks a session has started.
///
/// Runtime shutdown waits for blocking tasks, so every playback still running
/// on quit has to be told to stop. Playbacks tracked after [`stop_all`] are
/// stopped immediately.
///
/// [`stop_all`]: ActivePlaybacks::stop_all
#[derive(Clone, Debug, Default)]
pub struct ActivePlaybacks {
    inner: Arc<Mutex<Tracked>>,
}

#[derive(Debug, Default)]
struct Tracked {
    closed: bool,
    flags: Vec<Arc<AtomicBool>>,
}

impl ActivePlaybacks {
    pub fn track(&self, handle: &PlaybackHandle) {
        let mut tracked = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if tracked.closed {
            handle.stop();
            return;
        }
        // Only this list holds the flag once the task is done and its handle dropped.
        tracked.flags.retain(|flag| Arc::strong_count(flag) > 1);
        tracked.flags.push(Arc::clone(&handle.stop));
    }

    pub fn stop_all(&self) {
        let mut tracked = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        tracked.closed = true;
        for flag in tracked.flags.drain(..) {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

/// Renders a local audio file to an output device.
pub trait AudioPlayer: Send + Sync {
    /// Blocks the calling thread until playback completes.
    fn play_sync(&self, path: &Path) -> Result<(), PlaybackError>;

    /// Starts playback and returns immediately. Decode and device errors are
    /// reported here, before anything is played. Must be called from within a
    /// tokio runtime.
    fn play_async(&self, path: &Path) -> Result<PlaybackHandle, PlaybackError>;
}
