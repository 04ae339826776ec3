use crate::playback::{AudioPlayer, PlaybackError, PlaybackHandle};
use std::path::Path;

/// Accepts every file and plays nothing. Selected with `--no-audio`.
#[derive(Clone, Debug, Default)]
pub struct DummyPlayer;

impl DummyPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl AudioPlayer for DummyPlayer {
    fn play_sync(&self, path: &Path) -> Result<(), PlaybackError> {
        tracing::debug!(path = %path.display(), "audio disabled; skipping playback");
        Ok(())
    }

    fn play_async(&self, path: &Path) -> Result<PlaybackHandle, PlaybackError> {
        self.play_sync(path)?;
        Ok(PlaybackHandle::finished())
    }
}
