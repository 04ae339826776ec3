use crate::playback::{ActivePlaybacks, AudioPlayer, PlaybackError};
use crate::session::{Completion, DiagnosticSink, Event, JobRequest, LOG_TARGET};
use crate::tts::{GenerateRequest, Synthesizer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Collaborators shared by every job of a session.
#[derive(Clone)]
pub struct JobContext {
    pub synthesizer: Arc<dyn Synthesizer>,
    pub player: Arc<dyn AudioPlayer>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
    pub playbacks: ActivePlaybacks,
}

impl JobContext {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        player: Arc<dyn AudioPlayer>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            synthesizer,
            player,
            diagnostics,
            playbacks: ActivePlaybacks::default(),
        }
    }

    /// Stops every playback this context started, and any it starts later.
    pub fn shutdown(&self) {
        self.playbacks.stop_all();
    }
}

/// Runs one synthesis request to completion.
///
/// Always yields exactly one [`Completion`]. On success playback is started on
/// its own task and not awaited; its failures go to the diagnostic sink only.
pub async fn run_synthesis_job(ctx: &JobContext, request: JobRequest) -> Completion {
    let JobRequest {
        job,
        text,
        voice_name,
        out_path,
    } = request;

    let generate = GenerateRequest::new(text.clone(), voice_name, out_path.clone());
    match ctx.synthesizer.generate(generate).await {
        Ok(()) => {
            tracing::info!(target: LOG_TARGET, %job, path = %out_path.display(), "audio generated");
            spawn_playback(ctx, out_path.clone());
            Completion {
                job,
                success: true,
                text,
                path: Some(out_path),
            }
        }
        Err(e) => {
            ctx.diagnostics.synthesis_failed(job, &e);
            Completion::failed(job, text)
        }
    }
}

/// Runs the job on its own task and sends its completion to `completions`.
/// A job that panics is reported as failed.
pub fn spawn_synthesis_job(
    ctx: &JobContext,
    request: JobRequest,
    completions: UnboundedSender<Event>,
) {
    let ctx = ctx.clone();
    let job = request.job;
    let text = request.text.clone();
    tokio::spawn(async move {
        let run = tokio::spawn(async move { run_synthesis_job(&ctx, request).await });
        let completion = match run.await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!(target: LOG_TARGET, %job, error = %e, "synthesis job aborted");
                Completion::failed(job, text)
            }
        };
        if completions.send(Event::JobCompleted(completion)).is_err() {
            tracing::debug!(target: LOG_TARGET, %job, "session closed before job completed");
        }
    });
}

fn spawn_playback(ctx: &JobContext, path: PathBuf) {
    let player = Arc::clone(&ctx.player);
    let diagnostics = Arc::clone(&ctx.diagnostics);
    let playbacks = ctx.playbacks.clone();
    tokio::spawn(async move {
        // Opening the decoder and the device may block.
        let start_path = path.clone();
        let started = tokio::task::spawn_blocking(move || player.play_async(&start_path)).await;
        let result = match started {
            Ok(Ok(handle)) => {
                playbacks.track(&handle);
                handle.wait().await
            }
            Ok(Err(e)) => Err(e),
            Err(e) => Err(PlaybackError::TaskFailed(e.to_string())),
        };
        if let Err(e) = result {
            diagnostics.playback_failed(&path, &e);
        }
    });
}
