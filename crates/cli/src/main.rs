#![deny(warnings)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use talkback_core::config::{
    resolve_endpoint, resolve_optional_string, resolve_retries, resolve_temp_dir, Env,
    SessionConfig, StdEnv, SynthesisConfig, DEFAULT_OUT_FILE, DEFAULT_RETRIES, DEFAULT_TEXT,
    DEFAULT_TIMEOUT_SECS, DEFAULT_VOICE, ENV_ENDPOINT, ENV_TEMP_DIR, ENV_VOICES_FILE,
    SESSION_LOG_FILE,
};
use talkback_core::playback::{AudioPlayer, DummyPlayer, PlaybackHandle, RodioPlayer};
use talkback_core::session::{run_interactive, JobContext, Session, TracingDiagnostics};
use talkback_core::tts::{GenerateRequest, RemoteTtsClient, Synthesizer, TtsError};
use talkback_core::util::{retry_with_backoff, RetryConfig};
use talkback_core::voice::{Voice, VoiceCatalog};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(500);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "talkback")]
#[command(about = "Command-line text to speech")]
struct Args {
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize one text into an audio file
    Generate(GenerateArgs),
    /// Pick a voice and type texts to hear them spoken
    Interactive(InteractiveArgs),
    /// List the available voices
    Voices(VoicesArgs),
}

#[derive(clap::Args, Debug)]
struct RemoteArgs {
    /// Synthesis endpoint URL
    #[arg(long, env = ENV_ENDPOINT)]
    endpoint: Option<String>,

    /// JSON file replacing the built-in voice table
    #[arg(long, env = ENV_VOICES_FILE)]
    voices_file: Option<String>,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[arg(long, default_value = DEFAULT_VOICE)]
    voice: String,

    /// Text to speak; piped stdin takes precedence
    #[arg(long, default_value = DEFAULT_TEXT)]
    text: String,

    #[arg(long, default_value = DEFAULT_OUT_FILE)]
    out: PathBuf,

    /// Play the file once it is written
    #[arg(long)]
    play: bool,

    #[command(flatten)]
    remote: RemoteArgs,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Total attempts; 1 disables retrying
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    retries: u32,

    #[arg(long)]
    output_device: Option<String>,
}

#[derive(clap::Args, Debug)]
struct InteractiveArgs {
    #[command(flatten)]
    remote: RemoteArgs,

    /// Directory for the generated audio and the session log
    #[arg(long, env = ENV_TEMP_DIR)]
    temp_dir: Option<PathBuf>,

    /// Ignore keys while a synthesis job is running
    #[arg(long)]
    lock_input: bool,

    #[arg(long)]
    output_device: Option<String>,

    /// Skip audio output entirely
    #[arg(long)]
    no_audio: bool,

    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct VoicesArgs {
    /// Case-insensitive filter on name, gender, language and country
    #[arg(long)]
    search: Option<String>,

    #[arg(long, env = ENV_VOICES_FILE)]
    voices_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let env = StdEnv;

    match args.command {
        Command::Generate(cmd) => {
            init_tracing(&args.log_level, None)?;
            run_generate(cmd, &env).await
        }
        Command::Interactive(cmd) => {
            let temp_dir = resolve_temp_dir(cmd.temp_dir.clone(), &env)?;
            tokio::fs::create_dir_all(&temp_dir)
                .await
                .with_context(|| format!("failed to create {}", temp_dir.display()))?;
            let log_file = cmd
                .log_file
                .clone()
                .unwrap_or_else(|| temp_dir.join(SESSION_LOG_FILE));
            init_tracing(&args.log_level, Some(&log_file))?;
            run_session(cmd, &temp_dir, &env).await
        }
        Command::Voices(cmd) => {
            init_tracing(&args.log_level, None)?;
            list_voices(cmd, &env)
        }
    }
}

async fn run_generate(cmd: GenerateArgs, env: &impl Env) -> anyhow::Result<()> {
    let text = read_piped_stdin().await?.unwrap_or(cmd.text);
    let catalog = load_catalog(cmd.remote.voices_file, env)?;
    let endpoint = resolve_endpoint(cmd.remote.endpoint, env)?;
    let retries = resolve_retries(cmd.retries)?;
    let synthesis = SynthesisConfig::new(endpoint, cmd.timeout_secs)?;
    let client = RemoteTtsClient::new(&synthesis, catalog)?;

    tracing::info!(
        voice = %cmd.voice,
        out = %cmd.out.display(),
        endpoint = %synthesis.endpoint.as_str(),
        "generating audio"
    );

    let retry = RetryConfig::new(retries, RETRY_INITIAL_DELAY);
    let request = GenerateRequest::new(text, cmd.voice, cmd.out.clone());
    let result = retry_with_backoff(
        &retry,
        || client.generate(request.clone()),
        TtsError::is_retryable,
    )
    .await;

    // Synthesis failures are reported, not fatal.
    if let Err(e) = result {
        eprintln!("Error generating audio: {e}");
        return Ok(());
    }
    println!("Saved audio file to {}", cmd.out.display());

    if cmd.play {
        play_file(&cmd.out, cmd.output_device).await?;
    }
    Ok(())
}

async fn play_file(path: &Path, output_device: Option<String>) -> anyhow::Result<()> {
    let player = rodio_player(output_device);
    let start_path = path.to_path_buf();
    let handle = tokio::task::spawn_blocking(move || player.play_async(&start_path))
        .await
        .context("playback task failed")?
        .with_context(|| format!("failed to play {}", path.display()))?;

    if std::io::stdin().is_terminal() {
        println!("Playing audio, press Enter to stop...");
        let (tx, enter) = tokio::sync::oneshot::channel::<()>();
        // A blocking read cannot be cancelled; the thread is left behind on exit.
        std::thread::spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            let _ = tx.send(());
        });
        tokio::select! {
            _ = enter => {
                tracing::debug!("playback stopped by user");
                handle.stop();
            }
            _ = until_finished(&handle) => {}
        }
    }

    handle.wait().await.context("playback failed")
}

async fn until_finished(handle: &PlaybackHandle) {
    while !handle.is_finished() {
        tokio::time::sleep(STOP_POLL_INTERVAL).await;
    }
}

async fn run_session(cmd: InteractiveArgs, temp_dir: &Path, env: &impl Env) -> anyhow::Result<()> {
    let catalog = load_catalog(cmd.remote.voices_file, env)?;
    let endpoint = resolve_endpoint(cmd.remote.endpoint, env)?;
    let synthesis = SynthesisConfig::new(endpoint, DEFAULT_TIMEOUT_SECS)?;
    let synthesizer = RemoteTtsClient::new(&synthesis, Arc::clone(&catalog))?;

    let player: Arc<dyn AudioPlayer> = if cmd.no_audio {
        Arc::new(DummyPlayer::new())
    } else {
        let player = rodio_player(cmd.output_device);
        player
            .ensure_output()
            .context("audio output unavailable (use --no-audio to run without sound)")?;
        Arc::new(player)
    };

    let config = SessionConfig {
        lock_input_while_processing: cmd.lock_input,
        ..SessionConfig::in_dir(temp_dir)
    };
    tracing::info!(
        voices = catalog.len(),
        temp_audio = %config.temp_audio_path.display(),
        endpoint = %synthesis.endpoint.as_str(),
        lock_input = config.lock_input_while_processing,
        "config loaded"
    );

    let ctx = JobContext::new(Arc::new(synthesizer), player, Arc::new(TracingDiagnostics));
    run_interactive(Session::new(catalog, config), ctx)
        .await
        .context("interactive session failed")?;
    Ok(())
}

fn list_voices(cmd: VoicesArgs, env: &impl Env) -> anyhow::Result<()> {
    let catalog = load_catalog(cmd.voices_file, env)?;
    let voices: Vec<&Voice> = match cmd.search.as_deref() {
        Some(query) => catalog
            .filter(query)
            .into_iter()
            .filter_map(|i| catalog.get(i))
            .collect(),
        None => catalog.iter().collect(),
    };
    for voice in voices {
        println!("{}\t{}", voice.name, voice.description());
    }
    Ok(())
}

fn rodio_player(output_device: Option<String>) -> RodioPlayer {
    match output_device {
        Some(name) => RodioPlayer::new().with_output_device_name(name),
        None => RodioPlayer::new(),
    }
}

fn load_catalog(voices_file: Option<String>, env: &impl Env) -> anyhow::Result<Arc<VoiceCatalog>> {
    let catalog = match resolve_optional_string(voices_file, ENV_VOICES_FILE, env) {
        Some(path) => VoiceCatalog::from_json_file(Path::new(&path))?,
        None => VoiceCatalog::builtin(),
    };
    Ok(Arc::new(catalog))
}

async fn read_piped_stdin() -> anyhow::Result<Option<String>> {
    if std::io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("failed to read stdin")?;
    let text = buf.trim();
    Ok((!text.is_empty()).then(|| text.to_owned()))
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
