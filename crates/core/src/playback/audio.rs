use crate::decode::FileDecoder;
use crate::playback::{AudioPlayer, PlaybackError, PlaybackHandle};
use rodio::cpal::traits::DeviceTrait;
use rodio::cpal::traits::HostTrait;
use rodio::source::Source;
use rodio::{OutputStream, OutputStreamBuilder, Sink, StreamError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const LOG_TARGET: &str = "playback::rodio";
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A minimal, poison-tolerant, lazy initializer for a single value.
///
/// [`rodio::OutputStream`] must outlive every sink connected to it; dropping it
/// silences whatever is still playing. One stream is opened on first use and
/// shared by all clones of the player.
struct LazyInit<T> {
    value: Mutex<Option<T>>,
}

impl<T> LazyInit<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    fn get_or_try_init_with<R, E>(
        &self,
        init: impl FnOnce() -> Result<T, E>,
        f: impl FnOnce(&T) -> R,
        invariant_err: impl FnOnce() -> E,
    ) -> Result<R, E> {
        let mut guard = match self.value.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    "output stream cache lock was poisoned; recovering and continuing"
                );
                poisoned.into_inner()
            }
        };

        if guard.is_none() {
            *guard = Some(init()?);
        }

        match guard.as_ref() {
            Some(v) => Ok(f(v)),
            None => Err(invariant_err()),
        }
    }
}

/// Plays audio files through rodio, decoding them with [`FileDecoder`].
#[derive(Clone)]
pub struct RodioPlayer {
    output_device_name: Option<String>,
    output_stream: Arc<LazyInit<OutputStream>>,
    output_stream_open_attempts: Arc<AtomicUsize>,
}

impl Default for RodioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl RodioPlayer {
    pub fn new() -> Self {
        Self {
            output_device_name: None,
            output_stream: Arc::new(LazyInit::new()),
            output_stream_open_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_output_device_name<S: Into<String>>(mut self, name: S) -> Self {
        self.output_device_name = Some(name.into());
        self
    }

    /// Opens the output device now instead of on the first playback.
    pub fn ensure_output(&self) -> Result<(), PlaybackError> {
        self.output_stream.get_or_try_init_with(
            || self.open_output_stream(),
            |_| (),
            invariant_violated,
        )
    }

    fn open_output_stream(&self) -> Result<OutputStream, PlaybackError> {
        let attempt = self
            .output_stream_open_attempts
            .fetch_add(1, Ordering::Relaxed)
            + 1;
        tracing::debug!(
            target: LOG_TARGET,
            attempt,
            configured_output_device = %self.output_device_name.as_deref().unwrap_or("<default>"),
            "opening output stream"
        );

        let Some(wanted) = self.output_device_name.as_deref() else {
            return open_default_stream(None, "open default output stream");
        };

        match open_named_output_stream(wanted) {
            Ok(stream) => Ok(stream),
            Err(NamedDeviceStreamError::DeviceNotFound { available }) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    wanted_device = %wanted,
                    available_devices = %format_device_list(&available),
                    "configured output device not found; falling back to default output device"
                );
                open_default_stream(
                    Some(wanted),
                    "default-device fallback after named device not found",
                )
            }
            Err(NamedDeviceStreamError::OpenFailed { error, available }) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    wanted_device = %wanted,
                    error = %error,
                    available_devices = %format_device_list(&available),
                    "failed to open configured output device; falling back to default output device"
                );
                open_default_stream(
                    Some(wanted),
                    "default-device fallback after named device open failed",
                )
            }
        }
    }

    fn connect_sink(&self) -> Result<Sink, PlaybackError> {
        self.output_stream.get_or_try_init_with(
            || self.open_output_stream(),
            |stream| Sink::connect_new(stream.mixer()),
            invariant_violated,
        )
    }

    /// Decodes first so a bad file never touches the device.
    fn start(&self, path: &Path) -> Result<Sink, PlaybackError> {
        let decoder = FileDecoder::open(path)?;
        let sink = self.connect_sink()?;
        sink.append(DecodedSource::new(decoder));
        tracing::debug!(target: LOG_TARGET, path = %path.display(), "playback started");
        Ok(sink)
    }
}

impl AudioPlayer for RodioPlayer {
    fn play_sync(&self, path: &Path) -> Result<(), PlaybackError> {
        let sink = self.start(path)?;
        sink.sleep_until_end();
        tracing::debug!(target: LOG_TARGET, path = %path.display(), "playback finished");
        Ok(())
    }

    fn play_async(&self, path: &Path) -> Result<PlaybackHandle, PlaybackError> {
        let sink = self.start(path)?;
        let path = path.to_path_buf();
        Ok(PlaybackHandle::spawn_blocking(move |stop| {
            wait_for_sink(&sink, &stop);
            // Dropping the sink releases the decoder.
            drop(sink);
            tracing::debug!(target: LOG_TARGET, path = %path.display(), "playback finished");
        }))
    }
}

fn wait_for_sink(sink: &Sink, stop: &AtomicBool) {
    while !sink.empty() {
        if stop.load(Ordering::Relaxed) {
            sink.stop();
            return;
        }
        std::thread::sleep(STOP_POLL_INTERVAL);
    }
}

fn invariant_violated() -> PlaybackError {
    PlaybackError::AudioOutputUnavailable {
        details: "internal error: output stream cache invariant violated".to_owned(),
    }
}

fn open_default_stream(wanted: Option<&str>, context: &str) -> Result<OutputStream, PlaybackError> {
    OutputStreamBuilder::open_default_stream().map_err(|e| PlaybackError::AudioOutputUnavailable {
        details: format_stream_error_details(e, wanted, context),
    })
}

#[derive(Debug)]
enum NamedDeviceStreamError {
    DeviceNotFound {
        available: Vec<String>,
    },
    OpenFailed {
        error: StreamError,
        available: Vec<String>,
    },
}

fn normalize_device_name(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

fn open_named_output_stream(wanted: &str) -> Result<OutputStream, NamedDeviceStreamError> {
    let wanted_norm = normalize_device_name(wanted);

    let host = rodio::cpal::default_host();
    let mut available: Vec<String> = Vec::new();
    let mut selected = None;

    if let Ok(devices) = host.output_devices() {
        for d in devices {
            let name = d.name().unwrap_or_else(|_| "<unnamed>".to_owned());
            if normalize_device_name(&name) == wanted_norm {
                selected = Some(d);
            }
            available.push(name);
        }
    }

    let Some(device) = selected else {
        return Err(NamedDeviceStreamError::DeviceNotFound { available });
    };

    OutputStreamBuilder::from_device(device)
        .and_then(|b| b.open_stream_or_fallback())
        .map_err(|error| NamedDeviceStreamError::OpenFailed { error, available })
}

fn format_device_list(devices: &[String]) -> String {
    if devices.is_empty() {
        return "<unknown>".to_owned();
    }
    devices.join(", ")
}

fn format_stream_error_details(err: StreamError, wanted: Option<&str>, context: &str) -> String {
    let mut s = format!("{context}: {err}");
    if let Some(w) = wanted {
        s.push_str(&format!(" (configured_device={w})"));
    }
    #[cfg(feature = "playback-device-enum")]
    {
        if let Ok(devices) = enumerate_output_device_names() {
            if devices.is_empty() {
                s.push_str("; available_output_devices=<none>");
            } else {
                s.push_str("; available_output_devices=");
                s.push_str(&devices.join(", "));
            }
        }
    }
    s
}

#[cfg(feature = "playback-device-enum")]
pub fn enumerate_output_device_names() -> Result<Vec<String>, PlaybackError> {
    let host = rodio::cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| PlaybackError::AudioOutputUnavailable {
            details: format!("failed to list output devices: {e}"),
        })?;

    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "<unnamed>".to_owned()))
        .collect())
}

/// Feeds decoded file samples to rodio at the file's own rate and channel count.
struct DecodedSource {
    decoder: FileDecoder,
    sample_rate: u32,
    channels: u16,
}

impl DecodedSource {
    fn new(decoder: FileDecoder) -> Self {
        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels();
        Self {
            decoder,
            sample_rate,
            channels,
        }
    }
}

impl Iterator for DecodedSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next()
    }
}

impl Source for DecodedSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        self.decoder.total_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::write_wav;
    use crate::decode::DecodeError;

    #[test]
    fn normalize_device_name_trims_and_is_case_insensitive() {
        assert_eq!(normalize_device_name("  Speakers  "), "speakers");
        assert_eq!(normalize_device_name("HeAdPhOnEs"), "headphones");
    }

    #[test]
    fn format_device_list_handles_empty() {
        assert_eq!(format_device_list(&[]), "<unknown>");
        assert_eq!(
            format_device_list(&["A".to_owned(), "B".to_owned()]),
            "A, B"
        );
    }

    #[test]
    fn lazy_init_runs_init_only_once() {
        let cell: LazyInit<u32> = LazyInit::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let init = |value: u32| {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok::<u32, ()>(value)
            }
        };

        let v1 = cell.get_or_try_init_with(init(42), |v| *v, || ()).unwrap();
        let v2 = cell.get_or_try_init_with(init(99), |v| *v, || ()).unwrap();

        assert_eq!(v1, 42);
        assert_eq!(v2, 42);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn lazy_init_retries_after_failed_init() {
        let cell: LazyInit<u32> = LazyInit::new();
        let first = cell.get_or_try_init_with(|| Err("no device"), |v| *v, || "invariant");
        assert_eq!(first, Err("no device"));
        let second = cell.get_or_try_init_with(|| Ok(7), |v| *v, || "invariant");
        assert_eq!(second, Ok(7));
    }

    #[test]
    fn bad_files_fail_before_opening_a_device() {
        let player = RodioPlayer::new();
        let err = player.play_sync(Path::new("song.ogg")).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::Decode(DecodeError::UnsupportedExtension(_))
        ));
        assert_eq!(player.output_stream_open_attempts.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn decoded_source_exposes_native_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clip.wav");
        write_wav(&path, 22_050, 1, &[1, 2, 3, 4, 5]);

        let source = DecodedSource::new(FileDecoder::open(&path).expect("open"));
        assert_eq!(source.sample_rate(), 22_050);
        assert_eq!(source.channels(), 1);
        assert_eq!(source.current_span_len(), None);
        assert_eq!(source.count(), 5);
    }
}
