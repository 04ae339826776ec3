use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const LOG_TARGET: &str = "decode";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> std::result::Result<Self, DecodeError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp3") => Ok(Self::Mp3),
            Some("wav") => Ok(Self::Wav),
            _ => Err(DecodeError::UnsupportedExtension(path.to_path_buf())),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("not a supported audio file (expected .mp3 or .wav): {0}")]
    UnsupportedExtension(PathBuf),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unrecognised audio stream: {0}")]
    Probe(String),

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("codec error: {0}")]
    Codec(String),

    #[error("audio stream contains no samples")]
    Empty,
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Streaming decoder over a local audio file.
///
/// Yields interleaved `f32` samples at the stream's native rate and channel
/// count. The first packet is decoded in [`FileDecoder::open`], so a file that
/// probes fine but holds no decodable audio is rejected up front.
pub struct FileDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    total_frames: Option<u64>,
    buffer: Vec<f32>,
    pos: usize,
    finished: bool,
}

impl FileDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        let kind = AudioFormat::from_path(path)?;
        let file = File::open(path).map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        hint.with_extension(kind.extension());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Probe(e.to_string()))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;
        let track_id = track.id;
        let total_frames = track.codec_params.n_frames;
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Codec(e.to_string()))?;

        let mut this = Self {
            format,
            decoder,
            track_id,
            sample_rate: 0,
            channels: 0,
            total_frames,
            buffer: Vec::new(),
            pos: 0,
            finished: false,
        };

        if !this.refill()? {
            return Err(DecodeError::Empty);
        }

        tracing::debug!(
            target: LOG_TARGET,
            path = %path.display(),
            sample_rate = this.sample_rate,
            channels = this.channels,
            "opened audio file"
        );
        Ok(this)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn total_duration(&self) -> Option<Duration> {
        self.total_frames
            .map(|frames| duration_from_frames(self.sample_rate, frames))
    }

    /// Decodes the next packet of our track into `buffer`. `Ok(false)` at end of stream.
    fn refill(&mut self) -> Result<bool> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(false),
                Err(e) => return Err(DecodeError::Codec(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    if decoded.frames() == 0 {
                        continue;
                    }
                    let spec = *decoded.spec();
                    let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    samples.copy_interleaved_ref(decoded);

                    self.sample_rate = spec.rate;
                    self.channels = u16::try_from(spec.channels.count()).unwrap_or(u16::MAX);
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples.samples());
                    self.pos = 0;
                    return Ok(true);
                }
                // A corrupt frame is skipped, the rest of the stream may still be fine.
                Err(SymphoniaError::DecodeError(msg)) => {
                    tracing::debug!(target: LOG_TARGET, error = msg, "skipping undecodable packet");
                }
                Err(e) => return Err(DecodeError::Codec(e.to_string())),
            }
        }
    }
}

impl Iterator for FileDecoder {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos >= self.buffer.len() {
            if self.finished {
                return None;
            }
            match self.refill() {
                Ok(true) => {}
                Ok(false) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        error = %e,
                        "decode failed mid-stream; ending playback"
                    );
                    self.finished = true;
                    return None;
                }
            }
        }
        let sample = self.buffer[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

pub fn duration_from_frames(sample_rate_hz: u32, frames: u64) -> Duration {
    if sample_rate_hz == 0 {
        return Duration::from_secs(0);
    }
    let micros = (u128::from(frames) * 1_000_000u128) / u128::from(sample_rate_hz);
    Duration::from_micros(micros.min(u128::from(u64::MAX)) as u64)
}
