use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_VOICE: &str = "Andrew Multilingual";
pub const DEFAULT_TEXT: &str = "Hello, I am talkback, a commandline text to speech tool";
pub const DEFAULT_OUT_FILE: &str = "generated.mp3";
pub const DEFAULT_ENDPOINT: &str = "https://speechma.com/com.api/tts-api.php";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RETRIES: u32 = 1;
pub const TEMP_AUDIO_FILE: &str = "generated.mp3";
pub const SESSION_LOG_FILE: &str = "talkback.log";
pub const ENV_ENDPOINT: &str = "TALKBACK_ENDPOINT";
pub const ENV_VOICES_FILE: &str = "TALKBACK_VOICES_FILE";
pub const ENV_TEMP_DIR: &str = "TALKBACK_TEMP_DIR";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(value.trim()).map_err(|e| ConfigError::InvalidEndpoint {
            value: value.to_owned(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(ConfigError::InvalidEndpoint {
                value: value.to_owned(),
                reason: format!("unsupported scheme `{other}`"),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    /// `scheme://host[:port]`, sent as the `origin` header.
    pub fn origin(&self) -> String {
        self.0.origin().ascii_serialization()
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::parse(DEFAULT_ENDPOINT).unwrap_or_else(|_| unreachable!("default endpoint is valid"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisConfig {
    pub endpoint: Endpoint,
    pub timeout: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SynthesisConfig {
    pub fn new(endpoint: Endpoint, timeout_secs: u64) -> Result<Self, ConfigError> {
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Every interactive generation overwrites this file.
    pub temp_audio_path: PathBuf,
    pub lock_input_while_processing: bool,
}

impl SessionConfig {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            temp_audio_path: dir.join(TEMP_AUDIO_FILE),
            lock_input_while_processing: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::in_dir(&std::env::temp_dir())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid endpoint `{value}`: {reason}")]
    InvalidEndpoint { value: String, reason: String },
    #[error("timeout must be > 0 seconds")]
    ZeroTimeout,
    #[error("retries must be >= 1")]
    ZeroRetries,
    #[error("temp dir `{0}` is not a directory")]
    NotADirectory(PathBuf),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_endpoint(
    cli_value: Option<String>,
    env: &impl Env,
) -> Result<Endpoint, ConfigError> {
    let raw = resolve_string_with_default(cli_value, ENV_ENDPOINT, env, DEFAULT_ENDPOINT);
    Endpoint::parse(&raw)
}

pub fn resolve_temp_dir(
    cli_value: Option<PathBuf>,
    env: &impl Env,
) -> Result<PathBuf, ConfigError> {
    let dir = match cli_value {
        Some(p) => p,
        None => env
            .var(ENV_TEMP_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir),
    };
    if dir.exists() && !dir.is_dir() {
        return Err(ConfigError::NotADirectory(dir));
    }
    Ok(dir)
}

pub fn resolve_retries(value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroRetries);
    }
    Ok(value)
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}
