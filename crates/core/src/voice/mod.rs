mod builtin;

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub language: String,
    pub country: String,
}

impl Voice {
    /// Text matched by the interactive search box.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.name, self.gender, self.language, self.country
        )
    }

    pub fn description(&self) -> String {
        format!("{} | {} | {}", self.gender, self.language, self.country)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VoiceError {
    #[error("voice not found: {0}")]
    NotFound(String),

    #[error("failed to read voice file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid voice file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("voice file {0} contains no voices")]
    Empty(String),
}

/// Ordered, read-only set of voices. Built once at startup and shared behind an `Arc`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    pub fn builtin() -> Self {
        Self::new(builtin::voices())
    }

    pub fn from_json_file(path: &Path) -> Result<Self, VoiceError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| VoiceError::Io {
            path: display.clone(),
            source,
        })?;
        let voices: Vec<Voice> = serde_json::from_str(&raw).map_err(|source| VoiceError::Parse {
            path: display.clone(),
            source,
        })?;
        let catalog = Self::new(voices);
        if catalog.is_empty() {
            return Err(VoiceError::Empty(display));
        }
        tracing::debug!(path = %path.display(), count = catalog.len(), "loaded voice catalog");
        Ok(catalog)
    }

    pub fn find_by_name(&self, name: &str) -> Result<&Voice, VoiceError> {
        self.voices
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| VoiceError::NotFound(name.to_owned()))
    }

    pub fn get(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    /// Indices of voices whose search text contains `query`, ignoring case.
    /// An empty query matches everything; catalog order is preserved.
    pub fn filter(&self, query: &str) -> Vec<usize> {
        let needle = query.to_lowercase();
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| needle.is_empty() || v.search_text().to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect()
    }
}
