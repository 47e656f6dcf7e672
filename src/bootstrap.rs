use crate::MAX_GUESSES;
use crate::hint::HintPayload;
use crate::taxonomy::TaxonomyState;
use crate::transport::TransportError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Pages render unset values as `null`; read those as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BirdInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

/// State the page hands the controller once per load.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSessionConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub guess_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_winner: bool,
    #[serde(default)]
    pub hint: Option<HintPayload>,
    #[serde(default)]
    pub correct_taxonomy: Option<TaxonomyState>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bird: BirdInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub emojis: String,
}

impl GameSessionConfig {
    /// True when the page was loaded for an already finished game.
    pub fn is_terminal(&self) -> bool {
        self.is_winner || self.guess_count >= MAX_GUESSES
    }

    pub fn from_json(text: &str) -> Result<Self, BootstrapError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BootstrapError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[derive(Debug)]
pub enum BootstrapError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Fetch(TransportError),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Io(err) => write!(f, "failed to read bootstrap config: {err}"),
            BootstrapError::Parse(err) => write!(f, "invalid bootstrap config: {err}"),
            BootstrapError::Fetch(err) => write!(f, "failed to fetch bootstrap config: {err}"),
        }
    }
}

impl std::error::Error for BootstrapError {}

impl From<std::io::Error> for BootstrapError {
    fn from(value: std::io::Error) -> Self {
        BootstrapError::Io(value)
    }
}

impl From<serde_json::Error> for BootstrapError {
    fn from(value: serde_json::Error) -> Self {
        BootstrapError::Parse(value)
    }
}

impl From<TransportError> for BootstrapError {
    fn from(value: TransportError) -> Self {
        BootstrapError::Fetch(value)
    }
}
