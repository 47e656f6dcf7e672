use crate::autocomplete::SuggestionQuery;
use crate::submission::{GuessForm, GuessRecord};
use std::fmt;
use std::future::Future;
use std::time::Duration;

#[cfg(feature = "http")]
use crate::bootstrap::{BootstrapError, GameSessionConfig};
#[cfg(feature = "http")]
use tracing::debug;

/// The page endpoint guesses are posted to.
pub trait GuessEndpoint: Send + Sync + 'static {
    fn submit(&self, form: GuessForm) -> impl Future<Output = Result<GuessRecord, SubmitError>> + Send;
}

/// Candidate bird names for the current input and taxonomy filter.
pub trait SuggestionEndpoint: Send + Sync + 'static {
    fn suggest(
        &self,
        query: SuggestionQuery,
    ) -> impl Future<Output = Result<Vec<String>, TransportError>> + Send;
}

#[derive(Debug)]
pub enum SubmitError {
    /// 400: the server does not know that bird. The round is not consumed.
    InvalidGuess,
    /// 409: a new daily puzzle started while the page was open.
    SessionExpired,
    Transport(TransportError),
}

impl SubmitError {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => SubmitError::InvalidGuess,
            409 => SubmitError::SessionExpired,
            other => SubmitError::Transport(TransportError::Status(other)),
        }
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::InvalidGuess => write!(f, "guess not recognized"),
            SubmitError::SessionExpired => write!(f, "game session expired"),
            SubmitError::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<TransportError> for SubmitError {
    fn from(value: TransportError) -> Self {
        SubmitError::Transport(value)
    }
}

#[derive(Debug)]
pub enum TransportError {
    #[cfg(feature = "http")]
    Http(reqwest::Error),
    Status(u16),
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "http")]
            TransportError::Http(err) => write!(f, "request failed: {err}"),
            TransportError::Status(code) => write!(f, "unexpected HTTP status {code}"),
            TransportError::Decode(msg) => write!(f, "invalid response body: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            TransportError::Decode(value.to_string())
        } else {
            TransportError::Http(value)
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Page the game is served from; guesses are posted back to it.
    pub page_url: String,
    pub suggest_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_url: "http://127.0.0.1:8000/birdle/".to_string(),
            suggest_url: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(feature = "http")]
#[derive(Clone)]
pub struct HttpEndpoints {
    client: reqwest::Client,
    config: ClientConfig,
}

#[cfg(feature = "http")]
impl HttpEndpoints {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub async fn fetch_bootstrap(&self, url: &str) -> Result<GameSessionConfig, BootstrapError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(TransportError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()).into());
        }
        let text = response.text().await.map_err(TransportError::from)?;
        GameSessionConfig::from_json(&text)
    }
}

#[cfg(feature = "http")]
impl GuessEndpoint for HttpEndpoints {
    async fn submit(&self, form: GuessForm) -> Result<GuessRecord, SubmitError> {
        let response = self
            .client
            .post(&self.config.page_url)
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&form)
            .send()
            .await
            .map_err(TransportError::from)?;
        let status = response.status();
        debug!(status = status.as_u16(), "guess response");
        if !status.is_success() {
            return Err(SubmitError::from_status(status.as_u16()));
        }
        let record = response
            .json::<GuessRecord>()
            .await
            .map_err(TransportError::from)?;
        Ok(record)
    }
}

#[cfg(feature = "http")]
impl SuggestionEndpoint for HttpEndpoints {
    async fn suggest(&self, query: SuggestionQuery) -> Result<Vec<String>, TransportError> {
        let Some(url) = &self.config.suggest_url else {
            return Ok(Vec::new());
        };
        let mut params = vec![("q", query.text.as_str())];
        params.extend(
            query
                .filter
                .fields()
                .map(|(rank, value)| (rank.query_key(), value)),
        );
        let labels = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<String>>()
            .await?;
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_round_outcomes() {
        assert!(matches!(SubmitError::from_status(400), SubmitError::InvalidGuess));
        assert!(matches!(SubmitError::from_status(409), SubmitError::SessionExpired));
        assert!(matches!(
            SubmitError::from_status(502),
            SubmitError::Transport(TransportError::Status(502))
        ));
    }

    #[test]
    fn errors_render_readable_messages() {
        assert_eq!(SubmitError::InvalidGuess.to_string(), "guess not recognized");
        assert_eq!(
            SubmitError::from(TransportError::Status(500)).to_string(),
            "unexpected HTTP status 500"
        );
    }

    #[cfg(feature = "http")]
    #[test]
    fn endpoints_build_from_default_config() {
        assert!(HttpEndpoints::new(ClientConfig::default()).is_ok());
    }
}
