use thiserror::Error;

/// Errors surfaced by the `Indicators` and `Climate` clients.
///
/// Every failure is terminal for the call that raised it: a request that fans out
/// over several indicators, locations or date windows fails as a whole if any single
/// sub-request fails.
#[derive(Debug, Error)]
pub enum Error {
    /// Two options that share a URL slot were both supplied (`topic` and `source`).
    #[error("options `{first}` and `{second}` cannot be combined")]
    ConfigurationConflict {
        first: &'static str,
        second: &'static str,
    },

    /// The payload parsed as JSON but does not have the expected envelope/record shape.
    #[error("unexpected response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    /// The World Bank API answered with its own error payload (`[{"message": ...}]`).
    #[error("world bank api error from {url}: {message}")]
    Api { url: String, message: String },

    /// The injected fetcher failed. Not retried by the clients.
    #[error("GET {url} failed")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The response body was not valid JSON.
    #[error("decode json from {url}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(url: &str, message: impl Into<String>) -> Self {
        Error::MalformedResponse {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
