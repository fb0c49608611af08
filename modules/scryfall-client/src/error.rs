use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScryfallError>;

#[derive(Debug, Error)]
pub enum ScryfallError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ScryfallError {
    /// Worth retrying or skipping past: connection failures, timeouts,
    /// throttling and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            ScryfallError::Network(_) => true,
            ScryfallError::Api { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            ScryfallError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for ScryfallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ScryfallError::Parse(err.to_string())
        } else {
            ScryfallError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ScryfallError {
    fn from(err: serde_json::Error) -> Self {
        ScryfallError::Parse(err.to_string())
    }
}
