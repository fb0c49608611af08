use grimoire_store::StoreError;
use scryfall_client::ScryfallError;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Source error: {0}")]
    Source(#[from] ScryfallError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Download failed for {url}: {message}")]
    Download {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl IngestError {
    /// Operational failures the per-card and per-set handlers log and skip.
    /// Anything else (malformed payloads, serialization bugs) propagates to
    /// the batch boundary.
    pub fn is_transient(&self) -> bool {
        match self {
            IngestError::Source(e) => e.is_transient(),
            IngestError::Store(e) => e.is_transient(),
            IngestError::Download { .. } | IngestError::Cancelled | IngestError::InvalidOperation(_) => true,
        }
    }

    /// Whether another attempt at the same download could succeed.
    pub(crate) fn is_retryable_download(&self) -> bool {
        match self {
            IngestError::Download { status: None, .. } => true,
            IngestError::Download {
                status: Some(status),
                ..
            } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
