pub mod error;
pub mod types;

pub use error::{Result, ScryfallError};
pub use types::{
    CardFace, ImageSize, ImageUris, ImageVariant, ListResponse, Prices, ScryfallCard, ScryfallSet,
};

use std::time::Duration;

use async_stream::try_stream;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.scryfall.com";

/// Scryfall asks clients to keep to roughly ten requests per second.
const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

const USER_AGENT: &str = concat!("grimoire-ingest/", env!("CARGO_PKG_VERSION"));

pub struct ScryfallClient {
    client: reqwest::Client,
    base_url: String,
    request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl ScryfallClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            request_interval: DEFAULT_REQUEST_INTERVAL,
            last_request: Mutex::new(None),
        }
    }

    /// Minimum spacing between consecutive requests from this client.
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    /// Fetch every set Scryfall knows about, following pagination.
    pub async fn fetch_all_sets(&self) -> Result<Vec<ScryfallSet>> {
        let mut sets = Vec::new();
        let mut next = Some(format!("{}/sets", self.base_url));

        while let Some(url) = next.take() {
            let page: ListResponse<ScryfallSet> = self.get_json(&url).await?;
            sets.extend(page.data);
            if page.has_more {
                next = page.next_page;
            }
        }

        tracing::info!(count = sets.len(), "Fetched Scryfall sets");
        Ok(sets)
    }

    /// Lazily stream every printing in a set, one page at a time.
    ///
    /// The stream is finite and not restartable; call again for a fresh pass.
    /// A set without cards yields an empty stream rather than an error.
    pub fn set_cards(&self, set_code: &str) -> BoxStream<'_, Result<ScryfallCard>> {
        let set_code = set_code.to_string();
        Box::pin(try_stream! {
            let first = reqwest::Url::parse_with_params(
                &format!("{}/cards/search", self.base_url),
                &[
                    ("q", format!("e:{set_code}")),
                    ("unique", "prints".to_string()),
                    ("include_extras", "true".to_string()),
                    ("include_variations", "true".to_string()),
                    ("order", "set".to_string()),
                ],
            )
            .map_err(|e| ScryfallError::Parse(e.to_string()))?;

            let mut next = Some(first.to_string());
            let mut first_page = true;

            while let Some(url) = next.take() {
                let page: ListResponse<ScryfallCard> = match self.get_json(&url).await {
                    Ok(page) => page,
                    Err(ScryfallError::Api { status: 404, .. }) if first_page => {
                        tracing::debug!(set_code = %set_code, "Set has no searchable cards");
                        break;
                    }
                    Err(e) => Err(e)?,
                };
                first_page = false;

                if page.has_more {
                    next = page.next_page;
                }
                for card in page.data {
                    yield card;
                }
            }
        })
    }

    /// Download raw bytes (card images, set icons).
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScryfallError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.bytes().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.pace().await;

        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<types::ApiErrorBody>(&body)
                .map(|e| format!("{}: {}", e.code, e.details))
                .unwrap_or(body);
            return Err(ScryfallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.request_interval {
                tokio::time::sleep(self.request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for ScryfallClient {
    fn default() -> Self {
        Self::new()
    }
}
