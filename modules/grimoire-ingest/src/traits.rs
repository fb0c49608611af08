// Trait seams for the pipeline's external dependencies.
//
// CardSource: where sets and their cards come from (Scryfall in production).
// Downloader: raw bytes for card images and set icons.
//
// Storage seams (DocumentStore, BlobStore) live in grimoire-store.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};

use scryfall_client::{ScryfallCard, ScryfallClient, ScryfallSet};

use crate::error::{IngestError, Result};

#[async_trait]
pub trait CardSource: Send + Sync {
    /// Every set the source knows about.
    async fn fetch_all_sets(&self) -> Result<Vec<ScryfallSet>>;

    /// Lazy, finite stream of the set's cards. Not restartable; call again
    /// for a fresh pass.
    fn cards<'a>(&'a self, set: &ScryfallSet) -> BoxStream<'a, Result<ScryfallCard>>;
}

#[async_trait]
impl CardSource for ScryfallClient {
    async fn fetch_all_sets(&self) -> Result<Vec<ScryfallSet>> {
        Ok(ScryfallClient::fetch_all_sets(self).await?)
    }

    fn cards<'a>(&'a self, set: &ScryfallSet) -> BoxStream<'a, Result<ScryfallCard>> {
        self.set_cards(&set.code).map_err(IngestError::from).boxed()
    }
}

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Bytes>;
}
