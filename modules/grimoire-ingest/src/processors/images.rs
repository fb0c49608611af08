use std::sync::Arc;

use async_trait::async_trait;
use grimoire_common::Blob;
use grimoire_store::BlobScribe;
use scryfall_client::{ImageSize, ImageVariant, ScryfallCard, ScryfallSet};
use tracing::{debug, error, warn};

use super::{CardStep, SetStep};
use crate::error::Result;
use crate::traits::Downloader;

/// Log a blob write outcome. Returns whether the store accepted it.
fn log_blob_write(blob: &Blob, value: Option<&str>) -> bool {
    match value {
        Some(location) => {
            debug!(container = %blob.container, name = %blob.name, location, "Blob written");
            true
        }
        None => {
            error!(container = %blob.container, name = %blob.name, "Blob write returned no location");
            false
        }
    }
}

/// Downloads and stores every image resolution a card exposes. Each
/// resolution is independent: a failed download or write is logged and
/// the remaining resolutions still run.
pub struct CardImageProcessor {
    downloader: Arc<dyn Downloader>,
    blobs: BlobScribe,
    /// Resolutions to keep. Empty means all.
    sizes: Vec<ImageSize>,
}

impl CardImageProcessor {
    pub fn new(downloader: Arc<dyn Downloader>, blobs: BlobScribe, sizes: Vec<ImageSize>) -> Self {
        Self {
            downloader,
            blobs,
            sizes,
        }
    }

    fn wants(&self, size: ImageSize) -> bool {
        self.sizes.is_empty() || self.sizes.contains(&size)
    }

    async fn store_variant(&self, card: &ScryfallCard, variant: &ImageVariant) -> Result<bool> {
        let bytes = self.downloader.download(&variant.url).await?;
        let blob = Blob::card_image(
            card.id,
            variant.face,
            variant.size.as_str(),
            variant.size.extension(),
            variant.size.content_type(),
            bytes,
        );
        let resp = self.blobs.write(&blob).await?;
        Ok(log_blob_write(&blob, resp.value.as_deref()))
    }
}

#[async_trait]
impl CardStep for CardImageProcessor {
    fn name(&self) -> &'static str {
        "card_image"
    }

    async fn process(&self, card: &ScryfallCard) -> Result<()> {
        let variants: Vec<ImageVariant> = card
            .image_variants()
            .into_iter()
            .filter(|v| self.wants(v.size))
            .collect();

        let mut stored = 0;
        for variant in &variants {
            match self.store_variant(card, variant).await {
                Ok(true) => stored += 1,
                Ok(false) => {}
                Err(e) if e.is_transient() => {
                    warn!(
                        card_id = %card.id,
                        size = %variant.size,
                        face = variant.face,
                        error = %e,
                        "Card image failed, skipping resolution"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        debug!(card_id = %card.id, stored, total = variants.len(), "Card images processed");
        Ok(())
    }
}

pub struct SetIconProcessor {
    downloader: Arc<dyn Downloader>,
    blobs: BlobScribe,
}

impl SetIconProcessor {
    pub fn new(downloader: Arc<dyn Downloader>, blobs: BlobScribe) -> Self {
        Self { downloader, blobs }
    }
}

#[async_trait]
impl SetStep for SetIconProcessor {
    fn name(&self) -> &'static str {
        "set_icon"
    }

    async fn process(&self, set: &ScryfallSet) -> Result<()> {
        let Some(url) = set.icon_svg_uri.as_deref() else {
            debug!(set_code = %set.code, "Set has no icon");
            return Ok(());
        };

        let bytes = self.downloader.download(url).await?;
        let blob = Blob::set_icon(&set.code, bytes);
        let resp = self.blobs.write(&blob).await?;
        log_blob_write(&blob, resp.value.as_deref());
        Ok(())
    }
}
