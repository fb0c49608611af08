// Per-card and per-set processing steps.
//
// Each step performs one focused write or aggregation. Storage rejections
// are logged and swallowed; transport errors propagate so the composite
// processors can decide whether to skip the card or the set.

pub mod cards;
pub mod images;
pub mod sets;

pub use cards::{
    ArtistCardsProcessor, ArtistTracker, CardItemsProcessor, CardProjection,
    CardsByNameProcessor, SetCardsProcessor, TrigramTracker,
};
pub use images::{CardImageProcessor, SetIconProcessor};
pub use sets::{SetAssociationsProcessor, SetCodeIndexProcessor, SetItemsProcessor, SetProjection};

use async_trait::async_trait;
use grimoire_common::Collection;
use grimoire_store::UpsertResponse;
use scryfall_client::{ScryfallCard, ScryfallSet};
use tracing::{debug, error};

use crate::error::Result;

#[async_trait]
pub trait CardStep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, card: &ScryfallCard) -> Result<()>;
}

#[async_trait]
pub trait SetStep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, set: &ScryfallSet) -> Result<()>;
}

/// Log an upsert outcome. Returns whether the store accepted the write.
pub(crate) fn log_upsert(collection: Collection, id: &str, resp: &UpsertResponse) -> bool {
    if resp.is_success() {
        debug!(%collection, id, status = resp.status_code, "Upserted");
        true
    } else {
        error!(
            %collection,
            id,
            status = resp.status_code,
            message = resp.message.as_deref().unwrap_or_default(),
            "Upsert rejected"
        );
        false
    }
}
