use std::sync::Arc;

use async_trait::async_trait;
use grimoire_common::{ArtistCard, CardByName, CardItem, Document, SetCard};
use grimoire_store::Scribe;
use scryfall_client::ScryfallCard;
use tracing::trace;

use super::{log_upsert, CardStep};
use crate::aggregators::{ArtistAggregator, TrigramAggregator};
use crate::error::Result;
use crate::mappers;

/// Map the card into one document and upsert it.
pub struct CardProjection<D> {
    name: &'static str,
    scribe: Scribe<D>,
    map: fn(&ScryfallCard) -> D,
}

pub type SetCardsProcessor = CardProjection<SetCard>;
pub type CardItemsProcessor = CardProjection<CardItem>;
pub type CardsByNameProcessor = CardProjection<CardByName>;

impl<D: Document> CardProjection<D> {
    pub fn new(name: &'static str, scribe: Scribe<D>, map: fn(&ScryfallCard) -> D) -> Self {
        Self { name, scribe, map }
    }
}

impl CardProjection<SetCard> {
    pub fn set_cards(scribe: Scribe<SetCard>) -> Self {
        Self::new("set_cards", scribe, mappers::to_set_card)
    }
}

impl CardProjection<CardItem> {
    pub fn card_items(scribe: Scribe<CardItem>) -> Self {
        Self::new("card_items", scribe, mappers::to_card_item)
    }
}

impl CardProjection<CardByName> {
    pub fn cards_by_name(scribe: Scribe<CardByName>) -> Self {
        Self::new("cards_by_name", scribe, mappers::to_card_by_name)
    }
}

#[async_trait]
impl<D: Document + 'static> CardStep for CardProjection<D> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn process(&self, card: &ScryfallCard) -> Result<()> {
        let doc = (self.map)(card);
        let resp = self.scribe.upsert(&doc).await?;
        log_upsert(D::COLLECTION, &doc.id(), &resp);
        Ok(())
    }
}

/// Writes one ArtistCards document per artist straight from the card,
/// without waiting for the batch flush.
pub struct ArtistCardsProcessor {
    scribe: Scribe<ArtistCard>,
}

impl ArtistCardsProcessor {
    pub fn new(scribe: Scribe<ArtistCard>) -> Self {
        Self { scribe }
    }
}

#[async_trait]
impl CardStep for ArtistCardsProcessor {
    fn name(&self) -> &'static str {
        "artist_cards"
    }

    async fn process(&self, card: &ScryfallCard) -> Result<()> {
        let summary = mappers::artist_card_summary(card);
        for artist_id in &card.artist_ids {
            let doc = ArtistCard {
                artist_id: *artist_id,
                card_data: summary.clone(),
            };
            let resp = self.scribe.upsert(&doc).await?;
            log_upsert(ArtistCard::COLLECTION, &doc.id(), &resp);
        }
        Ok(())
    }
}

/// Tracking only; artist documents are written at batch flush.
pub struct ArtistTracker {
    aggregator: Arc<ArtistAggregator>,
}

impl ArtistTracker {
    pub fn new(aggregator: Arc<ArtistAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl CardStep for ArtistTracker {
    fn name(&self) -> &'static str {
        "artist_tracking"
    }

    async fn process(&self, card: &ScryfallCard) -> Result<()> {
        let artists = self.aggregator.track(card);
        trace!(card_id = %card.id, artists, "Tracked artists");
        Ok(())
    }
}

/// Tracking only; trigram documents are written once at run end.
pub struct TrigramTracker {
    aggregator: Arc<TrigramAggregator>,
}

impl TrigramTracker {
    pub fn new(aggregator: Arc<TrigramAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl CardStep for TrigramTracker {
    fn name(&self) -> &'static str {
        "trigram_tracking"
    }

    async fn process(&self, card: &ScryfallCard) -> Result<()> {
        let trigrams = self.aggregator.track(card);
        trace!(card_id = %card.id, trigrams, "Tracked trigrams");
        Ok(())
    }
}
