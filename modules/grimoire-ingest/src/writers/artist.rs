// Artist flush: every dirty aggregate goes through four writers, then the
// aggregator is marked clean.

use std::sync::Arc;

use async_trait::async_trait;
use grimoire_common::{ArtistCard, ArtistItem, ArtistSet, Document, SetArtist};
use grimoire_store::Scribe;
use tracing::{info, warn};

use crate::aggregators::{ArtistAggregate, ArtistAggregator};
use crate::error::Result;
use crate::processors::log_upsert;

#[async_trait]
pub trait ArtistWriteStep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, aggregate: &ArtistAggregate) -> Result<()>;
}

/// Upsert each document, logging rejections. Stops at the first transport
/// error.
async fn upsert_all<D: Document>(scribe: &Scribe<D>, docs: &[D]) -> Result<()> {
    for doc in docs {
        let resp = scribe.upsert(doc).await?;
        log_upsert(D::COLLECTION, &doc.id(), &resp);
    }
    Ok(())
}

fn name_variants(aggregate: &ArtistAggregate) -> Vec<String> {
    aggregate.name_variants.iter().cloned().collect()
}

/// The aggregate summary as one document.
pub struct ArtistItemsWriter {
    scribe: Scribe<ArtistItem>,
}

impl ArtistItemsWriter {
    pub fn new(scribe: Scribe<ArtistItem>) -> Self {
        Self { scribe }
    }
}

#[async_trait]
impl ArtistWriteStep for ArtistItemsWriter {
    fn name(&self) -> &'static str {
        "artist_items"
    }

    async fn write(&self, aggregate: &ArtistAggregate) -> Result<()> {
        let doc = ArtistItem {
            artist_id: aggregate.artist_id,
            name_variants: name_variants(aggregate),
            card_ids: aggregate.card_ids(),
            set_ids: aggregate.set_ids(),
            set_codes: aggregate.set_codes(),
        };
        upsert_all(&self.scribe, std::slice::from_ref(&doc)).await
    }
}

/// One join document per tracked card.
pub struct ArtistCardsWriter {
    scribe: Scribe<ArtistCard>,
}

impl ArtistCardsWriter {
    pub fn new(scribe: Scribe<ArtistCard>) -> Self {
        Self { scribe }
    }
}

#[async_trait]
impl ArtistWriteStep for ArtistCardsWriter {
    fn name(&self) -> &'static str {
        "artist_cards"
    }

    async fn write(&self, aggregate: &ArtistAggregate) -> Result<()> {
        let docs: Vec<ArtistCard> = aggregate
            .cards
            .values()
            .map(|summary| ArtistCard {
                artist_id: aggregate.artist_id,
                card_data: summary.clone(),
            })
            .collect();
        upsert_all(&self.scribe, &docs).await
    }
}

/// Sets by artist.
pub struct ArtistSetsWriter {
    scribe: Scribe<ArtistSet>,
}

impl ArtistSetsWriter {
    pub fn new(scribe: Scribe<ArtistSet>) -> Self {
        Self { scribe }
    }
}

#[async_trait]
impl ArtistWriteStep for ArtistSetsWriter {
    fn name(&self) -> &'static str {
        "artist_sets"
    }

    async fn write(&self, aggregate: &ArtistAggregate) -> Result<()> {
        let docs: Vec<ArtistSet> = aggregate
            .sets
            .iter()
            .map(|(set_id, set_code)| ArtistSet {
                artist_id: aggregate.artist_id,
                set_id: *set_id,
                set_code: set_code.clone(),
                artist_names: name_variants(aggregate),
            })
            .collect();
        upsert_all(&self.scribe, &docs).await
    }
}

/// Artists by set.
pub struct SetArtistsWriter {
    scribe: Scribe<SetArtist>,
}

impl SetArtistsWriter {
    pub fn new(scribe: Scribe<SetArtist>) -> Self {
        Self { scribe }
    }
}

#[async_trait]
impl ArtistWriteStep for SetArtistsWriter {
    fn name(&self) -> &'static str {
        "set_artists"
    }

    async fn write(&self, aggregate: &ArtistAggregate) -> Result<()> {
        let docs: Vec<SetArtist> = aggregate
            .sets
            .iter()
            .map(|(set_id, set_code)| SetArtist {
                set_id: *set_id,
                set_code: set_code.clone(),
                artist_id: aggregate.artist_id,
                artist_names: name_variants(aggregate),
            })
            .collect();
        upsert_all(&self.scribe, &docs).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub artists: usize,
    pub failed_writes: usize,
}

pub struct ArtistAggregateWriter {
    aggregator: Arc<ArtistAggregator>,
    steps: Vec<Box<dyn ArtistWriteStep>>,
}

impl ArtistAggregateWriter {
    pub fn new(aggregator: Arc<ArtistAggregator>, steps: Vec<Box<dyn ArtistWriteStep>>) -> Self {
        Self { aggregator, steps }
    }

    /// Write every dirty aggregate, then mark all clean. Write failures are
    /// logged per artist and writer; the flush always completes.
    pub async fn flush(&self) -> FlushOutcome {
        let dirty = self.aggregator.dirty();
        let mut outcome = FlushOutcome {
            artists: dirty.len(),
            failed_writes: 0,
        };

        for aggregate in &dirty {
            for step in &self.steps {
                if let Err(e) = step.write(aggregate).await {
                    warn!(
                        artist_id = %aggregate.artist_id,
                        writer = step.name(),
                        error = %e,
                        "Artist write failed"
                    );
                    outcome.failed_writes += 1;
                }
            }
        }

        self.aggregator.mark_all_clean();
        info!(
            artists = outcome.artists,
            failed_writes = outcome.failed_writes,
            "Flushed artist aggregates"
        );
        outcome
    }

    /// Drop every tracked aggregate without writing. Returns how many were
    /// dirty.
    pub fn discard(&self) -> usize {
        let dirty = self.aggregator.dirty_count();
        self.aggregator.clear();
        info!(artists = dirty, "Discarded artist aggregates");
        dirty
    }
}
