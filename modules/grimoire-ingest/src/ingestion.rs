// Default wiring of the pipeline from configuration, and the run driver.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use grimoire_common::{Config, Document, RetryPolicy};
use grimoire_store::{BlobScribe, BlobStore, DocumentStore, Scribe};
use scryfall_client::{ImageSize, ScryfallSet};
use tracing::{info, warn};

use crate::aggregators::{ArtistAggregator, TrigramAggregator};
use crate::error::{IngestError, Result};
use crate::pipeline::{ArtistFlush, BatchSetProcessor, CardProcessor, IngestStats, SetProcessor};
use crate::processors::{
    ArtistCardsProcessor, ArtistTracker, CardImageProcessor, CardItemsProcessor, CardStep,
    CardsByNameProcessor, SetAssociationsProcessor, SetCardsProcessor, SetCodeIndexProcessor,
    SetIconProcessor, SetItemsProcessor, SetStep, TrigramTracker,
};
use crate::traits::{CardSource, Downloader};
use crate::writers::{
    ArtistAggregateWriter, ArtistCardsWriter, ArtistItemsWriter, ArtistSetsWriter, ArtistWriteStep,
    SetArtistsWriter, TrigramWriter,
};

/// Which sets a run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetFilter {
    codes: BTreeSet<String>,
}

impl SetFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to these set codes (case-insensitive). An empty list means all.
    pub fn codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|c| c.as_ref().trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    /// Whether every set passes.
    pub fn is_all(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn matches(&self, set: &ScryfallSet) -> bool {
        self.codes.is_empty() || self.codes.contains(&set.code.to_lowercase())
    }
}

pub struct Ingestion {
    batch: BatchSetProcessor,
    trigram_writer: TrigramWriter,
    artists: Arc<ArtistAggregator>,
    trigrams: Arc<TrigramAggregator>,
    cancelled: Arc<AtomicBool>,
    running: AtomicBool,
    retry: RetryPolicy,
    write_trigrams: bool,
}

impl Ingestion {
    pub fn new(
        config: &Config,
        document_store: Arc<dyn DocumentStore>,
        blob_store: Arc<dyn BlobStore>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        let retry = config.retry;
        let artists = Arc::new(ArtistAggregator::new());
        let trigrams = Arc::new(TrigramAggregator::new());
        let cancelled = Arc::new(AtomicBool::new(false));
        let blobs = BlobScribe::new(blob_store, retry);

        let scribes = Scribes {
            store: document_store,
            retry,
        };

        // Card steps: writers and trackers in fixed order, optional steps last.
        let mut card_steps: Vec<Box<dyn CardStep>> = vec![
            Box::new(SetCardsProcessor::set_cards(scribes.scribe())),
            Box::new(CardItemsProcessor::card_items(scribes.scribe())),
            Box::new(ArtistTracker::new(artists.clone())),
            Box::new(CardsByNameProcessor::cards_by_name(scribes.scribe())),
            Box::new(TrigramTracker::new(trigrams.clone())),
        ];
        if config.artist_cards_direct {
            card_steps.push(Box::new(ArtistCardsProcessor::new(scribes.scribe())));
        }
        if config.download_images {
            card_steps.push(Box::new(CardImageProcessor::new(
                downloader.clone(),
                blobs.clone(),
                image_sizes(&config.image_sizes),
            )));
        }

        let mut set_steps: Vec<Box<dyn SetStep>> = vec![
            Box::new(SetItemsProcessor::set_items(scribes.scribe())),
            Box::new(SetAssociationsProcessor::set_associations(scribes.scribe())),
            Box::new(SetCodeIndexProcessor::set_code_index(scribes.scribe())),
        ];
        if config.download_images {
            set_steps.push(Box::new(SetIconProcessor::new(downloader, blobs)));
        }

        let artist_steps: Vec<Box<dyn ArtistWriteStep>> = vec![
            Box::new(ArtistItemsWriter::new(scribes.scribe())),
            Box::new(ArtistCardsWriter::new(scribes.scribe())),
            Box::new(ArtistSetsWriter::new(scribes.scribe())),
            Box::new(SetArtistsWriter::new(scribes.scribe())),
        ];

        let set_processor = SetProcessor::new(set_steps, CardProcessor::new(card_steps))
            .with_concurrency(config.card_concurrency);
        let batch = BatchSetProcessor::new(
            set_processor,
            ArtistAggregateWriter::new(artists.clone(), artist_steps),
            config.set_batch_size,
            cancelled.clone(),
        );
        let trigram_writer = TrigramWriter::new(trigrams.clone(), scribes.scribe())
            .with_concurrency(config.card_concurrency);

        Self {
            batch,
            trigram_writer,
            artists,
            trigrams,
            cancelled,
            running: AtomicBool::new(false),
            retry,
            write_trigrams: true,
        }
    }

    /// Leave the trigram table unwritten at run end.
    pub fn skip_trigrams(mut self) -> Self {
        self.write_trigrams = false;
        self
    }

    /// Setting this flag stops the run before the next set. It is cleared
    /// when the run ends, so the instance can run again.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn batch_processor(&self) -> &BatchSetProcessor {
        &self.batch
    }

    pub fn artists(&self) -> &ArtistAggregator {
        &self.artists
    }

    pub fn trigrams(&self) -> &TrigramAggregator {
        &self.trigrams
    }

    pub async fn run<S>(&self, source: &S, filter: &SetFilter) -> Result<IngestStats>
    where
        S: CardSource + ?Sized,
    {
        let mut stats = IngestStats::default();
        self.run_into(source, filter, &mut stats).await?;
        Ok(stats)
    }

    /// Like `run`, but leaves partial counts in `stats` when the run is
    /// cancelled or fails.
    ///
    /// Runs share the aggregators, so a second run on the same instance
    /// while one is in flight fails with `InvalidOperation`.
    ///
    /// A filtered run writes the set and card projections only. Artist and
    /// trigram documents are built from every set, so they are left as the
    /// last full run wrote them.
    pub async fn run_into<S>(&self, source: &S, filter: &SetFilter, stats: &mut IngestStats) -> Result<()>
    where
        S: CardSource + ?Sized,
    {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(IngestError::InvalidOperation(
                "an ingestion run is already in progress".into(),
            ));
        }
        let _guard = RunGuard {
            running: &self.running,
            cancelled: &self.cancelled,
        };

        let started = Instant::now();
        self.artists.clear();
        self.trigrams.clear();

        let result = self.run_inner(source, filter, stats).await;
        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        result
    }

    async fn run_inner<S>(&self, source: &S, filter: &SetFilter, stats: &mut IngestStats) -> Result<()>
    where
        S: CardSource + ?Sized,
    {
        let sets: Vec<ScryfallSet> = self
            .retry
            .run(
                "fetch sets",
                || source.fetch_all_sets(),
                |outcome| matches!(outcome, Err(e) if e.is_transient()),
            )
            .await?
            .into_iter()
            .filter(|set| filter.matches(set))
            .collect();
        info!(sets = sets.len(), "Starting ingestion");

        let full_run = filter.is_all();
        if !full_run {
            info!("Filtered run: artist and trigram documents are left unchanged");
        }
        let flush = if full_run {
            ArtistFlush::Write
        } else {
            ArtistFlush::Discard
        };

        self.batch.process_sets(source, &sets, flush, stats).await?;

        if !full_run {
            self.trigrams.clear();
        } else if self.write_trigrams {
            let outcome = self.trigram_writer.write_trigrams().await;
            stats.trigrams_written += outcome.written as u32;
            stats.trigrams_failed += outcome.failed as u32;
        } else {
            info!(trigrams = self.trigrams.len(), "Skipping trigram write");
        }

        Ok(())
    }
}

/// Clears the running and cancel flags when the run ends or its future is
/// dropped.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    cancelled: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.cancelled.store(false, Ordering::Relaxed);
        self.running.store(false, Ordering::Release);
    }
}

/// Hands out typed scribes over one shared document store.
struct Scribes {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
}

impl Scribes {
    fn scribe<D: Document>(&self) -> Scribe<D> {
        Scribe::new(self.store.clone(), self.retry)
    }
}

fn image_sizes(names: &[String]) -> Vec<ImageSize> {
    names
        .iter()
        .filter_map(|name| {
            let size = ImageSize::parse(name);
            if size.is_none() {
                warn!(size = %name, "Ignoring unknown image size");
            }
            size
        })
        .collect()
}
