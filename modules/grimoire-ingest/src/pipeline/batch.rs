use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scryfall_client::ScryfallSet;
use tracing::{error, info};

use super::set_processor::SetProcessor;
use super::stats::IngestStats;
use crate::error::{IngestError, Result};
use crate::traits::CardSource;
use crate::writers::ArtistAggregateWriter;

pub(crate) fn check_cancelled_flag(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        info!("Ingestion cancelled");
        return Err(IngestError::Cancelled);
    }
    Ok(())
}

/// What happens to tracked artists at each batch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtistFlush {
    /// Upsert every dirty aggregate.
    Write,
    /// Drop the aggregates unwritten. For runs over a subset of sets, whose
    /// aggregates are partial.
    Discard,
}

/// Top-level orchestrator: fixed-size batches of sets, one artist flush
/// per batch.
pub struct BatchSetProcessor {
    sets: SetProcessor,
    artist_writer: ArtistAggregateWriter,
    batch_size: usize,
    cancelled: Arc<AtomicBool>,
}

impl BatchSetProcessor {
    pub fn new(
        sets: SetProcessor,
        artist_writer: ArtistAggregateWriter,
        batch_size: usize,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sets,
            artist_writer,
            batch_size: batch_size.max(1),
            cancelled,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn set_processor(&self) -> &SetProcessor {
        &self.sets
    }

    /// Process every set, flushing artists after each batch.
    ///
    /// A failing set is logged and skipped. The flush only starts once
    /// every set of the batch has finished, so no card of the next batch is
    /// tracked before it. On cancellation the current batch is flushed and
    /// `IngestError::Cancelled` is returned; `stats` holds the partial
    /// counts either way.
    pub async fn process_sets<S>(
        &self,
        source: &S,
        sets: &[ScryfallSet],
        flush: ArtistFlush,
        stats: &mut IngestStats,
    ) -> Result<()>
    where
        S: CardSource + ?Sized,
    {
        let total = sets.len();
        stats.sets_total += total as u32;
        let mut done = 0usize;

        for batch in sets.chunks(self.batch_size) {
            stats.batches += 1;

            for set in batch {
                if let Err(e) = check_cancelled_flag(&self.cancelled) {
                    self.flush(flush, stats).await;
                    return Err(e);
                }

                match self.sets.process(source, set).await {
                    Ok(outcome) => {
                        stats.sets_processed += 1;
                        stats.cards_processed += outcome.cards_processed;
                        stats.cards_failed += outcome.cards_failed;
                        stats.set_steps_failed += outcome.steps_failed;
                    }
                    Err(e) => {
                        error!(set_code = %set.code, error = %e, "Set failed, skipping");
                        stats.sets_failed += 1;
                    }
                }
                done += 1;
            }

            self.flush(flush, stats).await;
            info!(done, total, batch = stats.batches, "Batch complete");
        }

        info!(sets = total, "All sets processed");
        Ok(())
    }

    async fn flush(&self, flush: ArtistFlush, stats: &mut IngestStats) {
        match flush {
            ArtistFlush::Write => {
                let outcome = self.artist_writer.flush().await;
                stats.artist_flushes += 1;
                stats.artists_flushed += outcome.artists as u32;
                stats.artist_writes_failed += outcome.failed_writes as u32;
            }
            ArtistFlush::Discard => {
                stats.artists_discarded += self.artist_writer.discard() as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use grimoire_common::{Collection, RetryPolicy};
    use grimoire_store::{DocumentStore, Scribe};

    use super::*;
    use crate::aggregators::ArtistAggregator;
    use crate::pipeline::CardProcessor;
    use crate::processors::{ArtistTracker, CardItemsProcessor, CardStep, SetItemsProcessor, SetStep};
    use crate::testing::{card_by, set, MemoryDocumentStore, MockCardSource};
    use crate::writers::{ArtistItemsWriter, ArtistWriteStep};

    struct Fixture {
        store: Arc<MemoryDocumentStore>,
        artists: Arc<ArtistAggregator>,
        cancelled: Arc<AtomicBool>,
        batch: BatchSetProcessor,
    }

    fn fixture(store: MemoryDocumentStore, batch_size: usize) -> Fixture {
        let store = Arc::new(store);
        let docs: Arc<dyn DocumentStore> = store.clone();
        let retry = RetryPolicy::none();
        let artists = Arc::new(ArtistAggregator::new());
        let cancelled = Arc::new(AtomicBool::new(false));

        let card_steps: Vec<Box<dyn CardStep>> = vec![
            Box::new(CardItemsProcessor::card_items(Scribe::new(docs.clone(), retry))),
            Box::new(ArtistTracker::new(artists.clone())),
        ];
        let set_steps: Vec<Box<dyn SetStep>> =
            vec![Box::new(SetItemsProcessor::set_items(Scribe::new(docs.clone(), retry)))];
        let artist_steps: Vec<Box<dyn ArtistWriteStep>> =
            vec![Box::new(ArtistItemsWriter::new(Scribe::new(docs, retry)))];

        let batch = BatchSetProcessor::new(
            SetProcessor::new(set_steps, CardProcessor::new(card_steps)),
            ArtistAggregateWriter::new(artists.clone(), artist_steps),
            batch_size,
            cancelled.clone(),
        );
        Fixture {
            store,
            artists,
            cancelled,
            batch,
        }
    }

    fn source(codes: &[&str]) -> MockCardSource {
        codes.iter().fold(MockCardSource::new(), |source, code| {
            source.with_set(set(code, code), vec![card_by(&format!("{code} card"), code, code)])
        })
    }

    #[tokio::test]
    async fn flushes_once_per_batch() {
        let f = fixture(MemoryDocumentStore::new(), 3);
        let source = source(&["a", "b", "c", "d", "e", "f", "g"]);
        let mut stats = IngestStats::default();

        f.batch
            .process_sets(&source, source.sets(), ArtistFlush::Write, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.batches, 3);
        assert_eq!(stats.artist_flushes, 3);
        assert_eq!(stats.artists_flushed, 7);
        assert_eq!(f.store.count(Collection::ArtistItems), 7);
    }

    #[tokio::test]
    async fn zero_batch_size_is_treated_as_one() {
        let f = fixture(MemoryDocumentStore::new(), 0);
        assert_eq!(f.batch.batch_size(), 1);
    }

    #[tokio::test]
    async fn discard_mode_leaves_artist_documents_alone() {
        let f = fixture(MemoryDocumentStore::new(), 2);
        let source = source(&["a", "b", "c"]);
        let mut stats = IngestStats::default();

        f.batch
            .process_sets(&source, source.sets(), ArtistFlush::Discard, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.sets_processed, 3);
        assert_eq!(stats.artist_flushes, 0);
        assert_eq!(stats.artists_discarded, 3);
        assert_eq!(f.store.count(Collection::ArtistItems), 0);
        assert_eq!(f.store.count(Collection::CardItems), 3);
        assert!(f.artists.is_empty());
    }

    #[tokio::test]
    async fn cancellation_flushes_before_returning() {
        let f = fixture(MemoryDocumentStore::new(), 10);
        let source = source(&["a", "b"]);
        f.cancelled.store(true, Ordering::Relaxed);
        let mut stats = IngestStats::default();

        let err = f
            .batch
            .process_sets(&source, source.sets(), ArtistFlush::Write, &mut stats)
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Cancelled));
        assert_eq!(stats.sets_processed, 0);
        assert_eq!(stats.artist_flushes, 1);
    }

    #[tokio::test]
    async fn failing_set_is_counted_and_skipped() {
        let f = fixture(MemoryDocumentStore::new(), 10);
        let source = source(&["a", "b", "c"]).break_stream_after("b", 0);
        let mut stats = IngestStats::default();

        f.batch
            .process_sets(&source, source.sets(), ArtistFlush::Write, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.sets_processed, 2);
        assert_eq!(stats.sets_failed, 1);
        assert_eq!(f.store.count(Collection::CardItems), 2);
    }
}
