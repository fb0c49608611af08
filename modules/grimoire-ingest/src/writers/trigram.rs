use std::sync::Arc;

use futures::stream::{self, StreamExt};
use grimoire_common::{CardNameTrigram, Document};
use grimoire_store::Scribe;
use tracing::{info, warn};

use crate::aggregators::TrigramAggregator;
use crate::processors::log_upsert;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrigramWriteOutcome {
    pub written: usize,
    pub failed: usize,
}

/// Writes the full trigram table once, then clears the aggregator.
pub struct TrigramWriter {
    aggregator: Arc<TrigramAggregator>,
    scribe: Scribe<CardNameTrigram>,
    concurrency: usize,
}

impl TrigramWriter {
    pub fn new(aggregator: Arc<TrigramAggregator>, scribe: Scribe<CardNameTrigram>) -> Self {
        Self {
            aggregator,
            scribe,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn write_trigrams(&self) -> TrigramWriteOutcome {
        let docs = self.aggregator.documents();
        info!(trigrams = docs.len(), "Writing card-name trigrams");

        let results: Vec<bool> = stream::iter(&docs)
            .map(|doc| async move {
                match self.scribe.upsert(doc).await {
                    Ok(resp) => log_upsert(CardNameTrigram::COLLECTION, &doc.id(), &resp),
                    Err(e) => {
                        warn!(trigram = %doc.trigram, error = %e, "Trigram write failed");
                        false
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        self.aggregator.clear();

        let written = results.iter().filter(|ok| **ok).count();
        let outcome = TrigramWriteOutcome {
            written,
            failed: results.len() - written,
        };
        info!(written = outcome.written, failed = outcome.failed, "Card-name trigrams written");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use grimoire_common::{Collection, RetryPolicy};
    use grimoire_store::DocumentStore;

    use super::*;
    use crate::testing::MemoryDocumentStore;

    #[tokio::test]
    async fn writes_every_trigram_then_clears() {
        let aggregator = Arc::new(TrigramAggregator::new());
        aggregator.track_name("ABCABC");
        aggregator.track_name("Cat");

        let store = Arc::new(MemoryDocumentStore::new());
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let writer = TrigramWriter::new(aggregator.clone(), Scribe::new(dyn_store, RetryPolicy::none()))
            .with_concurrency(4);

        let outcome = writer.write_trigrams().await;

        assert_eq!(outcome, TrigramWriteOutcome { written: 4, failed: 0 });
        assert_eq!(store.count(Collection::CardNameTrigrams), 4);
        let abc = store.get(Collection::CardNameTrigrams, "abc", "abc").unwrap();
        assert_eq!(abc["entries"][0]["positions"], serde_json::json!([0, 3]));
        assert!(aggregator.is_empty());
    }

    #[tokio::test]
    async fn failures_are_counted_and_table_still_cleared() {
        let aggregator = Arc::new(TrigramAggregator::new());
        aggregator.track_name("Cat");

        let store = Arc::new(MemoryDocumentStore::new().reject(Collection::CardNameTrigrams, 400));
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let writer = TrigramWriter::new(aggregator.clone(), Scribe::new(dyn_store, RetryPolicy::none()));

        let outcome = writer.write_trigrams().await;

        assert_eq!(outcome, TrigramWriteOutcome { written: 0, failed: 1 });
        assert!(aggregator.is_empty());
    }
}
