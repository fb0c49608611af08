use futures::StreamExt;
use scryfall_client::ScryfallSet;
use tracing::{info, warn};
use uuid::Uuid;

use super::card_processor::CardProcessor;
use crate::error::{IngestError, Result};
use crate::processors::SetStep;
use crate::traits::CardSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOutcome {
    pub cards_processed: u32,
    pub cards_failed: u32,
    pub steps_failed: u32,
}

/// Writes the set-level projections, then streams the set's cards through
/// the card processor.
pub struct SetProcessor {
    steps: Vec<Box<dyn SetStep>>,
    cards: CardProcessor,
    concurrency: usize,
}

impl SetProcessor {
    pub fn new(steps: Vec<Box<dyn SetStep>>, cards: CardProcessor) -> Self {
        Self {
            steps,
            cards,
            concurrency: 1,
        }
    }

    /// Process up to `concurrency` cards of a set at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn card_processor(&self) -> &CardProcessor {
        &self.cards
    }

    /// Set-level writes always complete before the first card is pulled.
    ///
    /// Transient failures are logged and skipped: per step for the set
    /// projections, per card for the card stream. Anything else, and any
    /// error pulling from the stream itself, is returned so the batch can
    /// skip the whole set.
    pub async fn process<S>(&self, source: &S, set: &ScryfallSet) -> Result<SetOutcome>
    where
        S: CardSource + ?Sized,
    {
        info!(set_code = %set.code, name = %set.name, "Processing set");
        let mut outcome = SetOutcome::default();

        for step in &self.steps {
            if let Err(e) = step.process(set).await {
                if !e.is_transient() {
                    return Err(e);
                }
                warn!(set_code = %set.code, step = step.name(), error = %e, "Set step failed, continuing");
                outcome.steps_failed += 1;
            }
        }

        let mut results = source
            .cards(set)
            .map(|pulled| async move {
                let card = pulled?;
                let result = self.cards.process(&card).await;
                Ok::<_, IngestError>(CardResult {
                    card_id: card.id,
                    name: card.name,
                    result,
                })
            })
            .buffer_unordered(self.concurrency);

        while let Some(pulled) = results.next().await {
            let CardResult { card_id, name, result } = pulled?;
            match result {
                Ok(()) => outcome.cards_processed += 1,
                Err(e) if e.is_transient() => {
                    warn!(set_code = %set.code, card_id = %card_id, name = %name, error = %e, "Card failed, continuing");
                    outcome.cards_failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            set_code = %set.code,
            cards = outcome.cards_processed,
            failed = outcome.cards_failed,
            "Set complete"
        );
        Ok(outcome)
    }
}

struct CardResult {
    card_id: Uuid,
    name: String,
    result: Result<()>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use grimoire_common::{Collection, RetryPolicy};
    use grimoire_store::{DocumentStore, Scribe};

    use super::*;
    use crate::processors::{
        CardItemsProcessor, CardStep, SetCardsProcessor, SetCodeIndexProcessor, SetItemsProcessor,
    };
    use crate::testing::{card, set, MemoryDocumentStore, MockCardSource};

    fn processor(store: &Arc<MemoryDocumentStore>) -> SetProcessor {
        let docs: Arc<dyn DocumentStore> = store.clone();
        let retry = RetryPolicy::none();
        let set_steps: Vec<Box<dyn SetStep>> = vec![
            Box::new(SetItemsProcessor::set_items(Scribe::new(docs.clone(), retry))),
            Box::new(SetCodeIndexProcessor::set_code_index(Scribe::new(docs.clone(), retry))),
        ];
        let card_steps: Vec<Box<dyn CardStep>> = vec![
            Box::new(SetCardsProcessor::set_cards(Scribe::new(docs.clone(), retry))),
            Box::new(CardItemsProcessor::card_items(Scribe::new(docs, retry))),
        ];
        SetProcessor::new(set_steps, CardProcessor::new(card_steps))
    }

    fn is_card_write(collection: Collection) -> bool {
        matches!(collection, Collection::SetCards | Collection::CardItems)
    }

    #[tokio::test]
    async fn set_writes_land_before_the_first_card() {
        let store = Arc::new(MemoryDocumentStore::new());
        let s = set("aaa", "Set A");
        let source = MockCardSource::new()
            .with_set(s.clone(), vec![card("Alpha", "aaa"), card("Beta", "aaa")]);

        processor(&store).with_concurrency(2).process(&source, &s).await.unwrap();

        let writes = store.writes();
        let first_card = store.first_write(|w| is_card_write(w.collection)).unwrap();
        let last_set = writes
            .iter()
            .rposition(|w| !is_card_write(w.collection))
            .unwrap();
        assert!(last_set < first_card);
    }

    #[tokio::test]
    async fn transient_set_step_failure_does_not_block_the_rest() {
        let store = Arc::new(MemoryDocumentStore::new().fail(Collection::SetItems));
        let s = set("aaa", "Set A");
        let source = MockCardSource::new().with_set(s.clone(), vec![card("Alpha", "aaa")]);

        let outcome = processor(&store).process(&source, &s).await.unwrap();

        assert_eq!(outcome.steps_failed, 1);
        assert_eq!(outcome.cards_processed, 1);
        assert_eq!(store.count(Collection::SetItems), 0);
        assert_eq!(store.count(Collection::SetCodeIndex), 1);
        assert_eq!(store.count(Collection::CardItems), 1);
    }

    #[tokio::test]
    async fn non_transient_set_step_failure_fails_the_set() {
        let s = set("aaa", "Set A");
        let store = Arc::new(MemoryDocumentStore::new().corrupt_id(s.id));
        let source = MockCardSource::new().with_set(s.clone(), vec![card("Alpha", "aaa")]);

        let err = processor(&store).process(&source, &s).await.unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(store.count(Collection::CardItems), 0);
    }

    #[tokio::test]
    async fn transient_card_failure_is_counted_and_skipped() {
        let cards = vec![card("One", "aaa"), card("Two", "aaa"), card("Three", "aaa")];
        let store = Arc::new(MemoryDocumentStore::new().fail_id(cards[0].id));
        let s = set("aaa", "Set A");
        let source = MockCardSource::new().with_set(s.clone(), cards);

        let outcome = processor(&store).process(&source, &s).await.unwrap();

        assert_eq!(outcome.cards_processed, 2);
        assert_eq!(outcome.cards_failed, 1);
        assert_eq!(store.count(Collection::CardItems), 2);
    }

    #[tokio::test]
    async fn non_transient_card_failure_fails_the_set() {
        let cards = vec![card("One", "aaa"), card("Two", "aaa")];
        let store = Arc::new(MemoryDocumentStore::new().corrupt_id(cards[0].id));
        let s = set("aaa", "Set A");
        let source = MockCardSource::new().with_set(s.clone(), cards);

        let err = processor(&store).process(&source, &s).await.unwrap_err();

        assert!(matches!(err, IngestError::Store(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn broken_stream_fails_the_set() {
        let s = set("aaa", "Set A");
        let source = MockCardSource::new()
            .with_set(s.clone(), vec![card("One", "aaa")])
            .break_stream_after("aaa", 0);
        let store = Arc::new(MemoryDocumentStore::new());

        let err = processor(&store).process(&source, &s).await.unwrap_err();

        assert!(matches!(err, IngestError::Source(_)));
        assert_eq!(store.count(Collection::SetItems), 1);
    }
}
