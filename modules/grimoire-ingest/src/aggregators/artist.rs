use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use grimoire_common::ArtistCardSummary;
use scryfall_client::ScryfallCard;
use uuid::Uuid;

use super::lock;
use crate::mappers::artist_card_summary;

/// Everything seen for one artist so far in the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistAggregate {
    pub artist_id: Uuid,
    pub name_variants: BTreeSet<String>,
    /// Tracked cards by card id.
    pub cards: BTreeMap<Uuid, ArtistCardSummary>,
    /// Set id to set code.
    pub sets: BTreeMap<Uuid, String>,
}

impl ArtistAggregate {
    fn new(artist_id: Uuid) -> Self {
        Self {
            artist_id,
            name_variants: BTreeSet::new(),
            cards: BTreeMap::new(),
            sets: BTreeMap::new(),
        }
    }

    pub fn card_ids(&self) -> Vec<Uuid> {
        self.cards.keys().copied().collect()
    }

    pub fn set_ids(&self) -> Vec<Uuid> {
        self.sets.keys().copied().collect()
    }

    pub fn set_codes(&self) -> Vec<String> {
        let codes: BTreeSet<&String> = self.sets.values().collect();
        codes.into_iter().cloned().collect()
    }
}

#[derive(Default)]
struct State {
    artists: HashMap<Uuid, ArtistAggregate>,
    dirty: BTreeSet<Uuid>,
}

/// Artist → cards, sets and name variants, with dirty tracking between
/// flushes. Aggregates are never dropped mid-run; each flush rewrites the
/// full aggregate, so repeated flushes of the same artist converge.
#[derive(Default)]
pub struct ArtistAggregator {
    state: Mutex<State>,
}

impl ArtistAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the card into the aggregate of each of its artists and mark
    /// them dirty. Returns how many artists were touched; a card without
    /// artist ids touches nothing.
    pub fn track(&self, card: &ScryfallCard) -> usize {
        let attributed = card.artist_names();
        if attributed.is_empty() {
            return 0;
        }

        let summary = artist_card_summary(card);
        let mut state = lock(&self.state);

        for (artist_id, name) in &attributed {
            let aggregate = state
                .artists
                .entry(*artist_id)
                .or_insert_with(|| ArtistAggregate::new(*artist_id));

            aggregate.cards.insert(card.id, summary.clone());
            aggregate.sets.insert(card.set_id, card.set.clone());
            if let Some(name) = name {
                aggregate.name_variants.insert(name.clone());
            }
            state.dirty.insert(*artist_id);
        }

        attributed.len()
    }

    /// Snapshot of every aggregate changed since the last `mark_all_clean`,
    /// ordered by artist id.
    pub fn dirty(&self) -> Vec<ArtistAggregate> {
        let state = lock(&self.state);
        state
            .dirty
            .iter()
            .filter_map(|id| state.artists.get(id).cloned())
            .collect()
    }

    pub fn dirty_count(&self) -> usize {
        lock(&self.state).dirty.len()
    }

    pub fn mark_all_clean(&self) {
        lock(&self.state).dirty.clear();
    }

    pub fn get(&self, artist_id: Uuid) -> Option<ArtistAggregate> {
        lock(&self.state).artists.get(&artist_id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).artists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every aggregate. Only between full runs.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.artists.clear();
        state.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::card;

    #[test]
    fn multi_artist_card_lands_in_every_aggregate() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut c = card("Ink-Eyes, Servant of Oni", "bok");
        c.artist_ids = vec![a, b];
        c.artist = Some("Anna & Bert".into());

        let aggregator = ArtistAggregator::new();
        assert_eq!(aggregator.track(&c), 2);

        for (id, name) in [(a, "Anna"), (b, "Bert")] {
            let agg = aggregator.get(id).unwrap();
            assert_eq!(agg.card_ids(), vec![c.id]);
            assert_eq!(agg.set_ids(), vec![c.set_id]);
            assert!(agg.name_variants.contains(name));
        }
        assert_eq!(aggregator.dirty_count(), 2);
    }

    #[test]
    fn card_without_artists_is_ignored() {
        let mut c = card("Plains", "lea");
        c.artist_ids.clear();

        let aggregator = ArtistAggregator::new();
        assert_eq!(aggregator.track(&c), 0);
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.dirty_count(), 0);
    }

    #[test]
    fn mismatched_split_keeps_full_name() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut c = card("Collab", "sld");
        c.artist_ids = vec![a, b];
        c.artist = Some("Solo Artist".into());

        let aggregator = ArtistAggregator::new();
        aggregator.track(&c);

        assert!(aggregator.get(a).unwrap().name_variants.contains("Solo Artist"));
        assert!(aggregator.get(b).unwrap().name_variants.contains("Solo Artist"));
    }

    #[test]
    fn repeated_tracking_accumulates_without_duplicates() {
        let artist = Uuid::new_v4();
        let mut first = card("Alpha", "aaa");
        first.artist_ids = vec![artist];
        let mut second = card("Beta", "bbb");
        second.artist_ids = vec![artist];

        let aggregator = ArtistAggregator::new();
        aggregator.track(&first);
        aggregator.track(&first);
        aggregator.track(&second);

        let agg = aggregator.get(artist).unwrap();
        assert_eq!(agg.cards.len(), 2);
        assert_eq!(agg.set_codes(), vec!["aaa".to_string(), "bbb".to_string()]);
        assert_eq!(aggregator.len(), 1);
    }

    #[test]
    fn mark_all_clean_keeps_aggregates() {
        let c = card("Alpha", "aaa");
        let aggregator = ArtistAggregator::new();
        aggregator.track(&c);

        aggregator.mark_all_clean();
        assert!(aggregator.dirty().is_empty());
        assert_eq!(aggregator.len(), 1);

        aggregator.clear();
        assert!(aggregator.is_empty());
    }
}
