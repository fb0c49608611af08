use std::collections::BTreeMap;
use std::sync::Mutex;

use grimoire_common::{normalize_card_name, trigram_positions, CardNameTrigram, TrigramEntry};
use scryfall_client::ScryfallCard;

use super::lock;

/// Trigram → entries keyed by original card name.
///
/// Keying by the original string collapses reprints of one name into a
/// single entry while keeping casing variants ("MOX", "Mox") apart even
/// when they normalize identically.
type Index = BTreeMap<String, BTreeMap<String, TrigramEntry>>;

#[derive(Default)]
pub struct TrigramAggregator {
    index: Mutex<Index>,
}

impl TrigramAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, card: &ScryfallCard) -> usize {
        self.track_name(&card.name)
    }

    /// Index every trigram of the normalized name. Returns how many distinct
    /// trigrams the name contributed to.
    pub fn track_name(&self, name: &str) -> usize {
        let normalized = normalize_card_name(name);
        let trigrams = trigram_positions(&normalized);
        let touched = trigrams.len();

        let mut index = lock(&self.index);
        for (trigram, positions) in trigrams {
            index
                .entry(trigram)
                .or_default()
                .entry(name.to_string())
                .or_insert_with(|| TrigramEntry {
                    name: name.to_string(),
                    normalized: normalized.clone(),
                    positions,
                });
        }

        touched
    }

    pub fn get(&self, trigram: &str) -> Option<CardNameTrigram> {
        lock(&self.index).get(trigram).map(|entries| CardNameTrigram {
            trigram: trigram.to_string(),
            entries: entries.values().cloned().collect(),
        })
    }

    /// Full table as persisted documents, in trigram order.
    pub fn documents(&self) -> Vec<CardNameTrigram> {
        lock(&self.index)
            .iter()
            .map(|(trigram, entries)| CardNameTrigram {
                trigram: trigram.clone(),
                entries: entries.values().cloned().collect(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.index).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.index).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_yields_single_trigram() {
        let aggregator = TrigramAggregator::new();
        assert_eq!(aggregator.track_name("CAT"), 1);

        let cat = aggregator.get("cat").unwrap();
        assert_eq!(aggregator.len(), 1);
        assert_eq!(cat.entries.len(), 1);
        assert_eq!(cat.entries[0].name, "CAT");
        assert_eq!(cat.entries[0].normalized, "cat");
        assert_eq!(cat.entries[0].positions, vec![0]);
    }

    #[test]
    fn repeated_trigram_keeps_every_position_in_one_entry() {
        let aggregator = TrigramAggregator::new();
        aggregator.track_name("ABCABC");

        let abc = aggregator.get("abc").unwrap();
        assert_eq!(abc.entries.len(), 1);
        assert_eq!(abc.entries[0].positions, vec![0, 3]);
        assert_eq!(aggregator.get("bca").unwrap().entries[0].positions, vec![1]);
        assert_eq!(aggregator.get("cab").unwrap().entries[0].positions, vec![2]);
        assert_eq!(aggregator.len(), 3);
    }

    #[test]
    fn reprints_collapse_into_one_entry() {
        let aggregator = TrigramAggregator::new();
        aggregator.track_name("Lightning Bolt");
        aggregator.track_name("Lightning Bolt");

        assert_eq!(aggregator.get("lig").unwrap().entries.len(), 1);
    }

    #[test]
    fn casing_variants_keep_separate_entries() {
        let aggregator = TrigramAggregator::new();
        aggregator.track_name("MOX");
        aggregator.track_name("Mox");

        let mox = aggregator.get("mox").unwrap();
        let names: Vec<&str> = mox.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["MOX", "Mox"]);
        assert!(mox.entries.iter().all(|e| e.normalized == "mox"));
    }

    #[test]
    fn names_under_three_characters_contribute_nothing() {
        let aggregator = TrigramAggregator::new();
        assert_eq!(aggregator.track_name("Ox"), 0);
        assert!(aggregator.is_empty());
    }

    #[test]
    fn clear_empties_the_table() {
        let aggregator = TrigramAggregator::new();
        aggregator.track_name("Giant Growth");
        assert!(!aggregator.documents().is_empty());

        aggregator.clear();
        assert!(aggregator.documents().is_empty());
    }
}
