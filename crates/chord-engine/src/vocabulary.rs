//! Corpus-wide chord vocabulary.
//!
//! Labels are counted across every song, ranked by descending count with
//! ties going to the label seen first in traversal order, and the top
//! `capacity - 1` get indices 1.. in rank order. Index 0 is the
//! out-of-vocabulary slot.
//!
//! Counting is split from ranking so per-song counters built on worker
//! threads can be merged in any order: a [`ChordCounter`] records, for each
//! label, its count and the `(song, bar)` position it was first seen at,
//! and merging sums counts and keeps the earliest position.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ChordLabel, ChordSequence, IndexSequence};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("vocabulary capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("index {index} outside vocabulary of {len} entries")]
    IndexOutOfRange { index: u32, len: usize },

    #[error("inconsistent chord index map: {0}")]
    Inconsistent(String),
}

/// Position of a label's first occurrence: song ordinal, then bar.
pub type FirstSeen = (u64, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub count: u64,
    pub first_seen: FirstSeen,
}

/// Label frequencies over some set of songs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChordCounter {
    counts: HashMap<ChordLabel, LabelCount>,
}

impl ChordCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter for one song at position `song` in traversal order.
    pub fn from_song(song: u64, chords: &[ChordLabel]) -> Self {
        let mut counter = Self::new();
        counter.observe(song, chords);
        counter
    }

    pub fn observe(&mut self, song: u64, chords: &[ChordLabel]) {
        for (bar, label) in chords.iter().enumerate() {
            let seen = (song, bar as u32);
            self.counts
                .entry(label.clone())
                .and_modify(|c| {
                    c.count += 1;
                    c.first_seen = c.first_seen.min(seen);
                })
                .or_insert(LabelCount {
                    count: 1,
                    first_seen: seen,
                });
        }
    }

    /// Fold another counter in. Commutative and associative.
    pub fn merge(&mut self, other: ChordCounter) {
        for (label, theirs) in other.counts {
            self.counts
                .entry(label)
                .and_modify(|ours| {
                    ours.count += theirs.count;
                    ours.first_seen = ours.first_seen.min(theirs.first_seen);
                })
                .or_insert(theirs);
        }
    }

    pub fn get(&self, label: &ChordLabel) -> Option<LabelCount> {
        self.counts.get(label).copied()
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().map(|c| c.count).sum()
    }

    /// Labels by descending count, ties by first occurrence.
    pub fn ranked(&self) -> Vec<(ChordLabel, u64)> {
        let mut entries: Vec<(&ChordLabel, &LabelCount)> = self.counts.iter().collect();
        entries.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        });
        entries
            .into_iter()
            .map(|(label, c)| (label.clone(), c.count))
            .collect()
    }
}

/// Bounded bidirectional chord ↔ index mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// `labels[i]` is the label for index `i`; `labels[0]` is the unknown token.
    labels: Vec<String>,
    index: HashMap<String, u32>,
}

impl Vocabulary {
    /// Count, rank and index a corpus given in traversal order.
    pub fn build(
        corpus: &[ChordSequence],
        capacity: usize,
        unknown_token: &str,
    ) -> Result<Self, VocabularyError> {
        let mut counter = ChordCounter::new();
        for (song, chords) in corpus.iter().enumerate() {
            counter.observe(song as u64, chords);
        }
        Self::from_counter(&counter, capacity, unknown_token)
    }

    pub fn from_counter(
        counter: &ChordCounter,
        capacity: usize,
        unknown_token: &str,
    ) -> Result<Self, VocabularyError> {
        if capacity == 0 {
            return Err(VocabularyError::InvalidCapacity(capacity));
        }

        let mut labels = Vec::with_capacity(capacity);
        labels.push(unknown_token.to_string());
        labels.extend(
            counter
                .ranked()
                .into_iter()
                .filter(|(label, _)| label.as_str() != unknown_token)
                .take(capacity - 1)
                .map(|(label, _)| label.as_str().to_string()),
        );

        Ok(Self::from_labels(labels))
    }

    /// Reload from a persisted chord-to-index map.
    ///
    /// Indices must be exactly `0..len`.
    pub fn from_chord_to_index(map: &BTreeMap<String, u32>) -> Result<Self, VocabularyError> {
        let mut slots: Vec<Option<String>> = vec![None; map.len()];
        for (label, &index) in map {
            let slot = slots
                .get_mut(index as usize)
                .ok_or(VocabularyError::IndexOutOfRange {
                    index,
                    len: map.len(),
                })?;
            if slot.replace(label.clone()).is_some() {
                return Err(VocabularyError::Inconsistent(format!(
                    "index {index} assigned twice"
                )));
            }
        }

        let labels: Vec<String> = slots.into_iter().flatten().collect();
        if labels.is_empty() {
            return Err(VocabularyError::Inconsistent("empty map".into()));
        }
        Ok(Self::from_labels(labels))
    }

    fn from_labels(labels: Vec<String>) -> Self {
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i as u32))
            .collect();
        Self { labels, index }
    }

    /// Number of slots, including the unknown slot.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false: the unknown slot is always present.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn unknown_token(&self) -> &str {
        &self.labels[0]
    }

    /// Index of `label`, or 0 when absent.
    pub fn index_of(&self, label: &ChordLabel) -> u32 {
        match self.index.get(label.as_str()) {
            Some(&i) if i != 0 => i,
            _ => 0,
        }
    }

    pub fn encode(&self, chords: &[ChordLabel]) -> IndexSequence {
        chords.iter().map(|label| self.index_of(label)).collect()
    }

    pub fn label(&self, index: u32) -> Result<&str, VocabularyError> {
        self.labels
            .get(index as usize)
            .map(String::as_str)
            .ok_or(VocabularyError::IndexOutOfRange {
                index,
                len: self.labels.len(),
            })
    }

    /// Look each index up; index 0 decodes to the unknown token.
    pub fn decode(&self, indices: &[u32]) -> Result<Vec<String>, VocabularyError> {
        indices
            .iter()
            .map(|&i| self.label(i).map(str::to_string))
            .collect()
    }

    pub fn chord_to_index_map(&self) -> BTreeMap<String, u32> {
        self.index.iter().map(|(k, &v)| (k.clone(), v)).collect()
    }

    pub fn index_to_chord_map(&self) -> BTreeMap<u32, String> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| (i as u32, label.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seq(labels: &[&str]) -> ChordSequence {
        labels.iter().map(|&l| ChordLabel::from(l)).collect()
    }

    #[test]
    fn ranks_by_count_then_first_seen() {
        let corpus = vec![seq(&["G7", "CM7", "-", "CM7"]), seq(&["Dm7", "G7", "Am7"])];
        let vocab = Vocabulary::build(&corpus, 10, "<unk>").unwrap();
        assert_eq!(
            vocab.decode(&[0, 1, 2, 3, 4, 5]).unwrap(),
            vec!["<unk>", "G7", "CM7", "-", "Dm7", "Am7"]
        );
        assert_eq!(vocab.len(), 6);
    }

    #[test]
    fn capacity_truncates_and_encodes_rest_to_zero() {
        let corpus = vec![seq(&["C", "C", "C", "G", "G", "F"])];
        let vocab = Vocabulary::build(&corpus, 3, "<unk>").unwrap();
        assert_eq!(vocab.encode(&seq(&["C", "F", "G", "Bb"])), vec![1, 0, 2, 0]);
    }

    #[test]
    fn capacity_one_holds_only_unknown() {
        let corpus = vec![seq(&["C", "G"])];
        let vocab = Vocabulary::build(&corpus, 1, "<unk>").unwrap();
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.encode(&corpus[0]), vec![0, 0]);
    }

    #[test]
    fn capacity_zero_is_rejected() {
        assert_eq!(
            Vocabulary::build(&[], 0, "<unk>"),
            Err(VocabularyError::InvalidCapacity(0))
        );
    }

    #[test]
    fn merge_order_does_not_matter() {
        let a = ChordCounter::from_song(0, &seq(&["C", "G", "C"]));
        let b = ChordCounter::from_song(1, &seq(&["G", "Am"]));
        let c = ChordCounter::from_song(2, &seq(&["Am", "F", "Am"]));

        let mut forward = ChordCounter::new();
        forward.merge(a.clone());
        forward.merge(b.clone());
        forward.merge(c.clone());

        let mut backward = ChordCounter::new();
        backward.merge(c);
        backward.merge(b);
        backward.merge(a);

        assert_eq!(forward, backward);
        assert_eq!(forward.total(), 8);
        assert_eq!(
            forward.get(&ChordLabel::from("Am")),
            Some(LabelCount {
                count: 3,
                first_seen: (1, 1)
            })
        );
    }

    #[test]
    fn maps_are_inverse() {
        let corpus = vec![seq(&["Em", "Em", "B7", "-"])];
        let vocab = Vocabulary::build(&corpus, 50, "<unk>").unwrap();
        let forward = vocab.chord_to_index_map();
        let backward = vocab.index_to_chord_map();
        assert_eq!(forward.len(), backward.len());
        for (label, index) in &forward {
            assert_eq!(&backward[index], label);
        }
        assert_eq!(forward["<unk>"], 0);
    }

    #[test]
    fn reload_from_map() {
        let corpus = vec![seq(&["A", "E", "A", "D"])];
        let vocab = Vocabulary::build(&corpus, 50, "<unk>").unwrap();
        let reloaded = Vocabulary::from_chord_to_index(&vocab.chord_to_index_map()).unwrap();
        assert_eq!(reloaded, vocab);

        let mut gap = BTreeMap::new();
        gap.insert("<unk>".to_string(), 0);
        gap.insert("A".to_string(), 2);
        assert!(matches!(
            Vocabulary::from_chord_to_index(&gap),
            Err(VocabularyError::IndexOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn decode_rejects_unknown_index() {
        let vocab = Vocabulary::build(&[seq(&["C"])], 5, "<unk>").unwrap();
        assert!(vocab.decode(&[1, 7]).is_err());
    }
}
