//! Corpus statistics over persisted chord records.
//!
//! Scale families are tallied against every known family, whatever the run
//! enabled, so a survey can show which families a corpus would need.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chord_engine::key::{active_set, detect_scale};
use chord_engine::{ChordCounter, ScaleMatch, SongChords};
use chordconf::{ExtractionConfig, ScaleFamily};
use serde::Serialize;

/// Family tally for songs that fit no known scale.
pub const OTHER: &str = "other";
/// Family tally for songs with no pitched activity.
pub const SILENT: &str = "silent";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Survey {
    pub songs: usize,
    /// Songs per first matching family in diatonic, harmonic, melodic, blues
    /// order, plus [`OTHER`] and [`SILENT`].
    pub scale_families: BTreeMap<String, u64>,
    /// Songs per rotation of their matching scale.
    pub shifts: BTreeMap<u8, u64>,
    /// Active pitch-class sets of songs that fit no known scale.
    pub unmatched: BTreeMap<String, u64>,
    /// Songs per declared key name.
    pub keys: BTreeMap<String, u64>,
    pub total_bars: u64,
    /// Chord labels by descending count.
    pub chords: Vec<(String, u64)>,
}

impl Survey {
    /// Tally `records`, taking the `key_histogram_size` most active pitch
    /// classes of each song as its scale candidate.
    pub fn from_records(records: &[SongChords], key_histogram_size: usize) -> Self {
        let every_family = ExtractionConfig {
            key_histogram_size,
            scale_families: ScaleFamily::ALL.to_vec(),
            ..Default::default()
        };
        let mut survey = Survey {
            songs: records.len(),
            ..Default::default()
        };
        let mut counter = ChordCounter::new();

        for (ordinal, record) in records.iter().enumerate() {
            let family = match detect_scale(&record.histogram, &every_family) {
                ScaleMatch::Matched(scale) => {
                    *survey.shifts.entry(scale.shift).or_default() += 1;
                    scale.family.as_str()
                }
                ScaleMatch::NoMatch => {
                    let active = active_set(&record.histogram, key_histogram_size);
                    if active.is_empty() {
                        SILENT
                    } else {
                        let classes = format!("{:?}", active.classes());
                        *survey.unmatched.entry(classes).or_default() += 1;
                        OTHER
                    }
                }
            };
            *survey.scale_families.entry(family.to_string()).or_default() += 1;
            *survey.keys.entry(record.key_name.clone()).or_default() += 1;
            survey.total_bars += record.chords.len() as u64;
            counter.merge(ChordCounter::from_song(ordinal as u64, &record.chords));
        }

        survey.chords = counter
            .ranked()
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect();
        survey
    }

    /// Plain-text report, showing at most `top` chords and unmatched sets.
    pub fn render(&self, top: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "songs: {}  bars: {}", self.songs, self.total_bars);

        let _ = writeln!(out, "\nscale families:");
        for (family, n) in &self.scale_families {
            let _ = writeln!(out, "  {family:<10} {n}");
        }

        let _ = writeln!(out, "\nscale shifts:");
        for (shift, n) in &self.shifts {
            let _ = writeln!(out, "  {shift:<10} {n}");
        }

        if !self.unmatched.is_empty() {
            let mut sets: Vec<(&String, &u64)> = self.unmatched.iter().collect();
            sets.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
            let _ = writeln!(out, "\nunmatched pitch-class sets:");
            for (set, n) in sets.into_iter().take(top) {
                let _ = writeln!(out, "  {set:<24} {n}");
            }
        }

        let _ = writeln!(out, "\ndeclared keys:");
        for (key, n) in &self.keys {
            let _ = writeln!(out, "  {key:<10} {n}");
        }

        let _ = writeln!(
            out,
            "\nchords ({} distinct, top {}):",
            self.chords.len(),
            top.min(self.chords.len())
        );
        for (label, n) in self.chords.iter().take(top) {
            let _ = writeln!(out, "  {label:<10} {n}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chord_engine::{ChordLabel, Key};
    use pretty_assertions::assert_eq;

    const C_MAJOR: [u32; 12] = [4, 0, 2, 0, 3, 2, 0, 3, 0, 2, 0, 1];
    // A harmonic minor: A B C D E F G#
    const A_HARMONIC: [u32; 12] = [3, 0, 2, 0, 3, 2, 0, 0, 2, 4, 0, 1];
    // Chromatic cluster that fits no scale family
    const CHROMATIC: [u32; 12] = [5, 4, 3, 4, 3, 0, 3, 0, 0, 0, 0, 0];

    fn record(song: &str, key: u8, histogram: [u32; 12], chords: &[&str]) -> SongChords {
        let key = Key::new(key).unwrap();
        SongChords {
            song: song.into(),
            content_hash: String::new(),
            version: 1,
            key,
            key_name: key.name(),
            detected_scale: None,
            transposed_by: 0,
            histogram,
            chords: chords.iter().map(|&c| ChordLabel::from(c)).collect(),
        }
    }

    #[test]
    fn counts_scales_keys_and_chords() {
        let records = vec![
            record("a.mid", 0, C_MAJOR, &["CM7", "G7", "CM7"]),
            record("b.mid", 21, C_MAJOR, &["Am7", "-"]),
            record("c.mid", 2, [0; 12], &["G7"]),
        ];
        let survey = Survey::from_records(&records, 7);

        assert_eq!(survey.songs, 3);
        assert_eq!(survey.total_bars, 6);
        assert_eq!(survey.scale_families["diatonic"], 2);
        assert_eq!(survey.scale_families[SILENT], 1);
        assert_eq!(survey.shifts[&0], 2);
        assert_eq!(survey.keys["Am"], 1);
        assert_eq!(survey.chords[0], ("CM7".to_string(), 2));
        assert_eq!(survey.chords[1], ("G7".to_string(), 2));

        let text = survey.render(2);
        assert!(text.contains("top 2"));
        assert!(!text.contains("Am7"));
    }

    #[test]
    fn every_family_is_surveyed_regardless_of_run_settings() {
        // Extraction ran with diatonic only, so the record carries no scale
        let records = vec![
            record("minor.mid", 21, A_HARMONIC, &["Am7"]),
            record("odd.mid", 0, CHROMATIC, &["CM7"]),
        ];
        let survey = Survey::from_records(&records, 7);

        assert_eq!(survey.scale_families["harmonic"], 1);
        assert_eq!(survey.scale_families[OTHER], 1);
        assert_eq!(survey.shifts[&0], 1);
        assert_eq!(
            survey.unmatched,
            BTreeMap::from([("[0, 1, 2, 3, 4, 6]".to_string(), 1)])
        );
        assert!(survey.render(5).contains("unmatched pitch-class sets"));
    }
}
