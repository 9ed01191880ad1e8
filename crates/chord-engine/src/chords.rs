use chordconf::{ChordStyle, ExtractionConfig, RootMode};
use midi_analysis::BarActivity;

use crate::chord_templates::{degree_index, key_spelling, note_name, quality_suffix};
use crate::types::{ChordLabel, ChordSequence, Key};

/// Root pitch class of one bar.
///
/// A silent bar has root 0.
pub fn extract_root(bar: &BarActivity, mode: RootMode) -> u8 {
    match mode {
        RootMode::LowestPitch => bar.lowest_active_pitch().map_or(0, |pitch| pitch % 12),
        RootMode::LowestPitchClass => bar
            .pitch_class_sums()
            .iter()
            .position(|&sum| sum > 0)
            .map_or(0, |pc| pc as u8),
    }
}

/// Name the chord built on `root` in `key`.
///
/// Roots off the key's scale, and every root when the key is unknown, give
/// the `-` sentinel.
pub fn name_chord(root: u8, key: Option<Key>, style: ChordStyle) -> ChordLabel {
    let Some(key) = key else {
        return ChordLabel::unmatched();
    };

    let degree = (root % 12 + 12 - key.tonic()) % 12;
    let Some(index) = degree_index(degree, key.mode()) else {
        return ChordLabel::unmatched();
    };

    let spelling = key_spelling(key.tonic(), key.mode());
    let suffix = quality_suffix(index, key.mode(), style);
    ChordLabel::new(format!("{}{}", note_name(root, spelling), suffix))
}

/// One label per bar, in bar order.
pub fn name_bars(bars: &[BarActivity], key: Option<Key>, config: &ExtractionConfig) -> ChordSequence {
    bars.iter()
        .map(|bar| name_chord(extract_root(bar, config.root_mode), key, config.chord_style))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyMode;
    use midi_analysis::PITCH_COUNT;
    use pretty_assertions::assert_eq;

    fn bar(pitches: &[(u8, u32)]) -> BarActivity {
        let mut counts = [0u32; PITCH_COUNT];
        for &(pitch, count) in pitches {
            counts[pitch as usize] = count;
        }
        BarActivity::from_counts(counts)
    }

    fn labels(roots: &[u8], key: Key, style: ChordStyle) -> Vec<String> {
        roots
            .iter()
            .map(|&r| name_chord(r, Some(key), style).to_string())
            .collect()
    }

    #[test]
    fn c_major_sevenths() {
        let key = Key::from_parts(0, KeyMode::Major);
        assert_eq!(
            labels(&[0, 2, 4, 5, 7, 9, 11], key, ChordStyle::Seventh),
            vec!["CM7", "Dm7", "Em7", "FM7", "G7", "Am7", "Bm7-5"]
        );
    }

    #[test]
    fn c_major_triads() {
        let key = Key::from_parts(0, KeyMode::Major);
        assert_eq!(
            labels(&[0, 2, 4, 5, 7, 9, 11], key, ChordStyle::Triad),
            vec!["C", "Dm", "Em", "F", "G", "Am", "Bdim"]
        );
    }

    #[test]
    fn a_minor_sevenths() {
        let key = Key::new(21).unwrap();
        let roots: Vec<u8> = [0, 2, 3, 5, 7, 8, 10].iter().map(|d| (9 + d) % 12).collect();
        assert_eq!(
            labels(&roots, key, ChordStyle::Seventh),
            vec!["Am7", "Bm7-5", "CM7", "Dm7", "Em7", "FM7", "G7"]
        );
    }

    #[test]
    fn flat_key_spells_with_flats() {
        // F major: Bb is the fourth degree
        let key = Key::from_parts(5, KeyMode::Major);
        assert_eq!(name_chord(10, Some(key), ChordStyle::Triad).as_str(), "Bb");
        // E major: G# is the third degree
        let key = Key::from_parts(4, KeyMode::Major);
        assert_eq!(name_chord(8, Some(key), ChordStyle::Seventh).as_str(), "G#m7");
    }

    #[test]
    fn off_scale_roots_are_unmatched() {
        let key = Key::from_parts(0, KeyMode::Major);
        for root in [1, 3, 6, 8, 10] {
            assert!(name_chord(root, Some(key), ChordStyle::Seventh).is_unmatched());
        }
        assert!(name_chord(0, None, ChordStyle::Triad).is_unmatched());
    }

    #[test]
    fn silent_bar_roots_on_c() {
        let silent = BarActivity::default();
        assert_eq!(extract_root(&silent, RootMode::LowestPitch), 0);
        assert_eq!(extract_root(&silent, RootMode::LowestPitchClass), 0);

        let key = Key::from_parts(0, KeyMode::Major);
        let config = ExtractionConfig::default();
        assert_eq!(name_bars(&[silent], Some(key), &config), vec![ChordLabel::from("CM7")]);
    }

    #[test]
    fn root_modes_differ_for_wide_voicings() {
        // G2 in the bass under a C5
        let wide = bar(&[(43, 8), (72, 8)]);
        assert_eq!(extract_root(&wide, RootMode::LowestPitch), 7);
        assert_eq!(extract_root(&wide, RootMode::LowestPitchClass), 0);
    }

    #[test]
    fn extraction_is_repeatable() {
        let b = bar(&[(64, 3), (67, 8), (60, 1)]);
        let first = extract_root(&b, RootMode::LowestPitch);
        assert_eq!(first, 0);
        assert_eq!(extract_root(&b.clone(), RootMode::LowestPitch), first);
    }

    #[test]
    fn bars_keep_their_order() {
        let key = Key::from_parts(7, KeyMode::Major);
        let config = ExtractionConfig {
            chord_style: ChordStyle::Triad,
            ..Default::default()
        };
        let bars = [bar(&[(55, 8)]), bar(&[(50, 8)]), bar(&[(60, 8)]), bar(&[(53, 8)])];
        let names: Vec<String> = name_bars(&bars, Some(key), &config)
            .into_iter()
            .map(|l| l.to_string())
            .collect();
        assert_eq!(names, vec!["G", "D", "C", "-"]);
    }
}
