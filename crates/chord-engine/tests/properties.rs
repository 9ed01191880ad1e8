//! Pipeline properties exercised through the public API.

use chord_engine::{
    scales_for, ChordExtractor, ChordLabel, ExtractError, Key, SongCache, Vocabulary,
};
use chordconf::{ChordStyle, ExtractionConfig, ScaleFamily};
use midi_analysis::{write_fixed_tempo, ExportOptions, KeySignature, MidiFileContext, TimedNote};
use pretty_assertions::assert_eq;

const PPQ: u16 = 480;
/// One 4/4 bar at 120 BPM, fs = 4, samples_per_bar = 8.
const BAR: u64 = PPQ as u64 * 4;

fn note(pitch: u8, onset: u64, offset: u64) -> TimedNote {
    TimedNote {
        onset_tick: onset,
        offset_tick: offset,
        pitch,
        velocity: 90,
        channel: 0,
        track_index: 1,
    }
}

fn midi(notes: &[TimedNote], key: Option<(i8, bool)>) -> Vec<u8> {
    let context = MidiFileContext {
        ppq: PPQ,
        tempo_changes: vec![],
        time_signatures: vec![],
        key_signatures: vec![],
    };
    let options = ExportOptions {
        target_bpm: 120.0,
        key_signature: key.map(|(sharps, minor)| KeySignature {
            tick: 0,
            sharps,
            minor,
        }),
    };
    write_fixed_tempo(notes, &context, &options)
}

const MAJ: [u8; 3] = [0, 4, 7];
const MIN: [u8; 3] = [0, 3, 7];

/// Block chords, one root-position triad per bar.
fn progression(chords: &[(u8, [u8; 3])]) -> Vec<TimedNote> {
    chords
        .iter()
        .enumerate()
        .flat_map(|(i, &(root, shape))| {
            let start = i as u64 * BAR;
            shape.map(|offset| note(48 + root + offset, start, start + BAR))
        })
        .collect()
}

fn labels(chords: &[ChordLabel]) -> Vec<&str> {
    chords.iter().map(ChordLabel::as_str).collect()
}

#[test]
fn every_family_has_twelve_distinct_sorted_rotations() {
    for family in ScaleFamily::ALL {
        let scales = scales_for(family);
        let base = scales[0].pitch_classes();
        for (rotation, scale) in scales.iter().enumerate() {
            let classes = scale.pitch_classes();
            assert!(classes.windows(2).all(|w| w[0] < w[1]), "{family} sorted");
            let mut expected: Vec<u8> = base.iter().map(|pc| (pc + rotation as u8) % 12).collect();
            expected.sort_unstable();
            assert_eq!(classes, expected);
        }
        for (i, a) in scales.iter().enumerate() {
            for b in &scales[i + 1..] {
                assert_ne!(a.set, b.set, "{family} rotations distinct");
            }
        }
    }
}

#[test]
fn single_bar_c_major_triad() {
    let bytes = midi(&progression(&[(0, MAJ)]), Some((0, false)));

    let sevenths = ChordExtractor::new(ExtractionConfig::default()).unwrap();
    let record = sevenths.extract("c.mid", &bytes).unwrap();
    assert_eq!(labels(&record.chords), vec!["CM7"]);
    assert_eq!(record.key, Key::new(0).unwrap());
    assert_eq!(record.detected_scale.as_ref().map(|s| s.shift), Some(0));

    let triads = ChordExtractor::new(ExtractionConfig {
        chord_style: ChordStyle::Triad,
        ..Default::default()
    })
    .unwrap();
    let record = triads.extract("c.mid", &bytes).unwrap();
    assert_eq!(labels(&record.chords), vec!["C"]);
}

#[test]
fn progression_in_declared_key() {
    // I vi IV V in C, then a partial bar that must be dropped
    let mut notes = progression(&[(0, MAJ), (9, MIN), (5, MAJ), (7, MAJ)]);
    notes.push(note(60, 4 * BAR, 4 * BAR + PPQ as u64));
    let bytes = midi(&notes, Some((0, false)));

    let extractor = ChordExtractor::new(ExtractionConfig::default()).unwrap();
    let record = extractor.extract("pop.mid", &bytes).unwrap();
    assert_eq!(labels(&record.chords), vec!["CM7", "Am7", "FM7", "G7"]);
}

#[test]
fn missing_key_signature_is_a_skip() {
    let bytes = midi(&progression(&[(0, MAJ)]), None);
    let extractor = ChordExtractor::new(ExtractionConfig::default()).unwrap();
    let err = extractor.extract("nokey.mid", &bytes).unwrap_err();
    assert!(matches!(err, ExtractError::NoKeySignature));
    assert!(err.is_skip());
}

#[test]
fn garbage_bytes_are_malformed() {
    let extractor = ChordExtractor::new(ExtractionConfig::default()).unwrap();
    let err = extractor.extract("junk.mid", b"not a midi file").unwrap_err();
    assert!(matches!(err, ExtractError::Malformed(_)));
    assert!(!err.is_skip());
}

#[test]
fn transposition_moves_d_major_to_c() {
    // D G A D in D major (two sharps)
    let bytes = midi(&progression(&[(2, MAJ), (7, MAJ), (9, MAJ), (2, MAJ)]), Some((2, false)));
    let extractor = ChordExtractor::new(ExtractionConfig {
        transpose: true,
        chord_style: ChordStyle::Triad,
        ..Default::default()
    })
    .unwrap();

    let record = extractor.extract("d.mid", &bytes).unwrap();
    assert_eq!(record.transposed_by, -2);
    assert_eq!(record.key_name, "D");
    assert_eq!(labels(&record.chords), vec!["C", "F", "G", "C"]);
}

#[test]
fn transposition_skips_unmatched_songs() {
    // A chromatic cluster fits no major scale
    let notes: Vec<TimedNote> = (60..64).map(|p| note(p, 0, BAR)).collect();
    let bytes = midi(&notes, Some((0, false)));

    let plain = ChordExtractor::new(ExtractionConfig::default()).unwrap();
    let record = plain.extract("cluster.mid", &bytes).unwrap();
    assert!(record.detected_scale.is_none());

    let transposing = ChordExtractor::new(ExtractionConfig {
        transpose: true,
        ..Default::default()
    })
    .unwrap();
    let err = transposing.extract("cluster.mid", &bytes).unwrap_err();
    assert!(matches!(err, ExtractError::UnmatchedScale));
}

#[test]
fn cached_result_matches_computed() {
    let bytes = midi(&progression(&[(0, MAJ), (7, MAJ)]), Some((0, false)));
    let extractor = ChordExtractor::new(ExtractionConfig::default())
        .unwrap()
        .with_cache(SongCache::open_in_memory().unwrap());

    let first = extractor.extract("a/one.mid", &bytes).unwrap();
    let second = extractor.extract("b/copy.mid", &bytes).unwrap();
    assert_eq!(second.song, "b/copy.mid");
    assert_eq!(second.chords, first.chords);
    assert_eq!(second.content_hash, first.content_hash);
}

#[test]
fn settings_change_the_fingerprint() {
    let a = ChordExtractor::new(ExtractionConfig::default()).unwrap();
    let b = ChordExtractor::new(ExtractionConfig {
        chord_style: ChordStyle::Triad,
        ..Default::default()
    })
    .unwrap();
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn vocabulary_is_reproducible() {
    let extractor = ChordExtractor::new(ExtractionConfig::default()).unwrap();
    let songs = [
        [(0, MAJ), (7, MAJ), (0, MAJ), (5, MAJ)],
        [(9, MIN), (5, MAJ), (7, MAJ), (0, MAJ)],
    ];
    let corpus: Vec<_> = songs
        .iter()
        .map(|chords| {
            let bytes = midi(&progression(chords), Some((0, false)));
            extractor.extract("song.mid", &bytes).unwrap().chords
        })
        .collect();

    let first = Vocabulary::build(&corpus, 50, "<unk>").unwrap();
    let second = Vocabulary::build(&corpus, 50, "<unk>").unwrap();
    assert_eq!(first.chord_to_index_map(), second.chord_to_index_map());
    assert_eq!(first.index_to_chord_map(), second.index_to_chord_map());

    // CM7 x3, FM7 x2, G7 x2 (seen before FM7), Am7 x1
    assert_eq!(
        first.decode(&[1, 2, 3, 4]).unwrap(),
        vec!["CM7", "G7", "FM7", "Am7"]
    );
    for seq in &corpus {
        let decoded = first.decode(&first.encode(seq)).unwrap();
        assert_eq!(decoded, labels(seq));
    }
    assert_eq!(first.encode(&[ChordLabel::from("Bm7-5")]), vec![0]);
}
