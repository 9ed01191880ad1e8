//! Piano-roll rendering and bar segmentation.
//!
//! A roll is a binary pitch-activity matrix: one column per sample, one bit
//! per MIDI pitch. Velocity is discarded; any sounding note is a 1.

use crate::note::Performance;
use serde::{Deserialize, Serialize};

/// Number of MIDI pitches, rows of the roll.
pub const PITCH_COUNT: usize = 128;

/// Sampling parameters for rendering a roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollParams {
    /// Samples per second of (tempo-normalized) time.
    pub fs: f64,
    /// Render at twice `fs` and OR adjacent column pairs back down,
    /// so notes shorter than one sample period still register.
    pub double_sample: bool,
    /// Widest roll that may be rendered, in samples at `fs`.
    pub max_samples: usize,
}

/// Default width limit: about 69 hours at 4 samples per second.
const DEFAULT_MAX_SAMPLES: usize = 1_000_000;

impl Default for RollParams {
    fn default() -> Self {
        Self {
            fs: 4.0,
            double_sample: true,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl RollParams {
    pub fn validate(&self) -> crate::Result<()> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(crate::Error::InvalidParams(format!(
                "fs must be positive, got {}",
                self.fs
            )));
        }
        Ok(())
    }
}

/// Binary pitch-activity matrix. Bit `p` of column `t` is pitch `p` at sample `t`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PianoRoll {
    columns: Vec<u128>,
}

impl PianoRoll {
    pub fn from_columns(columns: Vec<u128>) -> Self {
        Self { columns }
    }

    /// Render a performance at the given sampling parameters.
    ///
    /// The roll is `floor(end_seconds * fs)` samples wide. A note covers
    /// samples `floor(onset * fs)` up to but excluding `floor(offset * fs)`.
    /// A performance wider than `max_samples` is rejected before allocating.
    pub fn render(performance: &Performance, params: &RollParams) -> crate::Result<Self> {
        params.validate()?;

        let samples = (performance.end_seconds * params.fs).floor();
        if samples.is_nan() || samples > params.max_samples as f64 {
            return Err(crate::Error::InvalidParams(format!(
                "roll of {} samples exceeds the limit of {}",
                samples, params.max_samples
            )));
        }
        let width = samples.max(0.0) as usize;

        if !params.double_sample {
            return Ok(Self {
                columns: render_columns(performance, params.fs, width),
            });
        }

        let fine = render_columns(performance, params.fs * 2.0, width * 2);
        let columns = fine
            .chunks(2)
            .map(|pair| pair.iter().fold(0u128, |acc, col| acc | col))
            .collect();

        Ok(Self { columns })
    }

    /// Number of samples (columns).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_active(&self, pitch: u8, sample: usize) -> bool {
        self.columns
            .get(sample)
            .is_some_and(|col| pitch < PITCH_COUNT as u8 && col & (1u128 << pitch) != 0)
    }

    /// Shift every pitch by `semitones`. Pitches pushed outside 0..128 are lost.
    pub fn transpose(&self, semitones: i8) -> Self {
        let shift = semitones.unsigned_abs() as u32;
        let columns = self
            .columns
            .iter()
            .map(|&col| {
                if semitones >= 0 {
                    col.checked_shl(shift).unwrap_or(0)
                } else {
                    col.checked_shr(shift).unwrap_or(0)
                }
            })
            .collect();
        Self { columns }
    }

    /// Partition into non-overlapping bars of `samples_per_bar` columns.
    ///
    /// A trailing window shorter than a full bar is dropped.
    pub fn bars(&self, samples_per_bar: usize) -> Vec<BarActivity> {
        if samples_per_bar == 0 {
            return Vec::new();
        }

        self.columns
            .chunks_exact(samples_per_bar)
            .map(BarActivity::from_columns)
            .collect()
    }
}

fn render_columns(performance: &Performance, fs: f64, width: usize) -> Vec<u128> {
    let mut columns = vec![0u128; width];

    for note in &performance.notes {
        if note.velocity == 0 || note.pitch as usize >= PITCH_COUNT {
            continue;
        }
        let start = ((note.onset * fs).floor().max(0.0) as usize).min(width);
        let end = ((note.offset * fs).floor().max(0.0) as usize).min(width);
        let bit = 1u128 << note.pitch;
        for col in &mut columns[start..end.max(start)] {
            *col |= bit;
        }
    }

    columns
}

/// Per-pitch count of active samples within one bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarActivity {
    counts: [u32; PITCH_COUNT],
}

impl Default for BarActivity {
    fn default() -> Self {
        Self {
            counts: [0; PITCH_COUNT],
        }
    }
}

impl BarActivity {
    pub fn from_counts(counts: [u32; PITCH_COUNT]) -> Self {
        Self { counts }
    }

    fn from_columns(columns: &[u128]) -> Self {
        let mut counts = [0u32; PITCH_COUNT];
        for &col in columns {
            let mut bits = col;
            while bits != 0 {
                let pitch = bits.trailing_zeros() as usize;
                counts[pitch] += 1;
                bits &= bits - 1;
            }
        }
        Self { counts }
    }

    pub fn counts(&self) -> &[u32; PITCH_COUNT] {
        &self.counts
    }

    /// Lowest MIDI pitch with any activity.
    pub fn lowest_active_pitch(&self) -> Option<u8> {
        self.counts.iter().position(|&c| c > 0).map(|p| p as u8)
    }

    /// Activity folded into 12 pitch classes.
    pub fn pitch_class_sums(&self) -> [u32; 12] {
        let mut sums = [0u32; 12];
        for (pitch, &count) in self.counts.iter().enumerate() {
            sums[pitch % 12] += count;
        }
        sums
    }

    pub fn is_silent(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::PerformedNote;

    fn note(pitch: u8, onset: f64, offset: f64) -> PerformedNote {
        PerformedNote {
            onset,
            offset,
            pitch,
            velocity: 100,
        }
    }

    fn plain(fs: f64) -> RollParams {
        RollParams {
            fs,
            double_sample: false,
            ..Default::default()
        }
    }

    #[test]
    fn render_is_binary_and_sized_by_duration() {
        let perf = Performance::new(vec![note(60, 0.0, 2.0), note(60, 0.5, 1.0)]);
        let roll = PianoRoll::render(&perf, &plain(4.0)).unwrap();

        assert_eq!(roll.width(), 8);
        for t in 0..8 {
            assert!(roll.is_active(60, t));
            assert!(!roll.is_active(61, t));
        }

        // Overlapping notes collapse to one bit, so each sample counts once
        let bars = roll.bars(8);
        assert_eq!(bars[0].counts()[60], 8);
    }

    #[test]
    fn zero_velocity_is_silent() {
        let mut n = note(64, 0.0, 1.0);
        n.velocity = 0;
        let perf = Performance::new(vec![n]);
        let roll = PianoRoll::render(&perf, &plain(4.0)).unwrap();
        assert_eq!(roll.width(), 4);
        assert!(roll.bars(4)[0].is_silent());
    }

    #[test]
    fn trailing_partial_bar_is_dropped() {
        let perf = Performance::new(vec![note(60, 0.0, 5.0)]);
        let roll = PianoRoll::render(&perf, &plain(4.0)).unwrap();
        assert_eq!(roll.width(), 20);

        let bars = roll.bars(8);
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn short_roll_has_no_bars() {
        let perf = Performance::new(vec![note(60, 0.0, 1.0)]);
        let roll = PianoRoll::render(&perf, &plain(4.0)).unwrap();
        assert!(roll.bars(8).is_empty());
    }

    #[test]
    fn double_sampling_catches_short_notes() {
        // Note sits entirely between two samples at fs=4
        let perf = Performance::new(vec![note(48, 0.0, 2.0), note(72, 0.30, 0.45)]);

        let single = PianoRoll::render(&perf, &plain(4.0)).unwrap();
        assert!((0..single.width()).all(|t| !single.is_active(72, t)));

        let doubled = PianoRoll::render(
            &perf,
            &RollParams {
                fs: 4.0,
                double_sample: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(doubled.width(), single.width());
        assert!(doubled.is_active(72, 1));
    }

    #[test]
    fn oversized_roll_rejected_before_rendering() {
        // Ten minutes at fs=4 is 2400 samples
        let perf = Performance::new(vec![note(60, 0.0, 600.0)]);
        let params = RollParams {
            max_samples: 2_000,
            ..plain(4.0)
        };
        assert!(matches!(
            PianoRoll::render(&perf, &params),
            Err(crate::Error::InvalidParams(_))
        ));

        let at_limit = RollParams {
            max_samples: 2_400,
            ..params
        };
        assert_eq!(PianoRoll::render(&perf, &at_limit).unwrap().width(), 2_400);
    }

    #[test]
    fn invalid_fs_rejected() {
        let perf = Performance::new(vec![note(60, 0.0, 1.0)]);
        assert!(PianoRoll::render(&perf, &plain(0.0)).is_err());
        assert!(PianoRoll::render(&perf, &plain(f64::NAN)).is_err());
    }

    #[test]
    fn transpose_shifts_and_clips() {
        let roll = PianoRoll::from_columns(vec![(1u128 << 60) | (1u128 << 127) | 1]);
        let up = roll.transpose(2);
        assert!(up.is_active(62, 0));
        assert!(up.is_active(2, 0));
        assert!(!up.is_active(127, 0));

        let down = roll.transpose(-5);
        assert!(down.is_active(55, 0));
        assert!(down.is_active(122, 0));
        assert!(!down.is_active(0, 0));
    }

    #[test]
    fn bar_activity_queries() {
        let roll = PianoRoll::from_columns(vec![
            (1u128 << 43) | (1u128 << 60),
            1u128 << 60,
            1u128 << 67,
            0,
        ]);
        let bars = roll.bars(4);
        assert_eq!(bars.len(), 1);
        let bar = &bars[0];

        assert_eq!(bar.lowest_active_pitch(), Some(43));
        let classes = bar.pitch_class_sums();
        assert_eq!(classes[0], 2); // C4 twice
        assert_eq!(classes[7], 2); // G2 + G4
        assert!(!bar.is_silent());
        assert_eq!(BarActivity::default().lowest_active_pitch(), None);
    }
}
