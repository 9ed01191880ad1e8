//! Scale table: the twelve transpositions of each scale family.

use chordconf::ScaleFamily;
use serde::{Deserialize, Serialize};

/// A set of pitch classes as a 12-bit mask: bit `i` set means class `i` present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PitchClassSet(u16);

impl PitchClassSet {
    pub const EMPTY: PitchClassSet = PitchClassSet(0);

    pub const fn from_classes(classes: &[u8]) -> Self {
        let mut mask = 0u16;
        let mut i = 0;
        while i < classes.len() {
            mask |= 1 << (classes[i] % 12);
            i += 1;
        }
        Self(mask)
    }

    pub fn insert(&mut self, pitch_class: u8) {
        self.0 |= 1 << (pitch_class % 12);
    }

    pub fn contains(&self, pitch_class: u8) -> bool {
        pitch_class < 12 && self.0 & (1 << pitch_class) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_subset_of(&self, other: &PitchClassSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Add `semitones` to every member, mod 12.
    pub fn rotate(&self, semitones: u8) -> Self {
        let s = (semitones % 12) as u32;
        let wide = (self.0 as u32) << s;
        Self(((wide | (wide >> 12)) & 0x0FFF) as u16)
    }

    /// Members in ascending order.
    pub fn classes(&self) -> Vec<u8> {
        (0..12u8).filter(|&pc| self.contains(pc)).collect()
    }
}

impl FromIterator<u8> for PitchClassSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = PitchClassSet::EMPTY;
        for pc in iter {
            set.insert(pc);
        }
        set
    }
}

/// Canonical interval pattern of a family, rooted on C.
pub fn pattern(family: ScaleFamily) -> PitchClassSet {
    const DIATONIC: PitchClassSet = PitchClassSet::from_classes(&[0, 2, 4, 5, 7, 9, 11]);
    const HARMONIC: PitchClassSet = PitchClassSet::from_classes(&[0, 2, 4, 5, 8, 9, 11]);
    const MELODIC: PitchClassSet = PitchClassSet::from_classes(&[0, 2, 4, 6, 8, 9, 11]);
    const BLUES: PitchClassSet = PitchClassSet::from_classes(&[0, 3, 5, 6, 7, 10]);

    match family {
        ScaleFamily::Diatonic => DIATONIC,
        ScaleFamily::Harmonic => HARMONIC,
        ScaleFamily::Melodic => MELODIC,
        ScaleFamily::Blues => BLUES,
    }
}

/// One transposition of a scale family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub family: ScaleFamily,
    /// Semitones the canonical pattern was rotated by (0..12).
    pub rotation: u8,
    pub set: PitchClassSet,
}

impl Scale {
    /// Ascending pitch-class tuple.
    pub fn pitch_classes(&self) -> Vec<u8> {
        self.set.classes()
    }
}

/// All twelve rotations of a family, in rotation order 0..12.
pub fn scales_for(family: ScaleFamily) -> [Scale; 12] {
    let base = pattern(family);
    std::array::from_fn(|rotation| Scale {
        family,
        rotation: rotation as u8,
        set: base.rotate(rotation as u8),
    })
}

/// Whether every class of `set` lies on a single transposition of `family`.
pub fn membership(set: &PitchClassSet, family: ScaleFamily) -> bool {
    scales_for(family).iter().any(|s| set.is_subset_of(&s.set))
}
