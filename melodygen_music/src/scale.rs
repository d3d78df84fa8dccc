// Scale model: named interval sets, scale degrees, diatonic arithmetic and
// snapping.
//
// Every other component holds one `Scale`, built at construction and never
// changed afterwards. A scale is a name (resolved to a fixed list of
// semitone offsets within one octave, 5 to 12 entries) plus a root pitch
// class.
//
// Three lookups matter to the rest of the engine:
// - `nearest_index`: which offset a pitch sits on (or is closest to). The
//   diatonic arithmetic in `diatonic_interval` steps from this index.
// - `scale_degree`: the same index, reported 1-based and wrapped modulo 7
//   for every scale, including pentatonic and chromatic ones. The wrap is
//   kept as-is; cadence detection depends on it, and changing it would
//   change which melodies validate.
// - `snap_to_scale`: nearest in-scale pitch, used by every interpolator.

use serde::{Deserialize, Serialize};

/// The scale names the engine knows. Unknown names resolve to `Major`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleName {
    #[serde(rename = "major")]
    Major,
    #[serde(rename = "minor")]
    Minor,
    #[serde(rename = "harmonic minor")]
    HarmonicMinor,
    #[serde(rename = "melodic minor")]
    MelodicMinor,
    #[serde(rename = "pentatonic")]
    Pentatonic,
    #[serde(rename = "minor pentatonic")]
    MinorPentatonic,
    #[serde(rename = "blues")]
    Blues,
    #[serde(rename = "chromatic")]
    Chromatic,
    #[serde(rename = "whole tone")]
    WholeTone,
    #[serde(rename = "dorian")]
    Dorian,
    #[serde(rename = "phrygian")]
    Phrygian,
    #[serde(rename = "lydian")]
    Lydian,
    #[serde(rename = "mixolydian")]
    Mixolydian,
    #[serde(rename = "aeolian")]
    Aeolian,
    #[serde(rename = "locrian")]
    Locrian,
    /// Phrygian with a raised third.
    #[serde(rename = "phrygian dominant")]
    PhrygianDominant,
}

impl ScaleName {
    pub const ALL: [ScaleName; 16] = [
        ScaleName::Major,
        ScaleName::Minor,
        ScaleName::HarmonicMinor,
        ScaleName::MelodicMinor,
        ScaleName::Pentatonic,
        ScaleName::MinorPentatonic,
        ScaleName::Blues,
        ScaleName::Chromatic,
        ScaleName::WholeTone,
        ScaleName::Dorian,
        ScaleName::Phrygian,
        ScaleName::Lydian,
        ScaleName::Mixolydian,
        ScaleName::Aeolian,
        ScaleName::Locrian,
        ScaleName::PhrygianDominant,
    ];

    /// Semitone offsets from the root, ascending, all within [0, 12).
    pub fn intervals(self) -> &'static [i32] {
        match self {
            ScaleName::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleName::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleName::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleName::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            ScaleName::Pentatonic => &[0, 2, 4, 7, 9],
            ScaleName::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleName::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleName::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ScaleName::WholeTone => &[0, 2, 4, 6, 8, 10],
            ScaleName::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleName::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleName::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleName::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleName::Aeolian => &[0, 2, 3, 5, 7, 8, 10],
            ScaleName::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleName::PhrygianDominant => &[0, 1, 4, 5, 7, 8, 10],
        }
    }

    /// Human-readable name, as used in variation metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            ScaleName::Major => "major",
            ScaleName::Minor => "minor",
            ScaleName::HarmonicMinor => "harmonic minor",
            ScaleName::MelodicMinor => "melodic minor",
            ScaleName::Pentatonic => "pentatonic",
            ScaleName::MinorPentatonic => "minor pentatonic",
            ScaleName::Blues => "blues",
            ScaleName::Chromatic => "chromatic",
            ScaleName::WholeTone => "whole tone",
            ScaleName::Dorian => "dorian",
            ScaleName::Phrygian => "phrygian",
            ScaleName::Lydian => "lydian",
            ScaleName::Mixolydian => "mixolydian",
            ScaleName::Aeolian => "aeolian",
            ScaleName::Locrian => "locrian",
            ScaleName::PhrygianDominant => "phrygian dominant",
        }
    }

    /// Strict lookup. Case-insensitive; `_` and `-` count as spaces.
    pub fn parse(name: &str) -> Option<ScaleName> {
        let normalized = name.trim().to_lowercase().replace(['_', '-'], " ");
        ScaleName::ALL.into_iter().find(|s| s.as_str() == normalized)
    }

    /// Lenient lookup: unknown names resolve to `Major`.
    pub fn from_name(name: &str) -> ScaleName {
        ScaleName::parse(name).unwrap_or_else(|| {
            tracing::warn!("unknown scale '{}', using major", name);
            ScaleName::Major
        })
    }
}

/// Resolve a scale name straight to its offsets (major for unknown names).
pub fn resolve_intervals(name: &str) -> &'static [i32] {
    ScaleName::from_name(name).intervals()
}

/// Parse a pitch-class name ("C", "F#", "Bb", "Cs") into 0-11.
pub fn parse_pitch_class(name: &str) -> Option<u8> {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    let base: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental = match chars.next() {
        None => 0,
        Some('#') | Some('s') => 1,
        Some('b') => -1,
        Some(_) => return None,
    };
    if chars.next().is_some() {
        return None;
    }
    Some((base + accidental).rem_euclid(12) as u8)
}

/// A resolved scale: interval pattern plus root pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub name: ScaleName,
    /// Pitch class of the root (0 = C, 2 = D, ...).
    pub root_pc: u8,
}

impl Scale {
    pub fn new(name: ScaleName, root_pc: u8) -> Self {
        Scale {
            name,
            root_pc: root_pc % 12,
        }
    }

    /// Build from user-facing names, falling back to major / C.
    pub fn from_names(scale: &str, root: &str) -> Self {
        let root_pc = parse_pitch_class(root).unwrap_or_else(|| {
            tracing::warn!("unknown root '{}', using C", root);
            0
        });
        Scale::new(ScaleName::from_name(scale), root_pc)
    }

    /// C major.
    pub fn c_major() -> Self {
        Scale::new(ScaleName::Major, 0)
    }

    pub fn intervals(&self) -> &'static [i32] {
        self.name.intervals()
    }

    /// Number of tones per octave.
    pub fn len(&self) -> usize {
        self.intervals().len()
    }

    /// Always false: every scale has at least five tones.
    pub fn is_empty(&self) -> bool {
        self.intervals().is_empty()
    }

    /// Semitones from the root's pitch class to the pitch's, in 0..12.
    fn relative_pc(&self, pitch: i32) -> i32 {
        (pitch.rem_euclid(12) - self.root_pc as i32).rem_euclid(12)
    }

    /// Check if a MIDI pitch belongs to the scale.
    pub fn is_in_scale(&self, pitch: i32) -> bool {
        self.intervals().contains(&self.relative_pc(pitch))
    }

    /// Index of the offset the pitch sits on, or of the closest offset if
    /// it is out of scale (first closest in list order on ties). Distance
    /// is measured linearly within the octave, not around it.
    pub fn nearest_index(&self, pitch: i32) -> usize {
        let rel = self.relative_pc(pitch);
        let intervals = self.intervals();
        if let Some(i) = intervals.iter().position(|&iv| iv == rel) {
            return i;
        }
        intervals
            .iter()
            .enumerate()
            .min_by_key(|&(_, &iv)| (iv - rel).abs())
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// 1-based scale degree, always wrapped into 1..=7.
    pub fn scale_degree(&self, pitch: i32) -> u8 {
        (self.nearest_index(pitch) % 7) as u8 + 1
    }

    /// Semitone delta that moves `pitch` by `steps` scale tones (positive
    /// is up), crossing octaves as needed. Out-of-scale pitches step from
    /// their nearest scale tone.
    pub fn diatonic_interval(&self, pitch: i32, steps: i32) -> i32 {
        let intervals = self.intervals();
        let n = intervals.len() as i32;
        let current = self.nearest_index(pitch) as i32;
        let target = current + steps;
        let new_index = target.rem_euclid(n);
        let octave_shift = target.div_euclid(n);
        intervals[new_index as usize] - intervals[current as usize] + 12 * octave_shift
    }

    /// `pitch` moved by `steps` scale tones.
    pub fn transpose_diatonic(&self, pitch: i32, steps: i32) -> i32 {
        pitch + self.diatonic_interval(pitch, steps)
    }

    /// Snap a pitch to the nearest scale offset.
    ///
    /// Offsets are matched against the raw pitch class (`pitch mod 12`),
    /// not the root-relative one, so the result lines up with the scale's
    /// pattern laid out from C. Ties go to the smallest offset. A result
    /// more than a tritone away moves an octave toward the input.
    pub fn snap_to_scale(&self, pitch: i32) -> i32 {
        let pc = pitch.rem_euclid(12);
        let octave = pitch.div_euclid(12);

        // Offsets are ascending and unique, so the first minimum is the
        // smallest offset among equally close candidates.
        let closest = self
            .intervals()
            .iter()
            .copied()
            .min_by_key(|iv| (iv - pc).abs())
            .unwrap_or(0);

        let candidate = octave * 12 + closest;
        if (candidate - pitch).abs() <= 6 {
            candidate
        } else if candidate < pitch {
            candidate + 12
        } else {
            candidate - 12
        }
    }

    /// `count` ascending scale tones starting at the root in `octave`
    /// (MIDI convention: octave 4 starts at 60).
    pub fn scale_pitches(&self, octave: i32, count: usize) -> Vec<i32> {
        let intervals = self.intervals();
        let root = (octave + 1) * 12 + self.root_pc as i32;
        (0..count)
            .map(|i| root + intervals[i % intervals.len()] + 12 * (i / intervals.len()) as i32)
            .collect()
    }
}
