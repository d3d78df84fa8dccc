// The note model: the plain-data currency every component trades in.
//
// A melody is an ordered `Vec<Note>` with onsets and durations in seconds.
// Producers keep the vector sorted by onset; operators that can reorder
// notes (retrograde, fragment recombination) say so in their docs.
//
// The serde field names are the ones the request layer speaks. Older
// clients send `midi`/`time` instead of `pitch`/`onset`, so both are
// accepted on input, and a missing velocity takes the layer's 0.7 default.

use serde::{Deserialize, Serialize};

/// Velocity assumed when a caller omits it.
pub const DEFAULT_VELOCITY: f64 = 0.7;

fn default_velocity() -> f64 {
    DEFAULT_VELOCITY
}

/// A single timed, pitched note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI note number. Not clamped to 0..=127; transformations may push
    /// it outside and callers clamp on export.
    #[serde(alias = "midi")]
    pub pitch: i32,
    /// Onset in seconds.
    #[serde(alias = "time")]
    pub onset: f64,
    /// Duration in seconds, >= 0.
    pub duration: f64,
    /// Loudness in [0, 1].
    #[serde(default = "default_velocity")]
    pub velocity: f64,
}

/// An ordered sequence of notes.
pub type Melody = Vec<Note>;

impl Note {
    pub fn new(pitch: i32, onset: f64, duration: f64, velocity: f64) -> Self {
        Note {
            pitch,
            onset,
            duration,
            velocity,
        }
    }

    /// Time at which the note stops sounding.
    pub fn end(&self) -> f64 {
        self.onset + self.duration
    }

    /// Copy of this note at a different pitch.
    pub fn with_pitch(&self, pitch: i32) -> Self {
        Note { pitch, ..*self }
    }
}

/// End time of the last note in the sequence (not the maximum end: a
/// sustained early note can outlast it). `None` for an empty melody.
pub fn melody_end(melody: &[Note]) -> Option<f64> {
    melody.last().map(Note::end)
}

/// Lowest and highest pitch, or `None` for an empty melody.
pub fn pitch_bounds(melody: &[Note]) -> Option<(i32, i32)> {
    let lo = melody.iter().map(|n| n.pitch).min()?;
    let hi = melody.iter().map(|n| n.pitch).max()?;
    Some((lo, hi))
}

/// Pitch extremes of a melody or batch, as reported by analysis,
/// statistics, and the range check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PitchRange {
    pub lowest: i32,
    pub highest: i32,
    pub span: i32,
}

impl PitchRange {
    pub fn new(lowest: i32, highest: i32) -> Self {
        PitchRange {
            lowest,
            highest,
            span: highest - lowest,
        }
    }

    /// Range of a melody, or `None` if it is empty.
    pub fn of(melody: &[Note]) -> Option<Self> {
        pitch_bounds(melody).map(|(lo, hi)| PitchRange::new(lo, hi))
    }
}

/// Stable sort by onset. Notes sharing an onset keep their relative order.
pub fn sort_by_onset(melody: &mut [Note]) {
    melody.sort_by(|a, b| a.onset.total_cmp(&b.onset));
}

/// Linear interpolation between `a` and `b` at factor `t`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    (1.0 - t) * a + t * b
}

/// Round to a fixed number of decimal places, as reports present ratios.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Convert a MIDI pitch to a compact note name (e.g., "C4", "F#3").
/// Pitches outside 0..=127 render as "??".
pub fn pitch_name(pitch: i32) -> String {
    if !(0..=127).contains(&pitch) {
        return "??".to_string();
    }
    let octave = pitch / 12 - 1;
    format!("{}{}", PITCH_CLASS_NAMES[(pitch % 12) as usize], octave)
}

/// Pitch-class names used for keys ("C", "F#", ...).
pub fn pitch_class_name(pc: u8) -> &'static str {
    PITCH_CLASS_NAMES[(pc % 12) as usize]
}
