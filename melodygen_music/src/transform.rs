// The transformation catalog: melody-to-melody operators built on a scale.
//
// A `Transformer` owns one `Scale` and exposes every operator as a method
// that takes a melody slice and returns a new `Melody`. Inputs are never
// mutated. All operators are deterministic except ornamentation and the
// fragment/extend development methods, which draw from a caller-supplied
// `RandomSource`.
//
// Operators live in four files:
// - transform.rs: pitch operators (transpose, diatonic transpose, invert,
//   harmonize, counter-melody), time scaling, and `Transform` dispatch.
// - ornament.rs: turns, mordents, grace notes, ending slides.
// - develop.rs: sequence, fragment, extend, retrograde.
// - analysis.rs: read-only interval/contour/phrase analysis.
//
// String-tagged parameters from the request layer are parsed once into the
// closed enums below; unknown tags resolve to each enum's default.

use melodygen_prng::RandomSource;
use serde::{Deserialize, Serialize};

use crate::note::{Melody, Note};
use crate::scale::Scale;

/// Lowest pitch a harmony or counter line may land on (C2).
pub const ACCOMPANIMENT_LOW: i32 = 36;
/// Highest pitch a harmony or counter line may land on (C7).
pub const ACCOMPANIMENT_HIGH: i32 = 96;

/// Interval numbers are passed to the diatonic arithmetic as raw step
/// counts, the same convention `harmonize` uses for its degree interval.
const THIRD: i32 = 3;
const FIFTH: i32 = 5;

/// Pitch the inversion mirrors around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvertAxis {
    /// Midpoint of the lowest and highest pitch.
    #[default]
    Center,
    FirstNote,
    LastNote,
    /// A literal MIDI pitch.
    Pitch(i32),
}

impl InvertAxis {
    /// Parse "center", "first-note", "last-note", or a pitch number.
    /// Anything else mirrors around the first note.
    pub fn from_name(name: &str) -> InvertAxis {
        match name.trim().to_lowercase().replace('_', "-").as_str() {
            "center" => InvertAxis::Center,
            "first-note" => InvertAxis::FirstNote,
            "last-note" => InvertAxis::LastNote,
            other => other
                .parse::<i32>()
                .map(InvertAxis::Pitch)
                .unwrap_or(InvertAxis::FirstNote),
        }
    }
}

/// Voice-leading style for `counter_melody`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterStyle {
    #[default]
    Contrary,
    Parallel,
    Oblique,
    /// Cycles contrary, parallel, oblique, oblique by note index.
    Mixed,
}

impl CounterStyle {
    pub fn from_name(name: &str) -> CounterStyle {
        match name.trim().to_lowercase().as_str() {
            "parallel" => CounterStyle::Parallel,
            "oblique" => CounterStyle::Oblique,
            "mixed" => CounterStyle::Mixed,
            _ => CounterStyle::Contrary,
        }
    }
}

/// Ornamentation vocabulary for `ornament`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrnamentStyle {
    /// Turns on long notes.
    #[default]
    Classical,
    /// Chromatic grace notes.
    Jazz,
    /// Mordents.
    Baroque,
    /// A single slide off a long final note.
    Minimal,
}

impl OrnamentStyle {
    pub fn from_name(name: &str) -> OrnamentStyle {
        match name.trim().to_lowercase().as_str() {
            "jazz" => OrnamentStyle::Jazz,
            "baroque" => OrnamentStyle::Baroque,
            "minimal" => OrnamentStyle::Minimal,
            _ => OrnamentStyle::Classical,
        }
    }
}

/// Motivic development technique for `develop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopMethod {
    #[default]
    Sequence,
    Fragment,
    Extend,
    Retrograde,
}

impl DevelopMethod {
    pub fn from_name(name: &str) -> DevelopMethod {
        match name.trim().to_lowercase().as_str() {
            "fragment" => DevelopMethod::Fragment,
            "extend" => DevelopMethod::Extend,
            "retrograde" => DevelopMethod::Retrograde,
            _ => DevelopMethod::Sequence,
        }
    }
}

/// One operator with its parameters, for chained application.
///
/// Serialized with an `op` tag, e.g. `{"op": "transpose", "semitones": 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Transform {
    Transpose { semitones: i32 },
    TransposeDiatonic { steps: i32 },
    Invert { axis: InvertAxis },
    Augment { factor: f64 },
    Diminish { factor: f64 },
    Harmonize { degree_interval: i32 },
    CounterMelody { style: CounterStyle },
    Ornament { style: OrnamentStyle },
    Develop { method: DevelopMethod },
}

/// Applies the transformation catalog within one scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transformer {
    scale: Scale,
}

impl Transformer {
    pub fn new(scale: Scale) -> Self {
        Transformer { scale }
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Shift every pitch by a fixed number of semitones.
    pub fn transpose(&self, melody: &[Note], semitones: i32) -> Melody {
        melody
            .iter()
            .map(|n| n.with_pitch(n.pitch + semitones))
            .collect()
    }

    /// Move every note by `steps` scale tones. Each note works out its own
    /// degree, so the semitone shift can differ from note to note.
    pub fn transpose_diatonic(&self, melody: &[Note], steps: i32) -> Melody {
        melody
            .iter()
            .map(|n| n.with_pitch(self.scale.transpose_diatonic(n.pitch, steps)))
            .collect()
    }

    /// Mirror pitches around an axis: `new = 2 * axis - old`.
    pub fn invert(&self, melody: &[Note], axis: InvertAxis) -> Melody {
        let (Some(first), Some(last)) = (melody.first(), melody.last()) else {
            return Vec::new();
        };
        // Twice the axis. The center axis can fall between two semitones,
        // so it is kept doubled rather than floored; that keeps
        // inverting twice an exact identity.
        let doubled_axis = match axis {
            InvertAxis::Center => {
                let lo = melody.iter().map(|n| n.pitch).min().unwrap_or(first.pitch);
                let hi = melody.iter().map(|n| n.pitch).max().unwrap_or(first.pitch);
                lo + hi
            }
            InvertAxis::FirstNote => 2 * first.pitch,
            InvertAxis::LastNote => 2 * last.pitch,
            InvertAxis::Pitch(p) => 2 * p,
        };
        melody
            .iter()
            .map(|n| n.with_pitch(doubled_axis - n.pitch))
            .collect()
    }

    /// Stretch onsets (relative to the earliest onset) and durations.
    pub fn augment(&self, melody: &[Note], factor: f64) -> Melody {
        scale_time(melody, factor)
    }

    /// Compress onsets and durations; `factor` is below 1.
    pub fn diminish(&self, melody: &[Note], factor: f64) -> Melody {
        scale_time(melody, factor)
    }

    /// A parallel line `degree_interval` scale steps away, folded into the
    /// accompaniment range and played slightly softer.
    pub fn harmonize(&self, melody: &[Note], degree_interval: i32) -> Melody {
        melody
            .iter()
            .map(|n| {
                let pitch = self.scale.transpose_diatonic(n.pitch, degree_interval);
                Note {
                    pitch: fold_into_accompaniment_range(pitch),
                    velocity: n.velocity * 0.85,
                    ..*n
                }
            })
            .collect()
    }

    /// A second voice against the melody, one note per melody note.
    pub fn counter_melody(&self, melody: &[Note], style: CounterStyle) -> Melody {
        melody
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let style = match style {
                    CounterStyle::Mixed => match i % 4 {
                        0 => CounterStyle::Contrary,
                        1 => CounterStyle::Parallel,
                        _ => CounterStyle::Oblique,
                    },
                    other => other,
                };
                let pitch = match style {
                    CounterStyle::Contrary => {
                        let steps = match i.checked_sub(1).map(|p| n.pitch - melody[p].pitch) {
                            None => -THIRD,
                            Some(motion) if motion > 0 => -THIRD,
                            Some(motion) if motion < 0 => THIRD,
                            Some(_) => -FIFTH,
                        };
                        self.scale.transpose_diatonic(n.pitch, steps)
                    }
                    CounterStyle::Parallel => self.scale.transpose_diatonic(n.pitch, -THIRD),
                    CounterStyle::Oblique | CounterStyle::Mixed => {
                        if i % 2 == 0 {
                            melody[0].pitch
                        } else {
                            self.scale.transpose_diatonic(n.pitch, -FIFTH)
                        }
                    }
                };
                Note {
                    pitch: fold_into_accompaniment_range(pitch),
                    velocity: n.velocity * 0.8,
                    ..*n
                }
            })
            .collect()
    }

    /// Apply one operator.
    pub fn apply<R: RandomSource + ?Sized>(
        &self,
        melody: &[Note],
        transform: &Transform,
        rng: &mut R,
    ) -> Melody {
        match *transform {
            Transform::Transpose { semitones } => self.transpose(melody, semitones),
            Transform::TransposeDiatonic { steps } => self.transpose_diatonic(melody, steps),
            Transform::Invert { axis } => self.invert(melody, axis),
            Transform::Augment { factor } => self.augment(melody, factor),
            Transform::Diminish { factor } => self.diminish(melody, factor),
            Transform::Harmonize { degree_interval } => self.harmonize(melody, degree_interval),
            Transform::CounterMelody { style } => self.counter_melody(melody, style),
            Transform::Ornament { style } => self.ornament(melody, style, rng),
            Transform::Develop { method } => self.develop(melody, method, rng),
        }
    }

    /// Apply operators left to right, each to the previous result.
    pub fn apply_chain<R: RandomSource + ?Sized>(
        &self,
        melody: &[Note],
        chain: &[Transform],
        rng: &mut R,
    ) -> Melody {
        chain
            .iter()
            .fold(melody.to_vec(), |acc, t| self.apply(&acc, t, rng))
    }
}

fn scale_time(melody: &[Note], factor: f64) -> Melody {
    let start = melody
        .iter()
        .map(|n| n.onset)
        .fold(f64::INFINITY, f64::min);
    melody
        .iter()
        .map(|n| Note {
            onset: start + (n.onset - start) * factor,
            duration: n.duration * factor,
            ..*n
        })
        .collect()
}

/// Shift by octaves until the pitch lies in [36, 96].
pub fn fold_into_accompaniment_range(mut pitch: i32) -> i32 {
    while pitch > ACCOMPANIMENT_HIGH {
        pitch -= 12;
    }
    while pitch < ACCOMPANIMENT_LOW {
        pitch += 12;
    }
    pitch
}
