// Built-in seed melodies for trying out the engine.
//
// Lengths are given in quarter notes at 120 BPM (half a second each),
// back to back from time 0.

use crate::note::{DEFAULT_VELOCITY, Melody, Note};
use crate::scale::Scale;

/// Seconds per quarter note at 120 BPM.
pub const QUARTER_SECONDS: f64 = 0.5;

/// Names accepted by `named_seed`.
pub const SEED_NAMES: [&str; 3] = ["c_major_scale", "c_major_arpeggio", "twinkle"];

/// Lay pitches end to end with the given quarter-note lengths. Missing
/// lengths default to one quarter.
pub fn from_quarters(pitches: &[i32], quarters: &[f64]) -> Melody {
    let mut onset = 0.0;
    pitches
        .iter()
        .enumerate()
        .map(|(i, &pitch)| {
            let duration = quarters.get(i).copied().unwrap_or(1.0) * QUARTER_SECONDS;
            let note = Note::new(pitch, onset, duration, DEFAULT_VELOCITY);
            onset += duration;
            note
        })
        .collect()
}

/// A built-in melody by name, or `None` for an unknown name.
pub fn named_seed(name: &str) -> Option<Melody> {
    let melody = match name.trim().to_lowercase().as_str() {
        "c_major_scale" => from_quarters(
            &[60, 62, 64, 65, 67, 69, 71, 72],
            &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0],
        ),
        "c_major_arpeggio" => from_quarters(&[60, 64, 67, 72], &[1.0, 1.0, 1.0, 2.0]),
        "twinkle" => from_quarters(
            &[60, 60, 67, 67, 69, 69, 67],
            &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0],
        ),
        _ => return None,
    };
    Some(melody)
}

/// An ascending run of `count` scale tones from the root in `octave`, the
/// last note held for two quarters.
pub fn scale_run(scale: &Scale, octave: i32, count: usize) -> Melody {
    let pitches = scale.scale_pitches(octave, count);
    let mut quarters = vec![1.0; pitches.len()];
    if let Some(last) = quarters.last_mut() {
        *last = 2.0;
    }
    from_quarters(&pitches, &quarters)
}
