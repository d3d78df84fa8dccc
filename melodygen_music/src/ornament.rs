// Ornamentation: probabilistic embellishment of individual notes.
//
// Each style walks the melody once and decides per note, with an
// independent Bernoulli draw, whether to replace it with an ornament
// figure. Notes left alone pass through unchanged.
//
// - Classical: a four-note turn (upper neighbour, main, lower neighbour,
//   main) on notes longer than half a second.
// - Jazz: a chromatic grace note a semitone below, 0.1s ahead of the note.
// - Baroque: a mordent (main, lower neighbour, main) on notes longer than
//   0.3s.
// - Minimal: no randomness; a two-semitone slide after a long final note.
//
// Neighbour tones are diatonic (one scale step), except the jazz grace
// note and the minimal slide, which are chromatic.

use melodygen_prng::RandomSource;

use crate::note::{Melody, Note, sort_by_onset};
use crate::transform::{OrnamentStyle, Transformer};

const TURN_PROBABILITY: f64 = 0.3;
const TURN_MIN_DURATION: f64 = 0.5;
const GRACE_PROBABILITY: f64 = 0.2;
const GRACE_LEAD: f64 = 0.1;
const MORDENT_PROBABILITY: f64 = 0.25;
const MORDENT_MIN_DURATION: f64 = 0.3;
const MORDENT_FLICK: f64 = 0.1;
const SLIDE_MIN_DURATION: f64 = 1.0;
const SLIDE_DURATION: f64 = 0.2;

impl Transformer {
    /// Embellish a melody. The result is sorted by onset: a grace note can
    /// start before the note preceding its target.
    pub fn ornament<R: RandomSource + ?Sized>(
        &self,
        melody: &[Note],
        style: OrnamentStyle,
        rng: &mut R,
    ) -> Melody {
        let mut result = Vec::with_capacity(melody.len() * 2);
        let last = melody.len().saturating_sub(1);

        for (i, note) in melody.iter().enumerate() {
            match style {
                OrnamentStyle::Classical => {
                    if note.duration > TURN_MIN_DURATION && rng.random_bool(TURN_PROBABILITY) {
                        result.extend(self.turn(note));
                    } else {
                        result.push(*note);
                    }
                }
                OrnamentStyle::Jazz => {
                    // The draw happens for every note so the stream advances
                    // the same way whatever the melody's first note is.
                    if rng.random_bool(GRACE_PROBABILITY) && i > 0 {
                        result.push(grace_note(note));
                    }
                    result.push(*note);
                }
                OrnamentStyle::Baroque => {
                    if note.duration > MORDENT_MIN_DURATION && rng.random_bool(MORDENT_PROBABILITY)
                    {
                        result.extend(self.mordent(note));
                    } else {
                        result.push(*note);
                    }
                }
                OrnamentStyle::Minimal => {
                    if i == last && note.duration > SLIDE_MIN_DURATION {
                        result.extend(ending_slide(note));
                    } else {
                        result.push(*note);
                    }
                }
            }
        }

        sort_by_onset(&mut result);
        result
    }

    /// Upper neighbour, main, lower neighbour, main, in four equal parts.
    /// Only the returning main note (second) keeps full velocity.
    fn turn(&self, note: &Note) -> [Note; 4] {
        let scale = self.scale();
        let pitches = [
            scale.transpose_diatonic(note.pitch, 1),
            note.pitch,
            scale.transpose_diatonic(note.pitch, -1),
            note.pitch,
        ];
        let each = note.duration / 4.0;
        let mut i = 0;
        pitches.map(|pitch| {
            let sub = Note {
                pitch,
                onset: note.onset + i as f64 * each,
                duration: each,
                velocity: note.velocity * if i == 1 { 1.0 } else { 0.8 },
            };
            i += 1;
            sub
        })
    }

    /// Quick flick to the lower neighbour, then the shortened main note.
    fn mordent(&self, note: &Note) -> [Note; 3] {
        let lower = self.scale().transpose_diatonic(note.pitch, -1);
        [
            Note {
                duration: MORDENT_FLICK,
                velocity: note.velocity * 0.8,
                ..*note
            },
            Note {
                pitch: lower,
                onset: note.onset + MORDENT_FLICK,
                duration: MORDENT_FLICK,
                velocity: note.velocity * 0.7,
            },
            Note {
                onset: note.onset + 2.0 * MORDENT_FLICK,
                duration: note.duration - 2.0 * MORDENT_FLICK,
                ..*note
            },
        ]
    }
}

fn grace_note(target: &Note) -> Note {
    Note {
        pitch: target.pitch - 1,
        onset: target.onset - GRACE_LEAD,
        duration: GRACE_LEAD,
        velocity: target.velocity * 0.6,
    }
}

fn ending_slide(note: &Note) -> [Note; 2] {
    [
        *note,
        Note {
            pitch: note.pitch - 2,
            onset: note.end(),
            duration: SLIDE_DURATION,
            velocity: note.velocity * 0.5,
        },
    ]
}
