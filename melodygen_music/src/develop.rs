// Motivic development: operators that grow or rearrange a melody.
//
// - Sequence: the opening motif (up to four notes) restated a second, a
//   fourth, and a step below, each restatement pushed later in time.
// - Fragment: four random two-to-four-note fragments strung together.
// - Extend: the melody followed by a lightly mutated copy of itself.
// - Retrograde: the melody played backwards.
//
// Fragment and extend draw from the caller's random source; the other two
// are deterministic.

use melodygen_prng::{RandomSource, choose};

use crate::note::{Melody, Note};
use crate::transform::{DevelopMethod, Transformer};

/// Degree steps for the three sequence restatements.
const SEQUENCE_STEPS: [i32; 3] = [2, 4, -1];
/// Seconds of delay per already-emitted note for each restatement.
const SEQUENCE_SPACING: f64 = 0.5;
const MOTIF_LEN: usize = 4;
const FRAGMENT_MIN: usize = 2;
const FRAGMENT_MAX: usize = 4;
const FRAGMENT_COUNT: usize = 4;
const FRAGMENT_GAP: f64 = 0.1;
const EXTEND_MUTATION_PROBABILITY: f64 = 0.3;

impl Transformer {
    /// Apply a development technique. Empty input gives empty output.
    pub fn develop<R: RandomSource + ?Sized>(
        &self,
        melody: &[Note],
        method: DevelopMethod,
        rng: &mut R,
    ) -> Melody {
        if melody.is_empty() {
            return Vec::new();
        }
        match method {
            DevelopMethod::Sequence => self.sequence(melody),
            DevelopMethod::Fragment => fragment(melody, rng),
            DevelopMethod::Extend => self.extend(melody, rng),
            DevelopMethod::Retrograde => retrograde(melody),
        }
    }

    fn sequence(&self, melody: &[Note]) -> Melody {
        let motif = &melody[..melody.len().min(MOTIF_LEN)];
        let mut developed = motif.to_vec();
        for steps in SEQUENCE_STEPS {
            let delay = developed.len() as f64 * SEQUENCE_SPACING;
            for note in motif {
                developed.push(Note {
                    pitch: self.scale().transpose_diatonic(note.pitch, steps),
                    onset: note.onset + delay,
                    ..*note
                });
            }
        }
        developed
    }

    fn extend<R: RandomSource + ?Sized>(&self, melody: &[Note], rng: &mut R) -> Melody {
        let offset = melody.last().map(Note::end).unwrap_or(0.0);
        let mut developed = melody.to_vec();
        for note in melody {
            let pitch = if rng.random_bool(EXTEND_MUTATION_PROBABILITY) {
                let direction = *choose(rng, &[-1, 1]).unwrap_or(&1);
                self.scale().transpose_diatonic(note.pitch, direction)
            } else {
                note.pitch
            };
            developed.push(Note {
                pitch,
                onset: note.onset + offset,
                ..*note
            });
        }
        developed
    }
}

/// Every contiguous run of two to four notes, shortest first.
pub fn fragments(melody: &[Note]) -> Vec<&[Note]> {
    (FRAGMENT_MIN..=FRAGMENT_MAX.min(melody.len()))
        .flat_map(|len| melody.windows(len))
        .collect()
}

/// Four fragments placed back to back, 0.1s apart, starting at time 0.
/// A single-note melody has no fragments and is returned unchanged.
fn fragment<R: RandomSource + ?Sized>(melody: &[Note], rng: &mut R) -> Melody {
    let pool = fragments(melody);
    if pool.is_empty() {
        return melody.to_vec();
    }
    let mut result = Vec::new();
    let mut cursor = 0.0;
    for _ in 0..FRAGMENT_COUNT {
        let Some(piece) = choose(rng, &pool) else {
            break;
        };
        let shift = cursor - piece[0].onset;
        result.extend(piece.iter().map(|n| Note {
            onset: n.onset + shift,
            ..*n
        }));
        if let Some(last) = result.last() {
            cursor = last.end() + FRAGMENT_GAP;
        }
    }
    result
}

/// Reverse the note order and mirror onsets across the melody's span, from
/// the first onset to the last note's end, so that the last note to end
/// becomes the first to start.
pub fn retrograde(melody: &[Note]) -> Melody {
    let (Some(first), Some(last)) = (melody.first(), melody.last()) else {
        return Vec::new();
    };
    let mirror = first.onset + last.end();
    melody
        .iter()
        .rev()
        .map(|n| Note {
            onset: mirror - n.end(),
            ..*n
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Scale;
    use melodygen_prng::MelodyRng;

    /// Fixed draws; uniform picks always take the lowest index.
    struct Constant(u64);

    impl RandomSource for Constant {
        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn range_u64(&mut self, low: u64, _high: u64) -> u64 {
            low
        }
    }

    fn melody(pitches: &[i32]) -> Melody {
        pitches
            .iter()
            .enumerate()
            .map(|(i, &p)| Note::new(p, i as f64 * 0.5, 0.5, 0.7))
            .collect()
    }

    fn transformer() -> Transformer {
        Transformer::new(Scale::c_major())
    }

    #[test]
    fn test_sequence() {
        let t = transformer();
        let m = melody(&[60, 62, 64, 65, 67]);
        let out = t.develop(&m, DevelopMethod::Sequence, &mut MelodyRng::new(0));
        assert_eq!(out.len(), 16);
        let pitches: Vec<i32> = out.iter().map(|n| n.pitch).collect();
        assert_eq!(
            pitches,
            vec![60, 62, 64, 65, 64, 65, 67, 69, 67, 69, 71, 72, 59, 60, 62, 64]
        );
        // Restatements start after 4, 8 and 12 notes have been emitted.
        assert_eq!(out[4].onset, 2.0);
        assert_eq!(out[8].onset, 4.0);
        assert_eq!(out[12].onset, 6.0);
    }

    #[test]
    fn test_sequence_short_motif() {
        let t = transformer();
        let out = t.develop(&melody(&[60]), DevelopMethod::Sequence, &mut MelodyRng::new(0));
        let pitches: Vec<i32> = out.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 64, 67, 59]);
        assert_eq!(out[3].onset, 1.5);
    }

    #[test]
    fn test_fragments_enumeration() {
        let m = melody(&[60, 62, 64, 65]);
        let pool = fragments(&m);
        // 3 pairs + 2 triples + 1 quadruple.
        assert_eq!(pool.len(), 6);
        assert_eq!(pool[0].len(), 2);
        assert_eq!(pool[5].len(), 4);
        assert!(fragments(&m[..1]).is_empty());
    }

    #[test]
    fn test_fragment_back_to_back() {
        let t = transformer();
        let m = melody(&[60, 62, 64, 65, 67]);
        // Always picks the first fragment (60, 62).
        let out = t.develop(&m, DevelopMethod::Fragment, &mut Constant(0));
        assert_eq!(out.len(), 8);
        let onsets: Vec<f64> = out.iter().map(|n| n.onset).collect();
        let expected = [0.0, 0.5, 1.1, 1.6, 2.2, 2.7, 3.3, 3.8];
        for (got, want) in onsets.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{onsets:?}");
        }
    }

    #[test]
    fn test_fragment_single_note_unchanged() {
        let t = transformer();
        let m = melody(&[60]);
        assert_eq!(t.develop(&m, DevelopMethod::Fragment, &mut MelodyRng::new(5)), m);
    }

    #[test]
    fn test_extend() {
        let t = transformer();
        let m = melody(&[60, 64, 67]);
        let out = t.develop(&m, DevelopMethod::Extend, &mut Constant(u64::MAX));
        assert_eq!(out.len(), 6);
        assert_eq!(&out[..3], &m[..]);
        // No mutation fired: the copy repeats the pitches after the end.
        assert_eq!(out[3].pitch, 60);
        assert_eq!(out[3].onset, 1.5);
        assert_eq!(out[5].onset, 2.5);

        // Seeded: every copied note is either unchanged or one step away.
        let out = t.develop(&m, DevelopMethod::Extend, &mut MelodyRng::new(11));
        let scale = Scale::c_major();
        for (orig, copy) in m.iter().zip(&out[3..]) {
            let candidates = [
                orig.pitch,
                scale.transpose_diatonic(orig.pitch, 1),
                scale.transpose_diatonic(orig.pitch, -1),
            ];
            assert!(candidates.contains(&copy.pitch));
        }
    }

    #[test]
    fn test_retrograde() {
        let m = vec![
            Note::new(60, 0.0, 1.0, 0.7),
            Note::new(62, 1.0, 0.5, 0.7),
            Note::new(64, 2.0, 1.0, 0.7),
        ];
        let r = retrograde(&m);
        let pitches: Vec<i32> = r.iter().map(|n| n.pitch).collect();
        let onsets: Vec<f64> = r.iter().map(|n| n.onset).collect();
        assert_eq!(pitches, vec![64, 62, 60]);
        assert_eq!(onsets, vec![0.0, 1.5, 2.0]);
    }

    #[test]
    fn test_retrograde_is_involution() {
        let m = vec![
            Note::new(60, 0.25, 0.3, 0.7),
            Note::new(62, 0.75, 0.5, 0.7),
            Note::new(67, 1.5, 0.2, 0.7),
            Note::new(64, 2.0, 1.25, 0.7),
        ];
        let twice = retrograde(&retrograde(&m));
        for (a, b) in m.iter().zip(&twice) {
            assert_eq!(a.pitch, b.pitch);
            assert!((a.onset - b.onset).abs() < 1e-9);
            assert_eq!(a.duration, b.duration);
        }
        assert!(retrograde(&[]).is_empty());
    }
}
