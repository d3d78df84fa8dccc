// Read-only melody analysis: intervals, contour, scale degrees, phrases.
//
// Phrase detection is gap-based: a new phrase starts whenever the silence
// between one note's end and the next note's onset exceeds half a second.

use serde::{Deserialize, Serialize};

use crate::note::{Note, PitchRange};
use crate::transform::Transformer;

/// Silence (seconds) that separates two phrases.
pub const PHRASE_GAP: f64 = 0.5;

/// Direction of one melodic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contour {
    Up,
    Down,
    Same,
}

impl Contour {
    pub fn of_interval(interval: i32) -> Contour {
        match interval.signum() {
            1 => Contour::Up,
            -1 => Contour::Down,
            _ => Contour::Same,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MelodyAnalysis {
    /// Semitone differences between consecutive notes.
    pub intervals: Vec<i32>,
    pub contour: Vec<Contour>,
    /// Scale degree (1..=7) of every note.
    pub scale_degrees: Vec<u8>,
    /// Note indices grouped into phrases.
    pub phrases: Vec<Vec<usize>>,
    /// Absent for an empty melody.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<PitchRange>,
}

impl Transformer {
    pub fn analyze(&self, melody: &[Note]) -> MelodyAnalysis {
        let intervals: Vec<i32> = melody.windows(2).map(|w| w[1].pitch - w[0].pitch).collect();
        MelodyAnalysis {
            contour: intervals.iter().map(|&i| Contour::of_interval(i)).collect(),
            intervals,
            scale_degrees: melody
                .iter()
                .map(|n| self.scale().scale_degree(n.pitch))
                .collect(),
            phrases: detect_phrases(melody),
            range: PitchRange::of(melody),
        }
    }
}

/// Split note indices into phrases at gaps longer than `PHRASE_GAP`.
pub fn detect_phrases(melody: &[Note]) -> Vec<Vec<usize>> {
    let mut phrases: Vec<Vec<usize>> = Vec::new();
    for (i, note) in melody.iter().enumerate() {
        let starts_phrase = match i.checked_sub(1) {
            None => true,
            Some(prev) => note.onset - melody[prev].end() > PHRASE_GAP,
        };
        if starts_phrase {
            phrases.push(vec![i]);
        } else if let Some(current) = phrases.last_mut() {
            current.push(i);
        }
    }
    phrases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::{Scale, ScaleName};

    #[test]
    fn test_analyze_intervals_and_contour() {
        let t = Transformer::new(Scale::c_major());
        let m = vec![
            Note::new(60, 0.0, 0.5, 0.7),
            Note::new(64, 0.5, 0.5, 0.7),
            Note::new(64, 1.0, 0.5, 0.7),
            Note::new(59, 1.5, 0.5, 0.7),
        ];
        let a = t.analyze(&m);
        assert_eq!(a.intervals, vec![4, 0, -5]);
        assert_eq!(a.contour, vec![Contour::Up, Contour::Same, Contour::Down]);
        assert_eq!(a.scale_degrees, vec![1, 3, 3, 7]);
        assert_eq!(a.phrases, vec![vec![0, 1, 2, 3]]);
        assert_eq!(a.range, Some(PitchRange::new(59, 64)));
    }

    #[test]
    fn test_phrase_split_on_long_gap() {
        let m = vec![
            Note::new(60, 0.0, 0.5, 0.7),
            Note::new(62, 0.5, 0.5, 0.7),
            // 0.5s gap exactly: same phrase.
            Note::new(64, 1.5, 0.5, 0.7),
            // 0.6s gap: new phrase.
            Note::new(65, 2.6, 0.5, 0.7),
        ];
        assert_eq!(detect_phrases(&m), vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_empty_melody() {
        let t = Transformer::new(Scale::new(ScaleName::Dorian, 2));
        let a = t.analyze(&[]);
        assert_eq!(a, MelodyAnalysis::default());
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("range").is_none());
    }

    #[test]
    fn test_contour_serializes_lowercase() {
        let json = serde_json::to_string(&[Contour::Up, Contour::Same]).unwrap();
        assert_eq!(json, r#"["up","same"]"#);
    }
}
