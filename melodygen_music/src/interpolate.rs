// Melody interpolation: morphing melody A into melody B in discrete steps.
//
// Every method returns `steps + 2` melodies: A verbatim, then `steps`
// synthesized melodies at t = k / (steps + 1) for k = 1..=steps, then B
// verbatim. If either input is empty the result is empty.
//
// Three methods are offered:
//
// - DTW: align the two pitch sequences with dynamic time warping and blend
//   each aligned note pair. Keeps the most of both melodies' shape.
// - Contour: normalize both pitch sequences to [0, 1], resample to a common
//   length, blend, and map back into a blended pitch range.
// - Feature: blend four aggregate statistics (mean pitch, variance, note
//   density, step ratio) and synthesize a melody that roughly matches
//   them. Shape is not preserved; timing is regularized.
//
// Synthesized pitches are always snapped to the interpolator's scale.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::note::{DEFAULT_VELOCITY, Melody, Note, lerp, pitch_bounds};
use crate::scale::Scale;

/// Share of the distance toward the blended mean pitch that each
/// feature-synthesized pitch moves.
const MEAN_PULL: f64 = 0.3;
/// Fixed duration of feature-synthesized notes, and their spacing when the
/// blended density is not positive.
const FEATURE_NOTE_SECONDS: f64 = 0.5;
/// Largest absolute interval (semitones) that counts as a step.
const STEP_MAX: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    #[default]
    Dtw,
    Contour,
    Feature,
}

impl InterpolationMethod {
    /// Parse "dtw", "contour", or "feature". Unknown names give `None`.
    pub fn from_name(name: &str) -> Option<InterpolationMethod> {
        match name.trim().to_lowercase().as_str() {
            "dtw" => Some(InterpolationMethod::Dtw),
            "contour" => Some(InterpolationMethod::Contour),
            "feature" => Some(InterpolationMethod::Feature),
            _ => None,
        }
    }
}

/// Result of aligning two pitch sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtwAlignment {
    /// Index pairs `(i, j)` into A and B, in time order.
    pub pairs: Vec<(usize, usize)>,
    /// Accumulated absolute pitch difference along the path.
    pub total_cost: f64,
}

/// Dynamic time warping over two pitch sequences.
///
/// Fills an `(n+1) x (m+1)` cost matrix whose border (except the origin)
/// is infinite, then backtracks from `(n, m)`. At each step the cheapest
/// predecessor wins; ties go to the diagonal, then up (advance A only),
/// then left (advance B only).
pub fn dtw_align(a: &[i32], b: &[i32]) -> DtwAlignment {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let mut cost = vec![f64::INFINITY; (n + 1) * width];
    cost[0] = 0.0;

    for i in 1..=n {
        for j in 1..=m {
            let distance = (a[i - 1] - b[j - 1]).abs() as f64;
            let best = cost[(i - 1) * width + j - 1]
                .min(cost[(i - 1) * width + j])
                .min(cost[i * width + j - 1]);
            cost[i * width + j] = distance + best;
        }
    }

    let mut pairs = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        pairs.push((i - 1, j - 1));
        let candidates = [(i - 1, j - 1), (i - 1, j), (i, j - 1)];
        let mut next = candidates[0];
        for &(ci, cj) in &candidates[1..] {
            if cost[ci * width + cj] < cost[next.0 * width + next.1] {
                next = (ci, cj);
            }
        }
        (i, j) = next;
    }
    pairs.reverse();

    DtwAlignment {
        pairs,
        total_cost: cost[n * width + m],
    }
}

/// Aggregate statistics used by feature interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MelodyFeatures {
    pub mean_pitch: f64,
    /// Population variance of the pitches.
    pub pitch_variance: f64,
    /// Notes per second over the melody's span; 0 for a zero-length span.
    pub rhythm_density: f64,
    /// Fraction of consecutive intervals of at most two semitones; 0.5 for
    /// melodies with fewer than two notes.
    pub step_ratio: f64,
}

impl MelodyFeatures {
    /// Features of a melody, or `None` if it is empty.
    pub fn extract(melody: &[Note]) -> Option<MelodyFeatures> {
        let (first, last) = (melody.first()?, melody.last()?);
        let count = melody.len() as f64;
        let mean_pitch = melody.iter().map(|n| n.pitch as f64).sum::<f64>() / count;
        let pitch_variance = melody
            .iter()
            .map(|n| (n.pitch as f64 - mean_pitch).powi(2))
            .sum::<f64>()
            / count;

        let span = last.end() - first.onset;
        let rhythm_density = if span > 0.0 { count / span } else { 0.0 };

        let intervals = melody.len() - 1;
        let step_ratio = if intervals == 0 {
            0.5
        } else {
            let steps = melody
                .windows(2)
                .filter(|w| (w[1].pitch - w[0].pitch).abs() <= STEP_MAX)
                .count();
            steps as f64 / intervals as f64
        };

        Some(MelodyFeatures {
            mean_pitch,
            pitch_variance,
            rhythm_density,
            step_ratio,
        })
    }

    /// Blend every feature linearly: `t = 0` is `self`, `t = 1` is `other`.
    pub fn blend(&self, other: &MelodyFeatures, t: f64) -> MelodyFeatures {
        MelodyFeatures {
            mean_pitch: lerp(self.mean_pitch, other.mean_pitch, t),
            pitch_variance: lerp(self.pitch_variance, other.pitch_variance, t),
            rhythm_density: lerp(self.rhythm_density, other.rhythm_density, t),
            step_ratio: lerp(self.step_ratio, other.step_ratio, t),
        }
    }
}

/// Min-max normalize pitches into [0, 1]. A constant melody maps to 0.5
/// everywhere.
pub fn normalize_contour(pitches: &[i32]) -> Vec<f64> {
    let (Some(&lo), Some(&hi)) = (pitches.iter().min(), pitches.iter().max()) else {
        return Vec::new();
    };
    if lo == hi {
        return vec![0.5; pitches.len()];
    }
    let span = (hi - lo) as f64;
    pitches.iter().map(|&p| (p - lo) as f64 / span).collect()
}

/// Resample a contour to `len` points, evenly spaced over its fractional
/// index range, with linear interpolation between neighbours.
pub fn resample_contour(contour: &[f64], len: usize) -> Vec<f64> {
    if contour.len() == len {
        return contour.to_vec();
    }
    if contour.is_empty() {
        return vec![0.5; len];
    }
    let last = contour.len() - 1;
    (0..len)
        .map(|k| {
            let pos = if len > 1 {
                k as f64 * last as f64 / (len - 1) as f64
            } else {
                0.0
            };
            let low = (pos.floor() as usize).min(last);
            let high = (pos.ceil() as usize).min(last);
            if low == high {
                contour[low]
            } else {
                lerp(contour[low], contour[high], pos - low as f64)
            }
        })
        .collect()
}

/// Interpolates between melodies within one scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpolator {
    scale: Scale,
}

impl Interpolator {
    pub fn new(scale: Scale) -> Self {
        Interpolator { scale }
    }

    /// Dispatch to one of the three methods.
    pub fn interpolate(
        &self,
        method: InterpolationMethod,
        a: &[Note],
        b: &[Note],
        steps: usize,
    ) -> Vec<Melody> {
        let result = match method {
            InterpolationMethod::Dtw => self.dtw_interpolate(a, b, steps),
            InterpolationMethod::Contour => self.contour_interpolate(a, b, steps),
            InterpolationMethod::Feature => self.feature_interpolate(a, b, steps),
        };
        debug!(
            "{:?} interpolation: {} + {} notes, {} steps -> {} melodies",
            method,
            a.len(),
            b.len(),
            steps,
            result.len()
        );
        result
    }

    /// Blend DTW-aligned note pairs. Pitches are rounded then snapped;
    /// timing and velocity blend linearly.
    pub fn dtw_interpolate(&self, a: &[Note], b: &[Note], steps: usize) -> Vec<Melody> {
        if a.is_empty() || b.is_empty() {
            return Vec::new();
        }
        let pitches_a: Vec<i32> = a.iter().map(|n| n.pitch).collect();
        let pitches_b: Vec<i32> = b.iter().map(|n| n.pitch).collect();
        let alignment = dtw_align(&pitches_a, &pitches_b);

        frame(a, b, steps, |t| {
            alignment
                .pairs
                .iter()
                .map(|&(i, j)| {
                    let (na, nb) = (&a[i], &b[j]);
                    let pitch = lerp(na.pitch as f64, nb.pitch as f64, t).round() as i32;
                    Note {
                        pitch: self.scale.snap_to_scale(pitch),
                        onset: lerp(na.onset, nb.onset, t),
                        duration: lerp(na.duration, nb.duration, t),
                        velocity: lerp(na.velocity, nb.velocity, t),
                    }
                })
                .collect()
        })
    }

    /// Blend normalized contours, resampled to the longer melody's length,
    /// and map them into the blended pitch range.
    pub fn contour_interpolate(&self, a: &[Note], b: &[Note], steps: usize) -> Vec<Melody> {
        let (Some((lo_a, hi_a)), Some((lo_b, hi_b))) = (pitch_bounds(a), pitch_bounds(b)) else {
            return Vec::new();
        };
        let len = a.len().max(b.len());
        let contour_a = resample_contour(&normalize_contour(&pitches(a)), len);
        let contour_b = resample_contour(&normalize_contour(&pitches(b)), len);

        frame(a, b, steps, |t| {
            let lo = lerp(lo_a as f64, lo_b as f64, t) as i32;
            let hi = lerp(hi_a as f64, hi_b as f64, t) as i32;
            contour_a
                .iter()
                .zip(&contour_b)
                .enumerate()
                .map(|(i, (&ca, &cb))| {
                    let c = lerp(ca, cb, t);
                    let pitch = (lo as f64 + c * (hi - lo) as f64) as i32;
                    let na = &a[i.min(a.len() - 1)];
                    let nb = &b[i.min(b.len() - 1)];
                    Note {
                        pitch: self.scale.snap_to_scale(pitch),
                        onset: lerp(na.onset, nb.onset, t),
                        duration: lerp(na.duration, nb.duration, t),
                        velocity: lerp(na.velocity, nb.velocity, t),
                    }
                })
                .collect()
        })
    }

    /// Synthesize melodies from blended aggregate features.
    pub fn feature_interpolate(&self, a: &[Note], b: &[Note], steps: usize) -> Vec<Melody> {
        let (Some(fa), Some(fb)) = (MelodyFeatures::extract(a), MelodyFeatures::extract(b)) else {
            return Vec::new();
        };
        frame(a, b, steps, |t| self.synthesize(&fa.blend(&fb, t), a, b, t))
    }

    /// Length blends between the sources. Each pitch blends the notes at the
    /// same proportional position in A and B, is pulled toward the target
    /// mean, and snapped. Notes are 0.5s long, spaced at 1/density.
    fn synthesize(&self, target: &MelodyFeatures, a: &[Note], b: &[Note], t: f64) -> Melody {
        let len = lerp(a.len() as f64, b.len() as f64, t).round() as usize;
        let spacing = if target.rhythm_density > 0.0 {
            1.0 / target.rhythm_density
        } else {
            FEATURE_NOTE_SECONDS
        };
        (0..len)
            .map(|i| {
                let na = &a[(i * a.len() / len).min(a.len() - 1)];
                let nb = &b[(i * b.len() / len).min(b.len() - 1)];
                let blended = lerp(na.pitch as f64, nb.pitch as f64, t) as i32;
                let pulled =
                    (blended as f64 + (target.mean_pitch - blended as f64) * MEAN_PULL) as i32;
                Note {
                    pitch: self.scale.snap_to_scale(pulled),
                    onset: i as f64 * spacing,
                    duration: FEATURE_NOTE_SECONDS,
                    velocity: DEFAULT_VELOCITY,
                }
            })
            .collect()
    }
}

fn pitches(melody: &[Note]) -> Vec<i32> {
    melody.iter().map(|n| n.pitch).collect()
}

/// A, then one synthesized melody per interior step, then B.
fn frame(
    a: &[Note],
    b: &[Note],
    steps: usize,
    mut synthesize: impl FnMut(f64) -> Melody,
) -> Vec<Melody> {
    let mut out = Vec::with_capacity(steps + 2);
    out.push(a.to_vec());
    for k in 1..=steps {
        out.push(synthesize(k as f64 / (steps + 1) as f64));
    }
    out.push(b.to_vec());
    out
}
