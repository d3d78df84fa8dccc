// Batch variation generation from a seed melody.
//
// A batch is `count` independent draws, with replacement, from a catalog of
// operator presets. Each preset pairs an operator from the transformation
// catalog with a parameter range (e.g., chromatic transpose up 1..=7
// semitones) and a human-readable method label. Presets live in one static
// lookup table, `PRESETS`, keyed by `VariationType`; the generator never
// dispatches on strings.
//
// Unknown type tags coming from a request resolve to `RandomTranspose`, a
// +/-5 semitone transpose that is not part of the default catalog.
//
// All randomness, including the hex suffix of variation ids, comes from the
// caller's `RandomSource`, so a seeded source gives a reproducible batch.

use std::collections::BTreeMap;

use melodygen_prng::{RandomSource, choose};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::note::{Melody, Note, PitchRange, pitch_class_name, round_to};
use crate::scale::{Scale, ScaleName};
use crate::transform::{
    CounterStyle, DevelopMethod, InvertAxis, OrnamentStyle, Transform, Transformer,
};

/// One entry of the variation catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationType {
    TransposeUp,
    TransposeDown,
    TransposeDiatonicUp,
    TransposeDiatonicDown,
    InvertCenter,
    InvertFirst,
    InvertLast,
    Augment,
    Diminish,
    OrnamentClassical,
    OrnamentJazz,
    DevelopSequence,
    DevelopRetrograde,
    HarmonizeThird,
    HarmonizeFifth,
    CounterContrary,
    CounterParallel,
    /// Fallback for unrecognized tags.
    RandomTranspose,
}

impl VariationType {
    /// The presets drawn from when a request names no types.
    pub const DEFAULT_CATALOG: [VariationType; 17] = [
        VariationType::TransposeUp,
        VariationType::TransposeDown,
        VariationType::TransposeDiatonicUp,
        VariationType::TransposeDiatonicDown,
        VariationType::InvertCenter,
        VariationType::InvertFirst,
        VariationType::InvertLast,
        VariationType::Augment,
        VariationType::Diminish,
        VariationType::OrnamentClassical,
        VariationType::OrnamentJazz,
        VariationType::DevelopSequence,
        VariationType::DevelopRetrograde,
        VariationType::HarmonizeThird,
        VariationType::HarmonizeFifth,
        VariationType::CounterContrary,
        VariationType::CounterParallel,
    ];

    /// Resolve a request tag such as "invert_center". Unknown tags become
    /// `RandomTranspose`.
    pub fn from_tag(tag: &str) -> VariationType {
        let tag = tag.trim();
        match PRESETS.iter().find(|p| p.tag == tag) {
            Some(preset) => preset.kind,
            None => {
                debug!("unknown variation type '{}', using random transpose", tag);
                VariationType::RandomTranspose
            }
        }
    }

    pub fn tag(self) -> &'static str {
        preset(self).tag
    }
}

/// Applies a preset: returns the new notes and the method label.
type Operator = fn(&Transformer, &[Note], &mut dyn RandomSource) -> (Melody, String);

struct Preset {
    kind: VariationType,
    tag: &'static str,
    apply: Operator,
}

static PRESETS: [Preset; 18] = [
    Preset {
        kind: VariationType::TransposeUp,
        tag: "transpose_up",
        apply: transpose_up,
    },
    Preset {
        kind: VariationType::TransposeDown,
        tag: "transpose_down",
        apply: transpose_down,
    },
    Preset {
        kind: VariationType::TransposeDiatonicUp,
        tag: "transpose_diatonic_up",
        apply: diatonic_up,
    },
    Preset {
        kind: VariationType::TransposeDiatonicDown,
        tag: "transpose_diatonic_down",
        apply: diatonic_down,
    },
    Preset {
        kind: VariationType::InvertCenter,
        tag: "invert_center",
        apply: invert_center,
    },
    Preset {
        kind: VariationType::InvertFirst,
        tag: "invert_first",
        apply: invert_first,
    },
    Preset {
        kind: VariationType::InvertLast,
        tag: "invert_last",
        apply: invert_last,
    },
    Preset {
        kind: VariationType::Augment,
        tag: "augment",
        apply: augment,
    },
    Preset {
        kind: VariationType::Diminish,
        tag: "diminish",
        apply: diminish,
    },
    Preset {
        kind: VariationType::OrnamentClassical,
        tag: "ornament_classical",
        apply: ornament_classical,
    },
    Preset {
        kind: VariationType::OrnamentJazz,
        tag: "ornament_jazz",
        apply: ornament_jazz,
    },
    Preset {
        kind: VariationType::DevelopSequence,
        tag: "develop_sequence",
        apply: develop_sequence,
    },
    Preset {
        kind: VariationType::DevelopRetrograde,
        tag: "develop_retrograde",
        apply: develop_retrograde,
    },
    Preset {
        kind: VariationType::HarmonizeThird,
        tag: "harmonize_third",
        apply: harmonize_third,
    },
    Preset {
        kind: VariationType::HarmonizeFifth,
        tag: "harmonize_fifth",
        apply: harmonize_fifth,
    },
    Preset {
        kind: VariationType::CounterContrary,
        tag: "counter_contrary",
        apply: counter_contrary,
    },
    Preset {
        kind: VariationType::CounterParallel,
        tag: "counter_parallel",
        apply: counter_parallel,
    },
    Preset {
        kind: VariationType::RandomTranspose,
        tag: "random_transpose",
        apply: random_transpose,
    },
];

fn preset(kind: VariationType) -> &'static Preset {
    PRESETS
        .iter()
        .find(|p| p.kind == kind)
        .unwrap_or(&PRESETS[PRESETS.len() - 1])
}

const AUGMENT_FACTORS: [f64; 3] = [1.5, 2.0, 2.5];
const DIMINISH_FACTORS: [f64; 3] = [0.5, 0.66, 0.75];

fn transpose_up(t: &Transformer, seed: &[Note], rng: &mut dyn RandomSource) -> (Melody, String) {
    let semitones = rng.range_i32_inclusive(1, 7);
    (t.transpose(seed, semitones), format!("Transpose +{semitones} semitones"))
}

fn transpose_down(t: &Transformer, seed: &[Note], rng: &mut dyn RandomSource) -> (Melody, String) {
    let semitones = rng.range_i32_inclusive(-7, -1);
    (t.transpose(seed, semitones), format!("Transpose {semitones} semitones"))
}

fn diatonic_up(t: &Transformer, seed: &[Note], rng: &mut dyn RandomSource) -> (Melody, String) {
    let steps = rng.range_i32_inclusive(1, 4);
    (t.transpose_diatonic(seed, steps), format!("Diatonic transpose +{steps} steps"))
}

fn diatonic_down(t: &Transformer, seed: &[Note], rng: &mut dyn RandomSource) -> (Melody, String) {
    let steps = rng.range_i32_inclusive(-4, -1);
    (t.transpose_diatonic(seed, steps), format!("Diatonic transpose {steps} steps"))
}

fn invert_center(t: &Transformer, seed: &[Note], _: &mut dyn RandomSource) -> (Melody, String) {
    (t.invert(seed, InvertAxis::Center), "Invert around center".into())
}

fn invert_first(t: &Transformer, seed: &[Note], _: &mut dyn RandomSource) -> (Melody, String) {
    (t.invert(seed, InvertAxis::FirstNote), "Invert around first note".into())
}

fn invert_last(t: &Transformer, seed: &[Note], _: &mut dyn RandomSource) -> (Melody, String) {
    (t.invert(seed, InvertAxis::LastNote), "Invert around last note".into())
}

fn augment(t: &Transformer, seed: &[Note], rng: &mut dyn RandomSource) -> (Melody, String) {
    let factor = *choose(rng, &AUGMENT_FACTORS).unwrap_or(&2.0);
    (t.augment(seed, factor), format!("Augment ×{factor:?}"))
}

fn diminish(t: &Transformer, seed: &[Note], rng: &mut dyn RandomSource) -> (Melody, String) {
    let factor = *choose(rng, &DIMINISH_FACTORS).unwrap_or(&0.5);
    (t.diminish(seed, factor), format!("Diminish ×{factor:?}"))
}

fn ornament_classical(
    t: &Transformer,
    seed: &[Note],
    rng: &mut dyn RandomSource,
) -> (Melody, String) {
    (t.ornament(seed, OrnamentStyle::Classical, rng), "Classical ornamentation".into())
}

fn ornament_jazz(t: &Transformer, seed: &[Note], rng: &mut dyn RandomSource) -> (Melody, String) {
    (t.ornament(seed, OrnamentStyle::Jazz, rng), "Jazz ornamentation".into())
}

fn develop_sequence(
    t: &Transformer,
    seed: &[Note],
    rng: &mut dyn RandomSource,
) -> (Melody, String) {
    (t.develop(seed, DevelopMethod::Sequence, rng), "Sequential development".into())
}

fn develop_retrograde(
    t: &Transformer,
    seed: &[Note],
    rng: &mut dyn RandomSource,
) -> (Melody, String) {
    (t.develop(seed, DevelopMethod::Retrograde, rng), "Retrograde".into())
}

fn harmonize_third(t: &Transformer, seed: &[Note], _: &mut dyn RandomSource) -> (Melody, String) {
    (t.harmonize(seed, 3), "Harmonize at 3rd".into())
}

fn harmonize_fifth(t: &Transformer, seed: &[Note], _: &mut dyn RandomSource) -> (Melody, String) {
    (t.harmonize(seed, 5), "Harmonize at 5th".into())
}

fn counter_contrary(t: &Transformer, seed: &[Note], _: &mut dyn RandomSource) -> (Melody, String) {
    (t.counter_melody(seed, CounterStyle::Contrary), "Counter melody (contrary)".into())
}

fn counter_parallel(t: &Transformer, seed: &[Note], _: &mut dyn RandomSource) -> (Melody, String) {
    (t.counter_melody(seed, CounterStyle::Parallel), "Counter melody (parallel)".into())
}

fn random_transpose(
    t: &Transformer,
    seed: &[Note],
    rng: &mut dyn RandomSource,
) -> (Melody, String) {
    let semitones = rng.range_i32_inclusive(-5, 5);
    (t.transpose(seed, semitones), "Transpose (random)".into())
}

/// Provenance recorded with each variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationMetadata {
    pub method: String,
    pub variation_type: VariationType,
    pub seed_length: usize,
    pub output_length: usize,
    pub scale: ScaleName,
    /// Root pitch-class name, e.g. "C" or "F#". Serialized as `root`.
    #[serde(rename = "root")]
    pub key: String,
}

/// One generated variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    /// `var_<n>_<hex>`, with `n` counting from 1 within the batch.
    pub id: String,
    pub notes: Melody,
    pub metadata: VariationMetadata,
}

/// Aggregate numbers over a batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total_variations: usize,
    /// Rounded to two decimals.
    pub average_notes_per_variation: f64,
    pub variation_type_distribution: BTreeMap<VariationType, usize>,
    /// Extremes over every note of every variation; all zero if there are
    /// no notes.
    pub pitch_range: PitchRange,
}

/// Generates variation batches within one scale.
#[derive(Debug, Clone, Copy)]
pub struct VariationGenerator {
    transformer: Transformer,
}

impl VariationGenerator {
    pub fn new(scale: Scale) -> Self {
        VariationGenerator {
            transformer: Transformer::new(scale),
        }
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    /// Draw `count` variations of `seed`, each from a uniformly chosen
    /// preset. `allowed` restricts the presets; `None` or an empty slice
    /// means the full default catalog. An empty seed gives an empty batch.
    pub fn generate_batch<R: RandomSource>(
        &self,
        seed: &[Note],
        count: usize,
        allowed: Option<&[VariationType]>,
        rng: &mut R,
    ) -> Vec<Variation> {
        if seed.is_empty() {
            return Vec::new();
        }
        let pool: &[VariationType] = match allowed {
            Some(types) if !types.is_empty() => types,
            _ => &VariationType::DEFAULT_CATALOG,
        };
        let scale = *self.transformer.scale();

        let variations: Vec<Variation> = (1..=count)
            .map(|n| {
                let kind = *choose(rng, pool).unwrap_or(&VariationType::RandomTranspose);
                let (notes, method) = (preset(kind).apply)(&self.transformer, seed, rng);
                let id = format!("var_{}_{:08x}", n, rng.next_u32());
                Variation {
                    id,
                    metadata: VariationMetadata {
                        method,
                        variation_type: kind,
                        seed_length: seed.len(),
                        output_length: notes.len(),
                        scale: scale.name,
                        key: pitch_class_name(scale.root_pc).to_string(),
                    },
                    notes,
                }
            })
            .collect();

        debug!(
            "generated {} variations from a {}-note seed ({} presets)",
            variations.len(),
            seed.len(),
            pool.len()
        );
        variations
    }

    /// Apply a user-specified chain of operators to the seed.
    pub fn generate_chain<R: RandomSource>(
        &self,
        seed: &[Note],
        chain: &[Transform],
        rng: &mut R,
    ) -> Melody {
        self.transformer.apply_chain(seed, chain, rng)
    }
}

/// Summarize a batch. An empty batch gives all-zero statistics.
pub fn batch_statistics(variations: &[Variation]) -> BatchStatistics {
    if variations.is_empty() {
        return BatchStatistics::default();
    }
    let total_notes: usize = variations.iter().map(|v| v.notes.len()).sum();

    let mut distribution = BTreeMap::new();
    for v in variations {
        *distribution.entry(v.metadata.variation_type).or_insert(0) += 1;
    }

    let pitches = variations.iter().flat_map(|v| v.notes.iter().map(|n| n.pitch));
    let lowest = pitches.clone().min();
    let highest = pitches.max();
    let pitch_range = match (lowest, highest) {
        (Some(lo), Some(hi)) => PitchRange::new(lo, hi),
        _ => PitchRange::default(),
    };

    BatchStatistics {
        total_variations: variations.len(),
        average_notes_per_variation: round_to(total_notes as f64 / variations.len() as f64, 2),
        variation_type_distribution: distribution,
        pitch_range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use melodygen_prng::MelodyRng;

    fn seed() -> Melody {
        [60, 62, 64, 65, 67, 65, 64, 62, 60]
            .iter()
            .enumerate()
            .map(|(i, &p)| Note::new(p, i as f64 * 0.5, 0.5, 0.7))
            .collect()
    }

    fn generator() -> VariationGenerator {
        VariationGenerator::new(Scale::c_major())
    }

    #[test]
    fn test_metadata_serializes_root() {
        let batch = generator().generate_batch(&seed(), 1, None, &mut MelodyRng::new(3));
        let json = serde_json::to_value(&batch[0].metadata).unwrap();
        assert_eq!(json["root"], "C");
        assert!(json.get("key").is_none());
    }

    #[test]
    fn test_table_covers_every_type() {
        for kind in VariationType::DEFAULT_CATALOG {
            assert_eq!(preset(kind).kind, kind);
            assert_eq!(VariationType::from_tag(kind.tag()), kind);
        }
        assert_eq!(preset(VariationType::RandomTranspose).tag, "random_transpose");
    }

    #[test]
    fn test_unknown_tag_falls_back() {
        assert_eq!(VariationType::from_tag("wobble"), VariationType::RandomTranspose);
        assert_eq!(VariationType::from_tag(" augment "), VariationType::Augment);
    }

    #[test]
    fn test_batch_is_reproducible() {
        let g = generator();
        let a = g.generate_batch(&seed(), 5, None, &mut MelodyRng::new(42));
        let b = g.generate_batch(&seed(), 5, None, &mut MelodyRng::new(42));
        assert_eq!(a.len(), 5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_metadata() {
        let g = generator();
        let batch = g.generate_batch(&seed(), 30, None, &mut MelodyRng::new(7));
        for (i, v) in batch.iter().enumerate() {
            assert!(v.id.starts_with(&format!("var_{}_", i + 1)), "{}", v.id);
            assert_eq!(v.metadata.seed_length, 9);
            assert_eq!(v.metadata.output_length, v.notes.len());
            assert_eq!(v.metadata.scale, ScaleName::Major);
            assert_eq!(v.metadata.key, "C");
            assert!(VariationType::DEFAULT_CATALOG.contains(&v.metadata.variation_type));
        }
    }

    #[test]
    fn test_restricted_types_and_labels() {
        let g = generator();
        let allowed = [VariationType::TransposeUp];
        let batch = g.generate_batch(&seed(), 10, Some(&allowed), &mut MelodyRng::new(1));
        for v in &batch {
            assert_eq!(v.metadata.variation_type, VariationType::TransposeUp);
            let shift = v.notes[0].pitch - 60;
            assert!((1..=7).contains(&shift));
            assert_eq!(v.metadata.method, format!("Transpose +{shift} semitones"));
        }

        let allowed = [VariationType::Augment];
        let batch = g.generate_batch(&seed(), 10, Some(&allowed), &mut MelodyRng::new(2));
        for v in &batch {
            let factor = v.notes[0].duration / 0.5;
            assert!(AUGMENT_FACTORS.iter().any(|f| (f - factor).abs() < 1e-9));
            assert!(v.metadata.method.starts_with("Augment ×"));
        }
    }

    #[test]
    fn test_random_transpose_fallback() {
        let g = generator();
        let allowed = [VariationType::from_tag("not_a_type")];
        let batch = g.generate_batch(&seed(), 8, Some(&allowed), &mut MelodyRng::new(3));
        for v in &batch {
            assert_eq!(v.metadata.method, "Transpose (random)");
            assert!((v.notes[0].pitch - 60).abs() <= 5);
        }
    }

    #[test]
    fn test_empty_seed_gives_empty_batch() {
        let g = generator();
        assert!(g.generate_batch(&[], 5, None, &mut MelodyRng::new(0)).is_empty());
    }

    #[test]
    fn test_generate_chain() {
        let g = generator();
        let chain = [
            Transform::Transpose { semitones: 12 },
            Transform::Invert { axis: InvertAxis::FirstNote },
        ];
        let out = g.generate_chain(&seed(), &chain, &mut MelodyRng::new(0));
        let pitches: Vec<i32> = out.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![72, 70, 68, 67, 65, 67, 68, 70, 72]);
    }

    #[test]
    fn test_statistics() {
        let g = generator();
        let batch = g.generate_batch(&seed(), 12, None, &mut MelodyRng::new(9));
        let stats = batch_statistics(&batch);
        assert_eq!(stats.total_variations, 12);
        assert_eq!(stats.variation_type_distribution.values().sum::<usize>(), 12);
        let lo = batch.iter().flat_map(|v| &v.notes).map(|n| n.pitch).min().unwrap();
        assert_eq!(stats.pitch_range.lowest, lo);
        assert_eq!(
            stats.pitch_range.span,
            stats.pitch_range.highest - stats.pitch_range.lowest
        );

        let empty = batch_statistics(&[]);
        assert_eq!(empty.total_variations, 0);
        assert_eq!(empty.average_notes_per_variation, 0.0);
        assert_eq!(empty.pitch_range, PitchRange::default());
    }

    #[test]
    fn test_statistics_serialize_type_tags() {
        let g = generator();
        let allowed = [VariationType::HarmonizeThird];
        let batch = g.generate_batch(&seed(), 3, Some(&allowed), &mut MelodyRng::new(4));
        let json = serde_json::to_value(batch_statistics(&batch)).unwrap();
        assert_eq!(json["variation_type_distribution"]["harmonize_third"], 3);
        assert_eq!(json["average_notes_per_variation"], 9.0);
    }
}
