// Rule-based melody validation.
//
// A `Validator` runs up to four independent checks against one scale:
//
// - Key membership: at least 90% of notes are exact members of the scale.
// - Cadence: the last two scale degrees form a recognized resolution, or
//   at least the melody ends on the tonic.
// - Range: every pitch lies within a reference range (C3..=C6 unless the
//   caller supplies one).
// - Rhythm coherence: rests take at most half the melody's span and at
//   most 30% of notes are shorter than 0.1s. Always runs.
//
// Insufficient input never panics or errors: it shows up as a failing
// `MessageCheck`. Reports are plain data and serialize verbatim; map keys
// use `BTreeMap` so report JSON is stable.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::note::{Note, PitchRange, pitch_bounds, round_to};
use crate::scale::Scale;
use crate::variation::Variation;

/// Minimum in-scale percentage for the key check to pass.
pub const KEY_PASS_PERCENTAGE: f64 = 90.0;
/// At most this many offending notes are listed in a key report.
pub const MAX_REPORTED_VIOLATIONS: usize = 5;
/// Default reference range: C3..=C6.
pub const DEFAULT_RANGE: (i32, i32) = (48, 84);
pub const MAX_REST_DENSITY: f64 = 0.5;
/// Notes shorter than this (seconds) count as very short.
pub const SHORT_NOTE_SECONDS: f64 = 0.1;
pub const MAX_SHORT_NOTE_RATIO: f64 = 0.3;

/// Report keys, serialized in snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    KeyMembership,
    Cadence,
    Range,
    RhythmCoherence,
    EmptyMelody,
}

/// A note that fell outside the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NonScaleNote {
    pub index: usize,
    pub pitch: i32,
    /// Semitones above the root's pitch class, 0..12.
    pub interval_from_root: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMembershipCheck {
    pub passed: bool,
    /// Rounded to two decimals.
    pub in_scale_percentage: f64,
    pub in_scale_count: usize,
    pub total_notes: usize,
    /// The first few offenders, in melody order.
    pub non_scale_notes: Vec<NonScaleNote>,
}

/// Recognized endings, serialized as their labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CadenceType {
    #[serde(rename = "Leading tone to tonic")]
    LeadingToneToTonic,
    #[serde(rename = "Supertonic to tonic")]
    SupertonicToTonic,
    #[serde(rename = "Dominant to tonic")]
    DominantToTonic,
    #[serde(rename = "Subdominant to tonic")]
    SubdominantToTonic,
    #[serde(rename = "Tonic to tonic")]
    TonicToTonic,
    #[serde(rename = "Ends on tonic")]
    EndsOnTonic,
    #[serde(rename = "No valid cadence")]
    NoValidCadence,
}

impl CadenceType {
    /// Classify the last two scale degrees.
    pub fn classify(penultimate: u8, last: u8) -> CadenceType {
        match (penultimate, last) {
            (7, 1) => CadenceType::LeadingToneToTonic,
            (2, 1) => CadenceType::SupertonicToTonic,
            (5, 1) => CadenceType::DominantToTonic,
            (4, 1) => CadenceType::SubdominantToTonic,
            (1, 1) => CadenceType::TonicToTonic,
            (_, 1) => CadenceType::EndsOnTonic,
            _ => CadenceType::NoValidCadence,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CadenceType::LeadingToneToTonic => "Leading tone to tonic",
            CadenceType::SupertonicToTonic => "Supertonic to tonic",
            CadenceType::DominantToTonic => "Dominant to tonic",
            CadenceType::SubdominantToTonic => "Subdominant to tonic",
            CadenceType::TonicToTonic => "Tonic to tonic",
            CadenceType::EndsOnTonic => "Ends on tonic",
            CadenceType::NoValidCadence => "No valid cadence",
        }
    }

    pub fn is_valid(self) -> bool {
        self != CadenceType::NoValidCadence
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CadenceCheck {
    pub passed: bool,
    pub cadence_type: CadenceType,
    /// Degrees of the last four notes (last two if fewer than four).
    pub scale_degrees: Vec<u8>,
    /// The final degree pair, reported only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interval: Option<[u8; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceRange {
    pub lowest: i32,
    pub highest: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeViolations {
    pub below_minimum: bool,
    pub above_maximum: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeCheck {
    pub passed: bool,
    pub melody_range: PitchRange,
    pub reference_range: ReferenceRange,
    pub violations: RangeViolations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RhythmFlags {
    pub rest_density_ok: bool,
    pub short_notes_ok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RhythmCheck {
    pub passed: bool,
    /// Rounded to three decimals.
    pub rest_density: f64,
    /// Rounded to three decimals.
    pub short_note_ratio: f64,
    pub total_notes: usize,
    pub very_short_notes_count: usize,
    pub checks: RhythmFlags,
}

/// A check that could not run on its input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageCheck {
    pub passed: bool,
    pub message: String,
}

impl MessageCheck {
    fn failed(message: &str) -> Self {
        MessageCheck {
            passed: false,
            message: message.to_string(),
        }
    }
}

/// Outcome of one check. Serializes as the bare payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CheckResult {
    KeyMembership(KeyMembershipCheck),
    Cadence(CadenceCheck),
    Range(RangeCheck),
    Rhythm(RhythmCheck),
    Message(MessageCheck),
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        match self {
            CheckResult::KeyMembership(c) => c.passed,
            CheckResult::Cadence(c) => c.passed,
            CheckResult::Range(c) => c.passed,
            CheckResult::Rhythm(c) => c.passed,
            CheckResult::Message(c) => c.passed,
        }
    }
}

/// Which optional checks to run. Rhythm coherence always runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    pub check_key: bool,
    pub check_cadence: bool,
    pub check_range: bool,
    /// `(lowest, highest)` for the range check; `DEFAULT_RANGE` if absent.
    pub reference_range: Option<(i32, i32)>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            check_key: true,
            check_cadence: true,
            check_range: true,
            reference_range: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// True iff every check that ran passed.
    pub passed: bool,
    pub checks: BTreeMap<CheckName, CheckResult>,
}

impl ValidationReport {
    pub fn check(&self, name: CheckName) -> Option<&CheckResult> {
        self.checks.get(&name)
    }
}

/// A variation that passed validation, paired with its report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedVariation {
    #[serde(flatten)]
    pub variation: Variation,
    pub validation: ValidationReport,
}

/// Runs the constraint checks within one scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    scale: Scale,
}

impl Validator {
    pub fn new(scale: Scale) -> Self {
        Validator { scale }
    }

    /// Run the requested checks. An empty melody fails with a single
    /// `empty_melody` entry.
    pub fn validate(&self, melody: &[Note], options: &ValidationOptions) -> ValidationReport {
        let mut checks = BTreeMap::new();
        if melody.is_empty() {
            checks.insert(
                CheckName::EmptyMelody,
                CheckResult::Message(MessageCheck::failed("Empty melody")),
            );
            return ValidationReport {
                passed: false,
                checks,
            };
        }

        if options.check_key {
            checks.insert(CheckName::KeyMembership, self.check_key_membership(melody));
        }
        if options.check_cadence {
            checks.insert(CheckName::Cadence, self.check_cadence(melody));
        }
        if options.check_range {
            checks.insert(
                CheckName::Range,
                check_range(melody, options.reference_range),
            );
        }
        checks.insert(CheckName::RhythmCoherence, check_rhythm_coherence(melody));

        let passed = checks.values().all(CheckResult::passed);
        ValidationReport { passed, checks }
    }

    /// Share of notes whose pitch class is an exact scale member.
    pub fn check_key_membership(&self, melody: &[Note]) -> CheckResult {
        if melody.is_empty() {
            return CheckResult::Message(MessageCheck::failed("Empty melody"));
        }
        let root = self.scale.root_pc as i32;
        let violations: Vec<NonScaleNote> = melody
            .iter()
            .enumerate()
            .filter(|(_, n)| !self.scale.is_in_scale(n.pitch))
            .map(|(index, n)| NonScaleNote {
                index,
                pitch: n.pitch,
                interval_from_root: (n.pitch - root).rem_euclid(12),
            })
            .collect();

        let total = melody.len();
        let in_scale = total - violations.len();
        let percentage = in_scale as f64 / total as f64 * 100.0;
        CheckResult::KeyMembership(KeyMembershipCheck {
            passed: percentage >= KEY_PASS_PERCENTAGE,
            in_scale_percentage: round_to(percentage, 2),
            in_scale_count: in_scale,
            total_notes: total,
            non_scale_notes: violations.into_iter().take(MAX_REPORTED_VIOLATIONS).collect(),
        })
    }

    /// Classify the final degree pair.
    pub fn check_cadence(&self, melody: &[Note]) -> CheckResult {
        if melody.len() < 2 {
            return CheckResult::Message(MessageCheck::failed("Melody too short for cadence"));
        }
        let tail = if melody.len() >= 4 { 4 } else { 2 };
        let degrees: Vec<u8> = melody[melody.len() - tail..]
            .iter()
            .map(|n| self.scale.scale_degree(n.pitch))
            .collect();
        let (penultimate, last) = (degrees[tail - 2], degrees[tail - 1]);
        let cadence_type = CadenceType::classify(penultimate, last);
        let passed = cadence_type.is_valid();
        CheckResult::Cadence(CadenceCheck {
            passed,
            cadence_type,
            scale_degrees: degrees,
            last_interval: (!passed).then_some([penultimate, last]),
        })
    }

    /// Validate every variation with default options (plus the given
    /// range) and keep the ones that pass. Inputs are cloned, never
    /// modified.
    pub fn filter_valid(
        &self,
        variations: &[Variation],
        reference_range: Option<(i32, i32)>,
    ) -> Vec<ValidatedVariation> {
        let options = ValidationOptions {
            reference_range,
            ..ValidationOptions::default()
        };
        let kept: Vec<ValidatedVariation> = variations
            .iter()
            .filter_map(|v| {
                let validation = self.validate(&v.notes, &options);
                validation.passed.then(|| ValidatedVariation {
                    variation: v.clone(),
                    validation,
                })
            })
            .collect();
        debug!(
            "{} of {} variations passed validation",
            kept.len(),
            variations.len()
        );
        kept
    }
}

/// Pitch extremes against a reference range (C3..=C6 by default).
pub fn check_range(melody: &[Note], reference_range: Option<(i32, i32)>) -> CheckResult {
    let Some((lowest, highest)) = pitch_bounds(melody) else {
        return CheckResult::Message(MessageCheck::failed("Empty melody"));
    };
    let (min_allowed, max_allowed) = reference_range.unwrap_or(DEFAULT_RANGE);
    let violations = RangeViolations {
        below_minimum: lowest < min_allowed,
        above_maximum: highest > max_allowed,
    };
    CheckResult::Range(RangeCheck {
        passed: !violations.below_minimum && !violations.above_maximum,
        melody_range: PitchRange::new(lowest, highest),
        reference_range: ReferenceRange {
            lowest: min_allowed,
            highest: max_allowed,
        },
        violations,
    })
}

/// Rest density over the melody's span and the share of very short notes.
pub fn check_rhythm_coherence(melody: &[Note]) -> CheckResult {
    let (Some(first), Some(last)) = (melody.first(), melody.last()) else {
        return CheckResult::Message(MessageCheck::failed("Empty melody"));
    };
    let total_time = last.end() - first.onset;
    let sounding: f64 = melody.iter().map(|n| n.duration).sum();
    let rest_density = if total_time > 0.0 {
        (total_time - sounding) / total_time
    } else {
        0.0
    };

    let very_short = melody
        .iter()
        .filter(|n| n.duration < SHORT_NOTE_SECONDS)
        .count();
    let short_note_ratio = very_short as f64 / melody.len() as f64;

    let flags = RhythmFlags {
        rest_density_ok: rest_density <= MAX_REST_DENSITY,
        short_notes_ok: short_note_ratio <= MAX_SHORT_NOTE_RATIO,
    };
    CheckResult::Rhythm(RhythmCheck {
        passed: flags.rest_density_ok && flags.short_notes_ok,
        rest_density: round_to(rest_density, 3),
        short_note_ratio: round_to(short_note_ratio, 3),
        total_notes: melody.len(),
        very_short_notes_count: very_short,
        checks: flags,
    })
}
