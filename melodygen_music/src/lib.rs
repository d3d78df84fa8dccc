// Melodygen Music Engine
//
// Scale-aware melody transformation, variation, interpolation and
// validation. A melody is a plain `Vec<Note>` (pitch, onset, duration,
// velocity); every operation takes melodies by slice and returns new ones.
// Each component is built once over a fixed `Scale` and holds no other
// state, so calls are independent and can run in parallel.
//
// Architecture:
// - note.rs: The `Note` model, serde contract, and small melody helpers
// - scale.rs: Named scales, scale degrees, diatonic stepping, snapping
// - transform.rs: `Transformer` pitch/time operators and `Transform` dispatch
// - ornament.rs: Turns, mordents, grace notes, ending slides
// - develop.rs: Sequence, fragment, extend, retrograde
// - analysis.rs: Interval/contour/degree/phrase analysis
// - variation.rs: Batch variation generation from a preset lookup table,
//   plus batch statistics
// - interpolate.rs: DTW, contour, and feature-based interpolation
// - validate.rs: Key, cadence, range, and rhythm checks; batch filtering
// - seed.rs: Built-in seed melodies
// - config.rs: JSON engine configuration
// - midi.rs: MIDI import/export (used by the CLI only)
// - error.rs: Adapter error type
//
// Randomness (ornamentation, fragment/extend development, batch draws) is
// always drawn from a caller-supplied `melodygen_prng::RandomSource`, so a
// seeded `MelodyRng` makes every result reproducible.

pub mod analysis;
pub mod config;
pub mod develop;
pub mod error;
pub mod interpolate;
pub mod midi;
pub mod note;
pub mod ornament;
pub mod scale;
pub mod seed;
pub mod transform;
pub mod validate;
pub mod variation;
