// Engine configuration, loaded from JSON.
//
// `EngineConfig` gathers every knob the CLI exposes: the scale and root the
// engine is built on, batch generation settings, interpolation settings,
// and validation toggles. Every field has a default, so a config file only
// needs the fields it changes (`{"scale": "dorian", "root": "D"}` is a
// complete config). Command-line flags override whatever the file says.
//
// Names are resolved leniently, the way the engine does everywhere: an
// unknown scale becomes major, an unknown root becomes C, and unknown
// variation tags become the random-transpose fallback. The interpolation
// method is the exception: an unknown method is an error, since there is no
// sensible method to substitute.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MelodyError, Result};
use crate::interpolate::InterpolationMethod;
use crate::scale::Scale;
use crate::validate::ValidationOptions;
use crate::variation::VariationType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scale name, e.g. "major", "harmonic minor", "dorian".
    pub scale: String,
    /// Root pitch-class name, e.g. "C", "F#", "Bb".
    pub root: String,
    /// Random seed. `None` seeds from the clock.
    pub seed: Option<u64>,
    /// Variations per batch.
    pub count: usize,
    /// Variation type tags to draw from; `None` means the full catalog.
    pub variation_types: Option<Vec<String>>,
    /// Drop variations that fail validation.
    pub apply_constraints: bool,
    /// `[lowest, highest]` MIDI pitch for the range check.
    pub reference_range: Option<(i32, i32)>,
    /// Interior interpolation steps.
    pub steps: usize,
    /// "dtw", "contour", or "feature".
    pub method: String,
    pub check_key: bool,
    pub check_cadence: bool,
    pub check_range: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            scale: "major".to_string(),
            root: "C".to_string(),
            seed: None,
            count: 10,
            variation_types: None,
            apply_constraints: true,
            reference_range: None,
            steps: 5,
            method: "dtw".to_string(),
            check_key: true,
            check_cadence: true,
            check_range: true,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// The resolved scale. Never fails; see the module notes.
    pub fn scale(&self) -> Scale {
        Scale::from_names(&self.scale, &self.root)
    }

    /// Resolved variation types, or `None` for the default catalog.
    pub fn allowed_types(&self) -> Option<Vec<VariationType>> {
        self.variation_types
            .as_ref()
            .map(|tags| tags.iter().map(|t| VariationType::from_tag(t)).collect())
    }

    pub fn interpolation_method(&self) -> Result<InterpolationMethod> {
        InterpolationMethod::from_name(&self.method)
            .ok_or_else(|| MelodyError::UnknownMethod(self.method.clone()))
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            check_key: self.check_key,
            check_cadence: self.check_cadence,
            check_range: self.check_range,
            reference_range: self.reference_range,
        }
    }
}
