//! Engine configuration.
//!
//! Every section deserializes with defaults for missing keys, so a YAML file
//! only needs the values it overrides:
//!
//! ```yaml
//! classifier:
//!   threshold: 0.2
//! blend:
//!   feather_radius: 3
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Patch classification parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Largest tolerated log-lightness deviation from the EV prediction.
    pub threshold: f32,
    /// Fraction of a cell's comparable pixels that must deviate to flag it.
    pub min_deviant_fraction: f32,
    /// Cells with fewer comparable pixels than this fraction are left unflagged.
    pub min_comparable_fraction: f32,
    /// Lightness below this is too dark to compare.
    pub dark_limit: f32,
    /// Lightness above this is treated as clipped.
    pub saturation_limit: f32,
    /// Measure ΔEV from average lightness instead of trusting the EV metadata.
    pub estimate_delta_ev: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            min_deviant_fraction: 0.05,
            min_comparable_fraction: 0.25,
            dark_limit: 1e-3,
            saturation_limit: 0.98,
            estimate_delta_ev: false,
        }
    }
}

impl ClassifierConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        assert!(threshold > 0.0, "Threshold must be positive");
        self.threshold = threshold;
        self
    }

    pub fn with_estimated_delta_ev(mut self, estimate: bool) -> Self {
        self.estimate_delta_ev = estimate;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0) {
            return Err(invalid("classifier.threshold must be positive"));
        }
        if !(0.0..1.0).contains(&self.min_deviant_fraction) {
            return Err(invalid("classifier.min_deviant_fraction must be in [0, 1)"));
        }
        if !(0.0..=1.0).contains(&self.min_comparable_fraction) {
            return Err(invalid("classifier.min_comparable_fraction must be in [0, 1]"));
        }
        if !(self.dark_limit > 0.0 && self.dark_limit < self.saturation_limit) {
            return Err(invalid(
                "classifier.dark_limit must be positive and below saturation_limit",
            ));
        }
        Ok(())
    }
}

/// Which representation the donor content is merged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendDomain {
    /// Blend log-irradiance gradients and reconstruct with the Poisson solver.
    #[default]
    Gradient,
    /// Feathered alpha blend of exposure-matched pixels; no solve.
    Pixel,
}

/// How the additive constant lost by the zero-mean solve is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Match the reference's mean log-irradiance over non-ghosted pixels.
    #[default]
    UnmaskedMean,
    /// Scale the result so it equals the reference at one pixel.
    Pixel { x: usize, y: usize },
}

/// Field blending parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Width in pixels of the feather ramp around ghosted regions. 0 = hard switch.
    pub feather_radius: usize,
    pub domain: BlendDomain,
    pub anchor: Anchor,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            feather_radius: 2,
            domain: BlendDomain::Gradient,
            anchor: Anchor::UnmaskedMean,
        }
    }
}

/// Number of pixels per histogram tail ignored when matching channel ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipCounts {
    /// Fixed pixel counts (`nb_min`, `nb_max`).
    Count { low: usize, high: usize },
    /// Fractions of the pixel count, resolved per image.
    Fraction { low: f32, high: f32 },
}

impl Default for ClipCounts {
    fn default() -> Self {
        Self::Fraction {
            low: 0.0005,
            high: 0.0005,
        }
    }
}

impl ClipCounts {
    /// `(nb_min, nb_max)` for an image of `pixel_count` pixels.
    pub fn resolve(&self, pixel_count: usize) -> (usize, usize) {
        match *self {
            ClipCounts::Count { low, high } => (low, high),
            ClipCounts::Fraction { low, high } => {
                (fraction_of(low, pixel_count), fraction_of(high, pixel_count))
            }
        }
    }
}

/// `floor(fraction * count)`, tolerant of the f32 representation error of
/// decimal fractions such as `0.01`.
fn fraction_of(fraction: f32, count: usize) -> usize {
    let product = fraction as f64 * count as f64;
    (product * (1.0 + 1e-6)).floor() as usize
}

/// Post-solve rebalancing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    pub enabled: bool,
    pub clip: ClipCounts,
    /// Values below this floor are set to zero after the solve.
    pub zero_floor: f32,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clip: ClipCounts::default(),
            zero_floor: 0.0,
        }
    }
}

impl RebalanceConfig {
    fn validate(&self) -> Result<()> {
        if let ClipCounts::Fraction { low, high } = self.clip {
            if !(low >= 0.0 && high >= 0.0 && low + high < 1.0) {
                return Err(invalid(
                    "rebalance.clip fractions must be non-negative and sum below 1",
                ));
            }
        }
        if !self.zero_floor.is_finite() {
            return Err(invalid("rebalance.zero_floor must be finite"));
        }
        Ok(())
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AntighostConfig {
    pub classifier: ClassifierConfig,
    pub blend: BlendConfig,
    pub rebalance: RebalanceConfig,
}

impl AntighostConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yml::to_string(self)?)
    }

    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_feather_radius(mut self, radius: usize) -> Self {
        self.blend.feather_radius = radius;
        self
    }

    pub fn with_blend_domain(mut self, domain: BlendDomain) -> Self {
        self.blend.domain = domain;
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.blend.anchor = anchor;
        self
    }

    pub fn with_rebalance(mut self, enabled: bool) -> Self {
        self.rebalance.enabled = enabled;
        self
    }

    pub fn with_clip_counts(mut self, clip: ClipCounts) -> Self {
        self.rebalance.clip = clip;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        self.rebalance.validate()
    }
}

fn invalid(msg: &str) -> Error {
    Error::InvalidConfig(msg.to_string())
}
