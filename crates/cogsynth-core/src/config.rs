//! Engine configuration
//!
//! All tunable parameters in one place, injected at engine construction.
//! Loaded from TOML at startup. Unlike a best-effort settings file, a config
//! that is present but incomplete or out of range is fatal: the engine never
//! starts on a half-specified threshold.

use crate::error::{Error, Result};
use crate::types::Mode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Motion history and extrapolation.
    pub habit: HabitConfig,
    /// Density/symmetry recognition.
    pub field: FieldConfig,
    /// Posteriori cache and fingerprinting.
    pub cache: CacheConfig,
    /// Mode scoring and Bayesian update.
    pub selector: SelectorConfig,
    /// Cycle driving.
    pub cycle: CycleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HabitConfig {
    /// Window capacity K.
    pub window_size: usize,
    /// Geometric weight applied per step of age when averaging deltas (0, 1].
    pub recency_decay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    /// Samples required before density/symmetry are computed.
    pub min_samples: usize,
    /// Neighborhood radius as a fraction of the window spread (0, 1].
    pub neighborhood_radius: f64,
    /// Density must exceed this for a jump.
    pub density_threshold: f64,
    /// Symmetry must exceed this for a jump.
    pub symmetry_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Position quantization step used by fingerprints.
    pub quantum: f64,
    /// Exponential decay rate per unit of stimulus time.
    pub decay_rate: f64,
    /// Entries whose decayed confidence drops below this are removed.
    pub confidence_floor: f64,
    /// Max posteriori entries.
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorConfig {
    /// Guard's raw score when no constraint is violated.
    pub guard_base_score: f64,
    /// Tie-break order, first wins.
    pub precedence: [Mode; 3],
    /// Pseudo-count added per observed outcome.
    pub step_size: f64,
    /// Prediction error (distance units) at which reward falls to 1/e.
    pub reward_scale: f64,
    /// Cap on alpha + beta per mode, keeps the posterior responsive.
    pub evidence_horizon: f64,
    pub priors: ModePriors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModePriors {
    pub guard: Prior,
    pub habit: Prior,
    pub intuition: Prior,
}

impl ModePriors {
    pub fn get(&self, mode: Mode) -> &Prior {
        match mode {
            Mode::Guard => &self.guard,
            Mode::Habit => &self.habit,
            Mode::Intuition => &self.intuition,
        }
    }
}

/// Beta prior expressed as mean and pseudo-count strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prior {
    pub mean: f64,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleConfig {
    pub events_per_cycle: usize,
    pub cycles: usize,
}

// ============================================================
// Defaults
// ============================================================

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            habit: HabitConfig::default(),
            field: FieldConfig::default(),
            cache: CacheConfig::default(),
            selector: SelectorConfig::default(),
            cycle: CycleConfig::default(),
        }
    }
}

impl Default for HabitConfig {
    fn default() -> Self {
        Self { window_size: 16, recency_decay: 0.85 }
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            neighborhood_radius: 0.25,
            density_threshold: 0.6,
            symmetry_threshold: 0.75,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { quantum: 1.0, decay_rate: 0.01, confidence_floor: 0.2, capacity: 256 }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            guard_base_score: 0.1,
            precedence: [Mode::Guard, Mode::Intuition, Mode::Habit],
            step_size: 0.5,
            reward_scale: 50.0,
            evidence_horizon: 50.0,
            priors: ModePriors {
                guard: Prior { mean: 0.7, strength: 2.0 },
                habit: Prior { mean: 0.6, strength: 2.0 },
                intuition: Prior { mean: 0.3, strength: 2.0 },
            },
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self { events_per_cycle: 500, cycles: 3 }
    }
}

// ============================================================
// Loading and validation
// ============================================================

impl EngineConfig {
    /// Load and validate a config file. Any failure is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_toml(&content)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML (for generating a config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        let h = &self.habit;
        if h.window_size < 2 {
            return Err(Error::config("habit.window_size must be at least 2"));
        }
        check_range("habit.recency_decay", h.recency_decay, 0.0, 1.0, false)?;

        let f = &self.field;
        if f.min_samples < 2 {
            return Err(Error::config("field.min_samples must be at least 2"));
        }
        // The recognizer only ever sees the habit window.
        if f.min_samples > h.window_size {
            return Err(Error::config(format!(
                "field.min_samples ({}) cannot exceed habit.window_size ({})",
                f.min_samples, h.window_size
            )));
        }
        check_range("field.neighborhood_radius", f.neighborhood_radius, 0.0, 1.0, false)?;
        check_range("field.density_threshold", f.density_threshold, 0.0, 1.0, true)?;
        check_range("field.symmetry_threshold", f.symmetry_threshold, 0.0, 1.0, true)?;

        let c = &self.cache;
        check_positive("cache.quantum", c.quantum)?;
        if !(c.decay_rate.is_finite() && c.decay_rate >= 0.0) {
            return Err(Error::config("cache.decay_rate must be a finite number >= 0"));
        }
        check_range("cache.confidence_floor", c.confidence_floor, 0.0, 1.0, true)?;
        if c.capacity == 0 {
            return Err(Error::config("cache.capacity must be at least 1"));
        }

        let s = &self.selector;
        if !(s.guard_base_score.is_finite() && (0.0..1.0).contains(&s.guard_base_score)) {
            return Err(Error::config("selector.guard_base_score must be in [0, 1)"));
        }
        for mode in Mode::ALL {
            if !s.precedence.contains(&mode) {
                return Err(Error::config(format!(
                    "selector.precedence must list every mode exactly once (missing {})",
                    mode
                )));
            }
        }
        check_positive("selector.step_size", s.step_size)?;
        check_positive("selector.reward_scale", s.reward_scale)?;
        check_positive("selector.evidence_horizon", s.evidence_horizon)?;
        for mode in Mode::ALL {
            let prior = s.priors.get(mode);
            if !(prior.mean.is_finite() && prior.mean > 0.0 && prior.mean < 1.0) {
                return Err(Error::config(format!("selector.priors.{:?}.mean must be in (0, 1)", mode)));
            }
            check_positive("selector.priors.*.strength", prior.strength)?;
        }

        if self.cycle.events_per_cycle == 0 || self.cycle.cycles == 0 {
            return Err(Error::config("cycle.events_per_cycle and cycle.cycles must be at least 1"));
        }
        Ok(())
    }
}

/// Checks `lo < value <= hi`, or `lo <= value <= hi` when `inclusive_low`.
fn check_range(name: &str, value: f64, lo: f64, hi: f64, inclusive_low: bool) -> Result<()> {
    let low_ok = if inclusive_low { value >= lo } else { value > lo };
    if value.is_finite() && low_ok && value <= hi {
        Ok(())
    } else {
        let open = if inclusive_low { '[' } else { '(' };
        Err(Error::config(format!("{} must be in {}{}, {}]", name, open, lo, hi)))
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!("{} must be a finite number > 0", name)))
    }
}
