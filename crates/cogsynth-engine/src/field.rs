//! FieldRecognizer - density and symmetry over the motion window.
//!
//! Both measures are scale invariant: the neighborhood radius and the
//! symmetry error are taken relative to the window's spread `R` (max
//! distance from the centroid), so a cursor drifting steadily across the
//! screen and one oscillating in a tight circle are judged alike.
//!
//! A jump is asserted only when the window is both concentrated (density)
//! and mirrored about its principal axis (symmetry). The jump points from
//! the current position to the centroid of the densest neighborhood.

use cogsynth_core::config::FieldConfig;
use cogsynth_core::Vec2;

const EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JumpSignal {
    pub vector: Vec2,
    pub certainty: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSnapshot {
    pub density: f64,
    pub symmetry: f64,
    pub jump: Option<JumpSignal>,
}

impl FieldSnapshot {
    const EMPTY: FieldSnapshot = FieldSnapshot { density: 0.0, symmetry: 0.0, jump: None };
}

#[derive(Debug, Clone)]
pub struct FieldRecognizer {
    config: FieldConfig,
}

impl FieldRecognizer {
    pub fn new(config: FieldConfig) -> Self {
        Self { config }
    }

    /// Analyze `samples` (oldest first, including the current position).
    pub fn analyze(&self, samples: &[Vec2], current: Vec2) -> FieldSnapshot {
        let n = samples.len();
        if n < self.config.min_samples.max(1) {
            return FieldSnapshot::EMPTY;
        }
        let Some(centroid) = Vec2::mean(samples) else {
            return FieldSnapshot::EMPTY;
        };
        let spread = samples
            .iter()
            .map(|p| p.distance(centroid))
            .fold(0.0_f64, f64::max);
        if spread < EPSILON {
            // Every sample on one point: fully dense, nothing to mirror.
            return FieldSnapshot { density: 1.0, symmetry: 0.0, jump: None };
        }

        let (density, dense_centroid) = self.densest_neighborhood(samples, spread);
        let symmetry = mirror_symmetry(samples, centroid, spread);

        let jump = (density > self.config.density_threshold && symmetry > self.config.symmetry_threshold)
            .then(|| JumpSignal {
                vector: dense_centroid - current,
                certainty: (density * symmetry).sqrt(),
            });

        FieldSnapshot { density, symmetry, jump }
    }

    /// Fraction of samples in the most populated neighborhood, and that
    /// neighborhood's centroid. Ties go to the most recent sample.
    fn densest_neighborhood(&self, samples: &[Vec2], spread: f64) -> (f64, Vec2) {
        let radius = self.config.neighborhood_radius * spread;
        let mut best: Vec<Vec2> = Vec::new();
        for p in samples {
            let neighbors: Vec<Vec2> = samples
                .iter()
                .copied()
                .filter(|q| p.distance(*q) <= radius)
                .collect();
            if neighbors.len() >= best.len() {
                best = neighbors;
            }
        }
        let centroid = Vec2::mean(&best).unwrap_or_default();
        (best.len() as f64 / samples.len() as f64, centroid)
    }
}

/// Reflect every sample across the principal axis through `centroid` and
/// score how closely the reflections land on real samples.
fn mirror_symmetry(samples: &[Vec2], centroid: Vec2, spread: f64) -> f64 {
    let n = samples.len() as f64;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in samples {
        let v = *p - centroid;
        sxx += v.x * v.x;
        sxy += v.x * v.y;
        syy += v.y * v.y;
    }
    let theta = 0.5 * (2.0 * sxy / n).atan2((sxx - syy) / n);
    let axis = Vec2::new(theta.cos(), theta.sin());

    let total_error: f64 = samples
        .iter()
        .map(|p| {
            let v = *p - centroid;
            let reflected = centroid + axis * (2.0 * v.dot(axis)) - v;
            samples
                .iter()
                .map(|q| reflected.distance(*q))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();

    1.0 - (total_error / n / spread).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognizer() -> FieldRecognizer {
        FieldRecognizer::new(FieldConfig::default())
    }

    #[test]
    fn too_few_samples_is_empty() {
        let snap = recognizer().analyze(&[Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)], Vec2::new(2.0, 2.0));
        assert_eq!(snap, FieldSnapshot::EMPTY);
    }

    #[test]
    fn coincident_samples_are_dense_but_not_symmetric() {
        let p = Vec2::new(4.0, 4.0);
        let snap = recognizer().analyze(&[p, p, p, p], p);
        assert_eq!(snap.density, 1.0);
        assert_eq!(snap.symmetry, 0.0);
        assert!(snap.jump.is_none());
    }

    #[test]
    fn steady_drift_is_sparse() {
        let samples: Vec<Vec2> = (0..16).map(|i| Vec2::new(5.0 * i as f64, 2.0 * i as f64)).collect();
        let snap = recognizer().analyze(&samples, samples[15]);
        assert!(snap.density < 0.6, "density {}", snap.density);
        assert!(snap.jump.is_none());
    }

    #[test]
    fn mirrored_clusters_assert_a_jump_toward_the_dense_side() {
        // A tight drift, then the newest sample mirrored across x = 960.
        let mut samples: Vec<Vec2> = (0..15).map(|i| Vec2::new(200.0 + 2.0 * i as f64, 300.0 + i as f64)).collect();
        let current = Vec2::new(1920.0 - 230.0, 315.0);
        samples.push(current);

        let snap = recognizer().analyze(&samples, current);
        assert!(snap.density > 0.9, "density {}", snap.density);
        assert!(snap.symmetry > 0.75, "symmetry {}", snap.symmetry);
        let jump = snap.jump.expect("jump asserted");
        assert!(jump.vector.x < -1000.0);
        assert!((jump.certainty - (snap.density * snap.symmetry).sqrt()).abs() < 1e-12);
    }
}
