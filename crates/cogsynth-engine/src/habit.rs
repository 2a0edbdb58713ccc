//! HabitTracker - bounded motion history and trend extrapolation.
//!
//! The window is a FIFO of the last K valid stimuli. From it we derive the
//! recency-weighted mean displacement per step (the trend) and how steady
//! that trend is (vivacity). Steady motion gives vivacity near 1, erratic
//! motion near 0.

use cogsynth_core::config::HabitConfig;
use cogsynth_core::{Stimulus, Vec2};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub position: Vec2,
    pub velocity: Vec2,
    pub timestamp: f64,
}

impl From<&Stimulus> for Sample {
    fn from(s: &Stimulus) -> Self {
        Self { position: s.position, velocity: s.velocity, timestamp: s.timestamp }
    }
}

/// Result of analyzing the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HabitForecast {
    /// Next position under the current trend. `None` below two samples.
    pub predicted: Option<Vec2>,
    /// Trend consistency in [0, 1].
    pub vivacity: f64,
    /// Mean displacement per step.
    pub trend: Vec2,
}

impl HabitForecast {
    fn empty() -> Self {
        Self { predicted: None, vivacity: 0.0, trend: Vec2::ZERO }
    }
}

#[derive(Debug, Clone)]
pub struct HabitTracker {
    window: VecDeque<Sample>,
    capacity: usize,
    recency_decay: f64,
}

impl HabitTracker {
    pub fn new(config: &HabitConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window_size),
            capacity: config.window_size,
            recency_decay: config.recency_decay,
        }
    }

    /// Append, dropping the oldest sample when full.
    pub fn observe(&mut self, sample: Sample) {
        while self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.window.iter()
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.window.iter().map(|s| s.position).collect()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn analyze(&self) -> HabitForecast {
        let Some(last) = self.window.back() else {
            return HabitForecast::empty();
        };
        if self.window.len() < 2 {
            return HabitForecast::empty();
        }

        let deltas: Vec<Vec2> = self
            .window
            .iter()
            .zip(self.window.iter().skip(1))
            .map(|(a, b)| b.position - a.position)
            .collect();

        // Newest delta weighs 1, each step of age multiplies by r.
        let m = deltas.len();
        let weights: Vec<f64> = (0..m)
            .map(|j| self.recency_decay.powi((m - 1 - j) as i32))
            .collect();
        let total: f64 = weights.iter().sum();

        let mut mean = Vec2::ZERO;
        for (d, w) in deltas.iter().zip(&weights) {
            mean += *d * *w;
        }
        let mean = mean * (1.0 / total);

        let variance = deltas
            .iter()
            .zip(&weights)
            .map(|(d, w)| w * (*d - mean).length_squared())
            .sum::<f64>()
            / total;

        let energy = variance + mean.length_squared();
        let normalized = if energy > 0.0 { variance / energy } else { 0.0 };

        HabitForecast {
            predicted: Some(last.position + mean),
            vivacity: (1.0 - normalized).clamp(0.0, 1.0),
            trend: mean,
        }
    }
}
