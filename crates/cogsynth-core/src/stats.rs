//! Per-cycle aggregates.

use crate::types::{CacheOrigin, DecisionRecord, Mode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeCounts {
    pub guard: u64,
    pub habit: u64,
    pub intuition: u64,
}

impl ModeCounts {
    pub fn get(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Guard => self.guard,
            Mode::Habit => self.habit,
            Mode::Intuition => self.intuition,
        }
    }

    fn bump(&mut self, mode: Mode) {
        match mode {
            Mode::Guard => self.guard += 1,
            Mode::Habit => self.habit += 1,
            Mode::Intuition => self.intuition += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.guard + self.habit + self.intuition
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassCounts {
    pub apriori: u64,
    pub posteriori: u64,
    /// Fully synthesized events.
    pub none: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    pub p50_ns: u64,
    pub p95_ns: u64,
}

impl LatencySummary {
    /// Nearest-rank percentiles over the given samples.
    pub fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let rank = |p: f64| {
            let idx = ((p * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len()) - 1;
            sorted[idx]
        };
        let sum: u128 = sorted.iter().map(|&v| v as u128).sum();
        Self {
            count: sorted.len() as u64,
            min_ns: sorted[0],
            max_ns: sorted[sorted.len() - 1],
            mean_ns: sum as f64 / sorted.len() as f64,
            p50_ns: rank(0.50),
            p95_ns: rank(0.95),
        }
    }
}

/// Aggregate of one cycle. Created at cycle start, finalized at cycle end.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleStats {
    pub scenario: String,
    pub cycle: usize,
    /// Records emitted.
    pub events: u64,
    /// Stimuli that failed validation.
    pub rejected: u64,
    /// Stopped early by cancellation.
    pub interrupted: bool,
    pub modes: ModeCounts,
    pub bypass: BypassCounts,
    pub latency: LatencySummary,
    #[serde(skip)]
    latencies: Vec<u64>,
}

impl CycleStats {
    pub fn new(scenario: impl Into<String>, cycle: usize) -> Self {
        Self {
            scenario: scenario.into(),
            cycle,
            ..Default::default()
        }
    }

    pub fn observe(&mut self, record: &DecisionRecord) {
        self.events += 1;
        self.modes.bump(record.mode());
        match record.bypass {
            Some(CacheOrigin::Apriori) => self.bypass.apriori += 1,
            Some(CacheOrigin::Posteriori) => self.bypass.posteriori += 1,
            None => self.bypass.none += 1,
        }
        self.latencies
            .push(u64::try_from(record.latency.as_nanos()).unwrap_or(u64::MAX));
    }

    pub fn reject(&mut self) {
        self.rejected += 1;
    }

    /// Compute the latency distribution. Idempotent.
    pub fn finalize(&mut self) {
        self.latency = LatencySummary::from_samples(&self.latencies);
    }

    /// Fraction of records in `mode`, 0 when empty.
    pub fn frequency(&self, mode: Mode) -> f64 {
        if self.events == 0 {
            0.0
        } else {
            self.modes.get(mode) as f64 / self.events as f64
        }
    }

    pub fn mean_latency(&self) -> Duration {
        Duration::from_nanos(self.latency.mean_ns as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_percentiles_use_nearest_rank() {
        let samples: Vec<u64> = (1..=100).collect();
        let summary = LatencySummary::from_samples(&samples);
        assert_eq!(summary.count, 100);
        assert_eq!(summary.min_ns, 1);
        assert_eq!(summary.max_ns, 100);
        assert_eq!(summary.p50_ns, 50);
        assert_eq!(summary.p95_ns, 95);
        assert!((summary.mean_ns - 50.5).abs() < 1e-9);
    }

    #[test]
    fn empty_latency_summary_is_zeroed() {
        assert_eq!(LatencySummary::from_samples(&[]), LatencySummary::default());
    }
}
