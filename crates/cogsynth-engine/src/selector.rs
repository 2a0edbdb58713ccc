//! ModeSelector - Guard, Habit and Intuition as three scoring strategies.
//!
//! Each strategy produces a raw score in [0, 1]. The selector weights raw
//! scores by the learned reliability of each mode (`ModeState`) and picks
//! the best candidate. A constraint violation short-circuits everything and
//! selects Guard.
//!
//! Reliability is a Beta(α, β) pseudo-count pair per mode. After a full
//! synthesis the selector remembers where the chosen mode expected the
//! cursor to be next; the next valid stimulus turns the miss distance into
//! a reward in (0, 1] and updates the chosen mode's pair.

use crate::field::FieldSnapshot;
use crate::habit::HabitForecast;
use cogsynth_core::config::SelectorConfig;
use cogsynth_core::{Mode, ModeScores, Vec2};
use tracing::trace;

// ============================================================
// ModeState
// ============================================================

/// Persistent per-engine reliability estimates. Only `update` and `reset`
/// mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeState {
    evidence: [(f64, f64); 3],
    initial: [(f64, f64); 3],
    step_size: f64,
    horizon: f64,
}

fn slot(mode: Mode) -> usize {
    match mode {
        Mode::Guard => 0,
        Mode::Habit => 1,
        Mode::Intuition => 2,
    }
}

impl ModeState {
    pub fn new(config: &SelectorConfig) -> Self {
        let initial = Mode::ALL.map(|mode| {
            let prior = config.priors.get(mode);
            (prior.mean * prior.strength, (1.0 - prior.mean) * prior.strength)
        });
        Self {
            evidence: initial,
            initial,
            step_size: config.step_size,
            horizon: config.evidence_horizon,
        }
    }

    /// Posterior mean reliability of `mode`.
    pub fn weight(&self, mode: Mode) -> f64 {
        let (alpha, beta) = self.evidence[slot(mode)];
        alpha / (alpha + beta)
    }

    pub fn weights(&self) -> ModeScores {
        ModeScores {
            guard: self.weight(Mode::Guard),
            habit: self.weight(Mode::Habit),
            intuition: self.weight(Mode::Intuition),
        }
    }

    pub fn evidence(&self, mode: Mode) -> (f64, f64) {
        self.evidence[slot(mode)]
    }

    /// Fold one reward in [0, 1] into `mode`'s pair, then cap the total
    /// pseudo-count at the evidence horizon.
    pub fn update(&mut self, mode: Mode, reward: f64) {
        let reward = reward.clamp(0.0, 1.0);
        let (alpha, beta) = &mut self.evidence[slot(mode)];
        *alpha += self.step_size * reward;
        *beta += self.step_size * (1.0 - reward);
        let total = *alpha + *beta;
        if total > self.horizon {
            let k = self.horizon / total;
            *alpha *= k;
            *beta *= k;
        }
    }

    /// Restore the priors.
    pub fn reset(&mut self) {
        self.evidence = self.initial;
    }
}

// ============================================================
// Selection
// ============================================================

/// Outcome of one selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub mode: Mode,
    /// Raw strategy scores, 0 for non-candidates.
    pub raw: ModeScores,
    /// Raw scores times mode weights.
    pub weighted: ModeScores,
    /// True when a constraint violation forced Guard.
    pub overridden: bool,
}

impl Selection {
    /// Raw score of the selected mode.
    pub fn confidence(&self) -> f64 {
        self.raw.get(self.mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Expectation {
    mode: Mode,
    position: Vec2,
}

pub struct ModeSelector {
    config: SelectorConfig,
    state: ModeState,
    pending: Option<Expectation>,
}

impl ModeSelector {
    pub fn new(config: SelectorConfig) -> Self {
        let state = ModeState::new(&config);
        Self { config, state, pending: None }
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    /// Score the three strategies and pick one.
    pub fn select(&self, violated: bool, habit: &HabitForecast, field: &FieldSnapshot) -> Selection {
        let guard_raw = if violated { 1.0 } else { self.config.guard_base_score };
        let habit_raw = habit.predicted.map(|_| habit.vivacity);
        let intuition_raw = field.jump.map(|j| j.certainty);

        let raw = ModeScores {
            guard: guard_raw,
            habit: habit_raw.unwrap_or(0.0),
            intuition: intuition_raw.unwrap_or(0.0),
        };
        let weights = self.state.weights();
        let weighted = ModeScores {
            guard: raw.guard * weights.guard,
            habit: raw.habit * weights.habit,
            intuition: raw.intuition * weights.intuition,
        };

        if violated {
            return Selection { mode: Mode::Guard, raw, weighted, overridden: true };
        }

        let is_candidate = |mode: Mode| match mode {
            Mode::Guard => true,
            Mode::Habit => habit_raw.is_some(),
            Mode::Intuition => intuition_raw.is_some(),
        };

        // Walk in precedence order and only replace on a strictly higher
        // score, so exact ties keep the earlier mode.
        let mut best = Mode::Guard;
        let mut best_score = f64::NEG_INFINITY;
        for mode in self.config.precedence {
            if !is_candidate(mode) {
                continue;
            }
            let score = weighted.get(mode);
            if score > best_score {
                best = mode;
                best_score = score;
            }
        }

        Selection { mode: best, raw, weighted, overridden: false }
    }

    /// Remember where the chosen mode expects the next stimulus.
    pub fn expect(&mut self, mode: Mode, position: Vec2) {
        self.pending = Some(Expectation { mode, position });
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Score the pending expectation against the observed position and
    /// update the mode that made it. Returns `(mode, reward)` when there was
    /// one.
    pub fn resolve(&mut self, actual: Vec2) -> Option<(Mode, f64)> {
        let expectation = self.pending.take()?;
        let error = actual.distance(expectation.position);
        let reward = (-error / self.config.reward_scale).exp();
        self.state.update(expectation.mode, reward);
        trace!(mode = %expectation.mode, error, reward, "Resolved expectation");
        Some((expectation.mode, reward))
    }

    /// Restore priors and forget the pending expectation.
    pub fn reset(&mut self) {
        self.state.reset();
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::JumpSignal;

    fn forecast(vivacity: f64) -> HabitForecast {
        HabitForecast { predicted: Some(Vec2::new(1.0, 1.0)), vivacity, trend: Vec2::ZERO }
    }

    fn no_field() -> FieldSnapshot {
        FieldSnapshot { density: 0.0, symmetry: 0.0, jump: None }
    }

    fn jump(certainty: f64) -> FieldSnapshot {
        FieldSnapshot {
            density: certainty,
            symmetry: certainty,
            jump: Some(JumpSignal { vector: Vec2::new(-10.0, 0.0), certainty }),
        }
    }

    #[test]
    fn violation_overrides_everything() {
        let selector = ModeSelector::new(SelectorConfig::default());
        let s = selector.select(true, &forecast(1.0), &jump(1.0));
        assert_eq!(s.mode, Mode::Guard);
        assert!(s.overridden);
        assert_eq!(s.confidence(), 1.0);
    }

    #[test]
    fn without_history_guard_is_the_only_candidate() {
        let selector = ModeSelector::new(SelectorConfig::default());
        let empty = HabitForecast { predicted: None, vivacity: 0.0, trend: Vec2::ZERO };
        assert_eq!(selector.select(false, &empty, &no_field()).mode, Mode::Guard);
    }

    #[test]
    fn highest_weighted_score_wins() {
        let selector = ModeSelector::new(SelectorConfig::default());
        // habit 0.9 * 0.6 = 0.54 vs intuition 0.95 * 0.3 = 0.285
        assert_eq!(selector.select(false, &forecast(0.9), &jump(0.95)).mode, Mode::Habit);
        // habit 0.1 * 0.6 = 0.06 vs intuition 0.95 * 0.3 = 0.285
        assert_eq!(selector.select(false, &forecast(0.1), &jump(0.95)).mode, Mode::Intuition);
    }

    #[test]
    fn exact_ties_follow_precedence() {
        let mut config = SelectorConfig::default();
        config.priors.habit.mean = 0.5;
        config.priors.intuition.mean = 0.5;
        let selector = ModeSelector::new(config.clone());
        assert_eq!(selector.select(false, &forecast(0.8), &jump(0.8)).mode, Mode::Intuition);

        config.precedence = [Mode::Habit, Mode::Intuition, Mode::Guard];
        let selector = ModeSelector::new(config);
        assert_eq!(selector.select(false, &forecast(0.8), &jump(0.8)).mode, Mode::Habit);
    }

    #[test]
    fn accurate_predictions_raise_weight() {
        let mut selector = ModeSelector::new(SelectorConfig::default());
        let before = selector.state().weight(Mode::Habit);
        selector.expect(Mode::Habit, Vec2::new(10.0, 10.0));
        let (mode, reward) = selector.resolve(Vec2::new(10.0, 10.0)).unwrap();
        assert_eq!(mode, Mode::Habit);
        assert_eq!(reward, 1.0);
        assert!(selector.state().weight(Mode::Habit) > before);
        assert!(selector.resolve(Vec2::ZERO).is_none());
    }

    #[test]
    fn large_errors_lower_weight() {
        let mut selector = ModeSelector::new(SelectorConfig::default());
        let before = selector.state().weight(Mode::Intuition);
        selector.expect(Mode::Intuition, Vec2::ZERO);
        selector.resolve(Vec2::new(1000.0, 0.0));
        assert!(selector.state().weight(Mode::Intuition) < before);
    }

    #[test]
    fn evidence_is_capped_and_reset_restores_priors() {
        let config = SelectorConfig::default();
        let mut state = ModeState::new(&config);
        for _ in 0..500 {
            state.update(Mode::Habit, 1.0);
        }
        let (a, b) = state.evidence(Mode::Habit);
        assert!(a + b <= config.evidence_horizon + 1e-9);
        assert!(state.weight(Mode::Habit) > 0.9);

        state.reset();
        assert_eq!(state, ModeState::new(&config));
    }
}
