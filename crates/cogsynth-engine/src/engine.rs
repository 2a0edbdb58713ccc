//! Engine - one stimulus stream, one decision per event.
//!
//! Owns every piece of mutable state: the motion window, the mode state, the
//! posteriori cache. Events are processed strictly in order; `process`
//! returns only after the record is built and written back.

use crate::cache::{AprioriStore, CacheHit, Fingerprint, KnowledgeCache};
use crate::clock::Clock;
use crate::field::FieldRecognizer;
use crate::habit::{HabitTracker, Sample};
use crate::ingest;
use crate::selector::ModeSelector;
use crate::synthesizer::synthesize;
use cogsynth_core::{
    AprioriSeed, ConstraintSet, DecisionRecord, EngineConfig, LogicSeeds, ModeScores, RawStimulus, Result, Stimulus,
};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Snapshot of the engine's cognitive state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    /// Records emitted since construction.
    pub events: u64,
    pub window_len: usize,
    pub window_capacity: usize,
    pub posteriori_len: usize,
    pub apriori_len: usize,
    pub constraints: usize,
    /// Current reliability weight per mode.
    pub weights: ModeScores,
    pub awaiting_outcome: bool,
}

pub struct Engine {
    config: EngineConfig,
    constraints: ConstraintSet,
    cache: KnowledgeCache,
    habit: HabitTracker,
    field: FieldRecognizer,
    selector: ModeSelector,
    clock: Box<dyn Clock>,
    sequence: u64,
}

impl Engine {
    /// Validate the config and build the apriori partition. Fails before any
    /// event is processed.
    pub fn new(
        config: EngineConfig,
        constraints: ConstraintSet,
        apriori: &[AprioriSeed],
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let store = AprioriStore::from_seeds(apriori, config.cache.quantum)?;
        info!(
            "Engine ready: {} constraints, {} apriori entries, window {}",
            constraints.len(),
            store.len(),
            config.habit.window_size
        );
        Ok(Self {
            cache: KnowledgeCache::new(store, config.cache.clone()),
            habit: HabitTracker::new(&config.habit),
            field: FieldRecognizer::new(config.field.clone()),
            selector: ModeSelector::new(config.selector.clone()),
            constraints,
            clock,
            config,
            sequence: 0,
        })
    }

    /// Build from a loaded seed file.
    pub fn with_seeds(config: EngineConfig, seeds: &LogicSeeds, clock: Box<dyn Clock>) -> Result<Self> {
        let constraints = seeds.constraint_set()?;
        Self::new(config, constraints, &seeds.apriori, clock)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &KnowledgeCache {
        &self.cache
    }

    pub fn habit(&self) -> &HabitTracker {
        &self.habit
    }

    pub fn selector(&self) -> &ModeSelector {
        &self.selector
    }

    /// Resolve one event into its decision record.
    ///
    /// A validation error leaves the engine untouched: no sequence number is
    /// consumed and the pending expectation waits for the next valid event.
    pub fn process(&mut self, raw: &RawStimulus) -> Result<DecisionRecord> {
        let received = self.clock.now();
        let sequence = self.sequence;
        let stimulus = ingest::normalize(raw, sequence as f64)?;
        let fingerprint = self.cache.fingerprint(&stimulus)?;
        self.sequence += 1;

        self.selector.resolve(stimulus.position);
        self.habit.observe(Sample::from(&stimulus));

        if let Some(hit) = self.cache.lookup_apriori(&fingerprint) {
            return Ok(self.bypass(sequence, &stimulus, &fingerprint, hit, received));
        }

        // Constraints see velocity and payload, which the fingerprint does
        // not, so a violating stimulus never reaches the posteriori store.
        let violation = self.constraints.evaluate(&stimulus);
        if violation.is_none() {
            if let Some(hit) = self.cache.lookup_posteriori(&fingerprint, stimulus.timestamp) {
                return Ok(self.bypass(sequence, &stimulus, &fingerprint, hit, received));
            }
        }

        let forecast = self.habit.analyze();
        let field = self.field.analyze(&self.habit.positions(), stimulus.position);
        let analyzed = self.elapsed(received);

        let selection = self.selector.select(violation.is_some(), &forecast, &field);
        let synthesis = synthesize(&selection, &stimulus, violation.as_ref(), &forecast, &field);

        // An override answers this stimulus only; caching it would replay the
        // violation for a later stimulus that shares the key but breaks nothing.
        if !selection.overridden {
            self.cache.insert(fingerprint.clone(), synthesis.payload.clone(), synthesis.confidence, stimulus.timestamp);
        }
        self.selector.expect(selection.mode, synthesis.expected);

        let latency = self.elapsed(received);
        debug!(
            sequence,
            mode = %selection.mode,
            vivacity = forecast.vivacity,
            density = field.density,
            symmetry = field.symmetry,
            analysis_ns = analyzed.as_nanos() as u64,
            "#{} synthesized {}",
            sequence,
            selection.mode
        );
        if let Some(v) = &violation {
            info!("#{} guard override: {}", sequence, v.explanation);
        }

        Ok(DecisionRecord {
            sequence,
            timestamp: stimulus.timestamp,
            fingerprint: fingerprint.to_string(),
            payload: synthesis.payload,
            bypass: None,
            latency,
            scores: Some(selection.weighted),
        })
    }

    fn bypass(
        &self,
        sequence: u64,
        stimulus: &Stimulus,
        fingerprint: &Fingerprint,
        hit: CacheHit,
        received: Duration,
    ) -> DecisionRecord {
        let latency = self.elapsed(received);
        debug!("#{} {} bypass via {} ({:?})", sequence, hit.payload.mode(), hit.origin, latency);
        DecisionRecord {
            sequence,
            timestamp: stimulus.timestamp,
            fingerprint: fingerprint.to_string(),
            payload: hit.payload,
            bypass: Some(hit.origin),
            latency,
            scores: None,
        }
    }

    fn elapsed(&self, since: Duration) -> Duration {
        self.clock.now().saturating_sub(since)
    }

    /// Empty the posteriori partition (cycle boundary).
    pub fn clear_posteriori(&mut self) {
        self.cache.clear_posteriori();
    }

    /// Restore mode priors. The only path that resets learned weights.
    pub fn reset_mode_state(&mut self) {
        info!("Resetting mode state to priors");
        self.selector.reset();
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            events: self.sequence,
            window_len: self.habit.len(),
            window_capacity: self.habit.capacity(),
            posteriori_len: self.cache.posteriori_len(),
            apriori_len: self.cache.apriori().len(),
            constraints: self.constraints.len(),
            weights: self.selector.state().weights(),
            awaiting_outcome: self.selector.has_pending(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::StepClock;
    use cogsynth_core::{CacheOrigin, Mode};

    fn engine() -> Engine {
        Engine::new(
            EngineConfig::default(),
            ConstraintSet::empty(),
            &[],
            Box::new(StepClock::new(Duration::from_micros(1))),
        )
        .unwrap()
    }

    #[test]
    fn first_event_is_guard_with_scores() {
        let mut e = engine();
        let r = e.process(&RawStimulus::cursor(10.0, 10.0)).unwrap();
        assert_eq!(r.sequence, 0);
        assert_eq!(r.timestamp, 0.0);
        assert_eq!(r.mode(), Mode::Guard);
        assert!(r.scores.is_some());
        assert_eq!(r.bypass, None);
    }

    #[test]
    fn invalid_event_changes_nothing() {
        let mut e = engine();
        e.process(&RawStimulus::cursor(10.0, 10.0)).unwrap();
        let before = e.status();
        assert!(e.process(&RawStimulus::new("bogus").at(1.0, 1.0)).unwrap_err().is_validation());
        assert_eq!(e.status(), before);
        assert_eq!(e.process(&RawStimulus::cursor(20.0, 10.0)).unwrap().sequence, 1);
    }

    #[test]
    fn repeated_stimulus_is_a_posteriori_bypass() {
        let mut e = engine();
        for i in 0..5 {
            e.process(&RawStimulus::cursor(5.0 * i as f64, 2.0 * i as f64)).unwrap();
        }
        // Warm enough for a confident habit decision, which gets cached.
        let first = e.process(&RawStimulus::cursor(25.0, 10.0)).unwrap();
        assert_eq!(first.mode(), Mode::Habit);
        let second = e.process(&RawStimulus::cursor(25.0, 10.0)).unwrap();
        assert_eq!(second.bypass, Some(CacheOrigin::Posteriori));
        assert_eq!(second.payload, first.payload);
        assert!(second.scores.is_none());
        assert!(second.latency < first.latency);
        assert_eq!(e.habit().len(), 7);
    }

    #[test]
    fn reset_mode_state_restores_priors() {
        let mut e = engine();
        for i in 0..20 {
            e.process(&RawStimulus::cursor(5.0 * i as f64, 2.0 * i as f64)).unwrap();
        }
        let fresh = engine().status().weights;
        assert_ne!(e.status().weights, fresh);
        e.reset_mode_state();
        assert_eq!(e.status().weights, fresh);
        assert!(!e.status().awaiting_outcome);
    }
}
