//! CycleOrchestrator - drives events × cycles through one engine.
//!
//! Every cycle begins with an empty posteriori partition and fresh stats.
//! Mode state and the motion window carry over, so later cycles show what
//! the engine learned. Cancellation is checked between events only.

use crate::engine::Engine;
use crate::sink::ResultSink;
use cogsynth_core::config::CycleConfig;
use cogsynth_core::{CycleStats, DecisionRecord, Mode, RawStimulus, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// A producer of raw events, e.g. a scenario generator or a recorded trace.
pub trait StimulusSource {
    /// Name used in stats and output files.
    fn name(&self) -> &str;

    /// Next event, `None` when exhausted.
    fn next_stimulus(&mut self) -> Option<RawStimulus>;

    /// Called at the start of every cycle.
    fn restart(&mut self) {}
}

/// Shared stop signal, safe to set from another thread (e.g. a Ctrl-C
/// handler).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub stats: CycleStats,
    pub records: Vec<DecisionRecord>,
}

pub struct CycleOrchestrator {
    events_per_cycle: usize,
    cycles: usize,
    cancel: CancelFlag,
}

impl CycleOrchestrator {
    pub fn new(config: &CycleConfig) -> Self {
        Self {
            events_per_cycle: config.events_per_cycle,
            cycles: config.cycles,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run every configured cycle. Stops after an interrupted cycle.
    pub fn run(
        &self,
        engine: &mut Engine,
        source: &mut dyn StimulusSource,
        sink: &mut dyn ResultSink,
    ) -> Result<Vec<CycleStats>> {
        let mut all = Vec::with_capacity(self.cycles);
        for cycle in 1..=self.cycles {
            let report = self.run_cycle(engine, source, sink, cycle)?;
            let interrupted = report.stats.interrupted;
            all.push(report.stats);
            if interrupted {
                warn!("Scenario {} interrupted during cycle {}", source.name(), cycle);
                break;
            }
        }
        Ok(all)
    }

    /// One cycle: clear posteriori, feed events, emit to the sink.
    pub fn run_cycle(
        &self,
        engine: &mut Engine,
        source: &mut dyn StimulusSource,
        sink: &mut dyn ResultSink,
        cycle: usize,
    ) -> Result<CycleReport> {
        engine.clear_posteriori();
        source.restart();
        let mut stats = CycleStats::new(source.name(), cycle);
        let mut records = Vec::with_capacity(self.events_per_cycle);

        for _ in 0..self.events_per_cycle {
            if self.cancel.is_cancelled() {
                stats.interrupted = true;
                break;
            }
            let Some(raw) = source.next_stimulus() else {
                break;
            };
            match engine.process(&raw) {
                Ok(record) => {
                    stats.observe(&record);
                    sink.record(&record)?;
                    records.push(record);
                }
                Err(e) if e.is_validation() => {
                    warn!("Rejected stimulus in {} cycle {}: {}", source.name(), cycle, e);
                    stats.reject();
                }
                Err(e) => return Err(e),
            }
        }

        stats.finalize();
        sink.finish_cycle(&stats, &records)?;
        info!(
            "{} cycle {}: {} events, guard {:.1}%, habit {:.1}%, intuition {:.1}%, bypass {}/{}, mean latency {:?}",
            stats.scenario,
            cycle,
            stats.events,
            stats.frequency(Mode::Guard) * 100.0,
            stats.frequency(Mode::Habit) * 100.0,
            stats.frequency(Mode::Intuition) * 100.0,
            stats.bypass.apriori,
            stats.bypass.posteriori,
            stats.mean_latency()
        );

        Ok(CycleReport { stats, records })
    }
}
