//! Result sink - where records and cycle summaries go.
//!
//! The engine only defines the logical content; serialization is the sink's
//! concern. Implement this trait to add a new output.

use cogsynth_core::{CycleStats, DecisionRecord, Result};

pub trait ResultSink {
    /// Called once per emitted record, in order. Streaming sinks write here.
    fn record(&mut self, _record: &DecisionRecord) -> Result<()> { Ok(()) }

    /// Called at cycle end with the finalized stats and every record of the
    /// cycle. Must complete before the next cycle starts.
    fn finish_cycle(&mut self, stats: &CycleStats, records: &[DecisionRecord]) -> Result<()>;
}

/// Collected cycle output, kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub cycles: Vec<(CycleStats, Vec<DecisionRecord>)>,
    pub streamed: usize,
}

impl MemorySink {
    pub fn new() -> Self { Self::default() }

    pub fn stats(&self) -> impl Iterator<Item = &CycleStats> {
        self.cycles.iter().map(|(stats, _)| stats)
    }

    pub fn records(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.cycles.iter().flat_map(|(_, records)| records.iter())
    }
}

impl ResultSink for MemorySink {
    fn record(&mut self, _record: &DecisionRecord) -> Result<()> {
        self.streamed += 1;
        Ok(())
    }

    fn finish_cycle(&mut self, stats: &CycleStats, records: &[DecisionRecord]) -> Result<()> {
        self.cycles.push((stats.clone(), records.to_vec()));
        Ok(())
    }
}
