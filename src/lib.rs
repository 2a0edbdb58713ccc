//! Cogsynth harness - scenario generators and file output around the engine.

pub mod results;
pub mod scenario;

pub use results::{CycleSummary, JsonlSink, MasterSummary, ModeFrequencies};
pub use scenario::{Scenario, ScenarioKind};
