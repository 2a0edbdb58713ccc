//! Cogsynth Core - stimulus/decision types, configuration, logic seeds, errors

pub mod config;
pub mod error;
pub mod seeds;
pub mod stats;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result, ValidationError};
pub use seeds::{AprioriSeed, ConstraintRule, ConstraintSet, LogicSeeds, Violation};
pub use stats::{BypassCounts, CycleStats, LatencySummary, ModeCounts};
pub use types::*;
