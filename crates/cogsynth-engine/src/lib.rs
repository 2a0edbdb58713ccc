//! Cogsynth Engine - the cognitive synthesis pipeline
//!
//! Per event:
//! - ingest: raw event → canonical `Stimulus` (or a validation error)
//! - cache: apriori → posteriori lookup; a hit is a bypass and ends the event
//! - habit + field: motion extrapolation and density/symmetry over the window
//! - selector: guard override, weighted scores, deterministic tie-break
//! - synthesizer: one `DecisionRecord`, written back to posteriori
//!
//! The orchestrator drives events × cycles and clears posteriori per cycle.
//! One `Engine` per stimulus stream; nothing is shared between instances.

pub mod cache;
pub mod clock;
pub mod engine;
pub mod field;
pub mod habit;
pub mod ingest;
pub mod orchestrator;
pub mod selector;
pub mod sink;
pub mod synthesizer;

pub use cache::{AprioriStore, CacheEntry, CacheHit, Fingerprint, KnowledgeCache};
pub use clock::{Clock, MonotonicClock, StepClock};
pub use engine::{Engine, EngineStatus};
pub use field::{FieldRecognizer, FieldSnapshot, JumpSignal};
pub use habit::{HabitForecast, HabitTracker, Sample};
pub use orchestrator::{CancelFlag, CycleOrchestrator, CycleReport, StimulusSource};
pub use selector::{ModeSelector, ModeState, Selection};
pub use synthesizer::{synthesize, Synthesis};
pub use sink::{MemorySink, ResultSink};
