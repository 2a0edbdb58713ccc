//! Logic seeds - externally supplied constraint rules and apriori knowledge.
//!
//! Both are parsed once at startup and handed to the engine as immutable
//! data. The engine never compiles rule content into logic of its own; it
//! only asks a `ConstraintSet` whether a stimulus violates something.

use crate::error::{Error, Result};
use crate::types::{ModePayload, Stimulus, StimulusKind, Vec2};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A hard constraint as it appears in a seed file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ConstraintRule {
    /// Stimuli of this kind are never acceptable, unless the payload sets
    /// `exempt_flag` to true.
    ForbiddenKind {
        name: String,
        kind: StimulusKind,
        reason: String,
        #[serde(default)]
        exempt_flag: Option<String>,
    },
    /// Position must stay inside the box.
    Bounds {
        name: String,
        min: Vec2,
        max: Vec2,
        reason: String,
    },
    /// Velocity magnitude must not exceed the limit.
    MaxSpeed {
        name: String,
        limit: f64,
        reason: String,
    },
    /// Intent labels matching the pattern are rejected.
    ForbiddenIntent {
        name: String,
        pattern: String,
        reason: String,
    },
}

impl ConstraintRule {
    pub fn name(&self) -> &str {
        match self {
            ConstraintRule::ForbiddenKind { name, .. }
            | ConstraintRule::Bounds { name, .. }
            | ConstraintRule::MaxSpeed { name, .. }
            | ConstraintRule::ForbiddenIntent { name, .. } => name,
        }
    }
}

/// A violated constraint, with a human-readable explanation.
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub rule: String,
    pub explanation: String,
}

enum Compiled {
    Kind { kind: StimulusKind, exempt_flag: Option<String> },
    Bounds { min: Vec2, max: Vec2 },
    MaxSpeed { limit: f64 },
    Intent { pattern: Regex },
}

struct CompiledRule {
    name: String,
    reason: String,
    check: Compiled,
}

/// The read-only rule set consulted by guard evaluation.
#[derive(Default)]
pub struct ConstraintSet {
    rules: Vec<CompiledRule>,
}

impl std::fmt::Debug for ConstraintSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintSet")
            .field("rules", &self.rules.iter().map(|r| r.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl ConstraintSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile rules. Malformed patterns or degenerate bounds are fatal.
    pub fn compile(rules: &[ConstraintRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let check = match rule {
                ConstraintRule::ForbiddenKind { kind, exempt_flag, .. } => Compiled::Kind {
                    kind: *kind,
                    exempt_flag: exempt_flag.clone(),
                },
                ConstraintRule::Bounds { name, min, max, .. } => {
                    if !(min.is_finite() && max.is_finite() && min.x <= max.x && min.y <= max.y) {
                        return Err(Error::seed(format!("bounds rule '{}' has an empty box", name)));
                    }
                    Compiled::Bounds { min: *min, max: *max }
                }
                ConstraintRule::MaxSpeed { name, limit, .. } => {
                    if !(limit.is_finite() && *limit >= 0.0) {
                        return Err(Error::seed(format!("max_speed rule '{}' needs a limit >= 0", name)));
                    }
                    Compiled::MaxSpeed { limit: *limit }
                }
                ConstraintRule::ForbiddenIntent { name, pattern, .. } => {
                    let pattern = Regex::new(pattern)
                        .map_err(|e| Error::seed(format!("intent rule '{}': {}", name, e)))?;
                    Compiled::Intent { pattern }
                }
            };
            let reason = match rule {
                ConstraintRule::ForbiddenKind { reason, .. }
                | ConstraintRule::Bounds { reason, .. }
                | ConstraintRule::MaxSpeed { reason, .. }
                | ConstraintRule::ForbiddenIntent { reason, .. } => reason.clone(),
            };
            compiled.push(CompiledRule { name: rule.name().to_string(), reason, check });
        }
        Ok(Self { rules: compiled })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First violated rule in declaration order, if any.
    pub fn evaluate(&self, stimulus: &Stimulus) -> Option<Violation> {
        self.rules.iter().find_map(|rule| {
            let detail = match &rule.check {
                Compiled::Kind { kind, exempt_flag } => {
                    let exempt = exempt_flag.as_deref().is_some_and(|flag| stimulus.payload_flag(flag));
                    (stimulus.kind == *kind && !exempt).then(|| format!("{} stimulus", kind))
                }
                Compiled::Bounds { min, max } => {
                    let p = stimulus.position;
                    let inside = p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y;
                    (!inside).then(|| format!("position {} outside {}..{}", p, min, max))
                }
                Compiled::MaxSpeed { limit } => {
                    let speed = stimulus.velocity.length();
                    (speed > *limit).then(|| format!("speed {:.2} exceeds {:.2}", speed, limit))
                }
                Compiled::Intent { pattern } => stimulus
                    .intent
                    .as_deref()
                    .filter(|intent| pattern.is_match(intent))
                    .map(|intent| format!("intent '{}'", intent)),
            }?;
            Some(Violation {
                rule: rule.name.clone(),
                explanation: format!("{}: {}", rule.reason, detail),
            })
        })
    }
}

/// Innate knowledge: an exact (kind, position, intent) with its decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AprioriSeed {
    pub kind: StimulusKind,
    pub position: Vec2,
    #[serde(default)]
    pub intent: Option<String>,
    pub decision: ModePayload,
}

/// The full seed file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicSeeds {
    #[serde(default, rename = "constraint")]
    pub constraints: Vec<ConstraintRule>,
    #[serde(default)]
    pub apriori: Vec<AprioriSeed>,
}

impl LogicSeeds {
    /// Load from `.json` or `.toml` (chosen by extension). Fatal on error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::seed(format!("cannot read {}: {}", path.display(), e)))?;
        let seeds: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(Error::seed(format!(
                    "unsupported seed file extension {:?} for {}",
                    other,
                    path.display()
                )))
            }
        };
        tracing::info!(
            "Loaded logic seeds from {}: {} constraints, {} apriori",
            path.display(),
            seeds.constraints.len(),
            seeds.apriori.len()
        );
        Ok(seeds)
    }

    pub fn constraint_set(&self) -> Result<ConstraintSet> {
        ConstraintSet::compile(&self.constraints)
    }
}
