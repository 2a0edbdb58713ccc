//! Core types for Cogsynth

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// Planar vector used for positions, velocities, deltas and jump vectors.
/// Serializes as `[x, y]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Mean of a set of points, `None` when empty.
    pub fn mean<'a>(points: impl IntoIterator<Item = &'a Vec2>) -> Option<Vec2> {
        let mut sum = Vec2::ZERO;
        let mut n = 0usize;
        for p in points {
            sum += *p;
            n += 1;
        }
        (n > 0).then(|| sum * (1.0 / n as f64))
    }
}

impl From<[f64; 2]> for Vec2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Vec2> for [f64; 2] {
    fn from(v: Vec2) -> Self {
        [v.x, v.y]
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, k: f64) -> Vec2 {
        Vec2::new(self.x * k, self.y * k)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Stimulus
// ---------------------------------------------------------------------------

/// Recognized stimulus type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    CursorMovement,
    Gesture,
    IntentSignal,
    SurveillanceProbe,
}

impl StimulusKind {
    pub const ALL: [StimulusKind; 4] = [
        StimulusKind::CursorMovement,
        StimulusKind::Gesture,
        StimulusKind::IntentSignal,
        StimulusKind::SurveillanceProbe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StimulusKind::CursorMovement => "cursor_movement",
            StimulusKind::Gesture => "gesture",
            StimulusKind::IntentSignal => "intent_signal",
            StimulusKind::SurveillanceProbe => "surveillance_probe",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl fmt::Display for StimulusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An input event as produced by a live source or the harness, before
/// validation. Field names follow the wire shape (`type`, `coordinates`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawStimulus {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl RawStimulus {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn cursor(x: f64, y: f64) -> Self {
        Self::new(StimulusKind::CursorMovement.as_str()).at(x, y)
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.coordinates = Some(vec![x, y]);
        self
    }

    pub fn moving(mut self, vx: f64, vy: f64) -> Self {
        self.velocity = Some(vec![vx, vy]);
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Canonical, validated event. Built once per input event by ingest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub kind: StimulusKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub intent: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub timestamp: f64,
}

impl Stimulus {
    /// True when the payload carries `flag: true`.
    pub fn payload_flag(&self, flag: &str) -> bool {
        self.payload
            .as_ref()
            .and_then(|p| p.get(flag))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Modes and decisions
// ---------------------------------------------------------------------------

/// The three interpretation strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Guard,
    Habit,
    Intuition,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Guard, Mode::Habit, Mode::Intuition];

    pub fn label(self) -> &'static str {
        match self {
            Mode::Guard => "GUARD",
            Mode::Habit => "HABIT",
            Mode::Intuition => "INTUITION-JUMP",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mode-specific content of a decision. Exactly one variant per record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ModePayload {
    Guard {
        explanation: String,
        #[serde(default)]
        violated_rule: Option<String>,
    },
    Habit {
        predicted_position: Vec2,
        confidence: f64,
    },
    Intuition {
        jump_vector: Vec2,
        certainty: f64,
    },
}

impl ModePayload {
    pub fn mode(&self) -> Mode {
        match self {
            ModePayload::Guard { .. } => Mode::Guard,
            ModePayload::Habit { .. } => Mode::Habit,
            ModePayload::Intuition { .. } => Mode::Intuition,
        }
    }
}

/// Which cache partition answered a bypassed event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOrigin {
    Apriori,
    Posteriori,
}

impl fmt::Display for CacheOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheOrigin::Apriori => f.write_str("apriori"),
            CacheOrigin::Posteriori => f.write_str("posteriori"),
        }
    }
}

/// Weighted per-mode scores at selection time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeScores {
    pub guard: f64,
    pub habit: f64,
    pub intuition: f64,
}

impl ModeScores {
    pub fn get(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Guard => self.guard,
            Mode::Habit => self.habit,
            Mode::Intuition => self.intuition,
        }
    }
}

/// The single synthesized output per event (the cross-domain predicate).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "DecisionRow", try_from = "DecisionRow")]
pub struct DecisionRecord {
    /// Engine-lifetime event counter.
    pub sequence: u64,
    /// Stimulus timestamp.
    pub timestamp: f64,
    pub fingerprint: String,
    pub payload: ModePayload,
    /// `None` when the record came from full synthesis.
    pub bypass: Option<CacheOrigin>,
    pub latency: Duration,
    /// Absent on bypassed records.
    pub scores: Option<ModeScores>,
}

impl DecisionRecord {
    pub fn mode(&self) -> Mode {
        self.payload.mode()
    }

    pub fn is_bypass(&self) -> bool {
        self.bypass.is_some()
    }
}

/// Flat, uniform wire shape of a `DecisionRecord`: fields that do not belong
/// to the selected mode are `null`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionRow {
    pub sequence: u64,
    pub timestamp: f64,
    pub fingerprint: String,
    pub mode: Mode,
    pub bypass: Option<CacheOrigin>,
    pub latency_ns: u64,
    pub constraint_explanation: Option<String>,
    pub violated_rule: Option<String>,
    pub predicted_position: Option<Vec2>,
    pub habit_confidence: Option<f64>,
    pub jump_vector: Option<Vec2>,
    pub certainty: Option<f64>,
    pub scores: Option<ModeScores>,
}

impl From<DecisionRecord> for DecisionRow {
    fn from(record: DecisionRecord) -> Self {
        let mut row = DecisionRow {
            sequence: record.sequence,
            timestamp: record.timestamp,
            fingerprint: record.fingerprint,
            mode: record.payload.mode(),
            bypass: record.bypass,
            latency_ns: u64::try_from(record.latency.as_nanos()).unwrap_or(u64::MAX),
            constraint_explanation: None,
            violated_rule: None,
            predicted_position: None,
            habit_confidence: None,
            jump_vector: None,
            certainty: None,
            scores: record.scores,
        };
        match record.payload {
            ModePayload::Guard { explanation, violated_rule } => {
                row.constraint_explanation = Some(explanation);
                row.violated_rule = violated_rule;
            }
            ModePayload::Habit { predicted_position, confidence } => {
                row.predicted_position = Some(predicted_position);
                row.habit_confidence = Some(confidence);
            }
            ModePayload::Intuition { jump_vector, certainty } => {
                row.jump_vector = Some(jump_vector);
                row.certainty = Some(certainty);
            }
        }
        row
    }
}

impl TryFrom<DecisionRow> for DecisionRecord {
    type Error = String;

    fn try_from(row: DecisionRow) -> std::result::Result<Self, Self::Error> {
        let guard_fields = row.constraint_explanation.is_some() || row.violated_rule.is_some();
        let habit_fields = row.predicted_position.is_some() || row.habit_confidence.is_some();
        let jump_fields = row.jump_vector.is_some() || row.certainty.is_some();

        let payload = match row.mode {
            Mode::Guard if !habit_fields && !jump_fields => ModePayload::Guard {
                explanation: row
                    .constraint_explanation
                    .ok_or("guard record without constraint_explanation")?,
                violated_rule: row.violated_rule,
            },
            Mode::Habit if !guard_fields && !jump_fields => ModePayload::Habit {
                predicted_position: row
                    .predicted_position
                    .ok_or("habit record without predicted_position")?,
                confidence: row.habit_confidence.ok_or("habit record without habit_confidence")?,
            },
            Mode::Intuition if !guard_fields && !habit_fields => ModePayload::Intuition {
                jump_vector: row.jump_vector.ok_or("intuition record without jump_vector")?,
                certainty: row.certainty.ok_or("intuition record without certainty")?,
            },
            mode => return Err(format!("{} record carries fields of another mode", mode)),
        };

        Ok(DecisionRecord {
            sequence: row.sequence,
            timestamp: row.timestamp,
            fingerprint: row.fingerprint,
            payload,
            bypass: row.bypass,
            latency: Duration::from_nanos(row.latency_ns),
            scores: row.scores,
        })
    }
}
