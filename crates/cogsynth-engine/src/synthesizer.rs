//! Synthesizer - turns a selection into the event's single decision.

use crate::field::FieldSnapshot;
use crate::habit::HabitForecast;
use crate::selector::Selection;
use cogsynth_core::{Mode, ModePayload, Stimulus, Vec2, Violation};

/// What full synthesis produced for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub payload: ModePayload,
    /// Confidence to cache the decision with.
    pub confidence: f64,
    /// Where the chosen mode expects the next stimulus.
    pub expected: Vec2,
}

pub fn synthesize(
    selection: &Selection,
    stimulus: &Stimulus,
    violation: Option<&Violation>,
    habit: &HabitForecast,
    field: &FieldSnapshot,
) -> Synthesis {
    let here = stimulus.position;
    let (payload, expected) = match (selection.mode, field.jump) {
        (Mode::Habit, _) => {
            let predicted = habit.predicted.unwrap_or(here);
            (
                ModePayload::Habit { predicted_position: predicted, confidence: habit.vivacity },
                predicted,
            )
        }
        (Mode::Intuition, Some(jump)) => (
            ModePayload::Intuition { jump_vector: jump.vector, certainty: jump.certainty },
            here + jump.vector,
        ),
        // Guard, and Intuition without a jump (never a candidate).
        _ => (guard_payload(violation), here),
    };

    Synthesis { payload, confidence: selection.confidence(), expected }
}

fn guard_payload(violation: Option<&Violation>) -> ModePayload {
    match violation {
        Some(v) => ModePayload::Guard {
            explanation: v.explanation.clone(),
            violated_rule: Some(v.rule.clone()),
        },
        None => ModePayload::Guard {
            explanation: "no reliable prediction; holding position".to_string(),
            violated_rule: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::JumpSignal;
    use cogsynth_core::{ModeScores, StimulusKind};

    fn stimulus() -> Stimulus {
        Stimulus {
            kind: StimulusKind::CursorMovement,
            position: Vec2::new(100.0, 50.0),
            velocity: Vec2::ZERO,
            intent: None,
            payload: None,
            timestamp: 1.0,
        }
    }

    fn selection(mode: Mode, raw: ModeScores) -> Selection {
        Selection { mode, raw, weighted: raw, overridden: false }
    }

    #[test]
    fn intuition_expects_the_jump_target() {
        let field = FieldSnapshot {
            density: 0.9,
            symmetry: 0.9,
            jump: Some(JumpSignal { vector: Vec2::new(-40.0, 0.0), certainty: 0.9 }),
        };
        let habit = HabitForecast { predicted: None, vivacity: 0.0, trend: Vec2::ZERO };
        let raw = ModeScores { guard: 0.1, habit: 0.0, intuition: 0.9 };
        let out = synthesize(&selection(Mode::Intuition, raw), &stimulus(), None, &habit, &field);
        assert_eq!(out.expected, Vec2::new(60.0, 50.0));
        assert_eq!(out.confidence, 0.9);
        assert!(matches!(out.payload, ModePayload::Intuition { certainty, .. } if certainty == 0.9));
    }

    #[test]
    fn guard_carries_the_violated_rule() {
        let violation = Violation { rule: "screen".into(), explanation: "off screen".into() };
        let habit = HabitForecast { predicted: None, vivacity: 0.0, trend: Vec2::ZERO };
        let field = FieldSnapshot { density: 0.0, symmetry: 0.0, jump: None };
        let raw = ModeScores { guard: 1.0, habit: 0.0, intuition: 0.0 };
        let out = synthesize(&selection(Mode::Guard, raw), &stimulus(), Some(&violation), &habit, &field);
        assert_eq!(out.expected, Vec2::new(100.0, 50.0));
        assert_eq!(
            out.payload,
            ModePayload::Guard { explanation: "off screen".into(), violated_rule: Some("screen".into()) }
        );
    }
}
