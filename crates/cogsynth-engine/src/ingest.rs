//! StimulusIngest - raw event → canonical `Stimulus`.
//!
//! Pure: no shared state is read or written. A failure means the event is
//! dropped by the caller before anything else sees it.

use cogsynth_core::{RawStimulus, Stimulus, StimulusKind, ValidationError, Vec2};

/// Validate and normalize `raw`. `default_timestamp` is used when the event
/// carries none (the engine passes its logical event counter).
pub fn normalize(raw: &RawStimulus, default_timestamp: f64) -> Result<Stimulus, ValidationError> {
    let kind = StimulusKind::parse(raw.kind.trim())
        .ok_or_else(|| ValidationError::UnknownKind(raw.kind.clone()))?;

    let position = match raw.coordinates.as_deref() {
        Some(c) => vector("coordinates", c)?,
        None => return Err(missing(kind, "coordinates")),
    };

    let velocity = match (kind, raw.velocity.as_deref()) {
        (_, Some(v)) => vector("velocity", v)?,
        (StimulusKind::Gesture, None) => return Err(missing(kind, "velocity")),
        (_, None) => Vec2::ZERO,
    };

    let intent = raw
        .intent
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    if kind == StimulusKind::IntentSignal && intent.is_none() {
        return Err(missing(kind, "intent"));
    }

    let timestamp = raw.timestamp.unwrap_or(default_timestamp);
    if !timestamp.is_finite() {
        return Err(ValidationError::NonFinite { field: "timestamp" });
    }

    Ok(Stimulus {
        kind,
        position,
        velocity,
        intent,
        payload: raw.payload.clone(),
        timestamp,
    })
}

fn missing(kind: StimulusKind, field: &'static str) -> ValidationError {
    ValidationError::MissingField { kind: kind.to_string(), field }
}

fn vector(field: &'static str, values: &[f64]) -> Result<Vec2, ValidationError> {
    match values {
        [x, y] => {
            let v = Vec2::new(*x, *y);
            if v.is_finite() {
                Ok(v)
            } else {
                Err(ValidationError::NonFinite { field })
            }
        }
        _ => Err(ValidationError::WrongArity { field, len: values.len() }),
    }
}
