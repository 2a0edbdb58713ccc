//! Tests for cogsynth-core: record schema, config files, logic seed files, stats

use cogsynth_core::*;
use std::time::Duration;

fn habit_record() -> DecisionRecord {
    DecisionRecord {
        sequence: 7,
        timestamp: 7.0,
        fingerprint: "cursor_movement@(35,14)#navigation".into(),
        payload: ModePayload::Habit { predicted_position: Vec2::new(40.0, 16.0), confidence: 0.95 },
        bypass: None,
        latency: Duration::from_nanos(1500),
        scores: Some(ModeScores { guard: 0.07, habit: 0.6, intuition: 0.0 }),
    }
}

// ===========================================================================
// DecisionRecord wire shape
// ===========================================================================

#[test]
fn record_serializes_to_a_flat_uniform_row() {
    let value = serde_json::to_value(habit_record()).unwrap();
    assert_eq!(value["mode"], "habit");
    assert_eq!(value["bypass"], serde_json::Value::Null);
    assert_eq!(value["latency_ns"], 1500);
    assert_eq!(value["predicted_position"], serde_json::json!([40.0, 16.0]));
    assert_eq!(value["habit_confidence"], 0.95);
    // Fields of other modes are present and null.
    assert!(value["constraint_explanation"].is_null());
    assert!(value["jump_vector"].is_null());
    assert!(value["certainty"].is_null());
}

#[test]
fn record_parses_back() {
    let json = serde_json::to_string(&habit_record()).unwrap();
    let parsed: DecisionRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, habit_record());
}

#[test]
fn row_with_fields_of_two_modes_is_rejected() {
    let mut value = serde_json::to_value(habit_record()).unwrap();
    value["jump_vector"] = serde_json::json!([1.0, 2.0]);
    assert!(serde_json::from_value::<DecisionRecord>(value).is_err());
}

#[test]
fn bypass_origin_serializes_lowercase() {
    let mut record = habit_record();
    record.bypass = Some(CacheOrigin::Posteriori);
    record.scores = None;
    let value = serde_json::to_value(record).unwrap();
    assert_eq!(value["bypass"], "posteriori");
    assert!(value["scores"].is_null());
}

#[test]
fn mode_labels() {
    assert_eq!(Mode::Intuition.to_string(), "INTUITION-JUMP");
    assert_eq!(serde_json::to_value(Mode::Intuition).unwrap(), "intuition");
}

// ===========================================================================
// Config files
// ===========================================================================

#[test]
fn config_file_loads_and_unknown_keys_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");

    let mut config = EngineConfig::default();
    config.habit.window_size = 32;
    std::fs::write(&path, config.to_toml()).unwrap();
    assert_eq!(EngineConfig::load(&path).unwrap().habit.window_size, 32);

    let tampered = config.to_toml().replace("[habit]", "[habit]\nwindow = 4");
    std::fs::write(&path, tampered).unwrap();
    assert!(matches!(EngineConfig::load(&path), Err(Error::Config(_))));
}

#[test]
fn field_sample_minimum_beyond_the_window_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");

    let mut config = EngineConfig::default();
    config.habit.window_size = 16;
    config.field.min_samples = 50;
    std::fs::write(&path, config.to_toml()).unwrap();
    let err = EngineConfig::load(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("field.min_samples"));

    config.field.min_samples = 16;
    assert!(config.validate().is_ok());
}

#[test]
fn missing_config_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    assert!(EngineConfig::load(&dir.path().join("absent.toml")).is_err());
}

// ===========================================================================
// Logic seeds
// ===========================================================================

const SEEDS_TOML: &str = r#"
[[constraint]]
rule = "forbidden_kind"
name = "sovereignty"
kind = "surveillance_probe"
reason = "surveillance detected"
exempt_flag = "test_mode"

[[constraint]]
rule = "bounds"
name = "screen"
min = [0.0, 0.0]
max = [1920.0, 1080.0]
reason = "outside the screen"

[[constraint]]
rule = "forbidden_intent"
name = "exfiltration"
pattern = "^(exfil|scrape)"
reason = "forbidden intent"

[[apriori]]
kind = "cursor_movement"
position = [960.0, 540.0]
intent = "navigation"

[apriori.decision]
mode = "guard"
explanation = "screen center is reserved"
"#;

#[test]
fn toml_seed_file_loads_rules_and_apriori() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seeds.toml");
    std::fs::write(&path, SEEDS_TOML).unwrap();

    let seeds = LogicSeeds::load(&path).unwrap();
    assert_eq!(seeds.constraints.len(), 3);
    assert_eq!(seeds.constraints[1].name(), "screen");
    assert_eq!(seeds.apriori.len(), 1);
    assert_eq!(seeds.apriori[0].decision.mode(), Mode::Guard);

    let set = seeds.constraint_set().unwrap();
    let stimulus = Stimulus {
        kind: StimulusKind::IntentSignal,
        position: Vec2::new(10.0, 10.0),
        velocity: Vec2::ZERO,
        intent: Some("scrape-profile".into()),
        payload: None,
        timestamp: 0.0,
    };
    assert_eq!(set.evaluate(&stimulus).unwrap().rule, "exfiltration");
}

#[test]
fn json_seed_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seeds.json");
    let json = serde_json::json!({
        "constraint": [
            {"rule": "max_speed", "name": "speed", "limit": 50.0, "reason": "too fast"}
        ]
    });
    std::fs::write(&path, json.to_string()).unwrap();

    let seeds = LogicSeeds::load(&path).unwrap();
    assert_eq!(seeds.constraints.len(), 1);
    assert!(seeds.apriori.is_empty());
}

#[test]
fn unknown_seed_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seeds.yaml");
    std::fs::write(&path, "constraint: []").unwrap();
    assert!(matches!(LogicSeeds::load(&path), Err(Error::Seed(_))));
}

#[test]
fn degenerate_bounds_are_rejected() {
    let err = ConstraintSet::compile(&[ConstraintRule::Bounds {
        name: "inverted".into(),
        min: Vec2::new(10.0, 10.0),
        max: Vec2::new(0.0, 0.0),
        reason: "x".into(),
    }])
    .unwrap_err();
    assert!(err.to_string().contains("inverted"));
}

// ===========================================================================
// CycleStats
// ===========================================================================

#[test]
fn cycle_stats_count_modes_bypass_and_latency() {
    let mut stats = CycleStats::new("linear", 1);
    stats.observe(&habit_record());

    let mut bypassed = habit_record();
    bypassed.bypass = Some(CacheOrigin::Apriori);
    bypassed.latency = Duration::from_nanos(500);
    stats.observe(&bypassed);

    let mut guard = habit_record();
    guard.payload = ModePayload::Guard { explanation: "hold".into(), violated_rule: None };
    stats.observe(&guard);
    stats.reject();
    stats.finalize();

    assert_eq!(stats.events, 3);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.modes, ModeCounts { guard: 1, habit: 2, intuition: 0 });
    assert_eq!(stats.bypass, BypassCounts { apriori: 1, posteriori: 0, none: 2 });
    assert_eq!(stats.latency.min_ns, 500);
    assert_eq!(stats.latency.max_ns, 1500);
    assert!((stats.frequency(Mode::Habit) - 2.0 / 3.0).abs() < 1e-12);

    let json = serde_json::to_value(&stats).unwrap();
    assert!(json.get("latencies").is_none());
    assert_eq!(json["modes"]["habit"], 2);
}
