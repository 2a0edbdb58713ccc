//! Scenario generators - deterministic cursor streams for the harness.
//!
//! Every scenario emits `cursor_movement` events with intent `navigation`
//! over a 1920×1080 screen, timestamped with the iteration index. A
//! scenario restarts from scratch at each cycle, so every cycle of a run
//! sees the same input and differences come only from what the engine
//! learned.

use cogsynth_core::{RawStimulus, Vec2};
use cogsynth_engine::StimulusSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

pub const SCREEN_WIDTH: f64 = 1920.0;
pub const SCREEN_HEIGHT: f64 = 1080.0;
pub const INTENT: &str = "navigation";
pub const DEFAULT_JUMP_INTERVAL: usize = 40;

const CENTER: Vec2 = Vec2::new(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioKind {
    Linear,
    Oscillatory,
    RandomWalk,
    QuadrantLoop,
    SymmetricJumps,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 5] = [
        ScenarioKind::Linear,
        ScenarioKind::Oscillatory,
        ScenarioKind::RandomWalk,
        ScenarioKind::QuadrantLoop,
        ScenarioKind::SymmetricJumps,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::Linear => "linear",
            ScenarioKind::Oscillatory => "oscillatory",
            ScenarioKind::RandomWalk => "random_walk",
            ScenarioKind::QuadrantLoop => "quadrant_loop",
            ScenarioKind::SymmetricJumps => "symmetric_jumps",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
                format!("unknown scenario '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// A seeded, restartable scenario stream.
pub struct Scenario {
    kind: ScenarioKind,
    seed: u64,
    jump_interval: usize,
    iteration: usize,
    rng: StdRng,
    walker: Vec2,
    last: Option<Vec2>,
}

impl Scenario {
    pub fn new(kind: ScenarioKind, seed: u64) -> Self {
        Self {
            kind,
            seed,
            jump_interval: DEFAULT_JUMP_INTERVAL,
            iteration: 0,
            rng: StdRng::seed_from_u64(seed),
            walker: CENTER,
            last: None,
        }
    }

    /// Events between mirrored jumps (symmetric_jumps only). Clamped to 1.
    pub fn with_jump_interval(mut self, interval: usize) -> Self {
        self.jump_interval = interval.max(1);
        self
    }

    pub fn kind(&self) -> ScenarioKind {
        self.kind
    }

    pub fn jump_interval(&self) -> usize {
        self.jump_interval
    }

    /// Position for the current iteration. Advances the walk state.
    fn position(&mut self, i: usize) -> Vec2 {
        let t = i as f64;
        match self.kind {
            ScenarioKind::Linear => wrap(Vec2::new(100.0 + 3.0 * t, 100.0 + 1.5 * t)),
            ScenarioKind::Oscillatory => CENTER + Vec2::new((0.1 * t).sin(), (0.1 * t).cos()) * 100.0,
            ScenarioKind::RandomWalk => {
                if i > 0 {
                    let step = Vec2::new(
                        self.rng.gen_range(-10..=10) as f64,
                        self.rng.gen_range(-10..=10) as f64,
                    );
                    let next = self.walker + step;
                    self.walker = Vec2::new(
                        next.x.clamp(0.0, SCREEN_WIDTH - 1.0),
                        next.y.clamp(0.0, SCREEN_HEIGHT - 1.0),
                    );
                }
                self.walker
            }
            ScenarioKind::QuadrantLoop => {
                let corner = match i % 4 {
                    0 => Vec2::new(-200.0, -200.0),
                    1 => Vec2::new(200.0, -200.0),
                    2 => Vec2::new(200.0, 200.0),
                    _ => Vec2::new(-200.0, 200.0),
                };
                CENTER + corner
            }
            ScenarioKind::SymmetricJumps => {
                let mut p = wrap(Vec2::new(200.0 + 2.0 * t, 300.0 + t));
                if i > 0 && i % self.jump_interval == 0 {
                    p.x = SCREEN_WIDTH - p.x;
                }
                p
            }
        }
    }
}

fn wrap(p: Vec2) -> Vec2 {
    Vec2::new(p.x.rem_euclid(SCREEN_WIDTH), p.y.rem_euclid(SCREEN_HEIGHT))
}

impl StimulusSource for Scenario {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn next_stimulus(&mut self) -> Option<RawStimulus> {
        let i = self.iteration;
        let p = self.position(i);
        let velocity = self.last.map(|prev| p - prev).unwrap_or(Vec2::ZERO);
        self.last = Some(p);
        self.iteration += 1;

        Some(
            RawStimulus::cursor(p.x, p.y)
                .moving(velocity.x, velocity.y)
                .with_intent(INTENT)
                .with_timestamp(i as f64),
        )
    }

    fn restart(&mut self) {
        self.iteration = 0;
        self.rng = StdRng::seed_from_u64(self.seed);
        self.walker = CENTER;
        self.last = None;
    }
}
