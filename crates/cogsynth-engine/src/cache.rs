//! KnowledgeCache - two partitions behind one lookup.
//!
//! - apriori: built once from seeds, no mutating API at all. A hit here is
//!   final regardless of what posteriori holds for the same fingerprint.
//! - posteriori: learned decisions. Confidence decays exponentially with
//!   stimulus time; entries under the floor are dropped on sight, and the
//!   least confident entries go first when over capacity.

use cogsynth_core::config::CacheConfig;
use cogsynth_core::{
    AprioriSeed, CacheOrigin, Error, ModePayload, Result, Stimulus, StimulusKind, ValidationError, Vec2,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Cache key: kind, quantized position, intent. Totally ordered so that
/// eviction never depends on hash iteration order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint {
    kind: StimulusKind,
    qx: i64,
    qy: i64,
    intent: Option<String>,
}

impl Fingerprint {
    /// Fails when a quantized coordinate does not fit in an `i64`.
    pub fn new(
        kind: StimulusKind,
        position: Vec2,
        intent: Option<&str>,
        quantum: f64,
    ) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            kind,
            qx: quantize(position.x, quantum)?,
            qy: quantize(position.y, quantum)?,
            intent: intent.map(str::to_string),
        })
    }

    pub fn of(stimulus: &Stimulus, quantum: f64) -> std::result::Result<Self, ValidationError> {
        Self::new(stimulus.kind, stimulus.position, stimulus.intent.as_deref(), quantum)
    }
}

fn quantize(value: f64, quantum: f64) -> std::result::Result<i64, ValidationError> {
    let cell = (value / quantum).floor();
    // i64::MAX as f64 is 2^63, one past the largest representable cell.
    if cell.is_finite() && cell >= i64::MIN as f64 && cell < i64::MAX as f64 {
        Ok(cell as i64)
    } else {
        Err(ValidationError::OutOfRange { field: "coordinates" })
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@({},{})", self.kind, self.qx, self.qy)?;
        if let Some(intent) = &self.intent {
            write!(f, "#{}", intent)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub payload: ModePayload,
    pub origin: CacheOrigin,
    /// Confidence at `created_at`.
    pub confidence: f64,
    pub created_at: f64,
    pub last_accessed: f64,
}

impl CacheEntry {
    /// Confidence after exponential decay. Never increases with `now`.
    pub fn decayed_confidence(&self, now: f64, decay_rate: f64) -> f64 {
        let elapsed = (now - self.created_at).max(0.0);
        self.confidence * (-decay_rate * elapsed).exp()
    }
}

/// A bypass: the cached decision and the partition that answered.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheHit {
    pub origin: CacheOrigin,
    pub payload: ModePayload,
    pub confidence: f64,
}

/// Read-only apriori partition. Only construction can populate it.
#[derive(Clone, Debug, Default)]
pub struct AprioriStore {
    entries: BTreeMap<Fingerprint, CacheEntry>,
}

impl AprioriStore {
    /// Build from seeds. Two seeds with one fingerprint is a seed error.
    pub fn from_seeds(seeds: &[AprioriSeed], quantum: f64) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for seed in seeds {
            let fingerprint = Fingerprint::new(seed.kind, seed.position, seed.intent.as_deref(), quantum)
                .map_err(|e| Error::seed(format!("apriori seed at {}: {}", seed.position, e)))?;
            let entry = CacheEntry {
                fingerprint: fingerprint.clone(),
                payload: seed.decision.clone(),
                origin: CacheOrigin::Apriori,
                confidence: 1.0,
                created_at: 0.0,
                last_accessed: 0.0,
            };
            if entries.insert(fingerprint.clone(), entry).is_some() {
                return Err(Error::seed(format!("duplicate apriori seed for {}", fingerprint)));
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&CacheEntry> {
        self.entries.get(fingerprint)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }
}

// ---------------------------------------------------------------------------
// KnowledgeCache
// ---------------------------------------------------------------------------

pub struct KnowledgeCache {
    apriori: AprioriStore,
    posteriori: BTreeMap<Fingerprint, CacheEntry>,
    config: CacheConfig,
}

impl KnowledgeCache {
    pub fn new(apriori: AprioriStore, config: CacheConfig) -> Self {
        Self { apriori, posteriori: BTreeMap::new(), config }
    }

    pub fn fingerprint(&self, stimulus: &Stimulus) -> std::result::Result<Fingerprint, ValidationError> {
        Fingerprint::of(stimulus, self.config.quantum)
    }

    /// Apriori first, then posteriori.
    pub fn lookup(&mut self, fingerprint: &Fingerprint, now: f64) -> Option<CacheHit> {
        self.lookup_apriori(fingerprint)
            .or_else(|| self.lookup_posteriori(fingerprint, now))
    }

    pub fn lookup_apriori(&self, fingerprint: &Fingerprint) -> Option<CacheHit> {
        self.apriori.get(fingerprint).map(|entry| CacheHit {
            origin: CacheOrigin::Apriori,
            payload: entry.payload.clone(),
            confidence: entry.confidence,
        })
    }

    /// A stale entry is evicted and reported as a miss.
    pub fn lookup_posteriori(&mut self, fingerprint: &Fingerprint, now: f64) -> Option<CacheHit> {
        let entry = self.posteriori.get_mut(fingerprint)?;
        let confidence = entry.decayed_confidence(now, self.config.decay_rate);
        if confidence < self.config.confidence_floor {
            debug!(%fingerprint, confidence, "Evicting stale posteriori entry");
            self.posteriori.remove(fingerprint);
            return None;
        }
        entry.last_accessed = entry.last_accessed.max(now);
        Some(CacheHit {
            origin: CacheOrigin::Posteriori,
            payload: entry.payload.clone(),
            confidence,
        })
    }

    /// Store a synthesized decision. Returns false when refused: the
    /// fingerprint belongs to apriori, or the confidence is under the floor.
    pub fn insert(&mut self, fingerprint: Fingerprint, payload: ModePayload, confidence: f64, now: f64) -> bool {
        if self.apriori.contains(&fingerprint) {
            warn!(%fingerprint, "Refusing posteriori write over an apriori fingerprint");
            return false;
        }
        if !(confidence >= self.config.confidence_floor) {
            debug!(%fingerprint, confidence, "Not caching low-confidence decision");
            return false;
        }

        self.posteriori.insert(
            fingerprint.clone(),
            CacheEntry {
                fingerprint,
                payload,
                origin: CacheOrigin::Posteriori,
                confidence,
                created_at: now,
                last_accessed: now,
            },
        );
        self.sweep(now);
        self.enforce_capacity(now);
        true
    }

    /// Drop every posteriori entry whose decayed confidence is under the floor.
    pub fn sweep(&mut self, now: f64) {
        let (rate, floor) = (self.config.decay_rate, self.config.confidence_floor);
        self.posteriori.retain(|_, e| e.decayed_confidence(now, rate) >= floor);
    }

    fn enforce_capacity(&mut self, now: f64) {
        let rate = self.config.decay_rate;
        while self.posteriori.len() > self.config.capacity {
            let victim = self
                .posteriori
                .values()
                .min_by(|a, b| eviction_order(a, b, now, rate))
                .map(|e| e.fingerprint.clone());
            match victim {
                Some(fp) => {
                    debug!(fingerprint = %fp, "Evicting posteriori entry over capacity");
                    self.posteriori.remove(&fp);
                }
                None => break,
            }
        }
    }

    /// Empty posteriori. Apriori is untouched.
    pub fn clear_posteriori(&mut self) {
        self.posteriori.clear();
    }

    pub fn posteriori_len(&self) -> usize {
        self.posteriori.len()
    }

    pub fn posteriori_entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.posteriori.values()
    }

    pub fn apriori(&self) -> &AprioriStore {
        &self.apriori
    }
}

/// Lowest decayed confidence first, then least recently accessed, then key.
fn eviction_order(a: &CacheEntry, b: &CacheEntry, now: f64, rate: f64) -> Ordering {
    a.decayed_confidence(now, rate)
        .total_cmp(&b.decayed_confidence(now, rate))
        .then(a.last_accessed.total_cmp(&b.last_accessed))
        .then_with(|| a.fingerprint.cmp(&b.fingerprint))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CacheConfig {
        CacheConfig { quantum: 1.0, decay_rate: 0.1, confidence_floor: 0.3, capacity: 2 }
    }

    fn fp(x: f64) -> Fingerprint {
        Fingerprint::new(StimulusKind::CursorMovement, Vec2::new(x, 0.0), None, 1.0).unwrap()
    }

    fn habit(x: f64) -> ModePayload {
        ModePayload::Habit { predicted_position: Vec2::new(x, 0.0), confidence: 0.9 }
    }

    #[test]
    fn quantization_groups_nearby_positions() {
        let a = Fingerprint::new(StimulusKind::CursorMovement, Vec2::new(10.2, 5.9), Some("nav"), 1.0).unwrap();
        let b = Fingerprint::new(StimulusKind::CursorMovement, Vec2::new(10.8, 5.1), Some("nav"), 1.0).unwrap();
        let c = Fingerprint::new(StimulusKind::CursorMovement, Vec2::new(10.8, 5.1), None, 1.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "cursor_movement@(10,5)#nav");
    }

    #[test]
    fn positions_beyond_the_key_range_are_rejected() {
        let far = Fingerprint::new(StimulusKind::CursorMovement, Vec2::new(1e300, 0.0), None, 1.0);
        assert_eq!(far.unwrap_err(), ValidationError::OutOfRange { field: "coordinates" });
        let far_negative = Fingerprint::new(StimulusKind::CursorMovement, Vec2::new(0.0, -1e19), None, 1.0);
        assert!(far_negative.is_err());
        // Small quantum pushes an ordinary coordinate out of range too.
        assert!(Fingerprint::new(StimulusKind::CursorMovement, Vec2::new(1e10, 0.0), None, 1e-10).is_err());
        assert!(Fingerprint::new(StimulusKind::CursorMovement, Vec2::new(-1e15, 1e15), None, 1.0).is_ok());
    }

    #[test]
    fn partitions_can_be_queried_separately() {
        let seeds = vec![AprioriSeed {
            kind: StimulusKind::CursorMovement,
            position: Vec2::new(1.0, 0.0),
            intent: None,
            decision: ModePayload::Guard { explanation: "innate".into(), violated_rule: None },
        }];
        let mut cache = KnowledgeCache::new(AprioriStore::from_seeds(&seeds, 1.0).unwrap(), config());
        cache.insert(fp(2.0), habit(2.0), 0.9, 0.0);

        assert!(cache.lookup_apriori(&fp(1.0)).is_some());
        assert!(cache.lookup_apriori(&fp(2.0)).is_none());
        assert!(cache.lookup_posteriori(&fp(1.0), 0.0).is_none());
        assert_eq!(cache.lookup_posteriori(&fp(2.0), 0.0).unwrap().origin, CacheOrigin::Posteriori);
    }

    #[test]
    fn decayed_entry_is_evicted_on_lookup() {
        let mut cache = KnowledgeCache::new(AprioriStore::default(), config());
        assert!(cache.insert(fp(1.0), habit(1.0), 0.5, 0.0));
        assert!(cache.lookup(&fp(1.0), 1.0).is_some());
        // 0.5 * e^(-0.1 * 11) ≈ 0.17 < 0.3
        assert!(cache.lookup(&fp(1.0), 11.0).is_none());
        assert_eq!(cache.posteriori_len(), 0);
    }

    #[test]
    fn low_confidence_is_not_cached() {
        let mut cache = KnowledgeCache::new(AprioriStore::default(), config());
        assert!(!cache.insert(fp(1.0), habit(1.0), 0.1, 0.0));
        assert_eq!(cache.posteriori_len(), 0);
    }

    #[test]
    fn capacity_evicts_least_confident_first() {
        let mut cache = KnowledgeCache::new(AprioriStore::default(), config());
        cache.insert(fp(1.0), habit(1.0), 0.9, 0.0);
        cache.insert(fp(2.0), habit(2.0), 0.4, 0.0);
        cache.insert(fp(3.0), habit(3.0), 0.8, 0.0);
        assert_eq!(cache.posteriori_len(), 2);
        assert!(cache.lookup(&fp(2.0), 0.0).is_none());
        assert!(cache.lookup(&fp(1.0), 0.0).is_some());
        assert!(cache.lookup(&fp(3.0), 0.0).is_some());
    }

    #[test]
    fn apriori_shadows_posteriori_and_refuses_writes() {
        let seeds = vec![AprioriSeed {
            kind: StimulusKind::CursorMovement,
            position: Vec2::new(1.0, 0.0),
            intent: None,
            decision: ModePayload::Guard { explanation: "innate".into(), violated_rule: None },
        }];
        let apriori = AprioriStore::from_seeds(&seeds, 1.0).unwrap();
        let mut cache = KnowledgeCache::new(apriori, config());

        assert!(!cache.insert(fp(1.0), habit(1.0), 0.9, 0.0));
        let hit = cache.lookup(&fp(1.0), 0.0).unwrap();
        assert_eq!(hit.origin, CacheOrigin::Apriori);
        assert!(matches!(hit.payload, ModePayload::Guard { .. }));
    }

    #[test]
    fn duplicate_apriori_seeds_are_rejected() {
        let seed = AprioriSeed {
            kind: StimulusKind::CursorMovement,
            position: Vec2::new(1.0, 0.0),
            intent: None,
            decision: ModePayload::Guard { explanation: "x".into(), violated_rule: None },
        };
        assert!(AprioriStore::from_seeds(&[seed.clone(), seed], 1.0).is_err());
    }

    #[test]
    fn clear_posteriori_keeps_apriori() {
        let seeds = vec![AprioriSeed {
            kind: StimulusKind::Gesture,
            position: Vec2::new(5.0, 5.0),
            intent: None,
            decision: ModePayload::Guard { explanation: "innate".into(), violated_rule: None },
        }];
        let mut cache = KnowledgeCache::new(AprioriStore::from_seeds(&seeds, 1.0).unwrap(), config());
        cache.insert(fp(1.0), habit(1.0), 0.9, 0.0);
        cache.clear_posteriori();
        assert_eq!(cache.posteriori_len(), 0);
        assert_eq!(cache.apriori().len(), 1);
    }
}
