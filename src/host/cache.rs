// src/host/cache.rs
//
// Prediction cache (hint queue). Maps a (owner, anticipated signal-state)
// signature to pre-computed patches so a forecast can be answered before the
// triggering event's round-trip completes. Matching is exact-signature only:
// serving a patch computed for different input is strictly worse than
// waiting for the authoritative result.

use crate::config::CacheConfig;
use crate::patch::Patch;
use crate::types::SignalState;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Deterministic cache key: owner identity plus the canonical rendering of
/// the full anticipated signal-state.
pub fn signature(owner_id: &str, anticipated: &SignalState) -> String {
    format!("{}::{}", owner_id, anticipated.canonical())
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub owner_id: String,
    pub patches: Vec<Patch>,
    pub confidence: f32,
    pub inserted_at: Instant,
    pub ttl: Duration,
    /// Monotonic insertion order, used for deterministic eviction.
    seq: u64,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

pub struct PredictionCache {
    entries: HashMap<String, CacheEntry>,
    config: CacheConfig,
    next_seq: u64,
}

impl PredictionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// O(1) probe. Returns the entry only while it is live; expired entries
    /// are dropped on the way out.
    pub fn lookup(&mut self, signature: &str) -> Option<&CacheEntry> {
        let now = Instant::now();
        let expired = self
            .entries
            .get(signature)
            .map_or(false, |entry| entry.expired(now));
        if expired {
            debug!("Cache entry expired: {}", signature);
            self.entries.remove(signature);
            return None;
        }
        self.entries.get(signature)
    }

    /// Insert or replace the entry for `signature`. Last write wins: a
    /// fresher result is always at least as correct as a stale one.
    pub fn insert(
        &mut self,
        signature: String,
        owner_id: &str,
        patches: Vec<Patch>,
        confidence: f32,
        ttl: Option<Duration>,
    ) {
        let ttl = ttl.unwrap_or(Duration::from_millis(self.config.default_ttl_ms));
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            signature,
            CacheEntry {
                owner_id: owner_id.to_string(),
                patches,
                confidence,
                inserted_at: Instant::now(),
                ttl,
                seq,
            },
        );
        self.enforce_capacity();
    }

    /// Remove one signature.
    pub fn invalidate(&mut self, signature: &str) -> bool {
        self.entries.remove(signature).is_some()
    }

    /// Remove every entry belonging to `owner_id`. Called whenever the
    /// owner's state changes for a reason unrelated to a prediction, so a
    /// patch computed against outdated context can never be served.
    pub fn invalidate_owner(&mut self, owner_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.owner_id != owner_id);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Invalidated {} cache entries for owner {}", removed, owner_id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn enforce_capacity(&mut self) {
        while self.entries.len() > self.config.max_entries {
            // Evict the oldest entry
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    debug!("Cache at capacity, evicting {}", key);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hover_state() -> SignalState {
        SignalState::new().with("hover", serde_json::json!(true))
    }

    fn cache() -> PredictionCache {
        PredictionCache::new(CacheConfig::default())
    }

    #[test]
    fn test_signature_is_deterministic_and_owner_scoped() {
        let a = signature("counter-1", &hover_state());
        let b = signature("counter-1", &hover_state());
        let c = signature("counter-2", &hover_state());
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Differing anticipated state never collides
        let d = signature(
            "counter-1",
            &hover_state().with("count", serde_json::json!(1)),
        );
        assert_ne!(a, d);
    }

    #[test]
    fn test_lookup_after_insert_returns_exact_patches() {
        let mut cache = cache();
        let sig = signature("owner", &hover_state());
        let patches = vec![Patch::set_text(vec![0], "hovered")];
        cache.insert(sig.clone(), "owner", patches.clone(), 0.9, None);

        let entry = cache.lookup(&sig).unwrap();
        assert_eq!(entry.patches, patches);
        assert_eq!(entry.confidence, 0.9);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let mut cache = cache();
        let sig = signature("owner", &hover_state());
        cache.insert(
            sig.clone(),
            "owner",
            vec![Patch::set_text(vec![0], "x")],
            0.9,
            Some(Duration::from_millis(0)),
        );
        assert!(cache.lookup(&sig).is_none());
        assert!(cache.is_empty(), "expired entry dropped on lookup");
    }

    #[test]
    fn test_insert_replaces_previous_entry() {
        let mut cache = cache();
        let sig = signature("owner", &hover_state());
        cache.insert(sig.clone(), "owner", vec![Patch::set_text(vec![0], "old")], 0.5, None);
        cache.insert(sig.clone(), "owner", vec![Patch::set_text(vec![0], "new")], 0.8, None);
        assert_eq!(cache.len(), 1);
        let entry = cache.lookup(&sig).unwrap();
        assert_eq!(entry.patches[0], Patch::set_text(vec![0], "new"));
    }

    #[test]
    fn test_invalidate_owner_removes_all_of_owner() {
        let mut cache = cache();
        let sig_a = signature("a", &hover_state());
        let sig_a2 = signature("a", &hover_state().with("count", serde_json::json!(2)));
        let sig_b = signature("b", &hover_state());
        cache.insert(sig_a.clone(), "a", vec![], 0.9, None);
        cache.insert(sig_a2.clone(), "a", vec![], 0.9, None);
        cache.insert(sig_b.clone(), "b", vec![], 0.9, None);

        assert_eq!(cache.invalidate_owner("a"), 2);
        assert!(cache.lookup(&sig_a).is_none());
        assert!(cache.lookup(&sig_a2).is_none());
        assert!(cache.lookup(&sig_b).is_some());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut config = CacheConfig::default();
        config.max_entries = 2;
        let mut cache = PredictionCache::new(config);

        for i in 0..3 {
            let state = SignalState::new().with("count", serde_json::json!(i));
            cache.insert(signature("o", &state), "o", vec![], 0.9, None);
        }
        assert_eq!(cache.len(), 2);
        // The first insert is gone, the latest survives
        let first = signature("o", &SignalState::new().with("count", serde_json::json!(0)));
        let last = signature("o", &SignalState::new().with("count", serde_json::json!(2)));
        assert!(cache.lookup(&first).is_none());
        assert!(cache.lookup(&last).is_some());
    }
}
