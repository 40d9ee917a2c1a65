// src/host/speculation.rs
//
// Host control loop tying the pieces together: a PredictionRequest from the
// engine is answered from the prediction cache when possible, the cached
// patches are applied immediately, and the resulting state delta goes
// through the sync bridge before the region can be considered settled. On a
// miss the caller requests an authoritative computation and feeds the result
// back through `on_authoritative_result`, priming the cache for next time.

use crate::host::cache::{signature, PredictionCache};
use crate::host::metrics::HostMetrics;
use crate::host::sync::StateSyncBridge;
use crate::patch::{Patch, PatchApplier};
use crate::protocol::PredictionRequest;
use crate::types::SignalState;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SpeculationOutcome {
    /// Cache hit: patches applied speculatively, delta pushed.
    Applied {
        signature: String,
        patch_count: usize,
        confidence: f32,
    },
    /// Cache miss: the host should request an authoritative computation
    /// for this signature.
    Miss { signature: String },
}

pub struct SpeculationCoordinator<A: PatchApplier> {
    cache: PredictionCache,
    applier: A,
    bridge: StateSyncBridge,
    metrics: HostMetrics,
}

impl<A: PatchApplier> SpeculationCoordinator<A> {
    pub fn new(cache: PredictionCache, applier: A, bridge: StateSyncBridge) -> Self {
        Self {
            cache,
            applier,
            bridge,
            metrics: HostMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &HostMetrics {
        &self.metrics
    }

    pub fn applier(&self) -> &A {
        &self.applier
    }

    pub fn bridge(&self) -> &StateSyncBridge {
        &self.bridge
    }

    pub fn cache(&mut self) -> &mut PredictionCache {
        &mut self.cache
    }

    /// Handle one engine prediction.
    pub async fn on_prediction(&mut self, request: &PredictionRequest) -> SpeculationOutcome {
        self.metrics.inc(&self.metrics.predictions_received);
        let sig = signature(&request.owner_id, &request.observation);

        let entry = match self.cache.lookup(&sig) {
            Some(entry) => entry.clone(),
            None => {
                self.metrics.inc(&self.metrics.cache_misses);
                debug!("Speculation miss: {}", sig);
                return SpeculationOutcome::Miss { signature: sig };
            }
        };

        self.metrics.inc(&self.metrics.cache_hits);
        info!(
            "Speculation hit: {} ({} patches, conf {:.2})",
            sig,
            entry.patches.len(),
            entry.confidence
        );

        self.apply_and_sync(&request.owner_id, &entry.patches, &request.observation)
            .await;

        SpeculationOutcome::Applied {
            signature: sig,
            patch_count: entry.patches.len(),
            confidence: entry.confidence,
        }
    }

    /// Feed back an authoritative result: apply it, cache it under its
    /// signature for future predictions, and bridge the confirmed state.
    pub async fn on_authoritative_result(
        &mut self,
        owner_id: &str,
        observation: &SignalState,
        patches: Vec<Patch>,
        ttl: Option<Duration>,
    ) {
        let sig = signature(owner_id, observation);
        self.apply_and_sync(owner_id, &patches, observation).await;
        self.cache.insert(sig, owner_id, patches, 1.0, ttl);
    }

    /// Install a server-pushed hint: pre-computed patches for a state the
    /// server anticipates, cached without being applied.
    pub fn install_hint(
        &mut self,
        owner_id: &str,
        observation: &SignalState,
        patches: Vec<Patch>,
        confidence: f32,
        ttl: Option<Duration>,
    ) {
        let sig = signature(owner_id, observation);
        debug!("Hint installed: {} ({} patches)", sig, patches.len());
        self.cache.insert(sig, owner_id, patches, confidence, ttl);
    }

    /// The owner's authoritative state changed for a reason unrelated to any
    /// prediction: everything cached for it was computed against outdated
    /// context and must go.
    pub fn on_state_changed(&mut self, owner_id: &str) {
        let removed = self.cache.invalidate_owner(owner_id);
        for _ in 0..removed {
            self.metrics.inc(&self.metrics.invalidations);
        }
    }

    async fn apply_and_sync(&mut self, owner_id: &str, patches: &[Patch], delta: &SignalState) {
        if let Err(e) = self.applier.apply(patches) {
            // Best-effort: a failed speculative apply degrades to "no
            // speculation", never to a broken interaction
            warn!("Patch application failed for {}: {}", owner_id, e);
            return;
        }
        self.metrics.inc(&self.metrics.patches_applied);

        self.bridge.record_application(owner_id, delta).await;
        match self.bridge.settle_state(owner_id) {
            crate::host::sync::SettleState::Settled => {
                self.metrics.inc(&self.metrics.sync_settled)
            }
            _ => self.metrics.inc(&self.metrics.sync_unsettled),
        }
    }
}
