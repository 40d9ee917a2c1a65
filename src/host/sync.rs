// src/host/sync.rs
//
// State synchronization bridge. Every patch application — speculative or
// authoritative — lands its resulting signal values here, which mirrors them
// locally and pushes them to the authoritative side so the next authoritative
// computation runs against up-to-date inputs instead of overwriting the
// speculative state with stale output.
//
// The push is fire-and-forget from the UI's perspective, but a region is not
// considered settled until an acknowledgment (or a bounded timeout) has been
// observed. A failed push is retried exactly once, then logged and dropped;
// the next authoritative render restores correctness either way.

use crate::config::SyncConfig;
use crate::types::SignalState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// One signal value pushed to the authoritative side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncDelta {
    /// Correlation id echoed back in the acknowledgment.
    pub push_id: Uuid,
    pub owner_id: String,
    pub signal_key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAck {
    pub push_id: Uuid,
    pub accepted: bool,
}

/// Transport seam to the authoritative collaborator.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn push(&self, delta: &SyncDelta) -> Result<SyncAck>;
}

/// Settle state of one owner's mirrored signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleState {
    /// No unacknowledged pushes outstanding.
    Settled,
    /// A push is in flight.
    Pending,
    /// A push was dropped after retry; the mirror is ahead of the
    /// authoritative side until the next authoritative render.
    Unsettled,
}

pub struct StateSyncBridge {
    transport: Arc<dyn SyncTransport>,
    config: SyncConfig,
    snapshots: HashMap<String, SignalState>,
    settle: HashMap<String, SettleState>,
}

impl StateSyncBridge {
    pub fn new(transport: Arc<dyn SyncTransport>, config: SyncConfig) -> Self {
        Self {
            transport,
            config,
            snapshots: HashMap::new(),
            settle: HashMap::new(),
        }
    }

    /// Last known signal values for an owner.
    pub fn snapshot(&self, owner_id: &str) -> Option<&SignalState> {
        self.snapshots.get(owner_id)
    }

    pub fn settle_state(&self, owner_id: &str) -> SettleState {
        self.settle
            .get(owner_id)
            .copied()
            .unwrap_or(SettleState::Settled)
    }

    /// Record the signal values resulting from a patch application and push
    /// them to the authoritative side. The local mirror is updated first so
    /// a read during the push already sees the applied state.
    pub async fn record_application(&mut self, owner_id: &str, changes: &SignalState) {
        let snapshot = self.snapshots.entry(owner_id.to_string()).or_default();
        for (key, value) in &changes.0 {
            snapshot.0.insert(key.clone(), value.clone());
        }

        self.settle
            .insert(owner_id.to_string(), SettleState::Pending);

        let mut all_acknowledged = true;
        for (key, value) in &changes.0 {
            let delta = SyncDelta {
                push_id: Uuid::new_v4(),
                owner_id: owner_id.to_string(),
                signal_key: key.clone(),
                value: value.clone(),
            };
            if !self.push_with_retry(&delta).await {
                all_acknowledged = false;
            }
        }

        let state = if all_acknowledged {
            SettleState::Settled
        } else {
            SettleState::Unsettled
        };
        self.settle.insert(owner_id.to_string(), state);
    }

    /// Forget an owner entirely (e.g. on unmount).
    pub fn forget_owner(&mut self, owner_id: &str) {
        self.snapshots.remove(owner_id);
        self.settle.remove(owner_id);
    }

    /// One attempt plus one retry, each bounded by the ack timeout.
    async fn push_with_retry(&self, delta: &SyncDelta) -> bool {
        let timeout = Duration::from_millis(self.config.ack_timeout_ms);

        for attempt in 0..2 {
            match tokio::time::timeout(timeout, self.transport.push(delta)).await {
                Ok(Ok(ack)) if ack.accepted => {
                    debug!(
                        "Sync push acknowledged: {}::{} (attempt {})",
                        delta.owner_id,
                        delta.signal_key,
                        attempt + 1
                    );
                    return true;
                }
                Ok(Ok(_)) => {
                    warn!(
                        "Sync push rejected by authoritative side: {}::{}",
                        delta.owner_id, delta.signal_key
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        "Sync push failed: {}::{}: {}",
                        delta.owner_id, delta.signal_key, e
                    );
                }
                Err(_) => {
                    warn!(
                        "Sync push ack timed out after {}ms: {}::{}",
                        self.config.ack_timeout_ms, delta.owner_id, delta.signal_key
                    );
                }
            }
        }

        // The UI has already moved on; the next authoritative render will
        // reconverge the two sides.
        warn!(
            "Dropping sync push after retry: {}::{}",
            delta.owner_id, delta.signal_key
        );
        false
    }
}

/// HTTP transport to the authoritative endpoint.
pub struct HttpSyncTransport {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpSyncTransport {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.ack_timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl SyncTransport for HttpSyncTransport {
    async fn push(&self, delta: &SyncDelta) -> Result<SyncAck> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(delta)
            .send()
            .await
            .context("Sync request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Sync endpoint returned {}", response.status());
        }

        response
            .json::<SyncAck>()
            .await
            .context("Failed to parse sync acknowledgment")
    }
}
