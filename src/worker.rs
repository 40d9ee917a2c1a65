// src/worker.rs
//
// Runs the confidence engine as an isolated, single-threaded cooperative
// task. The host talks to it exclusively through channels — no shared
// mutable state — and every message runs to completion before the next one
// is dequeued, so the engine itself needs no locking.

use crate::config::EngineConfig;
use crate::engine::ConfidenceEngine;
use crate::protocol::{EngineMessage, EngineOutput};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Inbound queue depth. Input events are small and frequent; the host
/// awaits on send, so a full queue applies backpressure upstream.
const INBOUND_CAPACITY: usize = 256;

/// Outbound queue depth. Emissions are best-effort: when the host falls
/// behind, predictions are dropped rather than stalling the engine.
const OUTBOUND_CAPACITY: usize = 64;

/// Host-side handle to a running engine task.
pub struct EngineHandle {
    tx: mpsc::Sender<EngineMessage>,
    pub outputs: mpsc::Receiver<EngineOutput>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// Send one message to the engine, awaiting if the queue is full.
    /// Returns false when the engine task has terminated.
    pub async fn send(&self, message: EngineMessage) -> bool {
        self.tx.send(message).await.is_ok()
    }

    /// Receive the next emission, `None` once the engine has terminated
    /// and the queue has drained.
    pub async fn recv(&mut self) -> Option<EngineOutput> {
        self.outputs.recv().await
    }

    /// Close the inbound channel and wait for the engine task to finish
    /// processing whatever is already queued.
    pub async fn shutdown(self) {
        drop(self.tx);
        let _ = self.task.await;
    }
}

/// Spawn the engine task and return the host handle.
pub fn spawn(config: EngineConfig) -> EngineHandle {
    let (in_tx, mut in_rx) = mpsc::channel::<EngineMessage>(INBOUND_CAPACITY);
    let (out_tx, out_rx) = mpsc::channel::<EngineOutput>(OUTBOUND_CAPACITY);

    let task = tokio::spawn(async move {
        let mut engine = ConfidenceEngine::new(config);
        while let Some(message) = in_rx.recv().await {
            for output in engine.handle(message) {
                // Never block the event loop on a slow host: prediction is
                // best-effort and stale forecasts are worthless anyway.
                match out_tx.try_send(output) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("Output queue full, dropping prediction");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!("Host closed output channel, stopping engine");
                        return;
                    }
                }
            }
        }
        debug!("Engine inbound channel closed, task exiting");
    });

    EngineHandle {
        tx: in_tx,
        outputs: out_rx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rect, WatchedSignals};

    #[tokio::test]
    async fn test_worker_end_to_end_hover() {
        let mut handle = spawn(EngineConfig::default());

        assert!(
            handle
                .send(EngineMessage::RegisterRegion {
                    owner_id: "owner".to_string(),
                    region_id: "target".to_string(),
                    bounds: Rect::new(100.0, 100.0, 50.0, 50.0),
                    watched: WatchedSignals::hover(),
                })
                .await
        );

        for i in 0..5 {
            let sent = handle
                .send(EngineMessage::PointerMove {
                    x: i as f32 * 8.0,
                    y: 125.0,
                    timestamp_ms: i as f64 * 16.0,
                })
                .await;
            assert!(sent);
        }

        // The engine emits as it processes; wait for the first prediction
        let output = tokio::time::timeout(std::time::Duration::from_secs(1), handle.recv())
            .await
            .expect("engine should emit within a second")
            .expect("engine alive");
        match output {
            EngineOutput::Prediction(p) => {
                assert_eq!(p.region_id, "target");
                assert!(p.confidence > 0.55);
            }
            other => panic!("expected prediction, got {:?}", other),
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_worker_malformed_wire_messages_are_dropped() {
        let mut handle = spawn(EngineConfig::default());

        // A wire boundary decodes and drops malformed payloads before the
        // channel; simulate that path end to end.
        for raw in ["garbage", "{\"kind\":\"nope\"}"] {
            if let Some(msg) = crate::protocol::decode_message(raw) {
                handle.send(msg).await;
            }
        }
        // Engine is still alive and processing well-formed traffic
        assert!(
            handle
                .send(EngineMessage::PointerMove {
                    x: 1.0,
                    y: 1.0,
                    timestamp_ms: 0.0,
                })
                .await
        );
        // No regions registered, so nothing was emitted
        assert!(handle.outputs.try_recv().is_err());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_worker_shutdown_terminates_task() {
        let handle = spawn(EngineConfig::default());
        // shutdown() awaits the task; completing proves the loop exited
        tokio::time::timeout(std::time::Duration::from_secs(1), handle.shutdown())
            .await
            .expect("engine task should exit after the channel closes");
    }
}
