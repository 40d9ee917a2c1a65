// src/patch.rs
//
// The patch application surface. The rendering collaborator consumes ordered
// lists of path-addressed operations; implementations must stay safe under
// reapplication of the same patch set, since a race between a cache hit and
// an authoritative arrival can deliver the same patches twice.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One DOM operation: an op applied at a child-index path with an optional
/// value payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    /// Child indices from the component root down to the target node.
    pub path: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    /// Replace the text content of the node at `path`.
    SetText,
    /// Merge properties into the node at `path`.
    SetProps,
    /// Remove the node at `path`.
    Remove,
}

impl Patch {
    pub fn set_text(path: Vec<usize>, content: &str) -> Self {
        Self {
            op: PatchOp::SetText,
            path,
            value: Some(serde_json::json!(content)),
        }
    }

    pub fn set_props(path: Vec<usize>, props: serde_json::Value) -> Self {
        Self {
            op: PatchOp::SetProps,
            path,
            value: Some(props),
        }
    }

    pub fn remove(path: Vec<usize>) -> Self {
        Self {
            op: PatchOp::Remove,
            path,
            value: None,
        }
    }
}

/// Applies ordered patch lists to the live UI. Must be idempotent-safe:
/// applying the same list twice leaves the same final state.
pub trait PatchApplier: Send {
    fn apply(&mut self, patches: &[Patch]) -> Result<()>;
}

/// Path-keyed applier used by tests and headless embeddings. Each operation
/// writes an absolute value at its path, which makes reapplication a no-op
/// by construction.
#[derive(Default)]
pub struct MapPatchApplier {
    texts: HashMap<Vec<usize>, String>,
    props: HashMap<Vec<usize>, serde_json::Value>,
    removed: HashMap<Vec<usize>, bool>,
    pub applied_batches: usize,
}

impl MapPatchApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_at(&self, path: &[usize]) -> Option<&str> {
        self.texts.get(path).map(|s| s.as_str())
    }

    pub fn is_removed(&self, path: &[usize]) -> bool {
        self.removed.get(path).copied().unwrap_or(false)
    }
}

impl PatchApplier for MapPatchApplier {
    fn apply(&mut self, patches: &[Patch]) -> Result<()> {
        for patch in patches {
            match patch.op {
                PatchOp::SetText => {
                    let content = patch
                        .value
                        .as_ref()
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    self.texts.insert(patch.path.clone(), content);
                }
                PatchOp::SetProps => {
                    if let Some(value) = &patch.value {
                        self.props.insert(patch.path.clone(), value.clone());
                    }
                }
                PatchOp::Remove => {
                    self.removed.insert(patch.path.clone(), true);
                }
            }
        }
        self.applied_batches += 1;
        Ok(())
    }
}
