use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;
use jobwatch_core::model::Snapshot;

/// Latest and previous snapshots. The poll cycle is the only writer; any
/// number of readers (UI, status endpoint) may hold the returned `Arc`s.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    slots: RwLock<Slots>,
}

#[derive(Debug, Default)]
struct Slots {
    current: Option<Arc<Snapshot>>,
    previous: Option<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the first successful fetch.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).current.clone()
    }

    pub fn previous(&self) -> Option<Arc<Snapshot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).previous.clone()
    }

    /// `(current, previous)` read under one lock.
    pub fn pair(&self) -> (Option<Arc<Snapshot>>, Option<Arc<Snapshot>>) {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        (slots.current.clone(), slots.previous.clone())
    }

    /// previous := current, current := `next`, in one step. Returns the new previous.
    pub fn replace(&self, next: impl Into<Arc<Snapshot>>) -> Option<Arc<Snapshot>> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let old = slots.current.replace(next.into());
        slots.previous = old.clone();
        old
    }

    /// Writes the current snapshot as pretty JSON. No-op before the first fetch.
    pub fn write_current(&self, path: &Path) -> anyhow::Result<bool> {
        let Some(current) = self.current() else {
            return Ok(false);
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = serde_json::to_vec_pretty(current.as_ref()).context("serialize snapshot")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(true)
    }
}
