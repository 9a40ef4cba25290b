//! Latest published problem part per device.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::devices::{DeviceId, ProblemPart};

/// Immutable view of the registry at one point in time.
pub type PartSnapshot = Arc<BTreeMap<DeviceId, Arc<ProblemPart>>>;

/// Copy-on-write map from device id to its most recent part.
///
/// Publishing never waits for a running optimization: writers swap in a
/// new map, readers keep whatever snapshot they already hold.
#[derive(Debug, Default)]
pub struct PartRegistry {
    parts: RwLock<PartSnapshot>,
    forced: AtomicBool,
}

impl PartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the part of its device. A part asking for a reschedule
    /// raises the forced flag until [`take_forced`](Self::take_forced).
    pub fn publish(&self, part: ProblemPart) {
        if part.forces_reschedule() {
            self.forced.store(true, Ordering::SeqCst);
        }
        let id = part.device_id().clone();
        let mut guard = self.parts.write();
        Arc::make_mut(&mut guard).insert(id, Arc::new(part));
    }

    /// Drops a device. Returns whether it was registered.
    pub fn remove(&self, id: &DeviceId) -> bool {
        let mut guard = self.parts.write();
        if !guard.contains_key(id) {
            return false;
        }
        Arc::make_mut(&mut guard).remove(id).is_some()
    }

    pub fn snapshot(&self) -> PartSnapshot {
        Arc::clone(&self.parts.read())
    }

    pub fn len(&self) -> usize {
        self.parts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_forced(&self) -> bool {
        self.forced.load(Ordering::SeqCst)
    }

    /// Reads and clears the forced flag.
    pub fn take_forced(&self) -> bool {
        self.forced.swap(false, Ordering::SeqCst)
    }
}
