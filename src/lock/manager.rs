//! The lock manager.
//!
//! Owns the root id → [`LockRecord`] table for one editing session. Every call
//! resolves the object's root first, then performs its whole read-modify-write
//! of the table under a single synchronous mutex. Nothing inside the guard
//! awaits, so the guard can never be held across a suspension point.

use super::record::LockRecord;
use super::resolver::{DocumentBinding, RootResolver};
use crate::document::ActionPointLookup;
use crate::error::Result;
use crate::observability;
use crate::types::ObjectId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Lock statistics.
#[derive(Debug, Default)]
struct LockStats {
    granted: AtomicU64,
    denied: AtomicU64,
    released: AtomicU64,
}

/// Public lock statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockManagerStats {
    /// Total grants issued.
    pub granted: u64,
    /// Total requests denied.
    pub denied: u64,
    /// Total grants released.
    pub released: u64,
    /// Roots currently holding at least one grant.
    pub locked_roots: usize,
}

/// Hierarchical read/write lock manager.
#[derive(Debug, Default)]
pub struct LockManager {
    resolver: RootResolver,
    records: Mutex<HashMap<ObjectId, LockRecord>>,
    stats: LockStats,
}

impl LockManager {
    /// Create an unbound lock manager. Only sentinel ids can be locked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lock manager governing a scene.
    pub fn for_scene(scene_id: impl Into<ObjectId>) -> Self {
        Self::with_binding(DocumentBinding::Scene {
            scene_id: scene_id.into(),
        })
    }

    /// Create a lock manager governing a project.
    pub fn for_project(
        project_id: impl Into<ObjectId>,
        lookup: Arc<dyn ActionPointLookup>,
    ) -> Self {
        Self::with_binding(DocumentBinding::Project {
            project_id: project_id.into(),
            lookup,
        })
    }

    fn with_binding(binding: DocumentBinding) -> Self {
        Self {
            resolver: RootResolver::with_binding(binding),
            ..Default::default()
        }
    }

    pub fn binding(&self) -> &DocumentBinding {
        self.resolver.binding()
    }

    /// Root id whose record governs `object_id`.
    pub fn resolve_root(&self, object_id: &str) -> Result<ObjectId> {
        self.resolver.resolve(object_id)
    }

    /// Try to read-lock `object_id` for `owner`.
    pub fn read_lock(&self, object_id: &str, owner: &str) -> Result<bool> {
        let root_id = self.resolver.resolve(object_id)?;
        let locked = self.with_record(root_id, |record| record.read_lock(object_id, owner));
        self.record_attempt("read", object_id, owner, locked);
        Ok(locked)
    }

    /// Release one read acquisition of `object_id` held by `owner`.
    pub fn read_unlock(&self, object_id: &str, owner: &str) -> Result<()> {
        let root_id = self.resolver.resolve(object_id)?;
        self.with_record(root_id, |record| record.read_unlock(object_id, owner))?;
        self.record_release("read", object_id, owner, 1);
        Ok(())
    }

    /// Try to write-lock `object_id` for `owner`. With `lock_tree` the grant
    /// covers the object's whole root.
    pub fn write_lock(&self, object_id: &str, owner: &str, lock_tree: bool) -> Result<bool> {
        let root_id = self.resolver.resolve(object_id)?;
        let locked =
            self.with_record(root_id, |record| record.write_lock(object_id, owner, lock_tree));
        self.record_attempt(if lock_tree { "tree" } else { "write" }, object_id, owner, locked);
        Ok(locked)
    }

    /// Release the write grant on `object_id` held by `owner`.
    pub fn write_unlock(&self, object_id: &str, owner: &str) -> Result<()> {
        let root_id = self.resolver.resolve(object_id)?;
        self.with_record(root_id, |record| record.write_unlock(object_id, owner))?;
        self.record_release("write", object_id, owner, 1);
        Ok(())
    }

    /// Does `owner` hold a read grant on `object_id`?
    pub fn is_read_locked(&self, object_id: &str, owner: &str) -> Result<bool> {
        let root_id = self.resolver.resolve(object_id)?;
        let records = self.records.lock();
        Ok(records
            .get(&root_id)
            .and_then(|record| record.read_grant(object_id))
            .is_some_and(|grant| grant.is_held_by(owner)))
    }

    /// Does `owner` hold the write grant on `object_id`?
    pub fn is_write_locked(&self, object_id: &str, owner: &str) -> Result<bool> {
        let root_id = self.resolver.resolve(object_id)?;
        let records = self.records.lock();
        Ok(records
            .get(&root_id)
            .and_then(|record| record.write_grant(object_id))
            .is_some_and(|grant| grant.is_held_by(owner)))
    }

    /// Is the root governing `object_id` tree-locked?
    pub fn is_tree_locked(&self, object_id: &str) -> Result<bool> {
        let root_id = self.resolver.resolve(object_id)?;
        let records = self.records.lock();
        Ok(records
            .get(&root_id)
            .is_some_and(LockRecord::is_tree_locked))
    }

    /// Number of roots with at least one outstanding grant.
    pub fn locked_root_count(&self) -> usize {
        self.records.lock().len()
    }

    /// Drop every grant held by `owner`, e.g. when its client disconnects.
    pub fn release_owner(&self, owner: &str) -> usize {
        let released = {
            let mut records = self.records.lock();
            let mut released = 0;
            records.retain(|_, record| {
                released += record.release_owner(owner);
                !record.is_empty()
            });
            released
        };

        if released > 0 {
            self.record_release("any", "*", owner, released as u64);
        }
        released
    }

    /// Get lock statistics.
    pub fn stats(&self) -> LockManagerStats {
        LockManagerStats {
            granted: self.stats.granted.load(Ordering::Relaxed),
            denied: self.stats.denied.load(Ordering::Relaxed),
            released: self.stats.released.load(Ordering::Relaxed),
            locked_roots: self.locked_root_count(),
        }
    }

    /// Run `f` on the record of `root_id` under the guard, creating the
    /// record on demand and dropping it again if it ends up empty.
    fn with_record<T>(&self, root_id: ObjectId, f: impl FnOnce(&mut LockRecord) -> T) -> T {
        let mut records = self.records.lock();
        let record = records.entry(root_id.clone()).or_default();
        let out = f(record);
        if record.is_empty() {
            records.remove(&root_id);
        }
        out
    }

    fn record_attempt(&self, mode: &'static str, object_id: &str, owner: &str, locked: bool) {
        if locked {
            self.stats.granted.fetch_add(1, Ordering::Relaxed);
            observability::record_lock_granted(mode);
            debug!(mode, object_id, owner, "Lock granted");
        } else {
            self.stats.denied.fetch_add(1, Ordering::Relaxed);
            observability::record_lock_denied(mode);
            debug!(mode, object_id, owner, "Lock denied");
        }
        observability::update_locked_roots(self.locked_root_count());
    }

    fn record_release(&self, mode: &'static str, object_id: &str, owner: &str, count: u64) {
        self.stats.released.fetch_add(count, Ordering::Relaxed);
        observability::record_lock_released(mode, count);
        observability::update_locked_roots(self.locked_root_count());
        debug!(mode, object_id, owner, count, "Lock released");
    }
}
