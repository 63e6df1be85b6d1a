//! Per-root lock state.
//!
//! A [`LockRecord`] holds every read and write grant issued for objects that
//! resolve to the same root, plus the tree-exclusive flag for that root. It is
//! a plain state machine: no I/O, no clock other than the grant timestamp, and
//! no knowledge of the table it lives in.

use crate::error::{Result, SceneLockError};
use crate::types::{ObjectId, Owner};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One lock slot for one object id in one mode.
#[derive(Debug, Clone)]
pub struct Grant {
    /// One entry per outstanding acquisition. Readers may repeat.
    owners: Vec<Owner>,
    /// When the grant was taken or last re-entered.
    timestamp: DateTime<Utc>,
}

impl Grant {
    fn new(owner: &str) -> Self {
        Self {
            owners: vec![owner.to_string()],
            timestamp: Utc::now(),
        }
    }

    fn acquire(&mut self, owner: &str) {
        self.owners.push(owner.to_string());
        self.timestamp = Utc::now();
    }

    /// Drop one acquisition by `owner`. Returns false if it holds none.
    fn release(&mut self, owner: &str) -> bool {
        match self.owners.iter().position(|o| o == owner) {
            Some(idx) => {
                self.owners.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Owners currently holding the grant, one entry per acquisition.
    pub fn owners(&self) -> &[Owner] {
        &self.owners
    }

    /// Number of outstanding acquisitions.
    pub fn count(&self) -> usize {
        self.owners.len()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_held_by(&self, owner: &str) -> bool {
        self.owners.iter().any(|o| o == owner)
    }
}

/// Lock state of a single root.
#[derive(Debug, Default)]
pub struct LockRecord {
    read: HashMap<ObjectId, Grant>,
    write: HashMap<ObjectId, Grant>,
    tree: bool,
}

impl LockRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a read grant on `object_id`.
    ///
    /// Denied while the root is tree-locked or the object is write-locked.
    /// Re-entrant: the same owner may read-lock an object several times and
    /// must unlock it as many times.
    pub fn read_lock(&mut self, object_id: &str, owner: &str) -> bool {
        if self.tree || self.write.contains_key(object_id) {
            return false;
        }

        match self.read.get_mut(object_id) {
            Some(grant) => grant.acquire(owner),
            None => {
                self.read.insert(object_id.to_string(), Grant::new(owner));
            }
        }
        true
    }

    /// Release one read acquisition of `object_id` held by `owner`.
    pub fn read_unlock(&mut self, object_id: &str, owner: &str) -> Result<()> {
        let grant = self
            .read
            .get_mut(object_id)
            .ok_or_else(|| SceneLockError::NotLocked {
                object_id: object_id.to_string(),
            })?;

        if !grant.release(owner) {
            return Err(SceneLockError::OwnerMismatch {
                object_id: object_id.to_string(),
                owner: owner.to_string(),
            });
        }

        if grant.count() == 0 {
            self.read.remove(object_id);
        }
        Ok(())
    }

    /// Take a write grant on `object_id`, optionally over the whole root.
    ///
    /// Denied while the root is tree-locked, or the object already has a
    /// write grant or any read grant. A tree lock additionally requires the
    /// record to be completely empty.
    pub fn write_lock(&mut self, object_id: &str, owner: &str, lock_tree: bool) -> bool {
        if self.tree || self.write.contains_key(object_id) || self.read.contains_key(object_id) {
            return false;
        }

        if lock_tree && !self.is_empty() {
            return false;
        }

        self.write.insert(object_id.to_string(), Grant::new(owner));
        self.tree = lock_tree;
        true
    }

    /// Release the write grant on `object_id` held by `owner`.
    ///
    /// The grant is left untouched when someone else holds it.
    pub fn write_unlock(&mut self, object_id: &str, owner: &str) -> Result<()> {
        let grant = self
            .write
            .get(object_id)
            .ok_or_else(|| SceneLockError::NotLocked {
                object_id: object_id.to_string(),
            })?;

        if !grant.is_held_by(owner) {
            return Err(SceneLockError::OwnerMismatch {
                object_id: object_id.to_string(),
                owner: owner.to_string(),
            });
        }

        self.write.remove(object_id);
        self.tree = false;
        Ok(())
    }

    /// Drop every acquisition held by `owner`. Returns how many were dropped.
    pub fn release_owner(&mut self, owner: &str) -> usize {
        let mut released = 0;

        self.read.retain(|_, grant| {
            let before = grant.count();
            grant.owners.retain(|o| o != owner);
            released += before - grant.count();
            grant.count() > 0
        });

        let before = self.write.len();
        self.write.retain(|_, grant| !grant.is_held_by(owner));
        let dropped_writes = before - self.write.len();
        if dropped_writes > 0 && self.write.is_empty() {
            self.tree = false;
        }

        released + dropped_writes
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty()
    }

    pub fn is_tree_locked(&self) -> bool {
        self.tree
    }

    pub fn read_grant(&self, object_id: &str) -> Option<&Grant> {
        self.read.get(object_id)
    }

    pub fn write_grant(&self, object_id: &str) -> Option<&Grant> {
        self.write.get(object_id)
    }
}
