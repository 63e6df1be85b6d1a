//! Hierarchical read/write locking for scenelock.
//!
//! Clients editing the same scene or project coordinate through a single
//! [`LockManager`]. Any number of clients may read an object at once; a write
//! grant is exclusive for its object; a tree grant is exclusive for the whole
//! root the object belongs to.
//!
//! ```text
//!   RPC handler
//!        |
//!   scoped::acquire  (optional: several ids, all-or-nothing, retried)
//!        |
//!   LockManager ---- RootResolver (object id -> root id)
//!        |
//!   LockRecord of the root (read / write / tree)
//! ```

mod manager;
mod record;
mod resolver;
pub mod scoped;

pub use manager::{LockManager, LockManagerStats};
pub use record::{Grant, LockRecord};
pub use resolver::{DocumentBinding, RootResolver};
pub use scoped::{acquire, with_locks, with_read_lock, with_write_lock, ScopedLock};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Lock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Shared lock (multiple readers).
    Read,
    /// Exclusive lock on a single object.
    Write,
    /// Exclusive lock on the object's whole root.
    Tree,
}

impl LockMode {
    /// Attempt a single grant in this mode.
    pub fn acquire(self, manager: &LockManager, object_id: &str, owner: &str) -> Result<bool> {
        match self {
            LockMode::Read => manager.read_lock(object_id, owner),
            LockMode::Write => manager.write_lock(object_id, owner, false),
            LockMode::Tree => manager.write_lock(object_id, owner, true),
        }
    }

    /// Release a single grant taken in this mode.
    pub fn release(self, manager: &LockManager, object_id: &str, owner: &str) -> Result<()> {
        match self {
            LockMode::Read => manager.read_unlock(object_id, owner),
            LockMode::Write | LockMode::Tree => manager.write_unlock(object_id, owner),
        }
    }
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockMode::Read => write!(f, "read"),
            LockMode::Write => write!(f, "write"),
            LockMode::Tree => write!(f, "tree"),
        }
    }
}
