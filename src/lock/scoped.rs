//! Scoped, all-or-nothing acquisition of several locks.
//!
//! One attempt walks the ids in order and takes each lock. If any of them is
//! denied, everything taken so far in that attempt is released again before
//! the attempt fails, so a failed attempt never leaves grants behind. Attempts
//! are retried with [`retry`](crate::resilience::retry) while the failure is a
//! plain [`SceneLockError::LockingFailed`].
//!
//! A successful acquisition yields a [`ScopedLock`]. Its locks are released
//! exactly once: by [`ScopedLock::release`], or on drop, which also covers a
//! caller whose future is cancelled mid-way. Lock manager calls never await,
//! so the release in `Drop` is complete when `drop` returns.

use super::{LockManager, LockMode};
use crate::error::{Result, SceneLockError};
use crate::resilience::{retry, RetryConfig};
use crate::types::{ObjectIds, Owner};
use std::future::{ready, Future};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Locks held for a scope. Released on [`release`](Self::release) or drop.
#[must_use = "dropping a ScopedLock releases its locks immediately"]
pub struct ScopedLock {
    manager: Arc<LockManager>,
    ids: ObjectIds,
    owner: Owner,
    mode: LockMode,
    released: bool,
}

impl ScopedLock {
    pub fn ids(&self) -> &ObjectIds {
        &self.ids
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Release every lock of the scope, reporting all failed releases.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        release_all(&self.manager, &self.ids, &self.owner, self.mode)
    }

    /// Keep the locks held past the scope. The caller becomes responsible
    /// for unlocking them through the manager.
    pub fn detach(mut self) -> ObjectIds {
        self.released = true;
        self.ids.clone()
    }
}

impl Drop for ScopedLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = release_all(&self.manager, &self.ids, &self.owner, self.mode) {
            error!(
                owner = %self.owner,
                ids = %self.ids,
                error = %e,
                "Failed to release scoped locks on drop"
            );
        }
    }
}

impl std::fmt::Debug for ScopedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedLock")
            .field("ids", &self.ids)
            .field("owner", &self.owner)
            .field("mode", &self.mode)
            .field("released", &self.released)
            .finish()
    }
}

/// Acquire `ids` in `mode` for `owner`, retrying contention per
/// `retry_config`.
pub async fn acquire(
    manager: &Arc<LockManager>,
    ids: impl Into<ObjectIds>,
    owner: impl Into<Owner>,
    mode: LockMode,
    retry_config: &RetryConfig,
) -> Result<ScopedLock> {
    let ids = ids.into();
    let owner = owner.into();

    retry(
        || ready(try_acquire_all(manager, &ids, &owner, mode)),
        SceneLockError::is_retryable,
        retry_config.max_attempts,
        retry_config.delay,
    )
    .await?;

    debug!(owner = %owner, ids = %ids, mode = %mode, "Scoped locks acquired");
    Ok(ScopedLock {
        manager: Arc::clone(manager),
        ids,
        owner,
        mode,
        released: false,
    })
}

/// Run `body` while holding `ids` in `mode`, releasing them afterwards
/// whatever the outcome.
///
/// A failed release fails the call even when `body` succeeded. If both fail,
/// the release failures are attached to the body's error.
pub async fn with_locks<F, Fut, T>(
    manager: &Arc<LockManager>,
    ids: impl Into<ObjectIds>,
    owner: impl Into<Owner>,
    mode: LockMode,
    retry_config: &RetryConfig,
    body: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let scope = acquire(manager, ids, owner, mode, retry_config).await?;
    let outcome = body().await;
    let released = scope.release();

    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            warn!(error = %release_err, cause = %e, "Release failed after a failed critical section");
            let failures = match release_err {
                SceneLockError::ReleaseFailed(failures) => failures,
                other => vec![other],
            };
            Err(SceneLockError::RollbackFailed {
                cause: Box::new(e),
                failures,
            })
        }
    }
}

/// [`with_locks`] in [`LockMode::Write`].
pub async fn with_write_lock<F, Fut, T>(
    manager: &Arc<LockManager>,
    ids: impl Into<ObjectIds>,
    owner: impl Into<Owner>,
    retry_config: &RetryConfig,
    body: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_locks(manager, ids, owner, LockMode::Write, retry_config, body).await
}

/// [`with_locks`] in [`LockMode::Read`].
pub async fn with_read_lock<F, Fut, T>(
    manager: &Arc<LockManager>,
    ids: impl Into<ObjectIds>,
    owner: impl Into<Owner>,
    retry_config: &RetryConfig,
    body: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_locks(manager, ids, owner, LockMode::Read, retry_config, body).await
}

/// One all-or-nothing attempt.
fn try_acquire_all(
    manager: &LockManager,
    ids: &ObjectIds,
    owner: &str,
    mode: LockMode,
) -> Result<()> {
    let mut acquired: Vec<&str> = Vec::with_capacity(ids.len());

    for object_id in ids {
        let cause = match mode.acquire(manager, object_id, owner) {
            Ok(true) => {
                acquired.push(object_id);
                continue;
            }
            Ok(false) => SceneLockError::LockingFailed {
                object_id: object_id.clone(),
            },
            Err(e) => e,
        };
        return Err(rollback(manager, &acquired, owner, mode, cause));
    }

    Ok(())
}

/// Release `acquired` after a failed attempt. Every release is attempted;
/// failures are attached to the returned error.
fn rollback(
    manager: &LockManager,
    acquired: &[&str],
    owner: &str,
    mode: LockMode,
    cause: SceneLockError,
) -> SceneLockError {
    let failures: Vec<SceneLockError> = acquired
        .iter()
        .rev()
        .filter_map(|object_id| mode.release(manager, object_id, owner).err())
        .collect();

    if failures.is_empty() {
        return cause;
    }

    warn!(
        owner,
        failed = failures.len(),
        cause = %cause,
        "Rollback of partial acquisition failed"
    );
    SceneLockError::RollbackFailed {
        cause: Box::new(cause),
        failures,
    }
}

fn release_all(manager: &LockManager, ids: &ObjectIds, owner: &str, mode: LockMode) -> Result<()> {
    let failures: Vec<SceneLockError> = ids
        .iter()
        .filter_map(|object_id| mode.release(manager, object_id, owner).err())
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(SceneLockError::ReleaseFailed(failures))
    }
}
