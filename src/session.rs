//! Editing state and per-client sessions.
//!
//! [`EditorState`] is the shared context of one server: which scene or
//! project is open, and the [`LockManager`] governing it. Opening a document
//! starts a fresh manager bound to it; closing drops it again. A [`Session`]
//! pairs that state with the owner name of one connected client.
//!
//! [`Precondition`]s are checked before an operation runs and take no locks.

use crate::document::{CachedProject, Project, Scene};
use crate::error::{Result, SceneLockError};
use crate::lock::{self, LockManager, LockMode, ScopedLock};
use crate::resilience::RetryConfig;
use crate::types::{ObjectId, ObjectIds, Owner};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Editing-state guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// No scene is open.
    NoScene,
    /// A scene with a valid id is open.
    SceneNeeded,
    /// No project is open.
    NoProject,
    /// A project with a valid id is open.
    ProjectNeeded,
    /// A scene or a project is open.
    DocumentNeeded,
}

impl Precondition {
    /// Check the guard against `state`.
    pub fn check(self, state: &EditorState) -> Result<()> {
        self.check_document(&state.document.read())
    }

    fn check_document(self, document: &OpenDocument) -> Result<()> {
        let violated = match self {
            Precondition::NoScene => document.scene.is_some(),
            Precondition::SceneNeeded => !document.scene.as_ref().is_some_and(|s| !s.id.is_empty()),
            Precondition::NoProject => document.project.is_some(),
            Precondition::ProjectNeeded => {
                !document.project.as_ref().is_some_and(|p| !p.id().is_empty())
            }
            Precondition::DocumentNeeded => document.scene.is_none() && document.project.is_none(),
        };

        if violated {
            Err(SceneLockError::Precondition(self.message().to_string()))
        } else {
            Ok(())
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Precondition::NoScene => "Scene has to be closed first.",
            Precondition::SceneNeeded => "Scene not opened or has invalid id.",
            Precondition::NoProject => "Not available during project editing.",
            Precondition::ProjectNeeded => "Project not opened or has invalid id.",
            Precondition::DocumentNeeded => "Scene or project has to be opened first.",
        }
    }
}

/// Run `op` only if every precondition holds.
pub async fn guarded<F, Fut, T>(
    state: &EditorState,
    preconditions: &[Precondition],
    op: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for precondition in preconditions {
        precondition.check(state)?;
    }
    op().await
}

/// The open document and the manager governing it. Always replaced as a
/// whole, under one write guard.
struct OpenDocument {
    scene: Option<Scene>,
    project: Option<Arc<CachedProject>>,
    manager: Arc<LockManager>,
}

impl Default for OpenDocument {
    fn default() -> Self {
        Self {
            scene: None,
            project: None,
            manager: Arc::new(LockManager::new()),
        }
    }
}

impl OpenDocument {
    fn ensure_unlocked(&self) -> Result<()> {
        let locked = self.manager.locked_root_count();
        if locked > 0 {
            warn!(locked_roots = locked, "Refusing to close a locked document");
            return Err(SceneLockError::Precondition(format!(
                "Cannot close while {} object(s) are locked.",
                locked
            )));
        }
        Ok(())
    }
}

/// Shared editing state of one server.
pub struct EditorState {
    document: RwLock<OpenDocument>,
    retry: RetryConfig,
    server_owner: Owner,
}

impl EditorState {
    pub fn new(retry: RetryConfig, server_owner: impl Into<Owner>) -> Self {
        Self {
            document: RwLock::new(OpenDocument::default()),
            retry,
            server_owner: server_owner.into(),
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn server_owner(&self) -> &str {
        &self.server_owner
    }

    /// The lock manager of the open document. Unbound while nothing is open.
    pub fn lock_manager(&self) -> Arc<LockManager> {
        Arc::clone(&self.document.read().manager)
    }

    /// Like [`lock_manager`](Self::lock_manager), but fails unless a scene
    /// or project is open.
    pub fn document_lock_manager(&self) -> Result<Arc<LockManager>> {
        let document = self.document.read();
        Precondition::DocumentNeeded.check_document(&document)?;
        Ok(Arc::clone(&document.manager))
    }

    pub fn scene(&self) -> Option<Scene> {
        self.document.read().scene.clone()
    }

    pub fn project(&self) -> Option<Arc<CachedProject>> {
        self.document.read().project.clone()
    }

    /// Open `scene` and start a lock manager bound to it.
    pub fn open_scene(&self, scene: Scene) -> Result<()> {
        if scene.id.is_empty() {
            return Err(SceneLockError::InvalidArgument(
                "Scene id must not be empty".to_string(),
            ));
        }

        let mut document = self.document.write();
        Precondition::NoScene.check_document(&document)?;
        Precondition::NoProject.check_document(&document)?;

        info!(scene_id = %scene.id, objects = scene.objects.len(), "Scene opened");
        *document = OpenDocument {
            manager: Arc::new(LockManager::for_scene(scene.id.clone())),
            scene: Some(scene),
            project: None,
        };
        Ok(())
    }

    /// Close the open scene. Refused while any lock is held.
    pub fn close_scene(&self) -> Result<ObjectId> {
        let mut document = self.document.write();
        Precondition::SceneNeeded.check_document(&document)?;
        document.ensure_unlocked()?;

        let scene_id = std::mem::take(&mut *document)
            .scene
            .map(|s| s.id)
            .unwrap_or_default();
        info!(scene_id = %scene_id, "Scene closed");
        Ok(scene_id)
    }

    /// Open `project` and start a lock manager bound to it.
    pub fn open_project(&self, project: Project) -> Result<()> {
        if project.id.is_empty() {
            return Err(SceneLockError::InvalidArgument(
                "Project id must not be empty".to_string(),
            ));
        }

        let mut document = self.document.write();
        Precondition::NoProject.check_document(&document)?;
        Precondition::NoScene.check_document(&document)?;

        let project = Arc::new(CachedProject::from(project));
        info!(
            project_id = %project.id(),
            name = %project.name(),
            scene_id = %project.scene_id(),
            "Project opened"
        );
        *document = OpenDocument {
            manager: Arc::new(LockManager::for_project(
                project.id().to_string(),
                project.clone(),
            )),
            scene: None,
            project: Some(project),
        };
        Ok(())
    }

    /// Close the open project. Refused while any lock is held.
    pub fn close_project(&self) -> Result<ObjectId> {
        let mut document = self.document.write();
        Precondition::ProjectNeeded.check_document(&document)?;
        document.ensure_unlocked()?;

        let project_id = std::mem::take(&mut *document)
            .project
            .map(|p| p.id().to_string())
            .unwrap_or_default();
        info!(project_id = %project_id, "Project closed");
        Ok(project_id)
    }

    /// Acquire `ids` on the open document's manager.
    ///
    /// The manager is captured before the (possibly waiting) acquisition. If
    /// the document was closed or replaced meanwhile, the grants are
    /// released again and the call fails.
    pub async fn acquire(
        &self,
        ids: impl Into<ObjectIds>,
        owner: impl Into<Owner>,
        mode: LockMode,
    ) -> Result<ScopedLock> {
        guarded(self, &[Precondition::DocumentNeeded], || async move {
            let manager = self.lock_manager();
            let scope = lock::acquire(&manager, ids, owner, mode, &self.retry).await?;
            self.ensure_current(&manager)?;
            Ok(scope)
        })
        .await
    }

    /// Run `body` with `ids` write-locked by the server owner.
    pub async fn with_server_write_lock<F, Fut, T>(
        &self,
        ids: impl Into<ObjectIds>,
        body: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        guarded(self, &[Precondition::DocumentNeeded], || async move {
            let manager = self.lock_manager();
            lock::with_write_lock(&manager, ids, self.server_owner.clone(), &self.retry, || async {
                self.ensure_current(&manager)?;
                body().await
            })
            .await
        })
        .await
    }

    /// Fails if `manager` no longer governs the open document.
    fn ensure_current(&self, manager: &Arc<LockManager>) -> Result<()> {
        if Arc::ptr_eq(&self.document.read().manager, manager) {
            return Ok(());
        }
        warn!("Document changed while locking, dropping grants");
        Err(SceneLockError::Precondition(
            "Document was closed while locking.".to_string(),
        ))
    }
}

impl std::fmt::Debug for EditorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let document = self.document.read();
        f.debug_struct("EditorState")
            .field("scene", &document.scene.as_ref().map(|s| &s.id))
            .field("project", &document.project.as_ref().map(|p| p.id()))
            .field("server_owner", &self.server_owner)
            .finish()
    }
}

/// One client's view of the editing state.
#[derive(Debug, Clone)]
pub struct Session {
    owner: Owner,
    state: Arc<EditorState>,
}

impl Session {
    pub fn new(owner: impl Into<Owner>, state: Arc<EditorState>) -> Self {
        Self {
            owner: owner.into(),
            state,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn state(&self) -> &Arc<EditorState> {
        &self.state
    }

    /// Read-lock `ids`, retrying contention, and keep them held.
    pub async fn read_lock(&self, ids: impl Into<ObjectIds>) -> Result<ObjectIds> {
        Ok(self.acquire(ids, LockMode::Read).await?.detach())
    }

    /// Write-lock `ids`, retrying contention, and keep them held.
    pub async fn write_lock(&self, ids: impl Into<ObjectIds>, lock_tree: bool) -> Result<ObjectIds> {
        let mode = if lock_tree { LockMode::Tree } else { LockMode::Write };
        Ok(self.acquire(ids, mode).await?.detach())
    }

    /// Acquire `ids` for the scope of the returned guard.
    pub async fn acquire(&self, ids: impl Into<ObjectIds>, mode: LockMode) -> Result<ScopedLock> {
        self.state.acquire(ids, self.owner.clone(), mode).await
    }

    pub fn read_unlock(&self, object_id: &str) -> Result<()> {
        self.state
            .document_lock_manager()?
            .read_unlock(object_id, &self.owner)
    }

    pub fn write_unlock(&self, object_id: &str) -> Result<()> {
        self.state
            .document_lock_manager()?
            .write_unlock(object_id, &self.owner)
    }

    /// Drop every grant this client holds.
    pub fn release_all(&self) -> usize {
        self.state.lock_manager().release_owner(&self.owner)
    }
}
