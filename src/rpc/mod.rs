//! JSON request/response surface of the lock manager.
//!
//! Every client action is one envelope:
//!
//! ```json
//! {"id": 7, "owner": "ui-1", "request": "WriteLock", "args": {"object_id": "ap1", "lock_tree": false}}
//! ```
//!
//! answered by
//!
//! ```json
//! {"id": 7, "request": "WriteLock", "result": true}
//! ```
//!
//! Failures carry `result: false` and one message per underlying error.
//! Lock requests go through the retry policy and leave their grants held;
//! the client releases them with the matching unlock request.

use crate::document::{Project, Scene};
use crate::error::{Result, SceneLockError};
use crate::observability;
use crate::session::{EditorState, Session};
use crate::types::{ObjectId, Owner};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcEnvelope {
    /// Client-chosen id, echoed in the response.
    pub id: u64,
    /// Owner the request acts for.
    pub owner: Owner,
    #[serde(flatten)]
    pub request: RpcRequest,
}

/// Requests understood by [`RpcHandler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "request", content = "args")]
pub enum RpcRequest {
    ReadLock {
        object_id: ObjectId,
    },
    WriteLock {
        object_id: ObjectId,
        #[serde(default)]
        lock_tree: bool,
    },
    ReadUnlock {
        object_id: ObjectId,
    },
    WriteUnlock {
        object_id: ObjectId,
    },
    IsReadLocked {
        object_id: ObjectId,
        owner: Owner,
    },
    IsWriteLocked {
        object_id: ObjectId,
        owner: Owner,
    },
    LockedRootCount,
    ReleaseOwnerLocks,
    OpenScene {
        scene: Scene,
    },
    CloseScene,
    OpenProject {
        project: Project,
    },
    CloseProject,
}

impl RpcRequest {
    pub fn name(&self) -> &'static str {
        match self {
            RpcRequest::ReadLock { .. } => "ReadLock",
            RpcRequest::WriteLock { .. } => "WriteLock",
            RpcRequest::ReadUnlock { .. } => "ReadUnlock",
            RpcRequest::WriteUnlock { .. } => "WriteUnlock",
            RpcRequest::IsReadLocked { .. } => "IsReadLocked",
            RpcRequest::IsWriteLocked { .. } => "IsWriteLocked",
            RpcRequest::LockedRootCount => "LockedRootCount",
            RpcRequest::ReleaseOwnerLocks => "ReleaseOwnerLocks",
            RpcRequest::OpenScene { .. } => "OpenScene",
            RpcRequest::CloseScene => "CloseScene",
            RpcRequest::OpenProject { .. } => "OpenProject",
            RpcRequest::CloseProject => "CloseProject",
        }
    }
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    pub request: String,
    pub result: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    fn success(id: u64, request: &str, data: Option<Value>) -> Self {
        Self {
            id,
            request: request.to_string(),
            result: true,
            messages: Vec::new(),
            data,
        }
    }

    fn failure(id: u64, request: &str, error: &SceneLockError) -> Self {
        Self {
            id,
            request: request.to_string(),
            result: false,
            messages: error.messages(),
            data: None,
        }
    }
}

/// Dispatches envelopes against the shared editing state.
#[derive(Debug, Clone)]
pub struct RpcHandler {
    state: Arc<EditorState>,
}

impl RpcHandler {
    pub fn new(state: Arc<EditorState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<EditorState> {
        &self.state
    }

    /// Handle one request. Errors are rendered into the response.
    pub async fn handle(&self, envelope: RpcEnvelope) -> RpcResponse {
        let RpcEnvelope { id, owner, request } = envelope;
        let name = request.name();
        let session = Session::new(owner, Arc::clone(&self.state));

        let outcome = self.dispatch(&session, request).await;
        observability::record_rpc_request(name, outcome.as_ref().err().map(SceneLockError::kind));

        match outcome {
            Ok(data) => {
                debug!(id, request = name, owner = session.owner(), "Request succeeded");
                RpcResponse::success(id, name, data)
            }
            Err(e) => {
                warn!(id, request = name, owner = session.owner(), error = %e, "Request failed");
                RpcResponse::failure(id, name, &e)
            }
        }
    }

    async fn dispatch(&self, session: &Session, request: RpcRequest) -> Result<Option<Value>> {
        match request {
            RpcRequest::ReadLock { object_id } => {
                session.read_lock(object_id).await?;
                Ok(None)
            }
            RpcRequest::WriteLock {
                object_id,
                lock_tree,
            } => {
                session.write_lock(object_id, lock_tree).await?;
                Ok(None)
            }
            RpcRequest::ReadUnlock { object_id } => {
                session.read_unlock(&object_id)?;
                Ok(None)
            }
            RpcRequest::WriteUnlock { object_id } => {
                session.write_unlock(&object_id)?;
                Ok(None)
            }
            RpcRequest::IsReadLocked { object_id, owner } => {
                let manager = self.state.document_lock_manager()?;
                Ok(Some(json!(manager.is_read_locked(&object_id, &owner)?)))
            }
            RpcRequest::IsWriteLocked { object_id, owner } => {
                let manager = self.state.document_lock_manager()?;
                Ok(Some(json!(manager.is_write_locked(&object_id, &owner)?)))
            }
            RpcRequest::LockedRootCount => {
                Ok(Some(json!(self.state.lock_manager().locked_root_count())))
            }
            RpcRequest::ReleaseOwnerLocks => Ok(Some(json!(session.release_all()))),
            RpcRequest::OpenScene { scene } => {
                self.state.open_scene(scene)?;
                Ok(None)
            }
            RpcRequest::CloseScene => Ok(Some(json!(self.state.close_scene()?))),
            RpcRequest::OpenProject { project } => {
                self.state.open_project(project)?;
                Ok(None)
            }
            RpcRequest::CloseProject => Ok(Some(json!(self.state.close_project()?))),
        }
    }
}

/// Build the HTTP router.
pub fn router(handler: RpcHandler) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/rpc", post(handle_rpc))
        .with_state(handler)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn handle_rpc(
    State(handler): State<RpcHandler>,
    Json(envelope): Json<RpcEnvelope>,
) -> Json<RpcResponse> {
    Json(handler.handle(envelope).await)
}
