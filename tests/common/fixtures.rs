// Test fixtures for integration tests

use std::sync::Arc;

use scenelock::document::{ActionPoint, CachedProject, Project, Scene, SceneObject};
use scenelock::lock::LockManager;
use scenelock::resilience::RetryConfig;
use scenelock::rpc::{RpcEnvelope, RpcHandler, RpcRequest};
use scenelock::session::EditorState;
use scenelock::types::SERVER_OWNER;

/// Scene with a handful of objects.
pub fn sample_scene() -> Scene {
    let mut scene = Scene::new("scene1", "Workcell");
    scene.objects = vec![
        SceneObject {
            id: "obj1".to_string(),
            name: "robot".to_string(),
            object_type: "Robot".to_string(),
        },
        SceneObject {
            id: "obj2".to_string(),
            name: "table".to_string(),
            object_type: "Box".to_string(),
        },
    ];
    scene
}

/// Project with two roots: `ap1` (parent of `ap1_child`) and `ap2`.
pub fn sample_project() -> Project {
    Project::new("project1", "Pick and place", "scene1")
        .with_action_point(ActionPoint::new("ap1", "pick"))
        .with_action_point(ActionPoint::new("ap1_child", "pick approach").with_parent("ap1"))
        .with_action_point(ActionPoint::new("ap2", "place"))
}

pub fn scene_manager() -> Arc<LockManager> {
    Arc::new(LockManager::for_scene("scene1"))
}

pub fn project_manager() -> Arc<LockManager> {
    let project = Arc::new(CachedProject::from(sample_project()));
    Arc::new(LockManager::for_project("project1", project))
}

pub fn editor_state(retry: RetryConfig) -> Arc<EditorState> {
    Arc::new(EditorState::new(retry, SERVER_OWNER))
}

pub fn rpc_handler(retry: RetryConfig) -> RpcHandler {
    RpcHandler::new(editor_state(retry))
}

/// Builds request envelopes with increasing ids.
pub struct EnvelopeBuilder {
    next_id: u64,
}

impl EnvelopeBuilder {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    pub fn build(&mut self, owner: &str, request: RpcRequest) -> RpcEnvelope {
        let id = self.next_id;
        self.next_id += 1;
        RpcEnvelope {
            id,
            owner: owner.to_string(),
            request,
        }
    }
}

impl Default for EnvelopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
