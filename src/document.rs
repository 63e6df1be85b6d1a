//! Boundary model of the edited document.
//!
//! Scenes and projects are owned by the document layer. The lock manager only
//! needs to know which of the two is open and, for a project, the parent of an
//! action point. [`ActionPointLookup`] is that seam.

use crate::types::ObjectId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An object placed in a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
}

/// A scene as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            objects: Vec::new(),
        }
    }
}

/// An action point, optionally attached to a parent object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPoint {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub parent: Option<ObjectId>,
}

impl ActionPoint {
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent: None,
        }
    }

    /// Attach the action point to a parent.
    pub fn with_parent(mut self, parent: impl Into<ObjectId>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// A project as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ObjectId,
    pub name: String,
    pub scene_id: ObjectId,
    #[serde(default)]
    pub action_points: Vec<ActionPoint>,
}

impl Project {
    pub fn new(
        id: impl Into<ObjectId>,
        name: impl Into<String>,
        scene_id: impl Into<ObjectId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scene_id: scene_id.into(),
            action_points: Vec::new(),
        }
    }

    pub fn with_action_point(mut self, action_point: ActionPoint) -> Self {
        self.action_points.push(action_point);
        self
    }
}

/// Read access to the action points of an open project.
pub trait ActionPointLookup: Send + Sync {
    /// Look up an action point by id.
    fn action_point(&self, id: &str) -> Option<ActionPoint>;
}

/// A project held in memory while it is open for editing.
///
/// Action points can change while locks are held, so the table sits behind
/// its own lock, independent of the lock manager's guard.
#[derive(Debug)]
pub struct CachedProject {
    id: ObjectId,
    name: String,
    scene_id: ObjectId,
    action_points: RwLock<HashMap<ObjectId, ActionPoint>>,
}

impl CachedProject {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    /// Insert or replace an action point.
    pub fn upsert_action_point(&self, action_point: ActionPoint) {
        self.action_points
            .write()
            .insert(action_point.id.clone(), action_point);
    }

    /// Remove an action point, returning it if it existed.
    pub fn remove_action_point(&self, id: &str) -> Option<ActionPoint> {
        self.action_points.write().remove(id)
    }

    pub fn action_point_count(&self) -> usize {
        self.action_points.read().len()
    }
}

impl From<Project> for CachedProject {
    fn from(project: Project) -> Self {
        let action_points = project
            .action_points
            .into_iter()
            .map(|ap| (ap.id.clone(), ap))
            .collect();

        Self {
            id: project.id,
            name: project.name,
            scene_id: project.scene_id,
            action_points: RwLock::new(action_points),
        }
    }
}

impl ActionPointLookup for CachedProject {
    fn action_point(&self, id: &str) -> Option<ActionPoint> {
        self.action_points.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_project_lookup() {
        let project = Project::new("p1", "project", "s1")
            .with_action_point(ActionPoint::new("ap1", "ap1"))
            .with_action_point(ActionPoint::new("ap2", "ap2").with_parent("ap1"));
        let cached = CachedProject::from(project);

        assert_eq!(cached.action_point_count(), 2);
        assert_eq!(cached.action_point("ap2").unwrap().parent.as_deref(), Some("ap1"));
        assert!(cached.action_point("missing").is_none());

        cached.upsert_action_point(ActionPoint::new("ap3", "ap3"));
        assert!(cached.action_point("ap3").is_some());
        assert!(cached.remove_action_point("ap3").is_some());
        assert!(cached.action_point("ap3").is_none());
    }

    #[test]
    fn test_project_deserializes_without_action_points() {
        let project: Project =
            serde_json::from_str(r#"{"id":"p1","name":"p","scene_id":"s1"}"#).unwrap();
        assert!(project.action_points.is_empty());
    }
}
