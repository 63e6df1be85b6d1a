//! Root resolution.
//!
//! Every object id maps to the root whose [`LockRecord`](super::LockRecord)
//! governs it:
//!
//! ```text
//!  object id
//!      |
//!  sentinel? ----yes----> itself
//!      |
//!  bound to? --scene----> itself (scene hierarchy is flat for now)
//!      |
//!   project
//!      |
//!  action point parent, or itself when it has none
//! ```
//!
//! Anything else is an unknown object and fails loudly.

use crate::document::ActionPointLookup;
use crate::error::{Result, SceneLockError};
use crate::types::{is_sentinel, ObjectId};
use std::sync::Arc;

/// The document a lock manager governs.
#[derive(Clone, Default)]
pub enum DocumentBinding {
    /// Nothing is open; only sentinel ids resolve.
    #[default]
    Unbound,
    /// A scene is open.
    Scene { scene_id: ObjectId },
    /// A project is open.
    Project {
        project_id: ObjectId,
        lookup: Arc<dyn ActionPointLookup>,
    },
}

impl DocumentBinding {
    pub fn is_scene(&self) -> bool {
        matches!(self, DocumentBinding::Scene { .. })
    }

    pub fn is_project(&self) -> bool {
        matches!(self, DocumentBinding::Project { .. })
    }
}

impl std::fmt::Debug for DocumentBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentBinding::Unbound => write!(f, "Unbound"),
            DocumentBinding::Scene { scene_id } => write!(f, "Scene({})", scene_id),
            DocumentBinding::Project { project_id, .. } => write!(f, "Project({})", project_id),
        }
    }
}

/// Maps object ids to root ids for the bound document.
///
/// The binding is fixed for the resolver's lifetime; opening another document
/// means building another resolver.
#[derive(Debug, Default)]
pub struct RootResolver {
    binding: DocumentBinding,
}

impl RootResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binding(binding: DocumentBinding) -> Self {
        Self { binding }
    }

    pub fn binding(&self) -> &DocumentBinding {
        &self.binding
    }

    /// Resolve `object_id` to its root id.
    pub fn resolve(&self, object_id: &str) -> Result<ObjectId> {
        if is_sentinel(object_id) {
            return Ok(object_id.to_string());
        }

        match &self.binding {
            DocumentBinding::Scene { .. } => Ok(object_id.to_string()),
            DocumentBinding::Project { lookup, .. } => {
                let action_point = lookup
                    .action_point(object_id)
                    .ok_or_else(|| SceneLockError::UnknownObject(object_id.to_string()))?;
                Ok(action_point.parent.unwrap_or(action_point.id))
            }
            DocumentBinding::Unbound => Err(SceneLockError::UnknownObject(object_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ActionPoint, CachedProject, Project};
    use crate::types::{PROJECT_ROOT, SCENE_ROOT};

    fn cached_project() -> Arc<CachedProject> {
        let project = Project::new("p1", "project", "s1")
            .with_action_point(ActionPoint::new("ap1", "ap1"))
            .with_action_point(ActionPoint::new("ap2", "ap2").with_parent("obj1"));
        Arc::new(CachedProject::from(project))
    }

    fn project_resolver(lookup: Arc<CachedProject>) -> RootResolver {
        RootResolver::with_binding(DocumentBinding::Project {
            project_id: "p1".to_string(),
            lookup,
        })
    }

    #[test]
    fn test_scene_resolution_is_identity() {
        let resolver = RootResolver::with_binding(DocumentBinding::Scene {
            scene_id: "s1".to_string(),
        });

        assert!(resolver.binding().is_scene());
        assert_eq!(resolver.resolve("obj1").unwrap(), "obj1");
        assert_eq!(resolver.resolve("anything").unwrap(), "anything");
    }

    #[test]
    fn test_project_resolution_uses_parent() {
        let resolver = project_resolver(cached_project());

        assert!(resolver.binding().is_project());
        assert_eq!(resolver.resolve("ap1").unwrap(), "ap1");
        assert_eq!(resolver.resolve("ap2").unwrap(), "obj1");

        let err = resolver.resolve("missing").unwrap_err();
        assert!(matches!(err, SceneLockError::UnknownObject(id) if id == "missing"));
    }

    #[test]
    fn test_sentinels_resolve_to_themselves() {
        let resolver = RootResolver::new();
        assert_eq!(resolver.resolve(SCENE_ROOT).unwrap(), SCENE_ROOT);

        let resolver = project_resolver(cached_project());
        assert_eq!(resolver.resolve(PROJECT_ROOT).unwrap(), PROJECT_ROOT);
        assert_eq!(resolver.resolve(SCENE_ROOT).unwrap(), SCENE_ROOT);
    }

    #[test]
    fn test_unbound_rejects_objects() {
        let resolver = RootResolver::new();
        assert!(matches!(
            resolver.resolve("obj1"),
            Err(SceneLockError::UnknownObject(_))
        ));
    }

    #[test]
    fn test_resolution_follows_project_edits() {
        let cached = cached_project();
        let resolver = project_resolver(cached.clone());

        cached.upsert_action_point(ActionPoint::new("ap3", "ap3").with_parent("ap1"));
        assert_eq!(resolver.resolve("ap3").unwrap(), "ap1");
    }
}
