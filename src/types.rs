//! Core type definitions for scenelock.
//!
//! # Type Aliases
//!
//! Identifiers are plain strings on the wire and are kept as type aliases:
//!
//! - [`ObjectId`]: id of a scene object, action point, action or logic item
//! - [`Owner`]: opaque id of whoever holds a grant (usually a client)
//!
//! # Reserved Ids
//!
//! [`SCENE_ROOT`] and [`PROJECT_ROOT`] may be locked like any other object and
//! stand for the whole editable document. [`SERVER_OWNER`] is the owner name
//! used when the server takes locks on its own behalf.
//!
//! # Examples
//!
//! ```rust
//! use scenelock::types::ObjectIds;
//!
//! let single = ObjectIds::from("ap1");
//! assert_eq!(single.as_slice(), ["ap1"]);
//!
//! let many = ObjectIds::try_from(vec!["ap1", "ap2"]).unwrap();
//! assert_eq!(many.len(), 2);
//! ```

use crate::error::{Result, SceneLockError};
use serde::{Deserialize, Serialize};

/// Unique identifier of a lockable object.
pub type ObjectId = String;

/// Identifier of a lock owner.
pub type Owner = String;

/// Sentinel object id denoting the whole scene.
pub const SCENE_ROOT: &str = "SCENE";

/// Sentinel object id denoting the whole project.
pub const PROJECT_ROOT: &str = "PROJECT";

/// Default owner name for locks taken by the server itself.
pub const SERVER_OWNER: &str = "SERVER";

/// Check whether an id is one of the reserved whole-document ids.
pub fn is_sentinel(object_id: &str) -> bool {
    object_id == SCENE_ROOT || object_id == PROJECT_ROOT
}

/// An ordered, non-empty sequence of object ids.
///
/// Everything that accepts "one id or several" takes this type, so a single
/// id is just a one-element sequence past the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ObjectId>", into = "Vec<ObjectId>")]
pub struct ObjectIds(Vec<ObjectId>);

impl ObjectIds {
    /// Build a sequence, rejecting an empty one.
    pub fn new(ids: Vec<ObjectId>) -> Result<Self> {
        if ids.is_empty() {
            return Err(SceneLockError::InvalidArgument(
                "at least one object id is required".to_string(),
            ));
        }
        Ok(Self(ids))
    }

    /// A one-element sequence.
    pub fn single(object_id: impl Into<ObjectId>) -> Self {
        Self(vec![object_id.into()])
    }

    pub fn as_slice(&self) -> &[ObjectId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObjectId> {
        self.0.iter()
    }
}

impl From<&str> for ObjectIds {
    fn from(object_id: &str) -> Self {
        Self::single(object_id)
    }
}

impl From<String> for ObjectIds {
    fn from(object_id: String) -> Self {
        Self::single(object_id)
    }
}

impl From<&String> for ObjectIds {
    fn from(object_id: &String) -> Self {
        Self::single(object_id.clone())
    }
}

impl TryFrom<Vec<ObjectId>> for ObjectIds {
    type Error = SceneLockError;

    fn try_from(ids: Vec<ObjectId>) -> Result<Self> {
        Self::new(ids)
    }
}

impl TryFrom<Vec<&str>> for ObjectIds {
    type Error = SceneLockError;

    fn try_from(ids: Vec<&str>) -> Result<Self> {
        Self::new(ids.into_iter().map(str::to_string).collect())
    }
}

impl TryFrom<&[&str]> for ObjectIds {
    type Error = SceneLockError;

    fn try_from(ids: &[&str]) -> Result<Self> {
        Self::new(ids.iter().map(|id| id.to_string()).collect())
    }
}

impl From<ObjectIds> for Vec<ObjectId> {
    fn from(ids: ObjectIds) -> Self {
        ids.0
    }
}

impl<'a> IntoIterator for &'a ObjectIds {
    type Item = &'a ObjectId;
    type IntoIter = std::slice::Iter<'a, ObjectId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for ObjectIds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
