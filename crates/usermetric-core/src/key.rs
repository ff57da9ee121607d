//! Key namespace for user metric entities.
//!
//! Every user metric lives under one fixed ancestor key, so all entries form a
//! single entity group and listing queries observe a strongly consistent view.
//! The effective store key is `(root ancestor, kind, user key)`.

use std::fmt;

use crate::error::{Result, UserMetricError};

/// Entity kind of stored user metrics.
pub const USERMETRIC_KIND: &str = "usermetricentity";

/// String id of the collection root all user metrics are parented to.
pub const USERMETRIC_ROOT_NAME: &str = "usermetricroot";

/// Hierarchical store key: kind + string id + optional parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    kind: String,
    name: String,
    parent: Option<Box<EntityKey>>,
}

impl EntityKey {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, parent: Option<EntityKey>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            parent: parent.map(Box::new),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The caller-visible string identifier of this key.
    pub fn string_id(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&EntityKey> {
        self.parent.as_deref()
    }

    /// True if `ancestor` is this key or one of its parents.
    pub fn has_ancestor(&self, ancestor: &EntityKey) -> bool {
        let mut cur = Some(self);
        while let Some(k) = cur {
            if k == ancestor {
                return true;
            }
            cur = k.parent();
        }
        false
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = self.parent() {
            write!(f, "{p}/")?;
        }
        write!(f, "{},{:?}", self.kind, self.name)
    }
}

/// Which write path asks for a key; only changes the client-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUse {
    Insert,
    Update,
}

impl KeyUse {
    fn as_str(self) -> &'static str {
        match self {
            KeyUse::Insert => "Insert",
            KeyUse::Update => "Update",
        }
    }
}

/// The shared ancestor of all user metric entities.
pub fn usermetric_root_key() -> EntityKey {
    EntityKey::new(USERMETRIC_KIND, USERMETRIC_ROOT_NAME, None)
}

/// Scope a client-supplied key under the collection root.
///
/// An empty key is rejected with `BadInput`.
pub fn usermetric_key(user_key: &str, purpose: KeyUse) -> Result<EntityKey> {
    if user_key.is_empty() {
        return Err(UserMetricError::BadInput(format!(
            "Mandatory Key for {} is missing or invalid",
            purpose.as_str()
        )));
    }
    Ok(EntityKey::new(USERMETRIC_KIND, user_key, Some(usermetric_root_key())))
}
