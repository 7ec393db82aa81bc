//! User domain model.
//!
//! # Invariants
//! - `email` is unique across all users.
//! - `password_hash` is never serialized or printed.
//! - `blogs`/`comments` mirror `Blog.user`/`Comment.user` of existing entities.

use crate::model::blog::Blog;
use crate::model::comment::Comment;
use crate::model::entity::{Entity, EntityId, EntityKind, Ref};
use crate::model::validation::{require, ValidationError};
use serde::Serialize;
use std::fmt::{Debug, Formatter};

/// Persisted account that owns blogs and authors comments.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    /// bcrypt hash of the account password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Owned blogs in the order they were added.
    pub blogs: Vec<Ref<Blog>>,
    /// Authored comments in the order they were added.
    pub comments: Vec<Ref<Comment>>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Debug for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("blogs", &self.blogs)
            .field("comments", &self.comments)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields required to create a user. The password is already hashed.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(EntityKind::User, "name", &self.name)?;
        require(EntityKind::User, "email", &self.email)?;
        require(EntityKind::User, "password", &self.password_hash)?;
        Ok(())
    }
}

impl Debug for NewUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Profile fields replaced by an in-place user update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEdit {
    pub name: String,
    pub email: String,
}

impl UserEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(EntityKind::User, "name", &self.name)?;
        require(EntityKind::User, "email", &self.email)?;
        Ok(())
    }
}
