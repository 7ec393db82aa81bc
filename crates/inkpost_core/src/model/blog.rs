//! Blog domain model.

use crate::model::comment::Comment;
use crate::model::entity::{Entity, EntityId, EntityKind, Ref};
use crate::model::user::User;
use crate::model::validation::{require, ValidationError};
use serde::Serialize;

/// Post owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: EntityId,
    pub title: String,
    pub content: String,
    /// Client-supplied publication date, stored verbatim.
    pub date: String,
    /// Owning user. Authoritative for `User.blogs`.
    pub user: Ref<User>,
    /// Comments on this blog in the order they were added.
    pub comments: Vec<Ref<Comment>>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Entity for Blog {
    const KIND: EntityKind = EntityKind::Blog;

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Fields required to create a blog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlog {
    pub title: String,
    pub content: String,
    pub date: String,
    pub user: Ref<User>,
}

impl NewBlog {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(EntityKind::Blog, "title", &self.title)?;
        require(EntityKind::Blog, "content", &self.content)?;
        require(EntityKind::Blog, "date", &self.date)?;
        Ok(())
    }
}

/// Fields replaced by an in-place blog update. Relations are untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogEdit {
    pub title: String,
    pub content: String,
    pub date: String,
}

impl BlogEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(EntityKind::Blog, "title", &self.title)?;
        require(EntityKind::Blog, "content", &self.content)?;
        require(EntityKind::Blog, "date", &self.date)?;
        Ok(())
    }
}
