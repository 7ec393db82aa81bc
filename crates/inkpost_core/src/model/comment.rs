//! Comment domain model.

use crate::model::blog::Blog;
use crate::model::entity::{Entity, EntityId, EntityKind, Ref};
use crate::model::user::User;
use crate::model::validation::{require, ValidationError};
use serde::Serialize;

/// Text left by a user on a blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: EntityId,
    pub text: String,
    pub date: String,
    /// Author. Authoritative for `User.comments`.
    pub user: Ref<User>,
    /// Parent blog. Authoritative for `Blog.comments`; may dangle once the
    /// blog is deleted.
    pub blog: Ref<Blog>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Entity for Comment {
    const KIND: EntityKind = EntityKind::Comment;

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Fields required to create a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub text: String,
    pub date: String,
    pub user: Ref<User>,
    pub blog: Ref<Blog>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(EntityKind::Comment, "text", &self.text)?;
        require(EntityKind::Comment, "date", &self.date)?;
        Ok(())
    }
}

/// Fields replaced by an in-place comment update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEdit {
    pub text: String,
    pub date: String,
}

impl CommentEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(EntityKind::Comment, "text", &self.text)?;
        require(EntityKind::Comment, "date", &self.date)?;
        Ok(())
    }
}
