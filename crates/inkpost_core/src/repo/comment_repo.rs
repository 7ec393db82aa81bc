//! Comment repository contract and SQLite implementation.

use crate::model::comment::{Comment, CommentEdit, NewComment};
use crate::model::entity::{EntityId, EntityKind, Ref};
use crate::repo::documents::parse_entity_id;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const COMMENT_SELECT_SQL: &str = "SELECT
    id,
    text,
    date,
    user_id,
    blog_id,
    created_at,
    updated_at
FROM comments";

/// Repository interface for comment documents.
pub trait CommentRepository {
    fn create_comment(&self, comment: &NewComment) -> RepoResult<Comment>;
    fn get_comment(&self, id: EntityId) -> RepoResult<Option<Comment>>;
    /// Lists all comments in creation order.
    fn list_comments(&self) -> RepoResult<Vec<Comment>>;
    /// Lists comments whose author field points at `user_id`.
    fn list_comments_by_user(&self, user_id: EntityId) -> RepoResult<Vec<Comment>>;
    /// Lists comments whose parent field points at `blog_id`.
    fn list_comments_by_blog(&self, blog_id: EntityId) -> RepoResult<Vec<Comment>>;
    fn update_comment(&self, id: EntityId, edit: &CommentEdit) -> RepoResult<Comment>;
    /// Removes the document and returns its last state.
    fn delete_comment(&self, id: EntityId) -> RepoResult<Comment>;
}

/// SQLite-backed comment repository.
pub struct SqliteCommentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_required(&self, id: EntityId) -> RepoResult<Comment> {
        self.get_comment(id)?.ok_or(RepoError::NotFound {
            kind: EntityKind::Comment,
            id,
        })
    }

    fn query_comments(&self, sql: &str, param: Option<String>) -> RepoResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match param {
            Some(value) => stmt.query([value])?,
            None => stmt.query([])?,
        };
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(parse_comment_row(row)?);
        }
        Ok(comments)
    }
}

impl CommentRepository for SqliteCommentRepository<'_> {
    fn create_comment(&self, comment: &NewComment) -> RepoResult<Comment> {
        comment.validate()?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO comments (
                id,
                text,
                date,
                user_id,
                blog_id
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                comment.text.as_str(),
                comment.date.as_str(),
                comment.user.id().to_string(),
                comment.blog.id().to_string(),
            ],
        )?;

        self.load_required(id)
    }

    fn get_comment(&self, id: EntityId) -> RepoResult<Option<Comment>> {
        let mut comments = self.query_comments(
            &format!("{COMMENT_SELECT_SQL} WHERE id = ?1;"),
            Some(id.to_string()),
        )?;
        Ok(comments.pop())
    }

    fn list_comments(&self) -> RepoResult<Vec<Comment>> {
        self.query_comments(&format!("{COMMENT_SELECT_SQL} ORDER BY rowid ASC;"), None)
    }

    fn list_comments_by_user(&self, user_id: EntityId) -> RepoResult<Vec<Comment>> {
        self.query_comments(
            &format!("{COMMENT_SELECT_SQL} WHERE user_id = ?1 ORDER BY rowid ASC;"),
            Some(user_id.to_string()),
        )
    }

    fn list_comments_by_blog(&self, blog_id: EntityId) -> RepoResult<Vec<Comment>> {
        self.query_comments(
            &format!("{COMMENT_SELECT_SQL} WHERE blog_id = ?1 ORDER BY rowid ASC;"),
            Some(blog_id.to_string()),
        )
    }

    fn update_comment(&self, id: EntityId, edit: &CommentEdit) -> RepoResult<Comment> {
        edit.validate()?;

        let changed = self.conn.execute(
            "UPDATE comments
             SET
                text = ?2,
                date = ?3,
                updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1;",
            params![id.to_string(), edit.text.as_str(), edit.date.as_str()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Comment,
                id,
            });
        }

        self.load_required(id)
    }

    fn delete_comment(&self, id: EntityId) -> RepoResult<Comment> {
        let comment = self.load_required(id)?;
        self.conn
            .execute("DELETE FROM comments WHERE id = ?1;", [id.to_string()])?;
        Ok(comment)
    }
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    let id_text: String = row.get("id")?;
    let user_text: String = row.get("user_id")?;
    let blog_text: String = row.get("blog_id")?;

    Ok(Comment {
        id: parse_entity_id(&id_text, "comments.id")?,
        text: row.get("text")?,
        date: row.get("date")?,
        user: Ref::new(parse_entity_id(&user_text, "comments.user_id")?),
        blog: Ref::new(parse_entity_id(&blog_text, "comments.blog_id")?),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
