//! Blog repository contract and SQLite implementation.
//!
//! # Invariants
//! - `user_id` is fixed at creation; updates only touch title/content/date.
//! - `comment_ids` is only changed through the push/pull methods.

use crate::model::blog::{Blog, BlogEdit, NewBlog};
use crate::model::comment::Comment;
use crate::model::entity::{EntityId, EntityKind, Ref};
use crate::repo::documents::{
    decode_refs, parse_entity_id, pull_ref, push_ref, RefListColumn,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const BLOG_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    date,
    user_id,
    comment_ids,
    created_at,
    updated_at
FROM blogs";

const BLOG_COMMENTS: RefListColumn = RefListColumn {
    owner: EntityKind::Blog,
    table: "blogs",
    column: "comment_ids",
};

/// Repository interface for blog documents.
pub trait BlogRepository {
    /// Inserts a blog with a freshly assigned id and no comments.
    fn create_blog(&self, blog: &NewBlog) -> RepoResult<Blog>;
    fn get_blog(&self, id: EntityId) -> RepoResult<Option<Blog>>;
    /// Lists all blogs in creation order.
    fn list_blogs(&self) -> RepoResult<Vec<Blog>>;
    /// Lists blogs whose owning field points at `user_id`.
    fn list_blogs_by_user(&self, user_id: EntityId) -> RepoResult<Vec<Blog>>;
    fn update_blog(&self, id: EntityId, edit: &BlogEdit) -> RepoResult<Blog>;
    /// Removes the document and returns its last state.
    fn delete_blog(&self, id: EntityId) -> RepoResult<Blog>;
    fn push_comment(&self, blog_id: EntityId, comment: Ref<Comment>) -> RepoResult<()>;
    fn pull_comment(&self, blog_id: EntityId, comment: Ref<Comment>) -> RepoResult<()>;
}

/// SQLite-backed blog repository.
pub struct SqliteBlogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBlogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_required(&self, id: EntityId) -> RepoResult<Blog> {
        self.get_blog(id)?.ok_or(RepoError::NotFound {
            kind: EntityKind::Blog,
            id,
        })
    }

    fn query_blogs(&self, sql: &str, param: Option<String>) -> RepoResult<Vec<Blog>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match param {
            Some(value) => stmt.query([value])?,
            None => stmt.query([])?,
        };
        let mut blogs = Vec::new();
        while let Some(row) = rows.next()? {
            blogs.push(parse_blog_row(row)?);
        }
        Ok(blogs)
    }
}

impl BlogRepository for SqliteBlogRepository<'_> {
    fn create_blog(&self, blog: &NewBlog) -> RepoResult<Blog> {
        blog.validate()?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO blogs (
                id,
                title,
                content,
                date,
                user_id
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                blog.title.as_str(),
                blog.content.as_str(),
                blog.date.as_str(),
                blog.user.id().to_string(),
            ],
        )?;

        self.load_required(id)
    }

    fn get_blog(&self, id: EntityId) -> RepoResult<Option<Blog>> {
        let mut blogs = self.query_blogs(
            &format!("{BLOG_SELECT_SQL} WHERE id = ?1;"),
            Some(id.to_string()),
        )?;
        Ok(blogs.pop())
    }

    fn list_blogs(&self) -> RepoResult<Vec<Blog>> {
        self.query_blogs(&format!("{BLOG_SELECT_SQL} ORDER BY rowid ASC;"), None)
    }

    fn list_blogs_by_user(&self, user_id: EntityId) -> RepoResult<Vec<Blog>> {
        self.query_blogs(
            &format!("{BLOG_SELECT_SQL} WHERE user_id = ?1 ORDER BY rowid ASC;"),
            Some(user_id.to_string()),
        )
    }

    fn update_blog(&self, id: EntityId, edit: &BlogEdit) -> RepoResult<Blog> {
        edit.validate()?;

        let changed = self.conn.execute(
            "UPDATE blogs
             SET
                title = ?2,
                content = ?3,
                date = ?4,
                updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1;",
            params![
                id.to_string(),
                edit.title.as_str(),
                edit.content.as_str(),
                edit.date.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Blog,
                id,
            });
        }

        self.load_required(id)
    }

    fn delete_blog(&self, id: EntityId) -> RepoResult<Blog> {
        let blog = self.load_required(id)?;
        self.conn
            .execute("DELETE FROM blogs WHERE id = ?1;", [id.to_string()])?;
        Ok(blog)
    }

    fn push_comment(&self, blog_id: EntityId, comment: Ref<Comment>) -> RepoResult<()> {
        push_ref(self.conn, BLOG_COMMENTS, blog_id, comment)
    }

    fn pull_comment(&self, blog_id: EntityId, comment: Ref<Comment>) -> RepoResult<()> {
        pull_ref(self.conn, BLOG_COMMENTS, blog_id, comment)
    }
}

fn parse_blog_row(row: &Row<'_>) -> RepoResult<Blog> {
    let id_text: String = row.get("id")?;
    let user_text: String = row.get("user_id")?;
    let comment_ids: String = row.get("comment_ids")?;

    Ok(Blog {
        id: parse_entity_id(&id_text, "blogs.id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        date: row.get("date")?,
        user: Ref::new(parse_entity_id(&user_text, "blogs.user_id")?),
        comments: decode_refs(&comment_ids, "blogs.comment_ids")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
