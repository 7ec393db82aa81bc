//! User repository contract and SQLite implementation.
//!
//! # Invariants
//! - `users.email` is unique; collisions surface as `RepoError::DuplicateEmail`.
//! - `blog_ids`/`comment_ids` are only changed through the push/pull methods.

use crate::model::blog::Blog;
use crate::model::comment::Comment;
use crate::model::entity::{EntityId, EntityKind, Ref};
use crate::model::user::{NewUser, User, UserEdit};
use crate::repo::documents::{
    decode_refs, parse_entity_id, pull_ref, push_ref, RefListColumn,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, ErrorCode, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    password_hash,
    blog_ids,
    comment_ids,
    created_at,
    updated_at
FROM users";

const USER_BLOGS: RefListColumn = RefListColumn {
    owner: EntityKind::User,
    table: "users",
    column: "blog_ids",
};

const USER_COMMENTS: RefListColumn = RefListColumn {
    owner: EntityKind::User,
    table: "users",
    column: "comment_ids",
};

/// Repository interface for user documents.
pub trait UserRepository {
    /// Inserts a user with a freshly assigned id and empty reference lists.
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: EntityId) -> RepoResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Lists all users in creation order.
    fn list_users(&self) -> RepoResult<Vec<User>>;
    /// Replaces profile fields; reference lists are untouched.
    fn update_user(&self, id: EntityId, edit: &UserEdit) -> RepoResult<User>;
    /// Removes the document and returns its last state.
    fn delete_user(&self, id: EntityId) -> RepoResult<User>;
    fn push_blog(&self, user_id: EntityId, blog: Ref<Blog>) -> RepoResult<()>;
    fn pull_blog(&self, user_id: EntityId, blog: Ref<Blog>) -> RepoResult<()>;
    fn push_comment(&self, user_id: EntityId, comment: Ref<Comment>) -> RepoResult<()>;
    fn pull_comment(&self, user_id: EntityId, comment: Ref<Comment>) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_required(&self, id: EntityId) -> RepoResult<User> {
        self.get_user(id)?.ok_or(RepoError::NotFound {
            kind: EntityKind::User,
            id,
        })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        user.validate()?;

        let id = Uuid::new_v4();
        let inserted = self.conn.execute(
            "INSERT INTO users (
                id,
                name,
                email,
                password_hash
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                user.name.as_str(),
                user.email.as_str(),
                user.password_hash.as_str(),
            ],
        );
        if let Err(err) = inserted {
            return Err(map_unique_email(err, &user.email));
        }

        self.load_required(id)
    }

    fn get_user(&self, id: EntityId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn update_user(&self, id: EntityId, edit: &UserEdit) -> RepoResult<User> {
        edit.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE users
                 SET
                    name = ?2,
                    email = ?3,
                    updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
                 WHERE id = ?1;",
                params![id.to_string(), edit.name.as_str(), edit.email.as_str()],
            )
            .map_err(|err| map_unique_email(err, &edit.email))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::User,
                id,
            });
        }

        self.load_required(id)
    }

    fn delete_user(&self, id: EntityId) -> RepoResult<User> {
        let user = self.load_required(id)?;
        self.conn
            .execute("DELETE FROM users WHERE id = ?1;", [id.to_string()])?;
        Ok(user)
    }

    fn push_blog(&self, user_id: EntityId, blog: Ref<Blog>) -> RepoResult<()> {
        push_ref(self.conn, USER_BLOGS, user_id, blog)
    }

    fn pull_blog(&self, user_id: EntityId, blog: Ref<Blog>) -> RepoResult<()> {
        pull_ref(self.conn, USER_BLOGS, user_id, blog)
    }

    fn push_comment(&self, user_id: EntityId, comment: Ref<Comment>) -> RepoResult<()> {
        push_ref(self.conn, USER_COMMENTS, user_id, comment)
    }

    fn pull_comment(&self, user_id: EntityId, comment: Ref<Comment>) -> RepoResult<()> {
        pull_ref(self.conn, USER_COMMENTS, user_id, comment)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let blog_ids: String = row.get("blog_ids")?;
    let comment_ids: String = row.get("comment_ids")?;

    Ok(User {
        id: parse_entity_id(&id_text, "users.id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        blogs: decode_refs(&blog_ids, "users.blog_ids")?,
        comments: decode_refs(&comment_ids, "users.comment_ids")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

// `email` is the only unique column besides the primary key.
fn map_unique_email(err: rusqlite::Error, email: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::DuplicateEmail(email.to_string())
        }
        _ => err.into(),
    }
}
