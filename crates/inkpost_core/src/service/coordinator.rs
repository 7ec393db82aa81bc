//! Consistency coordinator for cross-entity writes.
//!
//! # Responsibility
//! - Run every write that touches a back-reference list as one unit together
//!   with the owning-field write it mirrors.
//! - Gate each unit on the existence checks the operation requires.
//!
//! # Invariants
//! - For every comment `c`: `c.id` is in `Blog(c.blog).comments` and in
//!   `User(c.user).comments` exactly while `c` exists.
//! - For every blog `b`: `b.id` is in `User(b.user).blogs` exactly while `b`
//!   exists.
//! - Gating reads and writes of one operation share a single immediate
//!   transaction; failure rolls every step back and nothing is retried.
//! - The coordinator holds no lock of its own; overlapping operations are
//!   serialized by the store.

use crate::db::run_in_transaction;
use crate::model::blog::{Blog, BlogEdit, NewBlog};
use crate::model::comment::{Comment, NewComment};
use crate::model::entity::{EntityId, EntityKind, Ref};
use crate::model::user::{NewUser, User};
use crate::model::validation::{require, ValidationError};
use crate::repo::blog_repo::{BlogRepository, SqliteBlogRepository};
use crate::repo::comment_repo::{CommentRepository, SqliteCommentRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::service::credentials::PasswordHasher;
use crate::service::error::{LookupKey, ServiceError, ServiceResult};
use log::{info, warn};
use rusqlite::Connection;
use std::time::Instant;

/// Sign-up input carrying the plain-text password.
#[derive(Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require(EntityKind::User, "name", &self.name)?;
        require(EntityKind::User, "email", &self.email)?;
        require(EntityKind::User, "password", &self.password)?;
        Ok(())
    }
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Executes cross-entity operations against one store connection.
pub struct ConsistencyCoordinator<'a> {
    conn: &'a Connection,
    hasher: &'a dyn PasswordHasher,
}

impl<'a> ConsistencyCoordinator<'a> {
    pub fn new(conn: &'a Connection, hasher: &'a dyn PasswordHasher) -> Self {
        Self { conn, hasher }
    }

    /// Creates a blog and appends it to its owner's `blogs`.
    ///
    /// # Errors
    /// - `Validation` when a required field is blank.
    /// - `NotFound(User)` when the owner does not exist.
    pub fn add_blog(&self, blog: &NewBlog) -> ServiceResult<Blog> {
        blog.validate()?;
        let started_at = Instant::now();
        let owner_id = blog.user.id();

        let created = run_in_transaction(self.conn, "add_blog", |tx| {
            let users = SqliteUserRepository::new(tx);
            let blogs = SqliteBlogRepository::new(tx);

            if users.get_user(owner_id)?.is_none() {
                return Err(ServiceError::not_found(EntityKind::User, owner_id));
            }
            let created = blogs.create_blog(blog)?;
            users.push_blog(owner_id, Ref::to(&created))?;
            Ok(created)
        })?;

        info!(
            "event=add_blog module=coordinator status=ok blog_id={} user_id={} duration_ms={}",
            created.id,
            owner_id,
            started_at.elapsed().as_millis()
        );
        Ok(created)
    }

    /// Replaces title, content and date of an existing blog.
    ///
    /// # Errors
    /// - `Validation` when a required field is blank.
    /// - `NotFound(Blog)` when the blog does not exist.
    pub fn update_blog(&self, id: EntityId, edit: &BlogEdit) -> ServiceResult<Blog> {
        edit.validate()?;

        let updated = run_in_transaction(self.conn, "update_blog", |tx| {
            SqliteBlogRepository::new(tx)
                .update_blog(id, edit)
                .map_err(ServiceError::from)
        })?;

        info!(
            "event=update_blog module=coordinator status=ok blog_id={}",
            id
        );
        Ok(updated)
    }

    /// Detaches a blog from its owner and deletes it.
    ///
    /// Comments that reference the blog are left in place and keep pointing at
    /// the deleted id.
    ///
    /// # Errors
    /// - `NotFound(Blog)` when the blog does not exist.
    /// - `OwnerMissing` when the blog's owner no longer exists.
    pub fn delete_blog(&self, id: EntityId) -> ServiceResult<Blog> {
        let started_at = Instant::now();

        let (deleted, orphaned) = run_in_transaction(self.conn, "delete_blog", |tx| {
            let users = SqliteUserRepository::new(tx);
            let blogs = SqliteBlogRepository::new(tx);
            let comments = SqliteCommentRepository::new(tx);

            let blog = blogs
                .get_blog(id)?
                .ok_or_else(|| ServiceError::not_found(EntityKind::Blog, id))?;
            let owner_id = blog.user.id();
            if users.get_user(owner_id)?.is_none() {
                return Err(ServiceError::OwnerMissing {
                    blog: id,
                    user: owner_id,
                });
            }

            users.pull_blog(owner_id, Ref::to(&blog))?;
            let orphaned = comments.list_comments_by_blog(id)?.len();
            blogs.delete_blog(id)?;
            Ok((blog, orphaned))
        })?;

        if orphaned > 0 {
            warn!(
                "event=delete_blog module=coordinator status=ok blog_id={} orphaned_comments={}",
                id, orphaned
            );
        }
        info!(
            "event=delete_blog module=coordinator status=ok blog_id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(deleted)
    }

    /// Creates a comment and appends it to the author's and the blog's lists.
    ///
    /// # Errors
    /// - `Validation` when a required field is blank.
    /// - `NotFound(User)` / `NotFound(Blog)` when either reference is missing.
    pub fn add_comment(&self, comment: &NewComment) -> ServiceResult<Comment> {
        comment.validate()?;
        let started_at = Instant::now();
        let user_id = comment.user.id();
        let blog_id = comment.blog.id();

        let created = run_in_transaction(self.conn, "add_comment", |tx| {
            let users = SqliteUserRepository::new(tx);
            let blogs = SqliteBlogRepository::new(tx);
            let comments = SqliteCommentRepository::new(tx);

            if users.get_user(user_id)?.is_none() {
                return Err(ServiceError::not_found(EntityKind::User, user_id));
            }
            if blogs.get_blog(blog_id)?.is_none() {
                return Err(ServiceError::not_found(EntityKind::Blog, blog_id));
            }

            let created = comments.create_comment(comment)?;
            users.push_comment(user_id, Ref::to(&created))?;
            blogs.push_comment(blog_id, Ref::to(&created))?;
            Ok(created)
        })?;

        info!(
            "event=add_comment module=coordinator status=ok comment_id={} blog_id={} user_id={} duration_ms={}",
            created.id,
            blog_id,
            user_id,
            started_at.elapsed().as_millis()
        );
        Ok(created)
    }

    /// Detaches a comment from its author and blog and deletes it.
    ///
    /// # Errors
    /// - `NotFound(Comment)` when the comment does not exist.
    /// - `NotFound(User)` / `NotFound(Blog)` when author or blog is gone.
    pub fn delete_comment(&self, id: EntityId) -> ServiceResult<Comment> {
        let started_at = Instant::now();

        let deleted = run_in_transaction(self.conn, "delete_comment", |tx| {
            let users = SqliteUserRepository::new(tx);
            let blogs = SqliteBlogRepository::new(tx);
            let comments = SqliteCommentRepository::new(tx);

            let comment = comments
                .get_comment(id)?
                .ok_or_else(|| ServiceError::not_found(EntityKind::Comment, id))?;
            let user_id = comment.user.id();
            let blog_id = comment.blog.id();
            if users.get_user(user_id)?.is_none() {
                return Err(ServiceError::not_found(EntityKind::User, user_id));
            }
            if blogs.get_blog(blog_id)?.is_none() {
                return Err(ServiceError::not_found(EntityKind::Blog, blog_id));
            }

            users.pull_comment(user_id, Ref::to(&comment))?;
            blogs.pull_comment(blog_id, Ref::to(&comment))?;
            comments.delete_comment(id)?;
            Ok(comment)
        })?;

        info!(
            "event=delete_comment module=coordinator status=ok comment_id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(deleted)
    }

    /// Registers a new user with a hashed password.
    ///
    /// The email check runs before hashing to fail fast, and again inside the
    /// write transaction; the unique index rejects any remaining race.
    ///
    /// # Errors
    /// - `Validation` when a field is blank.
    /// - `DuplicateEmail` when the email is already registered.
    pub fn sign_up(&self, request: &SignUpRequest) -> ServiceResult<User> {
        request.validate()?;
        let users = SqliteUserRepository::new(self.conn);
        if users.find_user_by_email(&request.email)?.is_some() {
            return Err(ServiceError::DuplicateEmail(request.email.clone()));
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let new_user = NewUser {
            name: request.name.clone(),
            email: request.email.clone(),
            password_hash,
        };

        let created = run_in_transaction(self.conn, "sign_up", |tx| {
            let users = SqliteUserRepository::new(tx);
            if users.find_user_by_email(&new_user.email)?.is_some() {
                return Err(ServiceError::DuplicateEmail(new_user.email.clone()));
            }
            users.create_user(&new_user).map_err(ServiceError::from)
        })?;

        info!(
            "event=sign_up module=coordinator status=ok user_id={}",
            created.id
        );
        Ok(created)
    }

    /// Checks a password against the stored hash for `email`.
    ///
    /// # Errors
    /// - `NotFound(User)` when no user has this email.
    /// - `InvalidCredentials` when the password does not match.
    pub fn login(&self, email: &str, password: &str) -> ServiceResult<User> {
        let users = SqliteUserRepository::new(self.conn);
        let user = users
            .find_user_by_email(email)?
            .ok_or_else(|| ServiceError::NotFound {
                kind: EntityKind::User,
                key: LookupKey::Email(email.to_string()),
            })?;

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(
                "event=login module=coordinator status=rejected user_id={}",
                user.id
            );
            return Err(ServiceError::InvalidCredentials);
        }

        info!(
            "event=login module=coordinator status=ok user_id={}",
            user.id
        );
        Ok(user)
    }
}
