//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define per-entity CRUD contracts over the three document collections.
//! - Isolate SQL and document encoding details from the coordinator.
//!
//! # Invariants
//! - Every repository call touches exactly one entity document.
//! - Create/update paths validate required fields before SQL mutations.
//! - Read paths reject undecodable persisted state instead of masking it.
//! - Repositories borrow a `&Connection`; passing a `Transaction` scopes every
//!   call to that transaction.

use crate::db::DbError;
use crate::model::entity::{EntityId, EntityKind};
use crate::model::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod blog_repo;
pub mod comment_repo;
pub mod user_repo;

mod documents;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { kind: EntityKind, id: EntityId },
    DuplicateEmail(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::DuplicateEmail(email) => write!(f, "email already registered: {email}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::DuplicateEmail(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
