//! Error kinds surfaced by coordinator operations.

use crate::model::entity::{EntityId, EntityKind};
use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use crate::service::credentials::CredentialError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Broad failure category, independent of the entity involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Duplicate,
    Auth,
    Transaction,
    Internal,
}

/// How a missing entity was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Id(EntityId),
    Email(String),
}

impl Display for LookupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Email(email) => write!(f, "email {email}"),
        }
    }
}

/// Failure of one coordinator operation. Any open transaction has already
/// been rolled back when a caller observes this value.
#[derive(Debug)]
pub enum ServiceError {
    /// Required field absent or id malformed.
    Validation(ValidationError),
    /// Referenced entity does not exist.
    NotFound { kind: EntityKind, key: LookupKey },
    /// Blog exists but its owning user does not.
    OwnerMissing { blog: EntityId, user: EntityId },
    /// Email already registered.
    DuplicateEmail(String),
    /// Password does not match the stored hash.
    InvalidCredentials,
    /// Hashing collaborator failed.
    Credentials(CredentialError),
    /// Store-level failure; the transaction was aborted.
    Store(RepoError),
}

impl ServiceError {
    pub fn not_found(kind: EntityKind, id: EntityId) -> Self {
        Self::NotFound {
            kind,
            key: LookupKey::Id(id),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } | Self::OwnerMissing { .. } => ErrorKind::NotFound,
            Self::DuplicateEmail(_) => ErrorKind::Duplicate,
            Self::InvalidCredentials => ErrorKind::Auth,
            Self::Store(_) => ErrorKind::Transaction,
            Self::Credentials(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code reported to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { kind, .. } => match kind {
                EntityKind::User => "USER_NOT_FOUND",
                EntityKind::Blog => "BLOG_NOT_FOUND",
                EntityKind::Comment => "COMMENT_NOT_FOUND",
            },
            Self::OwnerMissing { .. } => "OWNER_MISSING",
            Self::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Credentials(_) => "INTERNAL_ERROR",
            Self::Store(_) => "TRANSACTION_ERROR",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, key } => write!(f, "{kind} not found: {key}"),
            Self::OwnerMissing { blog, user } => {
                write!(f, "blog {blog} is linked to missing user {user}")
            }
            Self::DuplicateEmail(email) => write!(f, "user already exists: {email}"),
            Self::InvalidCredentials => write!(f, "password is incorrect"),
            Self::Credentials(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "store operation failed: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Credentials(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { kind, id } => Self::not_found(kind, id),
            RepoError::DuplicateEmail(email) => Self::DuplicateEmail(email),
            other => Self::Store(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CredentialError> for ServiceError {
    fn from(value: CredentialError) -> Self {
        Self::Credentials(value)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(value.into())
    }
}
