//! Core domain logic for the inkpost blogging backend.
//! This crate owns the document store, the cross-entity consistency rules and
//! the query gateway; transports live in other crates.

pub mod db;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{
    open_db, open_db_in_memory, run_in_transaction, Database, DbConnection, DbError, DbResult,
    DEFAULT_MAX_CONNECTIONS,
};
pub use gateway::{
    build_schema, execute_request, ExecutionPolicy, GatewayError, GraphError, GraphRequest,
    GraphResponse, Schema, SchemaError,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSink};
pub use model::blog::{Blog, BlogEdit, NewBlog};
pub use model::comment::{Comment, CommentEdit, NewComment};
pub use model::entity::{Entity, EntityId, EntityKind, Ref};
pub use model::user::{NewUser, User, UserEdit};
pub use model::validation::{parse_id, ValidationError};
pub use repo::blog_repo::{BlogRepository, SqliteBlogRepository};
pub use repo::comment_repo::{CommentRepository, SqliteCommentRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::coordinator::{ConsistencyCoordinator, SignUpRequest};
pub use service::credentials::{BcryptHasher, CredentialError, PasswordHasher};
pub use service::error::{ErrorKind, LookupKey, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
