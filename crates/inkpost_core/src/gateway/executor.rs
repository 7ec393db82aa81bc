//! Executes one gateway request against the pooled store.
//!
//! # Responsibility
//! - Run the document checks, then hand the request to the engine with a
//!   connection checked out for this request alone.
//! - Translate the engine response into the gateway wire shape.
//!
//! # Invariants
//! - Rejected documents never check out a connection or run a resolver.
//! - A failing field resolves to `null` and adds one error entry carrying its
//!   response path; sibling fields still run.
//! - Mutation root fields run one after another, each as its own
//!   coordinator operation.

use crate::db::{Database, DbConnection, DbResult};
use crate::gateway::preflight::{preflight, GatewayError};
use crate::gateway::resolve::{ResolveContext, ResolveError};
use crate::gateway::response::{GraphError, GraphRequest, GraphResponse};
use crate::gateway::schema::Schema;
use crate::repo::blog_repo::SqliteBlogRepository;
use crate::repo::comment_repo::SqliteCommentRepository;
use crate::repo::user_repo::SqliteUserRepository;
use crate::service::coordinator::ConsistencyCoordinator;
use crate::service::credentials::PasswordHasher;
use async_graphql::parser::types::OperationType;
use async_graphql::{Request, Variables};
use log::{error, info, warn};
use rusqlite::Connection;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Transport-level restrictions applied before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    pub allow_mutations: bool,
}

impl ExecutionPolicy {
    /// Policy for read-only transports such as `GET`.
    pub fn read_only() -> Self {
        Self {
            allow_mutations: false,
        }
    }
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            allow_mutations: true,
        }
    }
}

/// Store access owned by one request while the engine resolves it.
pub(crate) struct RequestScope {
    conn: Mutex<DbConnection>,
    hasher: Arc<dyn PasswordHasher>,
}

impl RequestScope {
    /// Runs `f` with repositories and a coordinator bound to this request's
    /// connection.
    pub(crate) fn run<T>(
        &self,
        f: impl FnOnce(&ResolveContext<'_>) -> Result<T, ResolveError>,
    ) -> Result<T, ResolveError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| ResolveError::internal("request connection lock poisoned"))?;
        let conn: &Connection = &guard;

        let users = SqliteUserRepository::new(conn);
        let blogs = SqliteBlogRepository::new(conn);
        let comments = SqliteCommentRepository::new(conn);
        let coordinator = ConsistencyCoordinator::new(conn, self.hasher.as_ref());
        f(&ResolveContext {
            users: &users,
            blogs: &blogs,
            comments: &comments,
            coordinator: &coordinator,
        })
    }
}

/// Runs `request` on a connection checked out of `db`.
///
/// Request-level problems come back as a rejected response and field-level
/// problems as error entries next to partial data.
///
/// # Errors
/// - Returns a store error only when no connection could be checked out.
pub fn execute_request(
    db: &Database,
    hasher: Arc<dyn PasswordHasher>,
    schema: &Schema,
    request: &GraphRequest,
    policy: ExecutionPolicy,
) -> DbResult<GraphResponse> {
    let started_at = Instant::now();
    let operation_name = request.operation_name.as_deref();

    let kind = match preflight(&request.query, operation_name, policy.allow_mutations) {
        Ok(kind) => kind,
        Err(err) => return Ok(reject(&err)),
    };

    let scope = RequestScope {
        conn: Mutex::new(db.connection()?),
        hasher,
    };
    let mut engine_request = Request::new(request.query.as_str()).data(scope);
    if let Some(variables) = &request.variables {
        engine_request =
            engine_request.variables(Variables::from_json(Value::Object(variables.clone())));
    }
    if let Some(name) = operation_name {
        engine_request = engine_request.operation_name(name);
    }

    let response = futures::executor::block_on(schema.engine().execute(engine_request));
    let errors: Vec<GraphError> = response.errors.into_iter().map(GraphError::from).collect();

    if errors.iter().any(GraphError::is_request_level) {
        warn!(
            "event=gateway_execute module=gateway status=rejected code={} error_count={} first_error={}",
            errors[0].code(),
            errors.len(),
            errors[0].message
        );
        return Ok(GraphResponse::rejected(errors));
    }

    let data = response.data.into_json().unwrap_or_else(|err| {
        error!(
            "event=gateway_execute module=gateway status=error error_code=encode_failed error={}",
            err
        );
        Value::Null
    });

    info!(
        "event=gateway_execute module=gateway status={} op_kind={} op_name={} field_errors={} duration_ms={}",
        if errors.is_empty() { "ok" } else { "partial" },
        operation_kind(kind),
        operation_name.unwrap_or("-"),
        errors.len(),
        started_at.elapsed().as_millis()
    );
    Ok(GraphResponse::executed(data, errors))
}

fn reject(err: &GatewayError) -> GraphResponse {
    warn!(
        "event=gateway_execute module=gateway status=rejected code={} error_count=1 first_error={}",
        err.code(),
        err
    );
    GraphResponse::rejected(vec![err.to_graph_error()])
}

fn operation_kind(kind: OperationType) -> &'static str {
    match kind {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    }
}
