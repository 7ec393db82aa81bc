use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use async_graphql::http::GraphiQLSource;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use inkpost_core::{execute_request, ExecutionPolicy, GraphError, GraphRequest, GraphResponse};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const BAD_REQUEST: &str = "BAD_REQUEST";
const GRAPHQL_ENDPOINT: &str = "/graphql";

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /graphql` with a JSON body.
pub async fn graphql_post_handler(
    State(state): State<AppState>,
    body: Result<Json<GraphRequest>, JsonRejection>,
) -> ServerResult<Response> {
    match body {
        Ok(Json(request)) => run_request(state, request, ExecutionPolicy::default()).await,
        Err(rejection) => Ok(bad_request(rejection.body_text())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphGetParams {
    pub query: Option<String>,
    /// JSON-encoded object.
    pub variables: Option<String>,
    pub operation_name: Option<String>,
}

/// `GET /graphql?query=...`; queries only. Browsers asking for HTML without
/// a query get the GraphiQL explorer.
pub async fn graphql_get_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<GraphGetParams>, QueryRejection>,
) -> ServerResult<Response> {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return Ok(bad_request(rejection.body_text())),
    };
    let Some(query) = params.query else {
        if accepts_html(&headers) {
            return Ok(graphiql());
        }
        return Ok(bad_request("missing `query` parameter".to_string()));
    };
    let variables = match params.variables.as_deref().map(parse_variables).transpose() {
        Ok(variables) => variables,
        Err(message) => return Ok(bad_request(message)),
    };

    let request = GraphRequest {
        query,
        variables,
        operation_name: params.operation_name,
    };
    run_request(state, request, ExecutionPolicy::read_only()).await
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("text/html"))
}

fn graphiql() -> Response {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_ENDPOINT).finish()).into_response()
}

fn parse_variables(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err("`variables` must be a JSON object".to_string()),
        Err(err) => Err(format!("`variables` is not valid JSON: {err}")),
    }
}

async fn run_request(
    state: AppState,
    request: GraphRequest,
    policy: ExecutionPolicy,
) -> ServerResult<Response> {
    let AppState { db, hasher, schema } = state;
    let response = tokio::task::spawn_blocking(move || {
        execute_request(&db, hasher, &schema, &request, policy)
    })
    .await
    .map_err(|err| ServerError::Internal(format!("request worker failed: {err}")))??;

    Ok(graph_response(response))
}

fn graph_response(response: GraphResponse) -> Response {
    let status = if response.is_rejected() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (status, Json(response)).into_response()
}

fn bad_request(message: String) -> Response {
    graph_response(GraphResponse::rejected(vec![GraphError::request(
        message,
        BAD_REQUEST,
        Vec::new(),
    )]))
}
