//! Wire shapes for gateway requests and responses.

use async_graphql::{PathSegment as EnginePathSegment, Pos, ServerError, Value as EngineValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PARSE_FAILED: &str = "GRAPHQL_PARSE_FAILED";
pub const VALIDATION_FAILED: &str = "GRAPHQL_VALIDATION_FAILED";
pub const MUTATION_NOT_ALLOWED: &str = "MUTATION_NOT_ALLOWED";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Client request as posted to the gateway endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    #[serde(default)]
    pub operation_name: Option<String>,
}

impl GraphRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        if let Value::Object(map) = variables {
            self.variables = Some(map);
        }
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// 1-based position in the request document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl From<Pos> for Location {
    fn from(value: Pos) -> Self {
        Self {
            line: value.line,
            column: value.column,
        }
    }
}

/// One step in the response path of a failed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<EnginePathSegment> for PathSegment {
    fn from(value: EnginePathSegment) -> Self {
        match value {
            EnginePathSegment::Field(name) => Self::Key(name),
            EnginePathSegment::Index(index) => Self::Index(index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorExtensions {
    pub code: String,
}

/// Error entry reported in the `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    pub extensions: ErrorExtensions,
}

impl GraphError {
    /// Request-level error not tied to a response path.
    pub fn request(message: impl Into<String>, code: &str, locations: Vec<Location>) -> Self {
        Self {
            message: message.into(),
            locations,
            path: None,
            extensions: ErrorExtensions {
                code: code.to_string(),
            },
        }
    }

    pub fn code(&self) -> &str {
        &self.extensions.code
    }

    /// True for errors raised before any field ran.
    pub fn is_request_level(&self) -> bool {
        self.path.is_none()
    }
}

impl From<ServerError> for GraphError {
    /// Engine errors without a `code` extension are validation failures when
    /// they carry no path and internal failures otherwise.
    fn from(value: ServerError) -> Self {
        let code = value
            .extensions
            .as_ref()
            .and_then(|extensions| extensions.get("code"))
            .and_then(|code| match code {
                EngineValue::String(code) => Some(code.clone()),
                _ => None,
            });
        let path = (!value.path.is_empty())
            .then(|| value.path.into_iter().map(PathSegment::from).collect::<Vec<_>>());
        let code = code.unwrap_or_else(|| {
            if path.is_none() {
                VALIDATION_FAILED.to_string()
            } else {
                INTERNAL_ERROR.to_string()
            }
        });

        Self {
            message: value.message,
            locations: value.locations.into_iter().map(Location::from).collect(),
            path,
            extensions: ErrorExtensions { code },
        }
    }
}

/// Result of one gateway request.
///
/// `data` is `null` when the document was rejected before execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphResponse {
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphError>,
    #[serde(skip)]
    rejected: bool,
}

impl GraphResponse {
    pub fn executed(data: Value, errors: Vec<GraphError>) -> Self {
        Self {
            data: Some(data),
            errors,
            rejected: false,
        }
    }

    pub fn rejected(errors: Vec<GraphError>) -> Self {
        Self {
            data: None,
            errors,
            rejected: true,
        }
    }

    /// True when parsing or validation failed and nothing ran.
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }
}
