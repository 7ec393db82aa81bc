//! Checks a document passes before it reaches the execution engine.
//!
//! # Responsibility
//! - Refuse documents nested deeper than [`MAX_NESTING`] by scanning raw text,
//!   before any recursive parser sees them.
//! - Pick the operation to run and enforce the transport's mutation policy.
//! - Refuse selection sets where one response key names different fields or
//!   different arguments.
//!
//! # Invariants
//! - Every rejection happens before a store connection is checked out.
//! - The nesting scan is iterative and linear in the document length.

use crate::gateway::response::{
    GraphError, Location, MUTATION_NOT_ALLOWED, PARSE_FAILED, VALIDATION_FAILED,
};
use async_graphql::parser::types::{
    DocumentOperations, ExecutableDocument, Field, OperationDefinition, OperationType, Selection,
    SelectionSet,
};
use async_graphql::parser::{parse_query, Error as SyntaxError};
use async_graphql::Positioned;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;

/// Deepest bracket nesting (`{`, `[`, `(`) a document may use.
pub const MAX_NESTING: usize = 64;

/// Failure that rejects a whole document before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    Parse {
        message: String,
        locations: Vec<Location>,
    },
    Validation {
        message: String,
        locations: Vec<Location>,
    },
    /// Mutation sent over a transport that only permits queries.
    MutationNotAllowed,
}

impl GatewayError {
    fn validation(message: impl Into<String>, locations: Vec<Location>) -> Self {
        Self::Validation {
            message: message.into(),
            locations,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => PARSE_FAILED,
            Self::Validation { .. } => VALIDATION_FAILED,
            Self::MutationNotAllowed => MUTATION_NOT_ALLOWED,
        }
    }

    pub fn to_graph_error(&self) -> GraphError {
        let locations = match self {
            Self::Parse { locations, .. } | Self::Validation { locations, .. } => {
                locations.clone()
            }
            Self::MutationNotAllowed => Vec::new(),
        };
        GraphError::request(self.to_string(), self.code(), locations)
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse { message, .. } | Self::Validation { message, .. } => {
                f.write_str(message)
            }
            Self::MutationNotAllowed => {
                f.write_str("mutations are only accepted in POST requests")
            }
        }
    }
}

impl Error for GatewayError {}

impl From<SyntaxError> for GatewayError {
    fn from(value: SyntaxError) -> Self {
        Self::Parse {
            message: value.to_string(),
            locations: value.positions().map(Location::from).collect(),
        }
    }
}

/// Runs every check and returns the kind of the selected operation.
pub(crate) fn preflight(
    query: &str,
    operation_name: Option<&str>,
    allow_mutations: bool,
) -> Result<OperationType, GatewayError> {
    check_nesting(query, MAX_NESTING)?;
    let document = parse_query(query)?;
    let operation = select_operation(&document, operation_name)?;
    if operation.ty == OperationType::Mutation && !allow_mutations {
        return Err(GatewayError::MutationNotAllowed);
    }

    check_response_keys(&operation.selection_set.node)?;
    for fragment in document.fragments.values() {
        check_response_keys(&fragment.node.selection_set.node)?;
    }
    Ok(operation.ty)
}

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl Cursor<'_> {
    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.bump() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_string(&mut self) {
        while let Some(ch) = self.bump() {
            match ch {
                '\\' => {
                    self.bump();
                }
                '"' | '\n' => break,
                _ => {}
            }
        }
    }

    fn skip_block_string(&mut self) {
        let mut quotes = 0;
        while let Some(ch) = self.bump() {
            match ch {
                '"' => {
                    quotes += 1;
                    if quotes == 3 {
                        return;
                    }
                }
                // Escaped triple quote.
                '\\' => {
                    quotes = 0;
                    if self.eat('"') && self.eat('"') {
                        self.eat('"');
                    }
                }
                _ => quotes = 0,
            }
        }
    }
}

/// Rejects `source` when brackets outside strings and comments nest deeper
/// than `limit`.
pub(crate) fn check_nesting(source: &str, limit: usize) -> Result<(), GatewayError> {
    let mut cursor = Cursor {
        chars: source.chars().peekable(),
        line: 1,
        column: 0,
    };
    let mut depth = 0usize;

    while let Some(ch) = cursor.bump() {
        match ch {
            '#' => cursor.skip_comment(),
            '"' => {
                if cursor.eat('"') {
                    if cursor.eat('"') {
                        cursor.skip_block_string();
                    }
                } else {
                    cursor.skip_string();
                }
            }
            '{' | '[' | '(' => {
                depth += 1;
                if depth > limit {
                    return Err(GatewayError::Parse {
                        message: format!("document nesting exceeds the limit of {limit}"),
                        locations: vec![cursor.location()],
                    });
                }
            }
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn select_operation<'d>(
    document: &'d ExecutableDocument,
    name: Option<&str>,
) -> Result<&'d OperationDefinition, GatewayError> {
    match (&document.operations, name) {
        (DocumentOperations::Single(operation), None) => Ok(&operation.node),
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .iter()
            .find(|(candidate, _)| candidate.as_str() == name)
            .map(|(_, operation)| &operation.node)
            .ok_or_else(|| unknown_operation(name)),
        (DocumentOperations::Single(_), Some(name)) => Err(unknown_operation(name)),
        (DocumentOperations::Multiple(operations), None) => {
            let mut all = operations.values();
            match (all.next(), all.next()) {
                (Some(only), None) => Ok(&only.node),
                _ => Err(GatewayError::validation(
                    "operationName is required when the document holds several operations",
                    Vec::new(),
                )),
            }
        }
    }
}

fn unknown_operation(name: &str) -> GatewayError {
    GatewayError::validation(format!("unknown operation named `{name}`"), Vec::new())
}

/// Fields selected directly or through inline fragments; named fragment
/// definitions are checked on their own.
fn collect_fields<'d>(set: &'d SelectionSet, out: &mut Vec<&'d Positioned<Field>>) {
    for item in &set.items {
        match &item.node {
            Selection::Field(field) => out.push(field),
            Selection::InlineFragment(fragment) => {
                collect_fields(&fragment.node.selection_set.node, out)
            }
            Selection::FragmentSpread(_) => {}
        }
    }
}

fn check_response_keys(set: &SelectionSet) -> Result<(), GatewayError> {
    let mut fields = Vec::new();
    collect_fields(set, &mut fields);

    let mut seen: HashMap<&str, &Positioned<Field>> = HashMap::new();
    for field in fields {
        let key = field.node.response_key().node.as_str();
        match seen.get(key) {
            Some(first) if !same_field(&first.node, &field.node) => {
                return Err(GatewayError::validation(
                    format!(
                        "response key `{key}` is used by `{}` and `{}` with different arguments or fields; alias one of them",
                        first.node.name.node, field.node.name.node
                    ),
                    vec![Location::from(first.pos), Location::from(field.pos)],
                ));
            }
            Some(_) => {}
            None => {
                seen.insert(key, field);
            }
        }
        check_response_keys(&field.node.selection_set.node)?;
    }
    Ok(())
}

fn same_field(first: &Field, second: &Field) -> bool {
    first.name.node == second.name.node
        && first.arguments.len() == second.arguments.len()
        && first.arguments.iter().all(|(name, value)| {
            second
                .arguments
                .iter()
                .any(|(other_name, other_value)| {
                    other_name.node == name.node && other_value.node == value.node
                })
        })
}
