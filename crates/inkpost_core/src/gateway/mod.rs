//! Query gateway: typed request documents in, JSON results out.
//!
//! # Responsibility
//! - Refuse oversized or ambiguous documents before they reach the engine.
//! - Dispatch reads to repositories and writes to the consistency coordinator.
//! - Report per-field failures without aborting sibling fields.
//!
//! # Invariants
//! - Rejected documents execute nothing.
//! - The gateway never touches back-reference lists directly.

pub mod executor;
pub mod preflight;
pub mod resolve;
pub mod response;
pub mod schema;

pub use executor::{execute_request, ExecutionPolicy};
pub use preflight::{GatewayError, MAX_NESTING};
pub use response::{GraphError, GraphRequest, GraphResponse, Location, PathSegment};
pub use schema::{build_schema, Schema, SchemaError, TypeName, MAX_SELECTION_DEPTH};
