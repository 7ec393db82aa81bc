//! Required-field and identifier validation shared by all entity inputs.

use crate::model::entity::{EntityId, EntityKind};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Input failed required-field or identifier checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is empty or whitespace-only.
    MissingField {
        entity: EntityKind,
        field: &'static str,
    },
    /// Identifier argument is not a valid entity id.
    MalformedId { field: String, value: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { entity, field } => {
                write!(f, "{entity} validation failed: `{field}` is required")
            }
            Self::MalformedId { field, value } => {
                write!(f, "invalid id for `{field}`: `{value}`")
            }
        }
    }
}

impl Error for ValidationError {}

/// Rejects blank values for a required field.
pub fn require(entity: EntityKind, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { entity, field });
    }
    Ok(())
}

/// Parses an opaque id supplied by a caller.
pub fn parse_id(field: &str, value: &str) -> Result<EntityId, ValidationError> {
    Uuid::parse_str(value.trim()).map_err(|_| ValidationError::MalformedId {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_id, require, ValidationError};
    use crate::model::entity::EntityKind;

    #[test]
    fn require_rejects_blank_values() {
        let err = require(EntityKind::Blog, "title", "  \n").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                entity: EntityKind::Blog,
                field: "title"
            }
        );
        assert!(require(EntityKind::Blog, "title", "x").is_ok());
    }

    #[test]
    fn parse_id_rejects_non_uuid_text() {
        let err = parse_id("id", "5f1d7c").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedId { .. }));
        assert!(err.to_string().contains("5f1d7c"));
    }
}
