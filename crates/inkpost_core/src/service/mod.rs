//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into transactional cross-entity operations.
//! - Keep the gateway and HTTP layers decoupled from storage details.

pub mod coordinator;
pub mod credentials;
pub mod error;
