//! HTTP front door for the inkpost query gateway.
//!
//! Serves `POST /graphql`, read-only `GET /graphql` and `GET /health`; all
//! store work runs on blocking worker threads.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ConfigOverrides, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::InkpostServer;
pub use state::AppState;
