use crate::config::ServerConfig;
use crate::error::ServerResult;
use inkpost_core::{build_schema, BcryptHasher, Database, PasswordHasher, Schema};
use std::sync::Arc;

/// Shared handles cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub schema: Arc<Schema>,
}

impl AppState {
    /// Opens and migrates the configured store.
    pub fn from_config(config: &ServerConfig) -> ServerResult<Self> {
        let db = Database::open_with(&config.database_path, config.max_connections)?;
        let hasher = BcryptHasher::try_new(config.bcrypt_cost)?;
        Self::new(db, Arc::new(hasher))
    }

    pub fn new(db: Database, hasher: Arc<dyn PasswordHasher>) -> ServerResult<Self> {
        Ok(Self {
            db: Arc::new(db),
            hasher,
            schema: Arc::new(build_schema()?),
        })
    }
}
