use crate::error::{ServerError, ServerResult};
use inkpost_core::service::credentials::DEFAULT_BCRYPT_COST;
use inkpost_core::{default_log_level, BcryptHasher, DEFAULT_MAX_CONNECTIONS};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// SQLite file; `:memory:` selects a private in-memory store.
    pub database_path: PathBuf,
    pub log_level: String,
    /// Rotating log files go here; stderr when unset.
    pub log_dir: Option<PathBuf>,
    pub bcrypt_cost: u32,
    /// Upper bound on pooled store connections; in-memory stores use one.
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            database_path: PathBuf::from("inkpost.sqlite3"),
            log_level: default_log_level().to_string(),
            log_dir: None,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Values taken from the environment or command line. Unset fields keep the
/// file or default value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub bind_addr: Option<SocketAddr>,
    /// Replaces only the port of `bind_addr`.
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub bcrypt_cost: Option<u32>,
    pub max_connections: Option<u32>,
}

impl ServerConfig {
    /// Defaults, or defaults overlaid with the TOML file at `path`.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|err| {
                    ServerError::Config(format!("cannot read `{}`: {err}", path.display()))
                })?;
                Self::from_toml_str(&raw)
            }
        }
    }

    pub fn from_toml_str(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|err| ServerError::Config(err.to_string()))
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(bind_addr) = overrides.bind_addr {
            self.bind_addr = bind_addr;
        }
        if let Some(port) = overrides.port {
            self.bind_addr.set_port(port);
        }
        if let Some(database_path) = overrides.database_path {
            self.database_path = database_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        if let Some(log_dir) = overrides.log_dir {
            self.log_dir = Some(log_dir);
        }
        if let Some(bcrypt_cost) = overrides.bcrypt_cost {
            self.bcrypt_cost = bcrypt_cost;
        }
        if let Some(max_connections) = overrides.max_connections {
            self.max_connections = max_connections;
        }
        self
    }

    /// Checks values that would otherwise only fail once the server runs.
    pub fn validate(&self) -> ServerResult<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ServerError::Config("database_path cannot be empty".to_string()));
        }
        if self.log_level.trim().is_empty() {
            return Err(ServerError::Config("log_level cannot be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ServerError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        BcryptHasher::try_new(self.bcrypt_cost)
            .map_err(|err| ServerError::Config(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:4000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.database_path, PathBuf::from("inkpost.sqlite3"));
        assert_eq!(c.bcrypt_cost, 10);
        assert!(c.log_dir.is_none());
        assert_eq!(c.max_connections, 8);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn toml_overlays_defaults() {
        let c = ServerConfig::from_toml_str(
            r#"
            database_path = "/var/lib/inkpost/store.sqlite3"
            bcrypt_cost = 12
            "#,
        )
        .unwrap();
        assert_eq!(c.database_path, PathBuf::from("/var/lib/inkpost/store.sqlite3"));
        assert_eq!(c.bcrypt_cost, 12);
        assert_eq!(c.bind_addr, ServerConfig::default().bind_addr);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = ServerConfig::from_toml_str("bind_addr = 7").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn port_override_applies_after_bind_addr() {
        let c = ServerConfig::default().with_overrides(ConfigOverrides {
            bind_addr: Some("0.0.0.0:8080".parse().unwrap()),
            port: Some(9000),
            ..ConfigOverrides::default()
        });
        assert_eq!(c.bind_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn out_of_range_bcrypt_cost_fails_validation() {
        let c = ServerConfig::default().with_overrides(ConfigOverrides {
            bcrypt_cost: Some(2),
            ..ConfigOverrides::default()
        });
        assert!(matches!(c.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn zero_max_connections_fails_validation() {
        let c = ServerConfig::from_toml_str("max_connections = 0").unwrap();
        assert!(matches!(c.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inkpost.toml");
        std::fs::write(&path, "bind_addr = \"127.0.0.1:5000\"\n").unwrap();

        let c = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(c.bind_addr.port(), 5000);
        assert!(ServerConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
