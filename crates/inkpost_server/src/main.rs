use anyhow::Context;
use clap::Parser;
use inkpost_core::{init_logging, LogSink};
use inkpost_server::{ConfigOverrides, InkpostServer, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "inkpost", about = "Blogging backend with a typed query gateway", version)]
struct Cli {
    /// TOML file overlaid on the built-in defaults
    #[arg(short, long, env = "INKPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:4000
    #[arg(long, env = "INKPOST_BIND")]
    bind: Option<SocketAddr>,

    /// Listen port; replaces the port of the bind address
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// SQLite file, or :memory:
    #[arg(long, env = "INKPOST_DATABASE")]
    database: Option<PathBuf>,

    #[arg(long, env = "INKPOST_LOG_LEVEL")]
    log_level: Option<String>,

    /// Write rotating log files here instead of stderr
    #[arg(long, env = "INKPOST_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[arg(long, env = "INKPOST_BCRYPT_COST")]
    bcrypt_cost: Option<u32>,

    /// Most store connections open at once
    #[arg(long, env = "INKPOST_MAX_CONNECTIONS")]
    max_connections: Option<u32>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_addr: self.bind,
            port: self.port,
            database_path: self.database.clone(),
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            bcrypt_cost: self.bcrypt_cost,
            max_connections: self.max_connections,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?.with_overrides(cli.overrides());

    let sink = match &config.log_dir {
        Some(dir) => LogSink::directory(dir).map_err(anyhow::Error::msg)?,
        None => LogSink::Stderr,
    };
    init_logging(&config.log_level, sink)
        .map_err(anyhow::Error::msg)
        .context("failed to initialize logging")?;

    let server = InkpostServer::new(config).context("failed to start server")?;
    server.serve().await?;
    Ok(())
}
