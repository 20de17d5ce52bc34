use anyhow::{Context, Result};
use clap::Parser;
use dbstudio_core::{DatabaseHandle, Dialect};
use dbstudio_server::{HttpServer, ServerConfig, router};
use dbstudio_sqlx::{ConnectionConfig, NetworkOptions, SqlxHandle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "dbstudio",
    version,
    about = "Expose a SQLite, PostgreSQL or MySQL database over HTTP",
    disable_help_subcommand = true
)]
struct Cli {
    /// Database type: sqlite, postgresql, or mysql
    #[arg(long, value_name = "TYPE")]
    db: Dialect,

    /// Port to listen on
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Hostname to listen on
    #[arg(long, default_value = "localhost")]
    host: String,

    /// SQLite database file path (in-memory when omitted)
    #[arg(long, value_name = "FILE")]
    path: Option<PathBuf>,

    /// Database connection URL (PostgreSQL/MySQL)
    #[arg(long)]
    url: Option<String>,

    /// Database host (PostgreSQL/MySQL)
    #[arg(long = "db-host", alias = "dbHost", value_name = "HOST")]
    db_host: Option<String>,

    /// Database port (PostgreSQL/MySQL)
    #[arg(long = "db-port", alias = "dbPort", value_name = "PORT")]
    db_port: Option<u16>,

    /// Database user (PostgreSQL/MySQL)
    #[arg(long = "db-user", alias = "dbUser", value_name = "USER")]
    db_user: Option<String>,

    /// Database password (PostgreSQL/MySQL)
    #[arg(
        long = "db-password",
        alias = "dbPassword",
        env = "DB_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD"
    )]
    db_password: Option<String>,

    /// Database name (PostgreSQL/MySQL)
    #[arg(long = "db-name", alias = "dbName", value_name = "NAME")]
    db_name: Option<String>,

    /// Serve a built UI from this directory
    #[arg(long = "ui-dir", value_name = "DIR")]
    ui_dir: Option<PathBuf>,
}

impl Cli {
    fn connection_config(&self) -> Result<ConnectionConfig> {
        let network = || NetworkOptions {
            host: self
                .db_host
                .clone()
                .unwrap_or_else(|| "localhost".to_string()),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
        };
        Ok(match self.db {
            Dialect::Sqlite => {
                let path = match &self.path {
                    Some(p) => Some(
                        std::path::absolute(p)
                            .with_context(|| format!("invalid sqlite path {}", p.display()))?,
                    ),
                    None => None,
                };
                ConnectionConfig::Sqlite { path }
            }
            Dialect::Postgresql => ConnectionConfig::Postgres {
                url: self.url.clone(),
                options: network(),
            },
            Dialect::Mysql => ConnectionConfig::Mysql {
                url: self.url.clone(),
                options: network(),
            },
        })
    }

    fn server_config(&self) -> ServerConfig {
        let config = ServerConfig::default()
            .set_host(self.host.clone())
            .set_port(self.port);
        match &self.ui_dir {
            Some(dir) => config.set_ui_dir(dir),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let connection = cli.connection_config()?;
    let server_config = cli.server_config();

    let handle = SqlxHandle::connect(&connection)
        .await
        .with_context(|| format!("failed to connect to {} database", connection.dialect()))?;
    let handle = Arc::new(handle);
    info!(dialect = %handle.dialect(), addr = %server_config.addr(), "starting dbstudio");

    let app = router(Arc::clone(&handle), &server_config);
    let server = HttpServer::new(app, &server_config);
    let addr = server.addr().to_string();
    server
        .start()
        .await
        .with_context(|| format!("http server on {addr} failed"))?;

    handle.close().await;
    Ok(())
}
