//! Command-line argument parsing for SQLChat.

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::validate::{FormInput, RemoteFields};
use clap::Parser;
use std::path::PathBuf;

/// Chat with your SQL database in natural language.
#[derive(Parser, Debug)]
#[command(name = "sqlchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database backend: sqlite or mysql
    #[arg(short = 'b', long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<DatabaseBackend>,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    pub sqlite_path: Option<PathBuf>,

    /// MySQL host (host or host:port)
    #[arg(short = 'H', long, value_name = "HOST")]
    pub mysql_host: Option<String>,

    /// MySQL user
    #[arg(short = 'U', long, value_name = "USER")]
    pub mysql_user: Option<String>,

    /// MySQL password
    #[arg(long, value_name = "PASSWORD", env = "MYSQL_PASSWORD", hide_env_values = true)]
    pub mysql_password: Option<String>,

    /// MySQL database name
    #[arg(short = 'd', long, value_name = "DATABASE")]
    pub mysql_database: Option<String>,

    /// API key for the model endpoint
    #[arg(long, value_name = "KEY", env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier (overrides the config file)
    #[arg(short = 'm', long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Read questions from stdin and print answers to stdout (no terminal UI)
    #[arg(long)]
    pub plain: bool,

    /// Create the sample STUDENT database at PATH and exit
    #[arg(long, value_name = "PATH")]
    pub init_demo: Option<PathBuf>,
}

fn parse_backend(s: &str) -> std::result::Result<DatabaseBackend, String> {
    DatabaseBackend::parse(s)
        .ok_or_else(|| format!("Invalid backend: {s}. Expected: sqlite or mysql"))
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides to the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(backend) = self.backend {
            config.database.backend = backend;
        }
        if let Some(path) = &self.sqlite_path {
            config.database.sqlite_path = path.clone();
        }
        if let Some(host) = &self.mysql_host {
            config.database.host = Some(host.clone());
        }
        if let Some(user) = &self.mysql_user {
            config.database.user = Some(user.clone());
        }
        if let Some(database) = &self.mysql_database {
            config.database.database = Some(database.clone());
        }
    }

    /// Builds the initial form contents from `config` and the secrets given
    /// on the command line or in the environment.
    pub fn form_input(&self, config: &Config) -> FormInput {
        let db = &config.database;
        FormInput {
            api_key: self.api_key.clone().unwrap_or_default(),
            backend: db.backend,
            sqlite_path: db.sqlite_path.clone(),
            remote: RemoteFields {
                host: db.host.clone().unwrap_or_default(),
                user: db.user.clone().unwrap_or_default(),
                password: self.mysql_password.clone().unwrap_or_default(),
                database: db.database.clone().unwrap_or_default(),
            },
        }
    }
}
