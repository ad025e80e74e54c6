//! Server configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! config file, then `POKEDEX_*` environment variables. Command-line flags
//! are applied on top by the binary.

use pokedex_core::{PokedexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_NAME: &str = "pokedex";
pub const ENV_PREFIX: &str = "POKEDEX";

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Csv,
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Csv => write!(f, "csv"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub backend: Backend,
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/pokemon.csv`
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
    /// Defaults to `<data_dir>/pokemon.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Load from defaults, `config_file` (or `pokedex.*` if present) and the
    /// process environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::from_sources(config_file, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_sources(config_file: Option<&Path>, env: config::Environment) -> Result<Self> {
        let file = match config_file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        config::Config::builder()
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)
            .and_then(|b| b.set_default("backend", "csv"))
            .and_then(|b| b.set_default("data_dir", DEFAULT_DATA_DIR))
            .map_err(config_error)?
            .add_source(file)
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize::<ServerConfig>())
            .map_err(config_error)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.csv_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("pokemon.csv"))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("pokemon.db"))
    }
}

fn config_error(e: config::ConfigError) -> PokedexError {
    PokedexError::Config(e.to_string())
}
