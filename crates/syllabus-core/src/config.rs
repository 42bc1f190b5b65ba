//! Runtime configuration
//!
//! Resolved in layers, later ones winning: built-in defaults, an optional
//! TOML file, then environment variables. Command-line flags are applied on
//! top by the binary.

use std::path::{Path, PathBuf};

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE: &str = "syllabus.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Storage engine selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_type: DbType,
    /// Directory holding both database files.
    pub data_dir: PathBuf,
    /// Knowledge graph database, relative to `data_dir`.
    pub kg_db_file: String,
    /// Scraper output used to seed the default graph, relative to `data_dir`.
    pub scraper_db_file: String,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_type: DbType::Sqlite,
            data_dir: PathBuf::from("./data"),
            kg_db_file: "knowledge_graphs.db".to_string(),
            scraper_db_file: "graph.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3334,
        }
    }
}

impl Config {
    /// Defaults, overlaid with the TOML file and the process environment
    /// (`DB_TYPE`, `DATA_DIR`, `KG_DB_FILE`, `SCRAPER_DB_FILE`, `HOST`, `PORT`).
    ///
    /// An explicit `path` must exist; the implicit [`CONFIG_FILE`] is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(path, Environment::default())
    }

    /// Like [`Config::load`], with `env` standing in for the process environment.
    pub fn load_from(path: Option<&Path>, env: config::Map<String, String>) -> Result<Self, ConfigError> {
        Self::build(path, Environment::default().source(Some(env)))
    }

    fn build(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::new(CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let config: Config = config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn kg_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.kg_db_file)
    }

    pub fn scraper_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.scraper_db_file)
    }
}
