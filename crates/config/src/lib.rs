//! Layered configuration.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. a TOML file (`nous.toml` in the platform config directory, or an
//!    explicit path),
//! 3. `NOUS_`-prefixed environment variables (`NOUS_LOG_LEVEL=debug`).
//!
//! ```toml
//! data_dir = "/srv/nous"
//! database = "nous.db"
//! covers_dir = "covers"
//! log_level = "info"
//! migrate_on_start = true
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "nous.toml";
pub const ENV_PREFIX: &str = "NOUS_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root of everything the application writes.
    pub data_dir: PathBuf,
    /// Database file, relative to `data_dir` unless absolute.
    pub database: PathBuf,
    /// Cover image directory, relative to `data_dir`.
    pub covers_dir: PathBuf,
    /// Default `tracing` filter when `RUST_LOG` isn't set.
    pub log_level: String,
    /// Migrate legacy inline covers to files on every start.
    pub migrate_on_start: bool,
}

impl Config {
    /// Defaults rooted at an arbitrary data directory.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            database: PathBuf::from("nous.db"),
            covers_dir: PathBuf::from("covers"),
            log_level: "info".to_string(),
            migrate_on_start: true,
        }
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "nous").ok_or_raise(|| ErrorKind::NoHomeDirectory)
    }

    /// Load configuration from every source.
    ///
    /// With an explicit `file`, it must exist; otherwise `nous.toml` in the
    /// platform config directory is used if present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let dirs = Self::project_dirs()?;
        let file = match file {
            Some(file) if !file.is_file() => exn::bail!(ErrorKind::MissingFile(file.to_path_buf())),
            Some(file) => file.to_path_buf(),
            None => dirs.config_dir().join(CONFIG_FILE),
        };
        tracing::debug!(file = %file.display(), "loading configuration");
        let figment = Figment::from(Serialized::defaults(Self::with_data_dir(dirs.data_dir())))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX));
        Self::from_figment(&figment)
    }

    /// Extract configuration from an already-assembled [`Figment`].
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        figment.extract().or_raise(|| ErrorKind::Load)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }

    pub fn covers_path(&self) -> PathBuf {
        self.data_dir.join(&self.covers_dir)
    }
}
