//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `LPRS_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file never stops startup; it is logged
//! and compiled defaults are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LPRS_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "lprs.db";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
/// Matches the multipart parse limit of the sensor firmware uploads (32 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 << 20;
pub const DEFAULT_RECENT_LIMIT: i64 = 1000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Raw contents of the TOML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub max_body_bytes: Option<usize>,
    pub recent_limit: Option<i64>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse a config file. Errors are reported, not swallowed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the given file, or the first platform config file that exists.
    ///
    /// Falls back to an empty config with a warning when nothing usable is found.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let candidate = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_paths().into_iter().find(|p| p.exists()),
        };

        let Some(path) = candidate else {
            info!("No config file found, using compiled defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Candidate config file locations, most specific first
fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("lprs").join("config.toml"));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc/lprs/config.toml"));
    }
    paths
}

/// Resolve the root folder following the priority order in the module docs
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lprs"))
        .unwrap_or_else(|| PathBuf::from("./lprs_data"))
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub recent_limit: i64,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge a TOML config over compiled defaults for the given root folder
    pub fn from_toml(root_folder: PathBuf, toml: &TomlConfig) -> Self {
        Self {
            root_folder,
            bind_address: toml
                .bind_address
                .clone()
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: toml.port.unwrap_or(DEFAULT_PORT),
            max_body_bytes: toml.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
            recent_limit: toml
                .recent_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_RECENT_LIMIT),
            log_level: toml
                .log_level
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    pub fn layout(&self) -> RootLayout {
        RootLayout::new(self.root_folder.clone())
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// On-disk layout below the root folder
///
/// ```text
/// <root>/lprs.db
/// <root>/data/json/{event_id}_{name}
/// <root>/data/images/{image_id}_{name}
/// ```
#[derive(Debug, Clone)]
pub struct RootLayout {
    root: PathBuf,
}

impl RootLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Create the root folder and data directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        let data = self.data_dir();
        for dir in [self.root.clone(), data.join("json"), data.join("images")] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }
}
