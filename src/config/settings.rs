use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;

use crate::data::MAX_SNAPSHOT_AGE_DAYS;
use crate::util::paths::{config_path, database_path};

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot database file
    pub database_path: PathBuf,
    /// Snapshots older than this are never restored
    pub max_age: Duration,
    /// Capture configuration
    pub capture: CaptureConfig,
    /// Restore configuration
    pub restore: RestoreConfig,
    /// Framework attach configuration
    pub attach: AttachConfig,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Routes eligible for capture; `None` allows every route
    pub routes: Option<Vec<String>>,
    pub inline_same_origin_styles: bool,
}

impl CaptureConfig {
    pub fn allows(&self, route: &str) -> bool {
        match &self.routes {
            Some(routes) => routes.iter().any(|r| r == route),
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Id of the render container element
    pub container_id: String,
    /// Paint into an isolated overlay instead of the container
    pub overlay: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct AttachConfig {
    pub transitions: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlStorageConfig {
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlSnapshotConfig {
    pub max_age_days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlCaptureConfig {
    pub routes: Option<Vec<String>>,
    pub inline_same_origin_styles: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlRestoreConfig {
    pub container_id: Option<String>,
    pub overlay: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlAttachConfig {
    pub transitions: Option<bool>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub storage: Option<TomlStorageConfig>,
    pub snapshot: Option<TomlSnapshotConfig>,
    pub capture: Option<TomlCaptureConfig>,
    pub restore: Option<TomlRestoreConfig>,
    pub attach: Option<TomlAttachConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: database_path(),
            max_age: Duration::days(MAX_SNAPSHOT_AGE_DAYS),
            capture: CaptureConfig {
                routes: None,
                inline_same_origin_styles: true,
            },
            restore: RestoreConfig {
                container_id: "root".to_string(),
                overlay: false,
            },
            attach: AttachConfig { transitions: true },
        }
    }
}

impl Config {
    /// Load configuration from the default config file, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from `path`, merging with defaults.
    ///
    /// A missing or unparsable file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Config::default();

        let Ok(contents) = fs::read_to_string(path) else {
            return config;
        };
        match toml::from_str::<TomlConfig>(&contents) {
            Ok(toml_config) => config.merge(toml_config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config file; using defaults"
                );
            }
        }

        config
    }

    /// Parse a TOML string on top of the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let toml_config = toml::from_str::<TomlConfig>(contents)?;
        let mut config = Config::default();
        config.merge(toml_config);
        Ok(config)
    }

    /// Apply every key present in `toml_config`
    pub fn merge(&mut self, toml_config: TomlConfig) {
        if let Some(storage) = toml_config.storage {
            if let Some(database) = storage.database {
                self.database_path = database;
            }
        }

        if let Some(snapshot) = toml_config.snapshot {
            if let Some(days) = snapshot.max_age_days {
                self.max_age = Duration::days(i64::from(days));
            }
        }

        if let Some(capture) = toml_config.capture {
            if capture.routes.is_some() {
                self.capture.routes = capture.routes;
            }
            if let Some(inline) = capture.inline_same_origin_styles {
                self.capture.inline_same_origin_styles = inline;
            }
        }

        if let Some(restore) = toml_config.restore {
            if let Some(container_id) = restore.container_id {
                self.restore.container_id = container_id;
            }
            if let Some(overlay) = restore.overlay {
                self.restore.overlay = overlay;
            }
        }

        if let Some(attach) = toml_config.attach {
            if let Some(transitions) = attach.transitions {
                self.attach.transitions = transitions;
            }
        }
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = path;
        self
    }

    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.restore.container_id = id.into();
        self
    }

    pub fn with_overlay(mut self, overlay: bool) -> Self {
        self.restore.overlay = overlay;
        self
    }

    pub fn with_capture_routes(mut self, routes: Vec<String>) -> Self {
        self.capture.routes = Some(routes);
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}
