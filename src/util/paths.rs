//! On-disk layout of the prepaint data directory
//!
//! ```text
//! <data dir>/            ~/.prepaint unless overridden with --data-dir
//!   config.toml          user configuration, example written on first load
//!   snapshots.db         SQLite snapshot store
//!   logs/prepaint.log    CLI log output
//! ```

use std::path::PathBuf;
use std::sync::OnceLock;

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Pin the data directory for the process. The first call wins; the CLI
/// makes it before logging or config are set up.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if let Err(rejected) = DATA_DIR.set(path) {
        tracing::debug!(
            path = %rejected.display(),
            "Data directory already pinned, keeping the first one"
        );
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".prepaint"))
        .unwrap_or_else(|| PathBuf::from(".prepaint"))
}

/// Root of the layout above
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Snapshot store used when the config names no database
pub fn database_path() -> PathBuf {
    data_dir().join("snapshots.db")
}

pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

pub fn log_file_path() -> PathBuf {
    logs_dir().join("prepaint.log")
}

pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}
