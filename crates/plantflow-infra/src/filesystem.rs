//! Data directory layout.
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   workflows/
//!     {id}.json
//! ```

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PLANTFLOW_HOME";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PLANTFLOW_HOME` environment variable
/// 2. `~/.plantflow`
/// 3. `.plantflow` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".plantflow");
    }

    PathBuf::from(".plantflow")
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

pub fn workflows_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("workflows")
}
