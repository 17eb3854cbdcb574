//! Configuration loading and data directory resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// TOML configuration file contents
///
/// Lives at `~/.config/cinescore/config.toml`. All fields optional; the
/// service falls back to environment variables and compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Data directory holding the SQLite database
    pub data_dir: Option<String>,
    /// OMDb API key (lowest-priority source; database and env win)
    pub omdb_api_key: Option<String>,
    /// Listen address, e.g. "127.0.0.1:5731"
    pub bind_addr: Option<String>,
}

/// Data directory resolution priority order:
/// 1. Environment variable (highest priority)
/// 2. TOML config file
/// 3. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(env_var_name: &str) -> PathBuf {
    // Priority 1: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 2: TOML config file
    if let Ok(config) = load_toml_config() {
        if let Some(dir) = config.data_dir {
            return PathBuf::from(dir);
        }
    }

    // Priority 3: OS-dependent compiled default
    default_data_dir()
}

/// Default configuration file path for the platform
pub fn config_file_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("cinescore").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Load the TOML config file, if one exists
pub fn load_toml_config() -> Result<TomlConfig> {
    let path = config_file_path()?;
    if !path.exists() {
        return Err(Error::Config(format!("Config file not found: {:?}", path)));
    }
    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write the TOML config file atomically (write to temp, then rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/cinescore (or /var/lib/cinescore for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("cinescore"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/cinescore"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/cinescore
        dirs::data_dir()
            .map(|d| d.join("cinescore"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/cinescore"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\cinescore
        dirs::data_local_dir()
            .map(|d| d.join("cinescore"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\cinescore"))
    } else {
        PathBuf::from("./cinescore_data")
    }
}
