//! Configuration resolution for cinescore-rf
//!
//! The OMDb API key resolves through three tiers with Database → ENV → TOML
//! priority. The database is authoritative; the settings endpoint writes
//! there and syncs the TOML backup best-effort.

use cinescore_common::config::{write_toml_config, TomlConfig};
use cinescore_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{info, warn};

/// Environment variable carrying the OMDb API key
pub const OMDB_API_KEY_ENV: &str = "CINESCORE_OMDB_API_KEY";

/// Resolve OMDb API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_omdb_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<String> {
    let mut sources = Vec::new();

    // Tier 1: Database (authoritative)
    let db_key = crate::db::settings::get_omdb_api_key(db).await?;
    if let Some(key) = &db_key {
        if is_valid_key(key) {
            sources.push("database");
        }
    }

    // Tier 2: Environment variable
    let env_key = std::env::var(OMDB_API_KEY_ENV).ok();
    if let Some(key) = &env_key {
        if is_valid_key(key) {
            sources.push("environment");
        }
    }

    // Tier 3: TOML config
    let toml_key = toml_config.omdb_api_key.as_ref();
    if let Some(key) = toml_key {
        if is_valid_key(key) {
            sources.push("TOML");
        }
    }

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "OMDb API key found in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    // Resolution priority
    if let Some(key) = db_key {
        if is_valid_key(&key) {
            info!("OMDb API key loaded from database");
            return Ok(key);
        }
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("OMDb API key loaded from environment variable");
            return Ok(key);
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(key) {
            info!("OMDb API key loaded from TOML config");
            return Ok(key.clone());
        }
    }

    // No valid key found
    Err(Error::Config(
        "OMDb API key not configured. Please configure using one of:\n\
         1. Settings API: POST /api/settings/omdb_api_key\n\
         2. Environment: CINESCORE_OMDB_API_KEY=your-key-here\n\
         3. TOML config: ~/.config/cinescore/config.toml (omdb_api_key = \"your-key\")\n\
         \n\
         Obtain API key at: https://www.omdbapi.com/apikey.aspx"
            .to_string(),
    ))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Sync the OMDb API key from database to the TOML file (best-effort backup)
pub async fn sync_api_key_to_toml(api_key: String, toml_path: &Path) -> Result<()> {
    // Read existing TOML (or start from defaults)
    let mut config = if toml_path.exists() {
        let content = std::fs::read_to_string(toml_path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?
    } else {
        TomlConfig::default()
    };

    config.omdb_api_key = Some(api_key);

    match write_toml_config(&config, toml_path) {
        Ok(()) => {
            info!("Settings synced to TOML: {}", toml_path.display());
            Ok(())
        }
        Err(e) => {
            warn!("TOML write failed (database write succeeded): {}", e);
            Ok(()) // Graceful degradation
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[tokio::test]
    async fn test_sync_api_key_preserves_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        write_toml_config(
            &TomlConfig {
                data_dir: Some("/tmp/cs".to_string()),
                omdb_api_key: None,
                bind_addr: Some("127.0.0.1:5731".to_string()),
            },
            &path,
        )
        .unwrap();

        sync_api_key_to_toml("fresh-key".to_string(), &path)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: TomlConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.omdb_api_key, Some("fresh-key".to_string()));
        assert_eq!(parsed.data_dir, Some("/tmp/cs".to_string()));
        assert_eq!(parsed.bind_addr, Some("127.0.0.1:5731".to_string()));
    }
}
