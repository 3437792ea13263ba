use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// Owner whose closet and outfits this device manages
    pub owner_id: String,
    /// Sync server settings
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the sync server
    pub server_url: Option<String>,
    /// Bearer token for the sync server
    pub api_key: Option<String>,
    /// Run a background sync loop during long-lived commands
    pub auto_sync: bool,
    /// Seconds between background sync cycles
    pub interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            database_path: PathBuf::from(&home).join(".lookbook").join("lookbook.db"),
            owner_id: "default".to_string(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_key: None,
            auto_sync: true,
            interval_secs: 30,
        }
    }
}

impl SyncConfig {
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some() && self.api_key.is_some()
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("LOOKBOOK_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(owner_id) = std::env::var("LOOKBOOK_OWNER_ID") {
            config.owner_id = owner_id;
        }
        if let Ok(url) = std::env::var("LOOKBOOK_SYNC_URL") {
            config.sync.server_url = Some(url);
        }
        if let Ok(key) = std::env::var("LOOKBOOK_SYNC_API_KEY") {
            config.sync.api_key = Some(key);
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/lookbook/config.yaml
    pub fn default_config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("lookbook")
            .join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config
            .database_path
            .to_string_lossy()
            .contains("lookbook.db"));
        assert_eq!(config.owner_id, "default");
        assert!(!config.sync.is_configured());
        assert!(config.sync.auto_sync);
        assert_eq!(config.sync.interval_secs, 30);
    }

    #[test]
    fn test_load_no_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.owner_id, "default");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /custom/path/db.sqlite").unwrap();
        writeln!(file, "owner_id: ana").unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  server_url: \"https://sync.example.com\"").unwrap();
        writeln!(file, "  api_key: \"secret\"").unwrap();
        writeln!(file, "  interval_secs: 60").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(
            config.database_path,
            PathBuf::from("/custom/path/db.sqlite")
        );
        assert_eq!(config.owner_id, "ana");
        assert!(config.sync.is_configured());
        assert_eq!(config.sync.interval_secs, 60);
    }

    #[test]
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "owner_id: fromfile").unwrap();

        // Set env var
        std::env::set_var("LOOKBOOK_OWNER_ID", "fromenv");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.owner_id, "fromenv");

        // Clean up
        std::env::remove_var("LOOKBOOK_OWNER_ID");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
