//! CLI configuration.
//!
//! Resolved from, highest priority first: command-line flags (which fall back
//! to environment variables through clap), the optional store file
//! `<store>/.sync/config.json`, and built-in defaults. The API token is only
//! ever read from `NOTION_TOKEN`.

use kb_sync::PacerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file location relative to the store root.
pub const CONFIG_PATH: &str = ".sync/config.json";

/// How the status property is typed in the Notion database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    #[default]
    Select,
    Status,
}

/// Notion database schema and API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionSettings {
    #[serde(default)]
    pub database_id: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_notion_version")]
    pub notion_version: String,

    /// Select property holding the document type
    #[serde(default = "default_type_property")]
    pub type_property: String,

    #[serde(default = "default_status_property")]
    pub status_property: String,

    #[serde(default)]
    pub status_kind: StatusKind,
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            database_id: None,
            api_base_url: default_api_base_url(),
            notion_version: default_notion_version(),
            type_property: default_type_property(),
            status_property: default_status_property(),
            status_kind: StatusKind::default(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.notion.com".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

fn default_type_property() -> String {
    "Type".to_string()
}

fn default_status_property() -> String {
    "Status".to_string()
}

/// Request pacing (Notion allows an average of three requests per second).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
        }
    }
}

fn default_requests_per_second() -> f64 {
    3.0
}

fn default_burst() -> u32 {
    3
}

/// Contents of `.sync/config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    notion: NotionSettings,

    #[serde(default)]
    rate_limit: RateLimitSettings,
}

/// Resolved configuration for one command.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the local store
    pub store_path: PathBuf,
    pub token: Option<String>,
    pub notion: NotionSettings,
    pub rate_limit: RateLimitSettings,
}

/// Credentials and target needed by commands that talk to Notion.
#[derive(Debug, Clone, Copy)]
pub struct RemoteTarget<'a> {
    pub token: &'a str,
    pub database_id: &'a str,
}

impl Config {
    /// Resolve configuration for the store at `store` (`~` is expanded).
    pub fn load(
        store: &str,
        database_id: Option<String>,
        token: Option<String>,
    ) -> Result<Self, ConfigError> {
        let store_path = expand_tilde(store);
        let file = read_config_file(&store_path)?;

        let mut notion = file.notion;
        if let Some(id) = database_id.filter(|id| !id.trim().is_empty()) {
            notion.database_id = Some(id);
        }

        Ok(Self {
            store_path,
            token: token.filter(|t| !t.trim().is_empty()),
            notion,
            rate_limit: file.rate_limit,
        })
    }

    /// Token and database, or an error naming what is missing.
    pub fn remote(&self) -> Result<RemoteTarget<'_>, ConfigError> {
        let token = self.token.as_deref().ok_or(ConfigError::MissingToken)?;
        let database_id = self
            .notion
            .database_id
            .as_deref()
            .ok_or(ConfigError::MissingDatabase)?;
        Ok(RemoteTarget { token, database_id })
    }

    pub fn pacer_config(&self) -> PacerConfig {
        PacerConfig {
            requests_per_second: self.rate_limit.requests_per_second,
            burst: self.rate_limit.burst,
        }
    }
}

fn read_config_file(store_path: &Path) -> Result<ConfigFile, ConfigError> {
    let path = store_path.join(CONFIG_PATH);
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
}

/// Expand ~ or ~/ prefix to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
    } else if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("NOTION_TOKEN environment variable not set")]
    MissingToken,

    #[error("No Notion database configured (use --database, NOTION_DATABASE_ID or notion.database_id)")]
    MissingDatabase,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, json: &str) {
        let sync_dir = dir.path().join(".sync");
        std::fs::create_dir_all(&sync_dir).unwrap();
        std::fs::write(sync_dir.join("config.json"), json).unwrap();
    }

    #[test]
    fn test_defaults_without_config_file() {
        let temp = TempDir::new().unwrap();
        let store = temp.path().to_str().unwrap();

        let config = Config::load(store, None, None).unwrap();

        assert_eq!(config.store_path, temp.path());
        assert_eq!(config.notion.api_base_url, "https://api.notion.com");
        assert_eq!(config.notion.notion_version, "2022-06-28");
        assert_eq!(config.notion.status_kind, StatusKind::Select);
        assert_eq!(config.rate_limit.burst, 3);
        assert!(matches!(config.remote(), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn test_file_values_with_partial_sections() {
        let temp = TempDir::new().unwrap();
        write_config(
            &temp,
            r#"{"notion": {"database_id": "db-file", "status_kind": "status"},
                "rate_limit": {"burst": 1}}"#,
        );

        let config = Config::load(temp.path().to_str().unwrap(), None, Some("secret".into())).unwrap();

        assert_eq!(config.notion.database_id.as_deref(), Some("db-file"));
        assert_eq!(config.notion.status_kind, StatusKind::Status);
        assert_eq!(config.notion.type_property, "Type");
        assert_eq!(config.rate_limit.burst, 1);
        assert_eq!(config.rate_limit.requests_per_second, 3.0);

        let remote = config.remote().unwrap();
        assert_eq!(remote.token, "secret");
        assert_eq!(remote.database_id, "db-file");
    }

    #[test]
    fn test_flag_overrides_file_database() {
        let temp = TempDir::new().unwrap();
        write_config(&temp, r#"{"notion": {"database_id": "db-file"}}"#);

        let config = Config::load(
            temp.path().to_str().unwrap(),
            Some("db-flag".to_string()),
            Some("secret".to_string()),
        )
        .unwrap();

        assert_eq!(config.remote().unwrap().database_id, "db-flag");
    }

    #[test]
    fn test_missing_database_is_reported() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(temp.path().to_str().unwrap(), None, Some("t".into())).unwrap();
        assert!(matches!(config.remote(), Err(ConfigError::MissingDatabase)));
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        write_config(&temp, "{ not json");
        assert!(matches!(
            Config::load(temp.path().to_str().unwrap(), None, None),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/tmp/kb"), PathBuf::from("/tmp/kb"));
    }
}
