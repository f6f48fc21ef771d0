//! Program configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use gdshare_common::{Error, FolderId, Result, RetentionPolicy};

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "gdshare.json";

/// Settings shared by every command.
///
/// Stored as JSON. Missing keys take their defaults; command-line flags
/// override whatever the file holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Folder every operation is scoped to.
    pub folder_id: Option<FolderId>,
    /// Client-secret file downloaded from the cloud console.
    pub credentials_path: PathBuf,
    /// Where the user's tokens are kept between runs.
    pub token_path: PathBuf,
    /// Files at least this many days old are purged.
    pub max_days: u32,
    /// Description attached to uploads.
    pub description: String,
    /// Page size for drive-wide listings.
    pub list_page_size: u32,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            folder_id: None,
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            max_days: RetentionPolicy::DEFAULT_MAX_DAYS,
            description: "Uploaded with gdshare".to_string(),
            list_page_size: 10,
        }
    }
}

impl ShareConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// - File unreadable
    /// - Invalid JSON or field values
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;

        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Find and load the configuration.
    ///
    /// An explicit path must exist. Otherwise `gdshare.json` in the working
    /// directory is tried, then `gdshare/config.json` in the user config
    /// directory; defaults apply when neither exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        for candidate in Self::default_locations() {
            if candidate.is_file() {
                tracing::debug!("Loading config from {}", candidate.display());
                return Self::load(&candidate);
            }
        }

        Ok(Self::default())
    }

    /// Implicit config file locations, in lookup order.
    pub fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            locations.push(dir.join("gdshare").join("config.json"));
        }
        locations
    }

    /// The configured folder.
    ///
    /// # Errors
    /// - No folder configured
    pub fn folder_id(&self) -> Result<FolderId> {
        self.folder_id.clone().ok_or_else(|| {
            Error::Config("No folder_id configured; set it in the config file or pass --folder-id".to_string())
        })
    }

    /// Retention policy built from `max_days`.
    pub fn retention(&self) -> Result<RetentionPolicy> {
        RetentionPolicy::new(self.max_days)
            .map_err(|e| Error::Config(format!("max_days: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ShareConfig::default();
        assert_eq!(config.max_days, 30);
        assert_eq!(config.credentials_path, PathBuf::from("credentials.json"));
        assert!(matches!(config.folder_id(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gdshare.json");
        std::fs::write(&path, r#"{"folder_id": "1FolderX", "max_days": 7}"#).unwrap();

        let config = ShareConfig::discover(Some(&path)).unwrap();
        assert_eq!(config.folder_id().unwrap().as_str(), "1FolderX");
        assert_eq!(config.retention().unwrap().max_days(), 7);
        assert_eq!(config.token_path, PathBuf::from("token.json"));
        assert_eq!(config.list_page_size, 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp = TempDir::new().unwrap();

        let empty_folder = temp.path().join("a.json");
        std::fs::write(&empty_folder, r#"{"folder_id": ""}"#).unwrap();
        assert!(matches!(ShareConfig::load(&empty_folder), Err(Error::Config(_))));

        let zero_days = temp.path().join("b.json");
        std::fs::write(&zero_days, r#"{"folder_id": "f", "max_days": 0}"#).unwrap();
        let config = ShareConfig::load(&zero_days).unwrap();
        assert!(matches!(config.retention(), Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.json");
        assert!(ShareConfig::discover(Some(&missing)).is_err());
    }
}
