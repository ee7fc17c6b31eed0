use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DATA_FILE_ENV: &str = "AXIOM_DATA_FILE";
pub const LOG_LEVEL_ENV: &str = "AXIOM_LOG_LEVEL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write config {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Account security knobs
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AccountPolicy {
    /// Failed logins at which an account locks
    pub max_failed_logins: u32,
    /// Lifetime of verification and reset tokens
    pub token_ttl_secs: u64,
    /// Refuse logins until the email address is verified
    pub require_verified_login: bool,
    pub password_hash_iterations: u32,
    pub token_length: usize,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            max_failed_logins: 5,
            token_ttl_secs: 86_400,
            require_verified_login: false,
            password_hash_iterations: 100_000,
            token_length: 32,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AccessPolicy {
    /// Report entities owned by someone else as missing rather than forbidden
    pub conceal_foreign_entities: bool,
}

/// Platform configuration, stored as JSON
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PlatformConfig {
    pub data_file: PathBuf,
    pub log: LogSettings,
    pub security: AccountPolicy,
    pub access: AccessPolicy,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("axiom_data.json"),
            log: LogSettings::default(),
            security: AccountPolicy::default(),
            access: AccessPolicy::default(),
        }
    }
}

impl PlatformConfig {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_file) = lookup(DATA_FILE_ENV).filter(|v| !v.is_empty()) {
            self.data_file = PathBuf::from(data_file);
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.is_empty()) {
            self.log.level = level;
        }
    }

    /// Save configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = PlatformConfig::from_file(&dir.path().join("axiom.json")).unwrap();
        assert_eq!(config, PlatformConfig::default());
        assert_eq!(config.security.max_failed_logins, 5);
        assert_eq!(config.security.token_ttl_secs, 86_400);
        assert!(!config.security.require_verified_login);
        assert!(!config.access.conceal_foreign_entities);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("axiom.json");
        fs::write(&path, r#"{"security": {"require_verified_login": true}}"#).unwrap();

        let config = PlatformConfig::from_file(&path).unwrap();
        assert!(config.security.require_verified_login);
        assert_eq!(config.security.max_failed_logins, 5);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("axiom.json");
        let mut config = PlatformConfig::default();
        config.access.conceal_foreign_entities = true;
        config.log.file = Some(PathBuf::from("axiom.log"));

        config.save(&path).unwrap();
        assert_eq!(PlatformConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("axiom.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            PlatformConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = PlatformConfig::default();
        config.apply_overrides(|key| match key {
            DATA_FILE_ENV => Some("/tmp/other.json".to_string()),
            LOG_LEVEL_ENV => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.data_file, PathBuf::from("/tmp/other.json"));
        assert_eq!(config.log.level, "debug");

        let mut untouched = PlatformConfig::default();
        untouched.apply_overrides(|_| Some(String::new()));
        assert_eq!(untouched, PlatformConfig::default());
    }
}
