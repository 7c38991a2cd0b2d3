use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Hard cap on DOIs per Crossref bulk request.
pub const MAX_CROSSREF_BATCH: usize = 100;

/// Root configuration, loaded from `~/.config/docmap-ingest/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_hub: DataHubConfig,
    pub crossref: CrossrefConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataHubConfig {
    pub index_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub username_env: String,
    pub password_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossrefConfig {
    pub works_url: String,
    pub batch_size: usize,
    pub min_interval_ms: u64,
    pub max_retries: u32,
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polite_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub max_concurrent_conversions: usize,
    pub dedup: DedupStrategy,
}

/// How already-imported work is kept out of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupStrategy {
    /// Rescan the whole index; the host's duplicate predicate is the only filter.
    #[default]
    Predicate,
    /// Additionally skip docmaps created on or before the last import date.
    PredicateAndCutoff,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for DataHubConfig {
    fn default() -> Self {
        Self {
            index_url: "https://data-hub-api.elifesciences.org/kotahi/docmaps/v1/index"
                .to_string(),
            username: None,
            password: None,
            username_env: "DOCMAP_INGEST_DATA_HUB_USERNAME".to_string(),
            password_env: "DOCMAP_INGEST_DATA_HUB_PASSWORD".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            works_url: "https://api.crossref.org/works".to_string(),
            batch_size: MAX_CROSSREF_BATCH,
            min_interval_ms: 1000,
            max_retries: 3,
            timeout_secs: 30,
            polite_email: None,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_concurrent_conversions: 8,
            dedup: DedupStrategy::Predicate,
        }
    }
}

// ─── Credentials ───────────────────────────────────────────

impl DataHubConfig {
    /// Inline username, else the value of `username_env`.
    pub fn resolve_username(&self) -> Option<String> {
        resolve_secret(self.username.as_deref(), &self.username_env)
    }

    /// Inline password, else the value of `password_env`.
    pub fn resolve_password(&self) -> Option<String> {
        resolve_secret(self.password.as_deref(), &self.password_env)
    }
}

fn resolve_secret(inline: Option<&str>, env_name: &str) -> Option<String> {
    inline
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| {
            std::env::var(env_name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
}

impl CrossrefConfig {
    /// Configured batch size, never above [`MAX_CROSSREF_BATCH`].
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_CROSSREF_BATCH)
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/docmap-ingest/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("DOCMAP_INGEST_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("docmap-ingest")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.import.max_concurrent_conversions == 0 {
            return Err(CoreError::ConfigError(
                "import.max_concurrent_conversions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.crossref.batch_size, 100);
        assert_eq!(cfg.import.dedup, DedupStrategy::Predicate);
        assert!(cfg.data_hub.username.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.import.dedup = DedupStrategy::PredicateAndCutoff;
        cfg.crossref.polite_email = Some("ops@example.org".to_string());
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.import.dedup, DedupStrategy::PredicateAndCutoff);
        assert_eq!(loaded.crossref.polite_email.as_deref(), Some("ops@example.org"));
        assert_eq!(loaded.data_hub.index_url, cfg.data_hub.index_url);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg =
            AppConfig::load_from(Path::new("/tmp/nonexistent_docmap_ingest_config.toml")).unwrap();
        assert_eq!(cfg.crossref.works_url, "https://api.crossref.org/works");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[crossref]\nbatch_size = 40\n").unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.crossref.batch_size, 40);
        assert_eq!(cfg.crossref.min_interval_ms, 1000);
        assert_eq!(cfg.import.max_concurrent_conversions, 8);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[import]\nmax_concurrent_conversions = 0\n").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(CoreError::ConfigError(_))
        ));
    }

    #[test]
    fn test_batch_size_is_capped() {
        let cfg = CrossrefConfig {
            batch_size: 500,
            ..Default::default()
        };
        assert_eq!(cfg.effective_batch_size(), MAX_CROSSREF_BATCH);

        let cfg = CrossrefConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(cfg.effective_batch_size(), 1);
    }

    #[test]
    fn test_crossref_timeout_defaults_and_overrides() {
        assert_eq!(CrossrefConfig::default().timeout_secs, 30);

        let cfg: AppConfig = toml::from_str("[crossref]\ntimeout_secs = 5\n").unwrap();
        assert_eq!(cfg.crossref.timeout_secs, 5);
        assert_eq!(cfg.crossref.batch_size, MAX_CROSSREF_BATCH);
    }

    #[test]
    fn test_inline_credentials_win() {
        let cfg = DataHubConfig {
            username: Some("  kotahi  ".to_string()),
            password: Some(String::new()),
            password_env: "DOCMAP_INGEST_TEST_UNSET_PASSWORD_VAR".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_username().as_deref(), Some("kotahi"));
        assert_eq!(cfg.resolve_password(), None);
    }
}
