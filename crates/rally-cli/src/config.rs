//! Configuration file management for rally.
//!
//! Provides a TOML-based config file at `~/.config/rally/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use rally_core::backend::GeminiConfig;
use rally_core::backend::gemini::DEFAULT_BASE_URL;
use rally_core::settings::PipelineSettings;
use rally_db::config::DbConfig;

/// Model used when none is configured anywhere.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Backend request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DbConfig::DEFAULT_URL.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the rally config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/rally` or `~/.config/rally`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("rally");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("rally")
}

/// Return the path to the rally config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns `Ok(None)` if it does not exist.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix since it may hold an API key.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Backend settings after resolution. The key is checked only when a
/// backend is actually built, so `db-init` works without one.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl BackendSettings {
    /// Validate and convert into the Gemini adapter's config.
    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let api_key = match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => bail!(
                "API key not found; set RALLY_API_KEY (or GOOGLE_API_KEY) or add backend.api_key to {}",
                config_path().display()
            ),
        };
        if self.model.trim().is_empty() {
            bail!("model name is empty; set RALLY_MODEL_NAME or backend.model");
        }
        Ok(GeminiConfig {
            api_key,
            model: self.model.trim().to_string(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
        })
    }
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct RallyConfig {
    pub db_config: DbConfig,
    pub backend: BackendSettings,
    pub pipeline: PipelineSettings,
}

/// First non-empty value among the named environment variables.
fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

impl RallyConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `RALLY_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - API key: `RALLY_API_KEY` > `GOOGLE_API_KEY` > `backend.api_key`
    /// - Model: `RALLY_MODEL_NAME` > `MODEL_NAME` > `backend.model` > [`DEFAULT_MODEL`]
    /// - Pipeline settings: `[pipeline]` section > defaults
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config()?;

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("RALLY_DATABASE_URL") {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let (file_backend, pipeline) = match file_config {
            Some(cfg) => (cfg.backend, cfg.pipeline),
            None => (BackendSection::default(), PipelineSettings::default()),
        };
        pipeline
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [pipeline] config: {e}"))?;

        let backend = BackendSettings {
            api_key: env_first(&["RALLY_API_KEY", "GOOGLE_API_KEY"]).or(file_backend.api_key),
            model: env_first(&["RALLY_MODEL_NAME", "MODEL_NAME"])
                .or(file_backend.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: file_backend
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                file_backend.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };

        Ok(Self {
            db_config,
            backend,
            pipeline,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rally_core::settings::BackendFailurePolicy;

    use super::*;
    use crate::test_util::{EnvGuard, lock_env};

    const VARS: &[&str] = &[
        "RALLY_DATABASE_URL",
        "RALLY_API_KEY",
        "GOOGLE_API_KEY",
        "RALLY_MODEL_NAME",
        "MODEL_NAME",
        "XDG_CONFIG_HOME",
    ];

    /// Clear every variable the resolver reads and point the config dir at
    /// an empty temp dir.
    fn isolated_env(tmp: &tempfile::TempDir) -> EnvGuard {
        let guard = EnvGuard::capture(VARS);
        for var in VARS {
            unsafe { std::env::remove_var(var) };
        }
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
        guard
    }

    fn write_config(contents: &str) {
        std::fs::create_dir_all(config_dir()).unwrap();
        std::fs::write(config_path(), contents).unwrap();
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        let original = ConfigFile {
            database: DatabaseSection {
                url: "postgresql://testhost:5432/testdb".to_string(),
            },
            backend: BackendSection {
                api_key: Some("k-123".to_string()),
                model: Some("gemini-test".to_string()),
                ..Default::default()
            },
            pipeline: PipelineSettings {
                min_workouts_per_day: 2,
                ..Default::default()
            },
        };
        save_config(&original).unwrap();

        let loaded = load_config().unwrap().expect("config should exist");
        assert_eq!(loaded.database.url, original.database.url);
        assert_eq!(loaded.backend.api_key.as_deref(), Some("k-123"));
        assert_eq!(loaded.backend.model.as_deref(), Some("gemini-test"));
        assert_eq!(loaded.pipeline.min_workouts_per_day, 2);
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        save_config(&ConfigFile::default()).unwrap();
        let meta = std::fs::metadata(config_path()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn missing_config_file_is_none() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        assert!(load_config().unwrap().is_none());
    }

    #[test]
    fn broken_config_file_is_an_error() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        write_config("[database\nurl = ");
        let err = RallyConfig::resolve(None).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        unsafe { std::env::set_var("RALLY_DATABASE_URL", "postgresql://env:5432/envdb") };
        let config = RallyConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
    }

    #[test]
    fn resolve_env_overrides_config_file() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        write_config(
            r#"
[database]
url = "postgresql://file:5432/filedb"

[backend]
api_key = "file-key"
model = "file-model"
"#,
        );
        unsafe { std::env::set_var("RALLY_DATABASE_URL", "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var("GOOGLE_API_KEY", "google-key") };
        unsafe { std::env::set_var("MODEL_NAME", "env-model") };

        let config = RallyConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.backend.api_key.as_deref(), Some("google-key"));
        assert_eq!(config.backend.model, "env-model");

        unsafe { std::env::set_var("RALLY_API_KEY", "rally-key") };
        let config = RallyConfig::resolve(None).unwrap();
        assert_eq!(config.backend.api_key.as_deref(), Some("rally-key"));
    }

    #[test]
    fn resolve_reads_config_file_sections() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        write_config(
            r#"
[database]
url = "postgresql://file:5432/filedb"

[backend]
api_key = "file-key"
timeout_secs = 30
base_url = "http://localhost:8089/v1beta"

[pipeline]
min_workouts_per_day = 2
on_backend_failure = "fail"
deactivate_previous_plans = true

[pipeline.retry]
max_attempts = 5
"#,
        );

        let config = RallyConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://file:5432/filedb");
        assert_eq!(config.backend.model, DEFAULT_MODEL);
        assert_eq!(config.backend.timeout, Duration::from_secs(30));
        assert_eq!(config.backend.base_url, "http://localhost:8089/v1beta");
        assert_eq!(config.pipeline.min_workouts_per_day, 2);
        assert_eq!(config.pipeline.on_backend_failure, BackendFailurePolicy::Fail);
        assert!(config.pipeline.deactivate_previous_plans);
        assert_eq!(config.pipeline.retry.max_attempts, 5);
        assert_eq!(config.pipeline.retry.initial_backoff_ms, 500);
    }

    #[test]
    fn resolve_rejects_invalid_pipeline_settings() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        write_config(
            r#"
[database]
url = "postgresql://file:5432/filedb"

[pipeline]
min_workouts_per_day = 9
"#,
        );
        let err = RallyConfig::resolve(None).unwrap_err();
        assert!(err.to_string().contains("invalid [pipeline] config"));
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        let config = RallyConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.backend.model, DEFAULT_MODEL);
        assert!(config.backend.api_key.is_none());
        assert_eq!(config.pipeline, PipelineSettings::default());
    }

    #[test]
    fn gemini_config_requires_api_key() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated_env(&tmp);

        let config = RallyConfig::resolve(None).unwrap();
        let err = config.backend.gemini_config().unwrap_err();
        assert!(err.to_string().contains("API key not found"));

        unsafe { std::env::set_var("RALLY_API_KEY", "   ") };
        let config = RallyConfig::resolve(None).unwrap();
        assert!(config.backend.gemini_config().is_err());

        unsafe { std::env::set_var("RALLY_API_KEY", "k") };
        let config = RallyConfig::resolve(None).unwrap();
        let gemini = config.backend.gemini_config().unwrap();
        assert_eq!(gemini.api_key, "k");
        assert_eq!(gemini.model, DEFAULT_MODEL);
        assert_eq!(gemini.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("rally/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
