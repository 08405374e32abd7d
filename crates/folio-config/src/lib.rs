//! Configuration management for Folio.
//!
//! Parses `folio.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `viz.key_prefix`
//! - `storage.dir`, `storage.public_url`, `storage.bucket`, `storage.endpoint`, `storage.region`
//! - `site.name`, `site.description`, `site.url`, `site.email`, `site.location`, `site.timezone`

mod expand;
pub mod site;

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use site::{DynamicSiteConfig, SettingsSource, SiteConfig, SiteOverrides};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the object key prefix for rendered visualizations.
    pub key_prefix: Option<String>,
    /// Disable the configured asset store.
    pub offline: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "folio.toml";

/// Default object key prefix.
const DEFAULT_KEY_PREFIX: &str = "portfolio/viz";

/// Default directory of the filesystem store, relative to the config file.
const DEFAULT_STORAGE_DIR: &str = "public";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Visualization rendering configuration.
    pub viz: VizConfig,
    /// Asset store configuration as parsed from TOML.
    storage: StorageConfigRaw,
    /// Static site metadata.
    pub site: SiteConfig,

    /// Resolved asset store configuration (set after loading).
    #[serde(skip)]
    pub storage_resolved: StorageConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Visualization rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    /// Object key prefix for stored diagrams.
    pub key_prefix: String,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
        }
    }
}

/// Raw storage configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StorageConfigRaw {
    backend: Option<String>,
    dir: Option<String>,
    public_url: Option<String>,
    bucket: Option<String>,
    endpoint: Option<String>,
    region: Option<String>,
}

/// Resolved asset store configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// No store: rendered diagrams are embedded inline.
    #[default]
    None,
    /// Objects written below a local directory.
    Fs {
        /// Absolute store directory.
        dir: PathBuf,
        /// Base URL the directory is served from.
        public_url: Option<String>,
    },
    /// S3-compatible object store.
    S3 {
        bucket: String,
        /// Custom endpoint (R2, `MinIO`); AWS when unset.
        endpoint: Option<String>,
        region: Option<String>,
        /// Base URL objects are served from.
        public_url: Option<String>,
    },
}

impl StorageConfig {
    /// Backend name as written in `storage.backend`.
    #[must_use]
    pub fn backend(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fs { .. } => "fs",
            Self::S3 { .. } => "s3",
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`storage.bucket`").
        field: String,
        /// Error message (e.g., "${`R2_BUCKET`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `folio.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(prefix) = &settings.key_prefix {
            self.viz.key_prefix.clone_from(prefix);
        }
        if settings.offline == Some(true) {
            self.storage_resolved = StorageConfig::None;
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            storage = config.storage_resolved.backend(),
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_viz()?;
        self.validate_storage()?;
        Ok(())
    }

    fn validate_viz(&self) -> Result<(), ConfigError> {
        let prefix = &self.viz.key_prefix;
        if prefix.starts_with('/') {
            return Err(ConfigError::Validation(
                "viz.key_prefix must be relative (no leading /)".to_owned(),
            ));
        }
        if prefix.split('/').any(|segment| segment == "..") {
            return Err(ConfigError::Validation(
                "viz.key_prefix cannot contain ..".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_storage(&self) -> Result<(), ConfigError> {
        match &self.storage_resolved {
            StorageConfig::None => {}
            StorageConfig::Fs { public_url, .. } => {
                if let Some(url) = public_url {
                    require_non_empty(url, "storage.public_url")?;
                }
            }
            StorageConfig::S3 {
                bucket,
                endpoint,
                public_url,
                ..
            } => {
                require_non_empty(bucket, "storage.bucket")?;
                if let Some(endpoint) = endpoint {
                    require_http_url(endpoint, "storage.endpoint")?;
                }
                if let Some(url) = public_url {
                    require_http_url(url, "storage.public_url")?;
                }
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.viz.key_prefix = expand::expand_env(&self.viz.key_prefix, "viz.key_prefix")?;

        let storage = &mut self.storage;
        expand::expand_opt(&mut storage.dir, "storage.dir")?;
        expand::expand_opt(&mut storage.public_url, "storage.public_url")?;
        expand::expand_opt(&mut storage.bucket, "storage.bucket")?;
        expand::expand_opt(&mut storage.endpoint, "storage.endpoint")?;
        expand::expand_opt(&mut storage.region, "storage.region")?;

        let site = &mut self.site;
        for (value, field) in [
            (&mut site.name, "site.name"),
            (&mut site.description, "site.description"),
            (&mut site.url, "site.url"),
            (&mut site.email, "site.email"),
            (&mut site.location, "site.location"),
            (&mut site.timezone, "site.timezone"),
        ] {
            *value = expand::expand_env(value, field)?;
        }

        Ok(())
    }

    /// Resolve the storage section against the config directory.
    ///
    /// Validates that `bucket` is provided for the `s3` backend.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let raw = &self.storage;
        let public_url = raw.public_url.clone().filter(|url| !url.is_empty());

        self.storage_resolved = match raw.backend.as_deref().unwrap_or("none") {
            "none" => StorageConfig::None,
            "fs" => StorageConfig::Fs {
                dir: config_dir.join(raw.dir.as_deref().unwrap_or(DEFAULT_STORAGE_DIR)),
                public_url,
            },
            "s3" => StorageConfig::S3 {
                bucket: raw.bucket.clone().ok_or_else(|| {
                    ConfigError::Validation(
                        "storage.backend = \"s3\" requires bucket to be set".to_owned(),
                    )
                })?,
                endpoint: raw.endpoint.clone().filter(|e| !e.is_empty()),
                region: raw.region.clone().filter(|r| !r.is_empty()),
                public_url,
            },
            other => {
                return Err(ConfigError::Validation(format!(
                    "unknown storage.backend \"{other}\" (expected none, fs or s3)"
                )));
            }
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.viz.key_prefix, "portfolio/viz");
        assert_eq!(config.storage_resolved, StorageConfig::None);
        assert_eq!(config.site.name, "Folio");
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let mut config = parse("");
        config.resolve_paths(Path::new("/project")).unwrap();
        assert_eq!(config.viz.key_prefix, "portfolio/viz");
        assert_eq!(config.storage_resolved, StorageConfig::None);
    }

    #[test]
    fn test_resolve_fs_storage() {
        let mut config = parse(
            r#"
[storage]
backend = "fs"
dir = "public/assets"
public_url = "/assets"
"#,
        );
        config.resolve_paths(Path::new("/project")).unwrap();

        assert_eq!(
            config.storage_resolved,
            StorageConfig::Fs {
                dir: PathBuf::from("/project/public/assets"),
                public_url: Some("/assets".to_owned()),
            }
        );
    }

    #[test]
    fn test_resolve_fs_storage_default_dir() {
        let mut config = parse("[storage]\nbackend = \"fs\"\n");
        config.resolve_paths(Path::new("/project")).unwrap();

        assert_eq!(
            config.storage_resolved,
            StorageConfig::Fs {
                dir: PathBuf::from("/project/public"),
                public_url: None,
            }
        );
    }

    #[test]
    fn test_resolve_s3_storage() {
        let mut config = parse(
            r#"
[storage]
backend = "s3"
bucket = "blog"
endpoint = "https://acct.r2.cloudflarestorage.com"
region = "auto"
public_url = "https://cdn.example.com"
"#,
        );
        config.resolve_paths(Path::new("/project")).unwrap();

        assert_eq!(
            config.storage_resolved,
            StorageConfig::S3 {
                bucket: "blog".to_owned(),
                endpoint: Some("https://acct.r2.cloudflarestorage.com".to_owned()),
                region: Some("auto".to_owned()),
                public_url: Some("https://cdn.example.com".to_owned()),
            }
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_s3_requires_bucket() {
        let mut config = parse("[storage]\nbackend = \"s3\"\n");

        let err = config.resolve_paths(Path::new("/project")).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)), "got {err:?}");
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn test_unknown_backend() {
        let mut config = parse("[storage]\nbackend = \"ftp\"\n");

        let err = config.resolve_paths(Path::new("/project")).unwrap_err();

        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn test_validate_s3_endpoint_scheme() {
        let mut config = parse(
            r#"
[storage]
backend = "s3"
bucket = "blog"
endpoint = "r2.cloudflarestorage.com"
"#,
        );
        config.resolve_paths(Path::new("/project")).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.endpoint"));
    }

    #[test]
    fn test_validate_key_prefix() {
        let mut config = Config::default();
        config.viz.key_prefix = "/abs".to_owned();
        assert!(config.validate().is_err());

        config.viz.key_prefix = "blog/../secret".to_owned();
        assert!(config.validate().is_err());

        config.viz.key_prefix = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = parse("[storage]\nbackend = \"fs\"\n");
        config.resolve_paths(Path::new("/project")).unwrap();

        config.apply_cli_settings(&CliSettings {
            key_prefix: Some("drafts/viz".to_owned()),
            offline: Some(true),
        });

        assert_eq!(config.viz.key_prefix, "drafts/viz");
        assert_eq!(config.storage_resolved, StorageConfig::None);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = parse("[storage]\nbackend = \"fs\"\n");
        config.resolve_paths(Path::new("/project")).unwrap();

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.viz.key_prefix, "portfolio/viz");
        assert_eq!(config.storage_resolved.backend(), "fs");
    }

    #[test]
    fn test_expand_env_vars_storage() {
        // SAFETY: variable names are unique to this test
        unsafe {
            std::env::set_var("FOLIO_CFG_TEST_BUCKET", "env-bucket");
        }
        let mut config = parse(
            r#"
[storage]
backend = "s3"
bucket = "${FOLIO_CFG_TEST_BUCKET}"
region = "${FOLIO_CFG_TEST_REGION_UNSET:-auto}"
"#,
        );

        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project")).unwrap();

        assert_eq!(
            config.storage_resolved,
            StorageConfig::S3 {
                bucket: "env-bucket".to_owned(),
                endpoint: None,
                region: Some("auto".to_owned()),
                public_url: None,
            }
        );
        unsafe {
            std::env::remove_var("FOLIO_CFG_TEST_BUCKET");
        }
    }

    #[test]
    fn test_expand_env_vars_site() {
        let mut config = parse(
            r#"
[site]
url = "${FOLIO_CFG_TEST_SITE_URL_UNSET:-https://example.com/}"
"#,
        );

        config.expand_env_vars().unwrap();

        assert_eq!(config.site.url, "https://example.com/");
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        let mut config = parse("[storage]\nbucket = \"${FOLIO_CFG_TEST_MISSING}\"\n");

        let err = config.expand_env_vars().unwrap_err();

        assert!(err.to_string().contains("storage.bucket"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(
            &path,
            "[viz]\nkey_prefix = \"blog/viz\"\n\n[storage]\nbackend = \"fs\"\ndir = \"out\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.viz.key_prefix, "blog/viz");
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(
            config.storage_resolved,
            StorageConfig::Fs {
                dir: dir.path().join("out"),
                public_url: None,
            }
        );
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/folio.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, "[viz\nkey_prefix = 1").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("folio.toml"), "").unwrap();
        let nested = dir.path().join("content/blog");
        std::fs::create_dir_all(&nested).unwrap();

        let found = Config::discover_config(&nested);

        assert_eq!(found, Some(dir.path().join("folio.toml")));
    }
}
