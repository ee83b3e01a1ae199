//! Configuration loading and types for fashionbrain.
//!
//! This crate is responsible for:
//! - Defining the configuration model consumed by the resolver, the client and the CLI
//! - Loading configuration from TOML files
//! - Providing a simple default search strategy (`/etc/fashionbrain/fashionbrain.toml`, `./fashionbrain.toml`)
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! usable configuration that relies entirely on base-URL auto-detection.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use fashionbrain_core::{FashionBrainError, Result};

/// Default request budget, in seconds, for both GET and POST.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root configuration struct for fashionbrain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FashionBrainConfig {
    /// Backend API location and request budgets.
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

impl FashionBrainConfig {
    /// Perform basic structural validation of the configuration.
    ///
    /// This does not contact the backend; it only checks for obviously
    /// invalid values.
    pub fn validate(&self) -> Result<()> {
        self.validate_base_url()?;
        self.validate_hostname_mappings()?;
        self.validate_timeouts()?;
        Ok(())
    }

    fn validate_base_url(&self) -> Result<()> {
        // An empty override means "not configured", not an error.
        if let Some(url) = self.api.base_url.as_deref().map(str::trim) {
            if !url.is_empty() && !is_http_url(url) {
                return Err(FashionBrainError::invalid_config(
                    "api.base_url",
                    "api.base_url must start with http:// or https://",
                ));
            }
        }
        Ok(())
    }

    fn validate_hostname_mappings(&self) -> Result<()> {
        for (hostname, backend) in &self.api.hostname_mappings {
            if hostname.trim().is_empty() {
                return Err(FashionBrainError::invalid_config(
                    "api.hostname_mappings",
                    "hostname keys must not be empty",
                ));
            }

            if !is_http_url(backend.trim()) {
                return Err(FashionBrainError::invalid_config(
                    "api.hostname_mappings",
                    format!(
                        "backend for '{}' must start with http:// or https:// (got '{}')",
                        hostname, backend
                    ),
                ));
            }
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<()> {
        if self.api.get_timeout_secs == 0 {
            return Err(FashionBrainError::invalid_config(
                "api.get_timeout_secs",
                "api.get_timeout_secs must be greater than zero",
            ));
        }
        if self.api.post_timeout_secs == 0 {
            return Err(FashionBrainError::invalid_config(
                "api.post_timeout_secs",
                "api.post_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Backend API section.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Explicit backend base URL, e.g. `https://backend.example.com`.
    ///
    /// When set and non-empty this wins over every other source.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Known backends keyed by the hostname the frontend is served from.
    #[serde(default)]
    pub hostname_mappings: BTreeMap<String, String>,

    /// Budget for GET requests, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub get_timeout_secs: u64,

    /// Budget for POST requests (including uploads), in seconds.
    #[serde(default = "default_timeout_secs")]
    pub post_timeout_secs: u64,
}

impl ApiConfig {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.get_timeout_secs)
    }

    pub fn post_timeout(&self) -> Duration {
        Duration::from_secs(self.post_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            hostname_mappings: BTreeMap::new(),
            get_timeout_secs: DEFAULT_TIMEOUT_SECS,
            post_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or filter expression, e.g. `info` or `info,fashionbrain_client=debug`.
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Load configuration from a specific file path.
///
/// This function parses TOML into [`FashionBrainConfig`] and maps errors into
/// [`FashionBrainError::Config`] / [`FashionBrainError::InvalidConfig`] as appropriate.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<FashionBrainConfig> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref).map_err(|err| {
        FashionBrainError::config(format!(
            "failed to read config file '{}': {}",
            path_ref.display(),
            err
        ))
    })?;

    parse_str(&contents).map_err(|err| match err {
        FashionBrainError::Config(message) => {
            FashionBrainError::invalid_config(path_ref.display().to_string(), message)
        }
        other => other,
    })
}

/// Parse configuration from TOML text.
pub fn parse_str(contents: &str) -> Result<FashionBrainConfig> {
    toml::from_str(contents)
        .map_err(|err| FashionBrainError::config(format!("failed to parse config: {}", err)))
}

/// Attempt to load configuration using the default search strategy.
///
/// Current strategy (in order):
/// 1. `/etc/fashionbrain/fashionbrain.toml`
/// 2. `./fashionbrain.toml` (in the current working directory)
pub fn load_default() -> Result<FashionBrainConfig> {
    let candidates = [
        PathBuf::from("/etc/fashionbrain/fashionbrain.toml"),
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("fashionbrain.toml"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return load_from_path(candidate);
        }
    }

    Err(FashionBrainError::ConfigNotFound(
        "create /etc/fashionbrain/fashionbrain.toml or ./fashionbrain.toml, or pass a path explicitly"
            .to_string(),
    ))
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_path_full() {
        let path = std::env::temp_dir().join(format!(
            "fashionbrain_config_full_{}.toml",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        {
            let mut file = fs::File::create(&path).expect("create temp config file");
            writeln!(
                file,
                r#"
[api]
base_url = "https://backend.example.com/"
get_timeout_secs = 5
post_timeout_secs = 10

[api.hostname_mappings]
"shop.example.app" = "https://api.example.com"

[telemetry]
log_level = "debug"
"#
            )
            .expect("write config");
        }

        let cfg = load_from_path(&path).expect("load config");

        assert_eq!(
            cfg.api.base_url.as_deref(),
            Some("https://backend.example.com/")
        );
        assert_eq!(cfg.api.get_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.api.post_timeout(), Duration::from_secs(10));
        assert_eq!(
            cfg.api.hostname_mappings.get("shop.example.app").map(String::as_str),
            Some("https://api.example.com")
        );
        assert_eq!(
            cfg.telemetry.and_then(|t| t.log_level).as_deref(),
            Some("debug")
        );

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_str("").expect("empty config parses");
        assert!(cfg.api.base_url.is_none());
        assert!(cfg.api.hostname_mappings.is_empty());
        assert_eq!(cfg.api.get_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.api.post_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_file_errors() {
        let res = load_from_path("/this/definitely/does/not/exist.toml");
        assert!(matches!(res, Err(FashionBrainError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_invalid_config() {
        let res = parse_str("[api\nbase_url = ");
        assert!(res.is_err());
    }

    #[test]
    fn test_validate_accepts_empty_override() {
        let cfg = parse_str("[api]\nbase_url = \"  \"\n").unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let cfg = parse_str("[api]\nbase_url = \"ftp://backend\"\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("api.base_url"));
    }

    #[test]
    fn test_validate_rejects_bad_mapping() {
        let cfg = parse_str(
            r#"
[api.hostname_mappings]
"shop.example.app" = "backend.example.com"
"#,
        )
        .unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let cfg = parse_str("[api]\nget_timeout_secs = 0\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("get_timeout_secs"));
    }
}
