use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::errors::CleanupError;
use super::locator::BucketLocator;
use crate::store::S3StoreConfig;

/// Defaults read from `~/.s3bc/config.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// S3 endpoint, with or without scheme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Use HTTPS when the endpoint carries no scheme
    #[serde(default)]
    pub secure: bool,

    /// Signing region
    #[serde(default = "default_region")]
    pub region: String,

    /// Path-style bucket addressing (needed by MinIO and most self-hosted stores)
    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,

    /// Number of most recent backups to keep
    #[serde(default = "default_save_last")]
    pub save_last: usize,

    /// Output format preference
    #[serde(default)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Quiet,
}

fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_force_path_style() -> bool {
    true
}
fn default_save_last() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            secure: false,
            region: default_region(),
            force_path_style: default_force_path_style(),
            save_last: default_save_last(),
            output_format: OutputFormat::Human,
        }
    }
}

impl Config {
    /// Get the s3bc data directory (~/.s3bc)
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".s3bc")
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Load config from `path`, or defaults if the file is absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

/// Access credentials for the store
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
    pub secure: bool,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("secure", &self.secure)
            .finish()
    }
}

/// Raw run inputs as they arrive from flags and environment
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub endpoint: Option<String>,
    pub secure: bool,
    pub region: Option<String>,
    pub bucket: Option<BucketLocator>,
    pub save_last: Option<usize>,
}

/// Everything one cleanup run needs, resolved and validated up front
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Endpoint URL including scheme
    pub endpoint: String,
    pub credentials: Credentials,
    pub region: String,
    pub force_path_style: bool,
    pub bucket: BucketLocator,
    pub save_last: usize,
}

impl RunConfig {
    /// Merge `inputs` over `file` and validate the result.
    ///
    /// Fails with [`CleanupError::Validation`] before anything touches the
    /// network.
    pub fn resolve(inputs: RunInputs, file: &Config) -> Result<Self, CleanupError> {
        let key = non_empty(inputs.key).ok_or_else(|| {
            CleanupError::validation(
                "key flag or AWS_ACCESS_KEY_ID environment variable must be specified",
            )
        })?;
        let secret = non_empty(inputs.secret).ok_or_else(|| {
            CleanupError::validation(
                "secret flag or AWS_SECRET_ACCESS_KEY environment variable must be specified",
            )
        })?;
        let endpoint = non_empty(inputs.endpoint)
            .or_else(|| non_empty(file.endpoint.clone()))
            .ok_or_else(|| {
                CleanupError::validation(
                    "endpoint flag or AWS_ENDPOINT_URL environment variable must be specified",
                )
            })?;
        let bucket = inputs
            .bucket
            .ok_or_else(|| CleanupError::validation("bucket flag must be specified"))?;

        let secure = inputs.secure || file.secure;

        Ok(Self {
            endpoint: normalize_endpoint(&endpoint, secure),
            credentials: Credentials { key, secret, secure },
            region: non_empty(inputs.region).unwrap_or_else(|| file.region.clone()),
            force_path_style: file.force_path_style,
            bucket,
            save_last: inputs.save_last.unwrap_or(file.save_last),
        })
    }

    pub fn store_config(&self) -> S3StoreConfig {
        S3StoreConfig {
            endpoint: self.endpoint.clone(),
            access_key: self.credentials.key.clone(),
            secret_key: self.credentials.secret.clone(),
            region: self.region.clone(),
            force_path_style: self.force_path_style,
        }
    }
}

/// Add a scheme to a bare `host:port` endpoint
pub fn normalize_endpoint(endpoint: &str, secure: bool) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else if secure {
        format!("https://{}", endpoint)
    } else {
        format!("http://{}", endpoint)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> RunInputs {
        RunInputs {
            key: Some("minio".to_string()),
            secret: Some("minio123".to_string()),
            endpoint: Some("localhost:9000".to_string()),
            secure: false,
            region: None,
            bucket: Some(BucketLocator::parse("s3://backups/mysql").unwrap()),
            save_last: None,
        }
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let run = RunConfig::resolve(inputs(), &Config::default()).unwrap();
        assert_eq!(run.endpoint, "http://localhost:9000");
        assert_eq!(run.region, "us-east-1");
        assert_eq!(run.save_last, 5);
        assert_eq!(run.bucket.bucket, "backups");
        assert_eq!(run.bucket.prefix, "mysql");
        assert!(run.force_path_style);
    }

    #[test]
    fn test_flags_override_file() {
        let file = Config {
            endpoint: Some("s3.example.com".to_string()),
            save_last: 10,
            region: "eu-west-1".to_string(),
            ..Config::default()
        };
        let mut raw = inputs();
        raw.save_last = Some(2);
        let run = RunConfig::resolve(raw, &file).unwrap();
        assert_eq!(run.endpoint, "http://localhost:9000");
        assert_eq!(run.save_last, 2);
        assert_eq!(run.region, "eu-west-1");
    }

    #[test]
    fn test_endpoint_falls_back_to_file() {
        let file = Config {
            endpoint: Some("s3.example.com".to_string()),
            secure: true,
            ..Config::default()
        };
        let mut raw = inputs();
        raw.endpoint = None;
        let run = RunConfig::resolve(raw, &file).unwrap();
        assert_eq!(run.endpoint, "https://s3.example.com");
        assert!(run.credentials.secure);
    }

    #[test]
    fn test_missing_inputs_are_validation_errors() {
        for field in ["key", "secret", "endpoint", "bucket"] {
            let mut raw = inputs();
            match field {
                "key" => raw.key = None,
                "secret" => raw.secret = Some("  ".to_string()),
                "endpoint" => raw.endpoint = None,
                _ => raw.bucket = None,
            }
            let err = RunConfig::resolve(raw, &Config::default()).unwrap_err();
            assert!(matches!(err, CleanupError::Validation(_)), "{}", field);
            assert!(err.to_string().contains(field), "{}", err);
        }
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("minio:9000", false), "http://minio:9000");
        assert_eq!(normalize_endpoint("minio:9000", true), "https://minio:9000");
        assert_eq!(
            normalize_endpoint("https://s3.amazonaws.com/", false),
            "https://s3.amazonaws.com"
        );
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials {
            key: "minio".to_string(),
            secret: "minio123".to_string(),
            secure: false,
        };
        assert!(!format!("{:?}", creds).contains("minio123"));
    }

    #[test]
    fn test_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let config = Config {
            save_last: 7,
            output_format: OutputFormat::Json,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("save_last = 3\n").unwrap();
        assert_eq!(config.save_last, 3);
        assert_eq!(config.region, "us-east-1");
        assert!(config.force_path_style);
    }
}
