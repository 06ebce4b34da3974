//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `OCRCTL_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `OCRCTL_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `OCRCTL_OCR__API_KEY=...` sets the `ocr.api_key` field.
//!
//! ## Example
//!
//! ```yaml
//! bucket: my-scans
//! storage:
//!   type: s3
//!   region: eu-west-1
//! ocr:
//!   type: vision
//!   api_key: AIza...
//! process:
//!   concurrency: 4
//! ```
//!
//! Cloud credentials are never part of this file: S3 and Textract use the standard AWS provider
//! chain, GCS uses the Google credential lookup (optionally pinned to a service account file), and
//! the Vision engine takes an API key (best supplied as `OCRCTL_OCR__API_KEY`).

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "OCRCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults except `bucket`, which validation requires to be set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Bucket that uploaded images and generated tables are written to
    pub bucket: String,
    /// Object storage backend
    pub storage: StorageConfig,
    /// OCR service used by the process endpoint
    pub ocr: OcrConfig,
    /// Process endpoint tuning
    pub process: ProcessConfig,
    /// Request size limits
    pub limits: LimitsConfig,
    /// CORS settings for browser clients
    pub cors: CorsConfig,
    /// Expose Prometheus metrics at `/internal/metrics`
    pub enable_metrics: bool,
    /// Log output and trace export
    pub telemetry: TelemetryConfig,
}

/// Object storage backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum StorageConfig {
    /// Store objects on local disk under `path/{bucket}/`
    Local { path: PathBuf },
    /// Store objects in S3 or an S3-compatible service
    S3 {
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint, e.g. `http://localhost:9000` for MinIO
        #[serde(default)]
        endpoint_url: Option<String>,
        #[serde(default)]
        force_path_style: bool,
    },
    /// Store objects in Google Cloud Storage
    Gcs {
        /// Service account key file; otherwise the standard Google credential lookup applies
        #[serde(default)]
        service_account_path: Option<String>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            path: PathBuf::from("./data"),
        }
    }
}

/// OCR engine selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum OcrConfig {
    /// Google Cloud Vision `TEXT_DETECTION`
    Vision {
        #[serde(default, skip_serializing)]
        api_key: Option<String>,
        #[serde(default = "default_vision_endpoint")]
        endpoint: Url,
        #[serde(default = "default_ocr_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
    /// AWS Textract `DetectDocumentText`
    Textract {
        #[serde(default)]
        region: Option<String>,
    },
}

fn default_vision_endpoint() -> Url {
    Url::parse(crate::ocr::vision::DEFAULT_ENDPOINT).expect("default Vision endpoint is a valid URL")
}

fn default_ocr_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig::Vision {
            api_key: None,
            endpoint: default_vision_endpoint(),
            timeout: default_ocr_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessConfig {
    /// Maximum images fetched and sent to OCR at once within a single request (default: 1,
    /// i.e. strictly sequential)
    pub concurrency: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum size of an upload request body in bytes (default: 32 MiB)
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests. Empty disables CORS headers entirely.
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://scanner.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Console log format
    pub format: LogFormat,
    /// OTLP/HTTP endpoint for trace export (e.g. `http://localhost:4318`). Unset disables export.
    pub otlp_endpoint: Option<String>,
    /// `service.name` resource attribute on exported spans
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            otlp_endpoint: None,
            service_name: "ocrctl".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            bucket: String::new(),
            storage: StorageConfig::default(),
            ocr: OcrConfig::default(),
            process: ProcessConfig::default(),
            limits: LimitsConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.bucket.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: bucket is not set. Add `bucket` to the config file or set OCRCTL_BUCKET.".to_string(),
            });
        }

        if self.bucket.contains('/') {
            return Err(Error::Internal {
                operation: format!("Config validation: bucket name '{}' must not contain '/'", self.bucket),
            });
        }

        if self.process.concurrency == 0 {
            return Err(Error::Internal {
                operation: "Config validation: process.concurrency cannot be 0 (use 1 for sequential processing)".to_string(),
            });
        }

        if self.limits.max_upload_bytes == 0 {
            return Err(Error::Internal {
                operation: "Config validation: limits.max_upload_bytes cannot be 0".to_string(),
            });
        }

        if let OcrConfig::Vision { api_key, .. } = &self.ocr
            && api_key.as_deref().is_none_or(str::is_empty)
        {
            return Err(Error::Internal {
                operation: "Config validation: the vision OCR engine requires ocr.api_key. \
                            Set OCRCTL_OCR__API_KEY or add api_key to the ocr section."
                    .to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables override specific values; OCRCTL_CONFIG names the file itself
            .merge(Env::prefixed("OCRCTL_").ignore(&["CONFIG"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
