//! Configuration management for VeriDoc services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Blob storage configuration
    pub storage: StorageConfig,

    /// Analysis oracle configuration
    pub oracle: OracleConfig,

    /// Upload validation limits
    pub validation: ValidationConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for the filesystem blob store
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Secret used to sign time-limited read URLs
    pub url_signing_secret: Option<String>,

    /// Base URL prefixed to signed paths
    #[serde(default = "default_storage_base_url")]
    pub base_url: String,

    /// Signed URL time-to-live in seconds
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    /// API key for the analysis gateway
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_oracle_base_url")]
    pub api_base: String,

    /// Multimodal model to use
    #[serde(default = "default_oracle_model")]
    pub model: String,

    /// Maximum tokens in the oracle response
    #[serde(default = "default_oracle_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

impl OracleConfig {
    /// Get the request timeout as Duration
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_oracle_base_url(),
            model: default_oracle_model(),
            max_tokens: default_oracle_max_tokens(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Accepted mime types for uploads
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,

    /// Maximum file size in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Maximum number of files in one batch submission
    #[serde(default = "default_max_batch_files")]
    pub max_batch_files: usize,

    /// In-flight pipeline cap during batch processing
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token validation
    pub jwt_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// Request ID header name
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_storage_root() -> String { "./data/documents".to_string() }
fn default_storage_base_url() -> String { "http://localhost:8080/v1/blobs".to_string() }
fn default_signed_url_ttl() -> u64 { 3600 }
fn default_oracle_base_url() -> String { "https://ai.gateway.lovable.dev/v1".to_string() }
fn default_oracle_model() -> String { "google/gemini-2.5-flash".to_string() }
fn default_oracle_max_tokens() -> u32 { 4096 }
fn default_oracle_timeout() -> u64 { 60 }
fn default_allowed_mime_types() -> Vec<String> {
    vec![
        "application/pdf".to_string(),
        "image/jpeg".to_string(),
        "image/jpg".to_string(),
        "image/png".to_string(),
    ]
}
fn default_max_file_bytes() -> u64 { 10 * 1024 * 1024 }
fn default_max_batch_files() -> usize { 10 }
fn default_batch_concurrency() -> usize { 3 }
fn default_jwt_expiration() -> u64 { 3600 }
fn default_request_id_header() -> String { "X-Request-ID".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "veridoc".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }

    /// Get the oracle request timeout as Duration
    pub fn oracle_timeout(&self) -> Duration {
        self.oracle.oracle_timeout()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/veridoc".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            storage: StorageConfig {
                root: default_storage_root(),
                url_signing_secret: None,
                base_url: default_storage_base_url(),
                signed_url_ttl_secs: default_signed_url_ttl(),
            },
            oracle: OracleConfig::default(),
            validation: ValidationConfig {
                allowed_mime_types: default_allowed_mime_types(),
                max_file_bytes: default_max_file_bytes(),
                max_batch_files: default_max_batch_files(),
                batch_concurrency: default_batch_concurrency(),
            },
            auth: AuthConfig {
                jwt_secret: None,
                jwt_expiration_secs: default_jwt_expiration(),
                request_id_header: default_request_id_header(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.validation.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.validation.max_batch_files, 10);
        assert_eq!(config.validation.batch_concurrency, 3);
        assert_eq!(config.oracle.timeout_secs, 60);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/veridoc");
    }

    #[test]
    fn test_allowed_types_include_pdf_and_images() {
        let config = AppConfig::default();
        let allowed = &config.validation.allowed_mime_types;
        assert!(allowed.iter().any(|m| m == "application/pdf"));
        assert!(allowed.iter().any(|m| m == "image/png"));
        assert!(allowed.iter().any(|m| m == "image/jpeg"));
    }
}
