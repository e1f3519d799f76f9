//! VeriDoc Common Library
//!
//! Shared code for the VeriDoc services including:
//! - Database models and repository patterns
//! - Blob storage adapter
//! - Analysis oracle client abstraction
//! - Verdict parsing and normalization
//! - Region overlay geometry
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod oracle;
pub mod overlay;
pub mod storage;
pub mod verdict;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use oracle::AnalysisOracle;
pub use storage::BlobStore;
pub use verdict::Verdict;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Risk score at or above which a document enters the review queue
pub const REVIEW_THRESHOLD: i32 = 60;
