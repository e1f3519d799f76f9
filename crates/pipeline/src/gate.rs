//! Upload validation gate
//!
//! Every upload passes through here before any storage or database write.
//! Checks run in a fixed order and the first failure wins, so a file that
//! is both the wrong type and oversized reports the type error.

use veridoc_common::config::ValidationConfig;
use veridoc_common::errors::{AppError, Result};
use veridoc_common::metrics::record_rejection;

/// Metadata about one uploaded file, checked before its bytes go anywhere
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

/// Validation gate configured with the service's upload limits
#[derive(Debug, Clone)]
pub struct ValidationGate {
    allowed_mime_types: Vec<String>,
    max_file_bytes: u64,
    max_batch_files: usize,
}

impl ValidationGate {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            allowed_mime_types: config.allowed_mime_types.clone(),
            max_file_bytes: config.max_file_bytes,
            max_batch_files: config.max_batch_files,
        }
    }

    /// Check a single file: mime type first, then size
    pub fn check_file(&self, meta: &FileMeta) -> Result<()> {
        if !self
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&meta.mime_type))
        {
            record_rejection("unsupported_type");
            return Err(AppError::UnsupportedFileType {
                mime_type: meta.mime_type.clone(),
            });
        }

        if meta.size > self.max_file_bytes {
            record_rejection("too_large");
            return Err(AppError::FileTooLarge {
                size: meta.size,
                limit: self.max_file_bytes,
            });
        }

        Ok(())
    }

    /// Check a batch submission: count first, then each file in order
    pub fn check_batch(&self, files: &[FileMeta]) -> Result<()> {
        if files.is_empty() {
            record_rejection("empty_batch");
            return Err(AppError::Validation {
                message: "No files provided".to_string(),
            });
        }

        if files.len() > self.max_batch_files {
            record_rejection("batch_too_large");
            return Err(AppError::BatchTooLarge {
                count: files.len(),
                limit: self.max_batch_files,
            });
        }

        for meta in files {
            self.check_file(meta)?;
        }

        Ok(())
    }

    pub fn max_batch_files(&self) -> usize {
        self.max_batch_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> ValidationGate {
        ValidationGate::new(&ValidationConfig {
            allowed_mime_types: vec![
                "application/pdf".to_string(),
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
            ],
            max_file_bytes: 10 * 1024 * 1024,
            max_batch_files: 10,
            batch_concurrency: 3,
        })
    }

    fn file(mime: &str, size: u64) -> FileMeta {
        FileMeta {
            filename: "doc.pdf".to_string(),
            mime_type: mime.to_string(),
            size,
        }
    }

    #[test]
    fn test_accepts_allowed_types() {
        let gate = gate();
        for mime in ["application/pdf", "image/jpeg", "image/jpg", "image/png"] {
            assert!(gate.check_file(&file(mime, 1024)).is_ok(), "{mime}");
        }
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let err = gate().check_file(&file("image/gif", 1024)).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let err = gate()
            .check_file(&file("application/pdf", 10 * 1024 * 1024 + 1))
            .unwrap_err();
        assert!(matches!(err, AppError::FileTooLarge { .. }));
    }

    #[test]
    fn test_file_at_limit_passes() {
        assert!(gate()
            .check_file(&file("application/pdf", 10 * 1024 * 1024))
            .is_ok());
    }

    #[test]
    fn test_type_check_runs_before_size() {
        // Both violations present: the type error is reported
        let err = gate()
            .check_file(&file("text/plain", 20 * 1024 * 1024))
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));
    }

    #[test]
    fn test_rejects_oversized_batch() {
        let files: Vec<FileMeta> = (0..11).map(|_| file("image/png", 100)).collect();
        let err = gate().check_batch(&files).unwrap_err();
        assert!(matches!(err, AppError::BatchTooLarge { count: 11, .. }));
    }

    #[test]
    fn test_rejects_empty_batch() {
        let err = gate().check_batch(&[]).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_batch_reports_first_bad_file() {
        let files = vec![
            file("image/png", 100),
            file("text/html", 100),
            file("application/zip", 100),
        ];
        let err = gate().check_batch(&files).unwrap_err();
        assert!(
            matches!(err, AppError::UnsupportedFileType { ref mime_type } if mime_type == "text/html")
        );
    }
}
