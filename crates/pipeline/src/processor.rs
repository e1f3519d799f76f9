//! Analysis pipeline orchestrator
//!
//! Drives a document through its lifecycle: validate, stage the blob,
//! create the record, call the analysis oracle, persist the verdict, and
//! route notifications. Status ordering is deliberate: `processing` is
//! persisted before the oracle call so a crash mid-analysis leaves an
//! honest state, and `completed` is the last write so readers never see a
//! completed document without its verdict.

use crate::gate::ValidationGate;
use crate::notify::notification_content;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use veridoc_common::db::models::{
    AuditAction, Document, DocumentStatus, EntityRef, ScanResult,
};
use veridoc_common::db::Repository;
use veridoc_common::errors::{AppError, Result};
use veridoc_common::metrics::record_analysis;
use veridoc_common::oracle::AnalysisOracle;
use veridoc_common::storage::{blob_path, BlobStore};
use veridoc_common::verdict::{parse_verdict, Verdict};
use veridoc_common::REVIEW_THRESHOLD;

/// One uploaded file, fully buffered
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn meta(&self) -> crate::gate::FileMeta {
        crate::gate::FileMeta {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size: self.bytes.len() as u64,
        }
    }
}

/// Result of a completed analysis run
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub document: Document,
    pub scan_result: ScanResult,
    pub verdict: Verdict,
}

impl AnalysisOutcome {
    pub fn fraud_flags_count(&self) -> usize {
        self.verdict.fraud_flags.len()
    }
}

/// Pipeline orchestrator
pub struct AnalysisPipeline {
    repository: Repository,
    storage: Arc<dyn BlobStore>,
    oracle: Arc<dyn AnalysisOracle>,
    gate: ValidationGate,
}

impl AnalysisPipeline {
    pub fn new(
        repository: Repository,
        storage: Arc<dyn BlobStore>,
        oracle: Arc<dyn AnalysisOracle>,
        gate: ValidationGate,
    ) -> Self {
        Self {
            repository,
            storage,
            oracle,
            gate,
        }
    }

    pub fn gate(&self) -> &ValidationGate {
        &self.gate
    }

    /// Validate an upload, stage its blob, and create the document record
    /// in the `pending` state
    #[instrument(skip(self, file), fields(user_id = %user_id, filename = %file.filename))]
    pub async fn ingest(&self, user_id: Uuid, file: UploadedFile) -> Result<Document> {
        let path = stage_upload(&self.gate, self.storage.as_ref(), user_id, &file).await?;

        let document = self
            .repository
            .create_document(
                user_id,
                file.filename.clone(),
                path,
                file.mime_type.clone(),
                file.bytes.len() as i64,
            )
            .await?;

        metrics::counter!("veridoc_documents_uploaded_total").increment(1);

        self.audit(
            user_id,
            AuditAction::Upload,
            Some(document.id),
            serde_json::json!({
                "filename": file.filename,
                "file_size": file.bytes.len(),
            }),
        )
        .await;

        info!(document_id = %document.id, "Document ingested");
        Ok(document)
    }

    /// Run the full analysis for a staged document
    #[instrument(skip(self), fields(user_id = %user_id, document_id = %document_id))]
    pub async fn analyze(&self, user_id: Uuid, document_id: Uuid) -> Result<AnalysisOutcome> {
        let document = self.repository.require_document(user_id, document_id).await?;

        match document.lifecycle() {
            DocumentStatus::Processing => {
                return Err(AppError::AnalysisInProgress {
                    id: document_id.to_string(),
                })
            }
            DocumentStatus::Completed => {
                return Err(AppError::Validation {
                    message: "Document has already been analyzed".to_string(),
                })
            }
            DocumentStatus::Pending | DocumentStatus::Failed => {}
        }

        let start = Instant::now();

        // Atomic pending/failed -> processing transition, persisted before
        // the oracle call so a crash mid-analysis leaves an honest state.
        // Losing the claim means another attempt got there first.
        if !self.repository.claim_for_analysis(document_id).await? {
            return Err(AppError::AnalysisInProgress {
                id: document_id.to_string(),
            });
        }

        match self.run_analysis(&document).await {
            Ok(outcome) => {
                record_analysis(start.elapsed().as_secs_f64(), "completed");

                let (kind, title, message) = notification_content(
                    &outcome.document.filename,
                    outcome.verdict.overall_risk_score,
                    outcome.verdict.risk_level,
                );
                self.notify(user_id, kind, title, message, outcome.scan_result.id)
                    .await;

                self.audit(
                    user_id,
                    AuditAction::Analyze,
                    Some(document_id),
                    serde_json::json!({
                        "scan_result_id": outcome.scan_result.id,
                        "risk_score": outcome.verdict.overall_risk_score,
                        "risk_level": outcome.verdict.risk_level,
                        "fraud_flags_count": outcome.fraud_flags_count(),
                    }),
                )
                .await;

                info!(
                    scan_result_id = %outcome.scan_result.id,
                    risk_score = outcome.verdict.overall_risk_score,
                    "Analysis completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                record_analysis(start.elapsed().as_secs_f64(), "failed");

                if let Err(status_err) = self
                    .repository
                    .update_document_status(document_id, DocumentStatus::Failed)
                    .await
                {
                    warn!(error = %status_err, "Failed to mark document as failed");
                }

                warn!(error = %e, retryable = e.is_retryable(), "Analysis failed");
                Err(e)
            }
        }
    }

    /// Re-run analysis for a failed document, reusing its staged blob
    #[instrument(skip(self), fields(user_id = %user_id, document_id = %document_id))]
    pub async fn retry(&self, user_id: Uuid, document_id: Uuid) -> Result<AnalysisOutcome> {
        let document = self.repository.require_document(user_id, document_id).await?;

        if document.lifecycle() != DocumentStatus::Failed {
            return Err(AppError::Validation {
                message: "Only failed documents can be retried".to_string(),
            });
        }

        info!("Retrying failed analysis");
        self.analyze(user_id, document_id).await
    }

    /// Delete a document record and its staged blob
    #[instrument(skip(self), fields(user_id = %user_id, document_id = %document_id))]
    pub async fn delete(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
        let document = self.repository.require_document(user_id, document_id).await?;

        self.repository.delete_document(document_id).await?;

        // Record is gone; a dangling blob only costs disk, so its removal
        // is best-effort
        if let Err(e) = self.storage.delete(&document.file_path).await {
            warn!(error = %e, path = %document.file_path, "Failed to delete blob");
        }

        self.audit(
            user_id,
            AuditAction::Delete,
            Some(document_id),
            serde_json::json!({ "filename": document.filename }),
        )
        .await;

        info!("Document deleted");
        Ok(())
    }

    async fn run_analysis(&self, document: &Document) -> Result<AnalysisOutcome> {
        let bytes = self.storage.download(&document.file_path).await?;
        let raw_text = self.oracle.analyze(&document.file_type, &bytes).await?;
        let verdict = parse_verdict(&raw_text);

        let scan_result = self.repository.create_verdict(document.id, &verdict).await?;

        if verdict.overall_risk_score >= REVIEW_THRESHOLD {
            self.repository.flag_for_review(document.id).await?;
        }

        // Last write: readers never see `completed` without its verdict
        let document = self
            .repository
            .update_document_status(document.id, DocumentStatus::Completed)
            .await?;

        Ok(AnalysisOutcome {
            document,
            scan_result,
            verdict,
        })
    }

    async fn notify(
        &self,
        user_id: Uuid,
        kind: veridoc_common::db::models::NotificationKind,
        title: String,
        message: String,
        scan_result_id: Uuid,
    ) {
        if let Err(e) = self
            .repository
            .create_notification(user_id, kind, title, message, EntityRef::ScanResult(scan_result_id))
            .await
        {
            warn!(error = %e, "Failed to create notification");
        }
    }

    async fn audit(
        &self,
        user_id: Uuid,
        action: AuditAction,
        entity_id: Option<Uuid>,
        metadata: serde_json::Value,
    ) {
        if let Err(e) = self
            .repository
            .create_audit_log(user_id, action, "document", entity_id, Some(metadata))
            .await
        {
            warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

/// Validate and stage one upload. The gate runs before any storage call,
/// so a rejected file performs no I/O at all.
async fn stage_upload(
    gate: &ValidationGate,
    storage: &dyn BlobStore,
    user_id: Uuid,
    file: &UploadedFile,
) -> Result<String> {
    gate.check_file(&file.meta())?;

    let path = blob_path(user_id, &file.filename);
    storage.upload(&path, &file.bytes).await?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use veridoc_common::config::ValidationConfig;
    use veridoc_common::db::models::{AuditLogEntry, Notification};
    use veridoc_common::db::DbPool;
    use veridoc_common::oracle::ScriptedOracle;
    use veridoc_common::storage::MemoryBlobStore;

    fn gate() -> ValidationGate {
        ValidationGate::new(&ValidationConfig {
            allowed_mime_types: vec!["application/pdf".to_string(), "image/png".to_string()],
            max_file_bytes: 1024,
            max_batch_files: 10,
            batch_concurrency: 3,
        })
    }

    fn file(mime: &str, bytes: Vec<u8>) -> UploadedFile {
        UploadedFile {
            filename: "statement.pdf".to_string(),
            mime_type: mime.to_string(),
            bytes,
        }
    }

    #[tokio::test]
    async fn test_stage_upload_writes_namespaced_blob() {
        let storage = MemoryBlobStore::new();
        let user_id = Uuid::new_v4();

        let path = stage_upload(&gate(), &storage, user_id, &file("application/pdf", vec![1; 100]))
            .await
            .unwrap();

        assert!(path.starts_with(&format!("{}/", user_id)));
        assert_eq!(storage.download(&path).await.unwrap(), vec![1; 100]);
    }

    #[tokio::test]
    async fn test_rejected_upload_never_touches_storage() {
        let storage = MemoryBlobStore::new();

        let err = stage_upload(&gate(), &storage, Uuid::new_v4(), &file("image/gif", vec![1; 100]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));

        let err = stage_upload(&gate(), &storage, Uuid::new_v4(), &file("image/png", vec![1; 2048]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileTooLarge { .. }));

        assert_eq!(storage.call_count(), 0);
    }

    #[test]
    fn test_uploaded_file_meta() {
        let meta = file("application/pdf", vec![0; 42]).meta();
        assert_eq!(meta.size, 42);
        assert_eq!(meta.mime_type, "application/pdf");
    }

    fn document_row(id: Uuid, user_id: Uuid, status: &str, file_path: &str) -> Document {
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        Document {
            id,
            user_id,
            filename: "statement.pdf".to_string(),
            file_path: file_path.to_string(),
            file_type: "application/pdf".to_string(),
            file_size: 100,
            status: status.to_string(),
            review_status: None,
            verified_by: None,
            reviewer_notes: None,
            verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn scan_row(id: Uuid, document_id: Uuid, score: i32) -> ScanResult {
        ScanResult {
            id,
            document_id,
            overall_risk_score: score,
            risk_level: "low".to_string(),
            raw_ocr_text: None,
            document_type: Some("Utility Bill".to_string()),
            analysis_summary: None,
            passed_checks: serde_json::json!(["format"]),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn notification_row(user_id: Uuid, scan_result_id: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            kind: "analysis_complete".to_string(),
            title: "Analysis Complete".to_string(),
            message: "done".to_string(),
            read: false,
            entity_type: Some("scan_result".to_string()),
            entity_id: Some(scan_result_id),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn audit_row(user_id: Uuid, document_id: Uuid) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            user_id,
            action: "analyze".to_string(),
            entity_type: "document".to_string(),
            entity_id: Some(document_id),
            metadata: None,
            created_at: chrono::Utc::now().into(),
        }
    }

    fn mock_pipeline(
        conn: Arc<DatabaseConnection>,
        storage: Arc<MemoryBlobStore>,
        oracle: Arc<ScriptedOracle>,
    ) -> AnalysisPipeline {
        let pool = DbPool {
            primary: conn,
            replica: None,
        };
        AnalysisPipeline::new(Repository::new(pool), storage, oracle, gate())
    }

    const LOW_RISK_VERDICT: &str = r#"{
        "overall_risk_score": 10,
        "risk_level": "low",
        "document_type": "Utility Bill",
        "fraud_flags": [],
        "extracted_fields": [],
        "passed_checks": ["format"]
    }"#;

    #[tokio::test]
    async fn test_analysis_success_completes_after_verdict_write() {
        let user_id = Uuid::new_v4();
        let doc_id = Uuid::new_v4();
        let scan_id = Uuid::new_v4();
        let path = format!("{}/blob.pdf", user_id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![document_row(doc_id, user_id, "pending", &path)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![scan_row(scan_id, doc_id, 10)]])
            .append_query_results([
                vec![document_row(doc_id, user_id, "processing", &path)],
                vec![document_row(doc_id, user_id, "completed", &path)],
            ])
            .append_query_results([vec![notification_row(user_id, scan_id)]])
            .append_query_results([vec![audit_row(user_id, doc_id)]])
            .into_connection();
        let db = Arc::new(db);
        let log_handle = db.clone();

        let storage = Arc::new(MemoryBlobStore::new());
        storage.upload(&path, b"pdf bytes").await.unwrap();
        let oracle = Arc::new(ScriptedOracle::with_response(LOW_RISK_VERDICT));

        let pipeline = mock_pipeline(db, storage, oracle.clone());
        let outcome = pipeline.analyze(user_id, doc_id).await.unwrap();

        assert_eq!(outcome.document.lifecycle(), DocumentStatus::Completed);
        assert_eq!(outcome.scan_result.id, scan_id);
        assert_eq!(outcome.verdict.overall_risk_score, 10);
        assert_eq!(oracle.call_count(), 1);

        // The verdict transaction lands before the completed write, and
        // exactly one notification of the right kind is created
        drop(pipeline);
        let log = format!(
            "{:?}",
            Arc::try_unwrap(log_handle).unwrap().into_transaction_log()
        );
        let verdict_write = log.find("scan_results").unwrap();
        let completed_write = log.find("completed").unwrap();
        assert!(verdict_write < completed_write);
        assert_eq!(log.matches("notifications").count(), 1);
        assert!(log.contains("analysis_complete"));
    }

    #[tokio::test]
    async fn test_oracle_rate_limit_marks_document_failed() {
        let user_id = Uuid::new_v4();
        let doc_id = Uuid::new_v4();
        let path = format!("{}/blob.pdf", user_id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![document_row(doc_id, user_id, "pending", &path)],
                vec![document_row(doc_id, user_id, "processing", &path)],
                vec![document_row(doc_id, user_id, "failed", &path)],
            ])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let db = Arc::new(db);
        let log_handle = db.clone();

        let storage = Arc::new(MemoryBlobStore::new());
        storage.upload(&path, b"pdf bytes").await.unwrap();
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_err(AppError::RateLimited);

        let pipeline = mock_pipeline(db, storage, oracle.clone());
        let err = pipeline.analyze(user_id, doc_id).await.unwrap_err();

        assert!(matches!(err, AppError::RateLimited));
        assert!(err.is_retryable());
        assert_eq!(oracle.call_count(), 1);

        // Two status updates ran (the claim and the failed mark) and no
        // verdict rows were attempted
        drop(pipeline);
        let log = format!(
            "{:?}",
            Arc::try_unwrap(log_handle).unwrap().into_transaction_log()
        );
        assert_eq!(log.matches("UPDATE").count(), 2);
        assert!(!log.contains("scan_results"));
    }

    #[tokio::test]
    async fn test_losing_the_processing_claim_stops_the_attempt() {
        let user_id = Uuid::new_v4();
        let doc_id = Uuid::new_v4();
        let path = format!("{}/blob.pdf", user_id);

        // The conditional claim update matches zero rows: another attempt
        // moved the document out of pending first
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![document_row(doc_id, user_id, "pending", &path)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let db = Arc::new(db);

        let storage = Arc::new(MemoryBlobStore::new());
        let oracle = Arc::new(ScriptedOracle::with_response(LOW_RISK_VERDICT));

        let pipeline = mock_pipeline(db, storage.clone(), oracle.clone());
        let err = pipeline.analyze(user_id, doc_id).await.unwrap_err();

        assert!(matches!(err, AppError::AnalysisInProgress { .. }));
        assert_eq!(oracle.call_count(), 0);
        assert_eq!(storage.call_count(), 0);
    }
}
