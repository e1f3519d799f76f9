//! Human review workflow
//!
//! Documents whose verdict crosses the review threshold enter a pending
//! review state. A reviewer settles each one as verified or rejected;
//! both outcomes are terminal.

use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use veridoc_common::db::models::{
    AuditAction, Document, EntityRef, NotificationKind, ReviewStatus,
};
use veridoc_common::db::{Repository, ReviewQueueItem};
use veridoc_common::errors::{AppError, Result};
use veridoc_common::metrics::record_review;
use veridoc_common::storage::BlobStore;
use veridoc_common::REVIEW_THRESHOLD;

/// A reviewer's decision on a flagged document
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Verify,
    Reject,
}

impl ReviewDecision {
    pub fn target_status(self) -> ReviewStatus {
        match self {
            ReviewDecision::Verify => ReviewStatus::Verified,
            ReviewDecision::Reject => ReviewStatus::Rejected,
        }
    }
}

/// Check whether a decision may be applied given the document's current
/// review state
pub fn check_transition(document_id: Uuid, current: Option<ReviewStatus>) -> Result<()> {
    match current {
        Some(ReviewStatus::Pending) => Ok(()),
        Some(ReviewStatus::Verified) | Some(ReviewStatus::Rejected) => {
            Err(AppError::AlreadyReviewed {
                id: document_id.to_string(),
            })
        }
        None => Err(AppError::Validation {
            message: "Document is not flagged for review".to_string(),
        }),
    }
}

/// Review workflow over the repository
pub struct ReviewService {
    repository: Repository,
    storage: Arc<dyn BlobStore>,
    signed_url_ttl_secs: u64,
}

impl ReviewService {
    pub fn new(repository: Repository, storage: Arc<dyn BlobStore>, signed_url_ttl_secs: u64) -> Self {
        Self {
            repository,
            storage,
            signed_url_ttl_secs,
        }
    }

    /// The reviewer's worklist: flagged documents awaiting a decision,
    /// highest risk first, each with a time-limited blob URL for viewing
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn queue(&self, user_id: Uuid) -> Result<Vec<ReviewQueueItem>> {
        self.repository.review_queue(user_id, REVIEW_THRESHOLD).await
    }

    /// Produce a signed read URL for a document's staged blob
    pub fn preview_url(&self, file_path: &str) -> Result<String> {
        self.storage.signed_url(file_path, self.signed_url_ttl_secs)
    }

    /// Apply a reviewer's decision to a flagged document
    #[instrument(skip(self, notes), fields(user_id = %user_id, document_id = %document_id))]
    pub async fn decide(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<Document> {
        let document = self.repository.require_document(user_id, document_id).await?;
        check_transition(document_id, document.review())?;

        let status = decision.target_status();
        let document = self
            .repository
            .apply_review(document_id, status, user_id, notes)
            .await?;

        let status_str: String = status.into();
        record_review(&status_str);

        let (kind, action, title) = match decision {
            ReviewDecision::Verify => (
                NotificationKind::Verified,
                AuditAction::Verify,
                "Document Verified",
            ),
            ReviewDecision::Reject => (
                NotificationKind::Rejected,
                AuditAction::Reject,
                "Document Rejected",
            ),
        };

        let message = format!("\"{}\" was marked as {}.", document.filename, status_str);
        if let Err(e) = self
            .repository
            .create_notification(
                user_id,
                kind,
                title.to_string(),
                message,
                EntityRef::Document(document_id),
            )
            .await
        {
            warn!(error = %e, "Failed to create review notification");
        }

        if let Err(e) = self
            .repository
            .create_audit_log(
                user_id,
                action,
                "document",
                Some(document_id),
                Some(serde_json::json!({ "decision": status_str })),
            )
            .await
        {
            warn!(error = %e, "Failed to write audit log entry");
        }

        info!(decision = %status_str, "Review decision applied");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use veridoc_common::db::DbPool;
    use veridoc_common::storage::MemoryBlobStore;

    #[test]
    fn test_preview_url_signs_the_blob_path() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let pool = DbPool {
            primary: Arc::new(db),
            replica: None,
        };
        let service = ReviewService::new(
            Repository::new(pool),
            Arc::new(MemoryBlobStore::new()),
            600,
        );

        let url = service.preview_url("user/scan.png").unwrap();
        assert!(url.contains("user/scan.png"));
        assert!(url.contains("600"));
    }

    #[test]
    fn test_pending_accepts_decision() {
        assert!(check_transition(Uuid::new_v4(), Some(ReviewStatus::Pending)).is_ok());
    }

    #[test]
    fn test_settled_states_are_terminal() {
        assert!(matches!(
            check_transition(Uuid::new_v4(), Some(ReviewStatus::Verified)),
            Err(AppError::AlreadyReviewed { .. })
        ));
        assert!(matches!(
            check_transition(Uuid::new_v4(), Some(ReviewStatus::Rejected)),
            Err(AppError::AlreadyReviewed { .. })
        ));
    }

    #[test]
    fn test_unflagged_document_rejects_decision() {
        assert!(matches!(
            check_transition(Uuid::new_v4(), None),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_decision_target_status() {
        assert_eq!(ReviewDecision::Verify.target_status(), ReviewStatus::Verified);
        assert_eq!(ReviewDecision::Reject.target_status(), ReviewStatus::Rejected);
    }
}
