//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations with proper
//! error handling and transaction support. Ownership scoping lives here:
//! every read takes the requesting user's id, and a document owned by a
//! different user is indistinguishable from a missing one.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::verdict::Verdict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scan result with its children and owning document
#[derive(Debug, Clone, Serialize)]
pub struct ScanResultDetail {
    pub scan_result: ScanResult,
    pub document: Document,
    pub fraud_flags: Vec<FraudFlag>,
    pub extracted_fields: Vec<ExtractedField>,
}

/// One entry in the human review worklist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQueueItem {
    pub scan_result_id: Uuid,
    pub document_id: Uuid,
    pub filename: String,
    pub file_path: String,
    pub overall_risk_score: i32,
    pub risk_level: String,
    pub document_type: Option<String>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    /// Create a new document record in the `pending` lifecycle state
    pub async fn create_document(
        &self,
        user_id: Uuid,
        filename: String,
        file_path: String,
        file_type: String,
        file_size: i64,
    ) -> Result<Document> {
        let now = chrono::Utc::now();

        let document = DocumentActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            filename: Set(filename),
            file_path: Set(file_path),
            file_type: Set(file_type),
            file_size: Set(file_size),
            status: Set(String::from(DocumentStatus::Pending)),
            review_status: Set(None),
            verified_by: Set(None),
            reviewer_notes: Set(None),
            verified_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        document.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find a document by id, scoped to its owner
    pub async fn find_document(&self, user_id: Uuid, id: Uuid) -> Result<Option<Document>> {
        DocumentEntity::find_by_id(id)
            .filter(DocumentColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a document by id, scoped to its owner, erroring when absent
    pub async fn require_document(&self, user_id: Uuid, id: Uuid) -> Result<Document> {
        self.find_document(user_id, id)
            .await?
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })
    }

    /// List a user's documents with pagination, newest first
    pub async fn list_documents(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Document>, u64)> {
        let paginator = DocumentEntity::find()
            .filter(DocumentColumn::UserId.eq(user_id))
            .order_by_desc(DocumentColumn::CreatedAt)
            .paginate(self.read_conn(), limit);

        let total = paginator.num_items().await?;
        let documents = paginator.fetch_page(offset / limit.max(1)).await?;

        Ok((documents, total))
    }

    /// Atomically claim a document for analysis: `pending`/`failed` moves
    /// to `processing` in a single conditional statement. Returns false
    /// when the document is in any other state, so two concurrent
    /// attempts can never both win the claim.
    pub async fn claim_for_analysis(&self, id: Uuid) -> Result<bool> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE documents SET status = 'processing', updated_at = now() \
             WHERE id = $1 AND status IN ('pending', 'failed')",
            vec![id.into()],
        );

        let result = self.write_conn().execute(stmt).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update a document's lifecycle status
    pub async fn update_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
    ) -> Result<Document> {
        let mut document: DocumentActiveModel = DocumentEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })?
            .into();

        document.status = Set(String::from(status));
        document.updated_at = Set(chrono::Utc::now().into());

        document.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Enter a document into the review worklist if it is not already there
    pub async fn flag_for_review(&self, id: Uuid) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE documents SET review_status = 'pending' WHERE id = $1 AND review_status IS NULL",
            vec![id.into()],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// Stamp a review decision onto a document
    pub async fn apply_review(
        &self,
        id: Uuid,
        status: ReviewStatus,
        reviewer: Uuid,
        notes: Option<String>,
    ) -> Result<Document> {
        let mut document: DocumentActiveModel = DocumentEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })?
            .into();

        document.review_status = Set(Some(String::from(status)));
        document.verified_by = Set(Some(reviewer));
        document.reviewer_notes = Set(notes);
        document.verified_at = Set(Some(chrono::Utc::now().into()));
        document.updated_at = Set(chrono::Utc::now().into());

        document.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a document record
    pub async fn delete_document(&self, id: Uuid) -> Result<bool> {
        let result = DocumentEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Verdict Operations
    // ========================================================================

    /// Persist a parsed verdict: one ScanResult row plus its FraudFlag and
    /// ExtractedField children, in a single transaction. Either the whole
    /// verdict lands or none of it does; a partially-written verdict is
    /// never visible.
    pub async fn create_verdict(&self, document_id: Uuid, verdict: &Verdict) -> Result<ScanResult> {
        let now = chrono::Utc::now();
        let scan_result_id = Uuid::new_v4();

        let txn = self.write_conn().begin().await?;

        let scan_result = ScanResultActiveModel {
            id: Set(scan_result_id),
            document_id: Set(document_id),
            overall_risk_score: Set(verdict.overall_risk_score),
            risk_level: Set(verdict.risk_level.as_str().to_string()),
            raw_ocr_text: Set(verdict.ocr_text.clone()),
            document_type: Set(Some(verdict.document_type.clone())),
            analysis_summary: Set(verdict.analysis_summary.clone()),
            passed_checks: Set(serde_json::json!(verdict.passed_checks)),
            created_at: Set(now.into()),
        };

        let scan_result = scan_result.insert(&txn).await?;

        for flag in &verdict.fraud_flags {
            let region_json = match flag.region_coords {
                Some(region) => Some(serde_json::to_value(region)?),
                None => None,
            };

            let row = FraudFlagActiveModel {
                id: Set(Uuid::new_v4()),
                scan_result_id: Set(scan_result_id),
                flag_type: Set(flag.flag_type.clone()),
                name: Set(flag.name.clone()),
                description: Set(flag.description.clone()),
                severity: Set(flag.severity.as_str().to_string()),
                confidence: Set(flag.confidence),
                evidence_reference: Set(flag.evidence_reference.clone()),
                page_number: Set(flag.page_number),
                region_coords: Set(region_json),
                created_at: Set(now.into()),
            };
            row.insert(&txn).await?;
        }

        for field in &verdict.extracted_fields {
            let row = ExtractedFieldActiveModel {
                id: Set(Uuid::new_v4()),
                scan_result_id: Set(scan_result_id),
                field_name: Set(field.field_name.clone()),
                field_value: Set(Some(field.field_value.clone())),
                confidence: Set(Some(field.confidence)),
                created_at: Set(now.into()),
            };
            row.insert(&txn).await?;
        }

        txn.commit().await?;

        Ok(scan_result)
    }

    /// Fetch a scan result with its children, scoped to the owning user
    pub async fn find_scan_result(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ScanResultDetail>> {
        let Some(scan_result) = ScanResultEntity::find_by_id(id).one(self.read_conn()).await?
        else {
            return Ok(None);
        };

        // Ownership check rides on the document lookup
        let Some(document) = self
            .find_document(user_id, scan_result.document_id)
            .await?
        else {
            return Ok(None);
        };

        let fraud_flags = FraudFlagEntity::find()
            .filter(FraudFlagColumn::ScanResultId.eq(id))
            .order_by_desc(FraudFlagColumn::Confidence)
            .all(self.read_conn())
            .await?;

        let extracted_fields = ExtractedFieldEntity::find()
            .filter(ExtractedFieldColumn::ScanResultId.eq(id))
            .order_by_asc(ExtractedFieldColumn::FieldName)
            .all(self.read_conn())
            .await?;

        Ok(Some(ScanResultDetail {
            scan_result,
            document,
            fraud_flags,
            extracted_fields,
        }))
    }

    /// Latest scan result for a document, if any
    pub async fn latest_scan_result(&self, document_id: Uuid) -> Result<Option<ScanResult>> {
        ScanResultEntity::find()
            .filter(ScanResultColumn::DocumentId.eq(document_id))
            .order_by_desc(ScanResultColumn::CreatedAt)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Review Queue
    // ========================================================================

    /// Fetch the review worklist for a user: scan results at or above the
    /// review threshold whose documents still await a decision, highest
    /// score first.
    pub async fn review_queue(&self, user_id: Uuid, threshold: i32) -> Result<Vec<ReviewQueueItem>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                s.id as scan_result_id,
                d.id as document_id,
                d.filename,
                d.file_path,
                s.overall_risk_score,
                s.risk_level,
                s.document_type,
                s.created_at
            FROM scan_results s
            JOIN documents d ON s.document_id = d.id
            WHERE d.user_id = $1
              AND s.overall_risk_score >= $2
              AND d.review_status = 'pending'
            ORDER BY s.overall_risk_score DESC
            "#,
            vec![user_id.into(), threshold.into()],
        );

        let rows = self.read_conn().query_all(stmt).await?;

        let items = rows
            .into_iter()
            .filter_map(|row| {
                Some(ReviewQueueItem {
                    scan_result_id: row.try_get_by_index::<Uuid>(0).ok()?,
                    document_id: row.try_get_by_index::<Uuid>(1).ok()?,
                    filename: row.try_get_by_index::<String>(2).ok()?,
                    file_path: row.try_get_by_index::<String>(3).ok()?,
                    overall_risk_score: row.try_get_by_index::<i32>(4).ok()?,
                    risk_level: row.try_get_by_index::<String>(5).ok()?,
                    document_type: row.try_get_by_index::<Option<String>>(6).ok()?,
                    created_at: row
                        .try_get_by_index::<chrono::DateTime<chrono::FixedOffset>>(7)
                        .ok()?,
                })
            })
            .collect();

        Ok(items)
    }

    // ========================================================================
    // Notification Operations
    // ========================================================================

    /// Create a notification for a user
    pub async fn create_notification(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: String,
        message: String,
        entity: EntityRef,
    ) -> Result<Notification> {
        let (entity_type, entity_id) = entity.into_columns();

        let notification = NotificationActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            kind: Set(String::from(kind)),
            title: Set(title),
            message: Set(message),
            read: Set(false),
            entity_type: Set(entity_type),
            entity_id: Set(entity_id),
            created_at: Set(chrono::Utc::now().into()),
        };

        notification
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// List a user's notifications, newest first
    pub async fn list_notifications(&self, user_id: Uuid, limit: u64) -> Result<Vec<Notification>> {
        NotificationEntity::find()
            .filter(NotificationColumn::UserId.eq(user_id))
            .order_by_desc(NotificationColumn::CreatedAt)
            .paginate(self.read_conn(), limit)
            .fetch_page(0)
            .await
            .map_err(Into::into)
    }

    /// Mark a notification as read, scoped to its owner
    pub async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let Some(notification) = NotificationEntity::find_by_id(id)
            .filter(NotificationColumn::UserId.eq(user_id))
            .one(self.write_conn())
            .await?
        else {
            return Ok(false);
        };

        let mut notification: NotificationActiveModel = notification.into();
        notification.read = Set(true);
        notification.update(self.write_conn()).await?;

        Ok(true)
    }

    // ========================================================================
    // Audit Log Operations
    // ========================================================================

    /// Append an audit log entry
    pub async fn create_audit_log(
        &self,
        user_id: Uuid,
        action: AuditAction,
        entity_type: &str,
        entity_id: Option<Uuid>,
        metadata: Option<serde_json::Value>,
    ) -> Result<()> {
        let entry = AuditLogActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            action: Set(String::from(action)),
            entity_type: Set(entity_type.to_string()),
            entity_id: Set(entity_id),
            metadata: Set(metadata),
            created_at: Set(chrono::Utc::now().into()),
        };

        entry.insert(self.write_conn()).await?;
        Ok(())
    }
}
