//! Document upload and lifecycle handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use veridoc_common::{
    auth::AuthContext,
    db::models::Document,
    errors::{AppError, Result},
};
use veridoc_pipeline::{AnalysisOutcome, UploadedFile};

/// A document as returned by the API
#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub status: String,
    pub review_status: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Document> for DocumentResponse {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id,
            filename: document.filename.clone(),
            file_type: document.file_type.clone(),
            file_size: document.file_size,
            status: document.status.clone(),
            review_status: document.review_status.clone(),
            created_at: document.created_at.to_rfc3339(),
            updated_at: document.updated_at.to_rfc3339(),
        }
    }
}

/// Response after a completed analysis run
#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub document: DocumentResponse,
    pub scan_result_id: Uuid,
    pub overall_risk_score: i32,
    pub risk_level: String,
    pub document_type: Option<String>,
    pub fraud_flags_count: usize,
    pub passed_checks: Vec<String>,
    pub flagged_for_review: bool,
    pub analysis_summary: Option<String>,
}

impl From<AnalysisOutcome> for AnalyzeResponse {
    fn from(outcome: AnalysisOutcome) -> Self {
        Self {
            scan_result_id: outcome.scan_result.id,
            overall_risk_score: outcome.verdict.overall_risk_score,
            risk_level: outcome.verdict.risk_level.as_str().to_string(),
            document_type: Some(outcome.verdict.document_type.clone()),
            fraud_flags_count: outcome.fraud_flags_count(),
            passed_checks: outcome.verdict.passed_checks.clone(),
            flagged_for_review: outcome.verdict.overall_risk_score
                >= veridoc_common::REVIEW_THRESHOLD,
            analysis_summary: outcome.verdict.analysis_summary.clone(),
            document: DocumentResponse::from(&outcome.document),
        }
    }
}

/// Collect uploaded files from a multipart body
pub(crate) async fn collect_files(mut multipart: Multipart) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation {
            message: format!("Malformed multipart body: {}", e),
        })?
    {
        // Only file fields carry a filename; other form fields are ignored
        let Some(filename) = field.file_name().map(String::from) else {
            continue;
        };

        let mime_type = field
            .content_type()
            .map(String::from)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = field.bytes().await.map_err(|e| AppError::Validation {
            message: format!("Failed to read file {}: {}", filename, e),
        })?;

        files.push(UploadedFile {
            filename,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(files)
}

/// Upload a single document and run the full analysis
pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AnalyzeResponse>)> {
    let mut files = collect_files(multipart).await?;

    if files.len() != 1 {
        return Err(AppError::Validation {
            message: format!("Expected exactly one file, got {}", files.len()),
        });
    }
    let file = files.remove(0);

    let document = state.pipeline.ingest(auth.user_id, file).await?;
    let outcome = state.pipeline.analyze(auth.user_id, document.id).await?;

    Ok((StatusCode::CREATED, Json(AnalyzeResponse::from(outcome))))
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub offset: u64,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentResponse>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// List the caller's documents, newest first
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> Result<Json<DocumentListResponse>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let (documents, total) = state
        .repository
        .list_documents(auth.user_id, params.offset, limit)
        .await?;

    Ok(Json(DocumentListResponse {
        documents: documents.iter().map(DocumentResponse::from).collect(),
        total,
        offset: params.offset,
        limit,
    }))
}

#[derive(Serialize)]
pub struct DocumentDetailResponse {
    #[serde(flatten)]
    pub document: DocumentResponse,
    pub latest_scan_result_id: Option<Uuid>,
}

/// Get a document with its latest scan result reference
pub async fn get_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentDetailResponse>> {
    let document = state
        .repository
        .require_document(auth.user_id, document_id)
        .await?;

    let latest = state.repository.latest_scan_result(document_id).await?;

    Ok(Json(DocumentDetailResponse {
        document: DocumentResponse::from(&document),
        latest_scan_result_id: latest.map(|s| s.id),
    }))
}

/// Delete a document and its stored blob
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(document_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.pipeline.delete(auth.user_id, document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Retry analysis for a failed document
pub async fn retry_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(document_id): Path<Uuid>,
) -> Result<Json<AnalyzeResponse>> {
    let outcome = state.pipeline.retry(auth.user_id, document_id).await?;
    Ok(Json(AnalyzeResponse::from(outcome)))
}
