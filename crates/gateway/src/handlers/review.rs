//! Review workflow handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::handlers::documents::DocumentResponse;
use crate::AppState;
use veridoc_common::{
    auth::AuthContext,
    errors::{AppError, Result},
};
use veridoc_pipeline::ReviewDecision;

#[derive(Serialize)]
pub struct ReviewQueueResponse {
    pub items: Vec<ReviewQueueItemResponse>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct ReviewQueueItemResponse {
    pub scan_result_id: Uuid,
    pub document_id: Uuid,
    pub filename: String,
    pub overall_risk_score: i32,
    pub risk_level: String,
    pub document_type: Option<String>,
    pub created_at: String,
    /// Time-limited signed URL for rendering the document
    pub preview_url: String,
}

/// The caller's review worklist, highest risk first
pub async fn queue(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ReviewQueueResponse>> {
    let items = state.review.queue(auth.user_id).await?;

    let items: Vec<ReviewQueueItemResponse> = items
        .into_iter()
        .map(|item| {
            let preview_url = state.review.preview_url(&item.file_path)?;
            Ok(ReviewQueueItemResponse {
                scan_result_id: item.scan_result_id,
                document_id: item.document_id,
                filename: item.filename,
                overall_risk_score: item.overall_risk_score,
                risk_level: item.risk_level,
                document_type: item.document_type,
                created_at: item.created_at.to_rfc3339(),
                preview_url,
            })
        })
        .collect::<Result<_>>()?;

    Ok(Json(ReviewQueueResponse {
        total: items.len(),
        items,
    }))
}

#[derive(Deserialize, Validate)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Apply a review decision to a flagged document
pub async fn decide(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(document_id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<DocumentResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
    })?;

    let document = state
        .review
        .decide(auth.user_id, document_id, request.decision, request.notes)
        .await?;

    Ok(Json(DocumentResponse::from(&document)))
}
