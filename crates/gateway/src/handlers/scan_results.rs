//! Scan result handlers
//!
//! Verdict detail reads and the overlay projection endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::handlers::documents::DocumentResponse;
use crate::AppState;
use veridoc_common::{
    auth::AuthContext,
    db::ScanResultDetail,
    errors::{AppError, Result},
    overlay::{build_overlay, FlagGeometry, OverlayView, Viewport},
    storage::BlobStore,
    verdict::Severity,
};

#[derive(Serialize)]
pub struct FraudFlagResponse {
    pub id: Uuid,
    pub flag_type: String,
    pub name: String,
    pub description: String,
    pub severity: String,
    pub confidence: i32,
    pub evidence_reference: Option<String>,
    pub page_number: Option<i32>,
    pub region_coords: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct ExtractedFieldResponse {
    pub id: Uuid,
    pub field_name: String,
    pub field_value: Option<String>,
    pub confidence: Option<i32>,
}

#[derive(Serialize)]
pub struct ScanResultResponse {
    pub id: Uuid,
    pub overall_risk_score: i32,
    pub risk_level: String,
    pub document_type: Option<String>,
    pub analysis_summary: Option<String>,
    pub raw_ocr_text: Option<String>,
    pub passed_checks: Vec<String>,
    pub created_at: String,
    pub document: DocumentResponse,
    pub fraud_flags: Vec<FraudFlagResponse>,
    pub extracted_fields: Vec<ExtractedFieldResponse>,
    /// Time-limited signed URL for rendering the document
    pub preview_url: String,
}

async fn require_detail(
    state: &AppState,
    user_id: Uuid,
    scan_result_id: Uuid,
) -> Result<ScanResultDetail> {
    state
        .repository
        .find_scan_result(user_id, scan_result_id)
        .await?
        .ok_or_else(|| AppError::ScanResultNotFound {
            id: scan_result_id.to_string(),
        })
}

/// Get a scan result with its flags, fields, and a signed preview URL
pub async fn get_scan_result(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(scan_result_id): Path<Uuid>,
) -> Result<Json<ScanResultResponse>> {
    let detail = require_detail(&state, auth.user_id, scan_result_id).await?;

    let preview_url = state.storage.signed_url(
        &detail.document.file_path,
        state.config.storage.signed_url_ttl_secs,
    )?;

    let passed_checks =
        serde_json::from_value(detail.scan_result.passed_checks.clone()).unwrap_or_default();

    Ok(Json(ScanResultResponse {
        id: detail.scan_result.id,
        overall_risk_score: detail.scan_result.overall_risk_score,
        risk_level: detail.scan_result.risk_level.clone(),
        document_type: detail.scan_result.document_type.clone(),
        analysis_summary: detail.scan_result.analysis_summary.clone(),
        raw_ocr_text: detail.scan_result.raw_ocr_text.clone(),
        passed_checks,
        created_at: detail.scan_result.created_at.to_rfc3339(),
        document: DocumentResponse::from(&detail.document),
        fraud_flags: detail
            .fraud_flags
            .iter()
            .map(|f| FraudFlagResponse {
                id: f.id,
                flag_type: f.flag_type.clone(),
                name: f.name.clone(),
                description: f.description.clone(),
                severity: f.severity.clone(),
                confidence: f.confidence,
                evidence_reference: f.evidence_reference.clone(),
                page_number: f.page_number,
                region_coords: f.region_coords.clone(),
            })
            .collect(),
        extracted_fields: detail
            .extracted_fields
            .iter()
            .map(|f| ExtractedFieldResponse {
                id: f.id,
                field_name: f.field_name.clone(),
                field_value: f.field_value.clone(),
                confidence: f.confidence,
            })
            .collect(),
        preview_url,
    }))
}

#[derive(Deserialize, Validate)]
pub struct OverlayParams {
    #[validate(range(min = 1.0, max = 100_000.0))]
    pub width: f64,
    #[validate(range(min = 1.0, max = 100_000.0))]
    pub height: f64,
    #[validate(range(min = 0.01, max = 100.0))]
    pub zoom: Option<f64>,
    pub selected: Option<Uuid>,
}

#[derive(Serialize)]
pub struct OverlayResponse {
    /// Time-limited signed URL for the underlying document
    pub preview_url: String,
    pub overlay: OverlayView,
}

/// Project a scan result's fraud flag regions onto a rendered viewport
pub async fn get_overlay(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(scan_result_id): Path<Uuid>,
    Query(params): Query<OverlayParams>,
) -> Result<Json<OverlayResponse>> {
    params.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
    })?;
    let zoom = params.zoom.unwrap_or(1.0);

    let detail = require_detail(&state, auth.user_id, scan_result_id).await?;

    let flags: Vec<FlagGeometry> = detail
        .fraud_flags
        .iter()
        .map(|f| FlagGeometry {
            flag_id: f.id,
            severity: Severity::from_str_lossy(&f.severity),
            page_number: f.page_number,
            region: f
                .region_coords
                .clone()
                .and_then(|v| serde_json::from_value(v).ok()),
        })
        .collect();

    let viewport = Viewport {
        width: params.width,
        height: params.height,
        zoom,
    };

    let preview_url = state.storage.signed_url(
        &detail.document.file_path,
        state.config.storage.signed_url_ttl_secs,
    )?;

    Ok(Json(OverlayResponse {
        preview_url,
        overlay: build_overlay(&flags, &viewport, params.selected),
    }))
}
