//! Signed blob read handler
//!
//! Serves stored document bytes to holders of an unexpired signed URL.
//! The signature covers the path and expiry, so a link cannot be
//! re-pointed at another blob or have its lifetime extended by the client.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;
use veridoc_common::{
    errors::{AppError, Result},
    storage::BlobStore,
};

#[derive(Deserialize)]
pub struct SignedParams {
    pub expires: i64,
    pub token: String,
}

/// Serve a blob to a valid signed URL
pub async fn fetch_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<SignedParams>,
) -> Result<impl IntoResponse> {
    if !state
        .storage
        .verify_token(&path, params.expires, &params.token)
    {
        return Err(AppError::Unauthorized {
            message: "Invalid or expired signed URL".to_string(),
        });
    }

    let bytes = state.storage.download(&path).await?;
    let mime = mime_for_path(&path);

    Ok(([(header::CONTENT_TYPE, mime)], bytes))
}

fn mime_for_path(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path("u/a.pdf"), "application/pdf");
        assert_eq!(mime_for_path("u/a.jpeg"), "image/jpeg");
        assert_eq!(mime_for_path("u/a.bin"), "application/octet-stream");
    }
}
