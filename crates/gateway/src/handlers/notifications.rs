//! Notification handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use veridoc_common::{
    auth::AuthContext,
    db::models::EntityRef,
    errors::{AppError, Result},
};

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub entity: EntityRef,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationResponse>,
    pub unread: usize,
}

/// List the caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> Result<Json<NotificationListResponse>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);

    let notifications = state
        .repository
        .list_notifications(auth.user_id, limit)
        .await?;

    let unread = notifications.iter().filter(|n| !n.read).count();
    let notifications = notifications
        .into_iter()
        .map(|n| NotificationResponse {
            id: n.id,
            kind: n.kind.clone(),
            title: n.title.clone(),
            message: n.message.clone(),
            read: n.read,
            entity: n.entity_ref(),
            created_at: n.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(NotificationListResponse {
        notifications,
        unread,
    }))
}

/// Mark one notification as read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode> {
    let updated = state
        .repository
        .mark_notification_read(auth.user_id, notification_id)
        .await?;

    if !updated {
        return Err(AppError::NotificationNotFound {
            id: notification_id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}
