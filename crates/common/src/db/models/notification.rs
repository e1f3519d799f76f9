//! Notification entity
//!
//! Created by the pipeline as a best-effort side effect; its lifecycle is
//! independent of the pipeline outcome.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    HighRisk,
    AnalysisComplete,
    Verified,
    Rejected,
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::HighRisk => "high_risk".to_string(),
            NotificationKind::AnalysisComplete => "analysis_complete".to_string(),
            NotificationKind::Verified => "verified".to_string(),
            NotificationKind::Rejected => "rejected".to_string(),
        }
    }
}

/// Reference back to the entity a notification is about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    ScanResult(Uuid),
    Document(Uuid),
    None,
}

impl EntityRef {
    /// Split into the `entity_type`/`entity_id` column pair
    pub fn into_columns(self) -> (Option<String>, Option<Uuid>) {
        match self {
            EntityRef::ScanResult(id) => (Some("scan_result".to_string()), Some(id)),
            EntityRef::Document(id) => (Some("document".to_string()), Some(id)),
            EntityRef::None => (None, None),
        }
    }

    /// Reconstruct from the stored column pair
    pub fn from_columns(entity_type: Option<&str>, entity_id: Option<Uuid>) -> Self {
        match (entity_type, entity_id) {
            (Some("scan_result"), Some(id)) => EntityRef::ScanResult(id),
            (Some("document"), Some(id)) => EntityRef::Document(id),
            _ => EntityRef::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub kind: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    pub read: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub entity_type: Option<String>,

    pub entity_id: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the entity reference as a tagged value
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::from_columns(self.entity_type.as_deref(), self.entity_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_round_trip() {
        let id = Uuid::new_v4();
        let (ty, eid) = EntityRef::ScanResult(id).into_columns();
        assert_eq!(
            EntityRef::from_columns(ty.as_deref(), eid),
            EntityRef::ScanResult(id)
        );
    }

    #[test]
    fn test_dangling_ref_is_none() {
        assert_eq!(EntityRef::from_columns(Some("scan_result"), None), EntityRef::None);
        assert_eq!(EntityRef::from_columns(None, Some(Uuid::new_v4())), EntityRef::None);
        assert_eq!(
            EntityRef::from_columns(Some("unknown"), Some(Uuid::new_v4())),
            EntityRef::None
        );
    }
}
