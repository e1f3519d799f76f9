//! Document entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pipeline lifecycle status
///
/// Mutated only by the pipeline orchestrator. Valid sequences are
/// `pending -> processing -> completed` and `pending -> processing -> failed`,
/// plus the explicit `failed -> pending` retry transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<String> for DocumentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => DocumentStatus::Pending,
            "processing" => DocumentStatus::Processing,
            "completed" => DocumentStatus::Completed,
            "failed" => DocumentStatus::Failed,
            _ => DocumentStatus::Pending,
        }
    }
}

impl From<DocumentStatus> for String {
    fn from(status: DocumentStatus) -> Self {
        match status {
            DocumentStatus::Pending => "pending".to_string(),
            DocumentStatus::Processing => "processing".to_string(),
            DocumentStatus::Completed => "completed".to_string(),
            DocumentStatus::Failed => "failed".to_string(),
        }
    }
}

/// Human review status, orthogonal to the pipeline lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Verified,
    Rejected,
}

impl From<String> for ReviewStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "verified" => ReviewStatus::Verified,
            "rejected" => ReviewStatus::Rejected,
            _ => ReviewStatus::Pending,
        }
    }
}

impl From<ReviewStatus> for String {
    fn from(status: ReviewStatus) -> Self {
        match status {
            ReviewStatus::Pending => "pending".to_string(),
            ReviewStatus::Verified => "verified".to_string(),
            ReviewStatus::Rejected => "rejected".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub filename: String,

    /// Blob store path, namespaced per user
    #[sea_orm(column_type = "Text")]
    pub file_path: String,

    #[sea_orm(column_type = "Text")]
    pub file_type: String,

    pub file_size: i64,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// Populated once a verdict crosses the review threshold
    #[sea_orm(column_type = "Text", nullable)]
    pub review_status: Option<String>,

    pub verified_by: Option<Uuid>,

    #[sea_orm(column_type = "Text", nullable)]
    pub reviewer_notes: Option<String>,

    pub verified_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the lifecycle status as an enum
    pub fn lifecycle(&self) -> DocumentStatus {
        DocumentStatus::from(self.status.clone())
    }

    /// Get the review status as an enum, if the document entered review
    pub fn review(&self) -> Option<ReviewStatus> {
        self.review_status.clone().map(ReviewStatus::from)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::scan_result::Entity")]
    ScanResults,
}

impl Related<super::scan_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScanResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DocumentStatus::Pending,
            DocumentStatus::Processing,
            DocumentStatus::Completed,
            DocumentStatus::Failed,
        ] {
            let s: String = status.into();
            assert_eq!(DocumentStatus::from(s), status);
        }
    }

    #[test]
    fn test_unknown_status_defaults_to_pending() {
        assert_eq!(
            DocumentStatus::from("garbage".to_string()),
            DocumentStatus::Pending
        );
    }
}
