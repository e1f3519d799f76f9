//! Scan result entity
//!
//! One row per completed analysis attempt. Immutable once created;
//! re-analysis after a retry inserts a new row rather than overwriting.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scan_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub document_id: Uuid,

    /// Oracle-assigned fraud risk score, 0-100
    pub overall_risk_score: i32,

    /// Oracle-assigned level; not recomputed from the score downstream
    #[sea_orm(column_type = "Text")]
    pub risk_level: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub raw_ocr_text: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub document_type: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub analysis_summary: Option<String>,

    /// Forensic checks that passed, for the degraded-analysis note as well
    #[sea_orm(column_type = "JsonBinary")]
    pub passed_checks: serde_json::Value,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id"
    )]
    Document,

    #[sea_orm(has_many = "super::fraud_flag::Entity")]
    FraudFlags,

    #[sea_orm(has_many = "super::extracted_field::Entity")]
    ExtractedFields,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl Related<super::fraud_flag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FraudFlags.def()
    }
}

impl Related<super::extracted_field::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExtractedFields.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
