//! Fraud flag entity
//!
//! One discrete detected anomaly with severity, confidence, and optional
//! spatial localization. `region_coords` holds a percentage-based bounding
//! box as JSONB, or null when the oracle could not localize the issue.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fraud_flags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub scan_result_id: Uuid,

    /// Free-form category tag, e.g. "visual_forensics"
    #[sea_orm(column_type = "Text")]
    pub flag_type: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    #[sea_orm(column_type = "Text")]
    pub severity: String,

    /// 0-100
    pub confidence: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub evidence_reference: Option<String>,

    pub page_number: Option<i32>,

    /// `{x, y, width, height}` as percentages of page dimensions
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub region_coords: Option<serde_json::Value>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scan_result::Entity",
        from = "Column::ScanResultId",
        to = "super::scan_result::Column::Id"
    )]
    ScanResult,
}

impl Related<super::scan_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScanResult.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
