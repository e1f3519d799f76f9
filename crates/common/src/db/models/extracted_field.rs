//! Extracted field entity
//!
//! Key/value pairs the oracle pulled out of the document. Field names are
//! not unique per scan result; the oracle may emit duplicates and they are
//! stored as-is.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "extracted_fields")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub scan_result_id: Uuid,

    /// Normalized snake_case key, e.g. "issue_date"
    #[sea_orm(column_type = "Text")]
    pub field_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub field_value: Option<String>,

    pub confidence: Option<i32>,

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
