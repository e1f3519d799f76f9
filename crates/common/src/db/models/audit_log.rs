//! Audit log entity
//!
//! Append-only; the core only ever inserts rows here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Closed set of auditable actions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Upload,
    Analyze,
    Delete,
    Verify,
    Reject,
    Export,
    SettingsUpdate,
    Login,
    Logout,
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        match action {
            AuditAction::Upload => "upload".to_string(),
            AuditAction::Analyze => "analyze".to_string(),
            AuditAction::Delete => "delete".to_string(),
            AuditAction::Verify => "verify".to_string(),
            AuditAction::Reject => "reject".to_string(),
            AuditAction::Export => "export".to_string(),
            AuditAction::SettingsUpdate => "settings_update".to_string(),
            AuditAction::Login => "login".to_string(),
            AuditAction::Logout => "logout".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub action: String,

    #[sea_orm(column_type = "Text")]
    pub entity_type: String,

    pub entity_id: Option<Uuid>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<serde_json::Value>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_strings_carry_no_entity_prefix() {
        // entity_type is stored in its own column; the action string
        // stays bare
        for action in [
            AuditAction::Upload,
            AuditAction::Analyze,
            AuditAction::Delete,
            AuditAction::Verify,
            AuditAction::Reject,
            AuditAction::Export,
        ] {
            let s = String::from(action);
            assert!(!s.contains('.'), "unexpected prefix in {}", s);
        }
        assert_eq!(String::from(AuditAction::Upload), "upload");
        assert_eq!(String::from(AuditAction::Export), "export");
    }
}
