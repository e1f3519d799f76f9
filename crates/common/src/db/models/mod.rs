//! SeaORM entity models
//!
//! Database entities for VeriDoc

mod audit_log;
mod document;
mod extracted_field;
mod fraud_flag;
mod notification;
mod scan_result;

pub use document::{
    Entity as DocumentEntity,
    Model as Document,
    ActiveModel as DocumentActiveModel,
    Column as DocumentColumn,
    DocumentStatus,
    ReviewStatus,
};

pub use scan_result::{
    Entity as ScanResultEntity,
    Model as ScanResult,
    ActiveModel as ScanResultActiveModel,
    Column as ScanResultColumn,
};

pub use fraud_flag::{
    Entity as FraudFlagEntity,
    Model as FraudFlag,
    ActiveModel as FraudFlagActiveModel,
    Column as FraudFlagColumn,
};

pub use extracted_field::{
    Entity as ExtractedFieldEntity,
    Model as ExtractedField,
    ActiveModel as ExtractedFieldActiveModel,
    Column as ExtractedFieldColumn,
};

pub use notification::{
    Entity as NotificationEntity,
    Model as Notification,
    ActiveModel as NotificationActiveModel,
    Column as NotificationColumn,
    EntityRef,
    NotificationKind,
};

pub use audit_log::{
    Entity as AuditLogEntity,
    Model as AuditLogEntry,
    ActiveModel as AuditLogActiveModel,
    Column as AuditLogColumn,
    AuditAction,
};
