//! API handlers module

pub mod batch;
pub mod blobs;
pub mod documents;
pub mod health;
pub mod notifications;
pub mod review;
pub mod scan_results;
