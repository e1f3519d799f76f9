//! VeriDoc Analysis Pipeline
//!
//! Orchestrates the document lifecycle: upload validation, blob staging,
//! oracle analysis, verdict persistence, batching, review decisions, and
//! notification routing.

pub mod batch;
pub mod gate;
pub mod notify;
pub mod processor;
pub mod review;

pub use batch::{run_batch, BatchEvent, BatchItemResult, BatchStage, BatchSummary, ItemProgress};
pub use gate::{FileMeta, ValidationGate};
pub use processor::{AnalysisOutcome, AnalysisPipeline, UploadedFile};
pub use review::{ReviewDecision, ReviewService};
