//! Batch processing coordinator
//!
//! Runs up to `concurrency` per-file pipelines at once and reports
//! per-file stage transitions over an optional channel. Files are fully
//! independent: one failure never aborts or poisons the rest of the
//! batch.

use futures::StreamExt;
use serde::Serialize;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, instrument};
use uuid::Uuid;
use veridoc_common::errors::Result;

/// Where a batch item currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStage {
    Pending,
    Uploading,
    Analyzing,
    Completed,
    Failed,
}

/// Progress event emitted while a batch runs
#[derive(Debug, Clone, Serialize)]
pub struct BatchEvent {
    pub index: usize,
    pub stage: BatchStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handle a per-item runner uses to report its intermediate stages
#[derive(Clone)]
pub struct ItemProgress {
    index: usize,
    tx: Option<mpsc::Sender<BatchEvent>>,
}

impl ItemProgress {
    /// Report entering a stage. Send failures are ignored: progress is
    /// advisory and never affects the item's outcome.
    pub async fn stage(&self, stage: BatchStage) {
        if let Some(tx) = &self.tx {
            let _ = tx
                .send(BatchEvent {
                    index: self.index,
                    stage,
                    document_id: None,
                    error: None,
                })
                .await;
        }
    }
}

/// Final state of one batch item
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub document_id: Option<Uuid>,
    pub error: Option<String>,
}

impl BatchItemResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a whole batch, items ordered by submission index
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

/// Run `run` over every item with bounded concurrency. Each item's
/// outcome is recorded independently; the summary lists results in
/// submission order regardless of completion order. With a progress
/// channel, every item announces `pending` up front and a terminal
/// `completed`/`failed`, with the runner's own stages in between.
#[instrument(skip_all, fields(total = items.len(), concurrency = concurrency))]
pub async fn run_batch<T, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    progress: Option<mpsc::Sender<BatchEvent>>,
    run: F,
) -> BatchSummary
where
    F: Fn(usize, T, ItemProgress) -> Fut,
    Fut: Future<Output = Result<Uuid>>,
{
    let total = items.len();

    if let Some(tx) = &progress {
        for index in 0..total {
            let _ = tx
                .send(BatchEvent {
                    index,
                    stage: BatchStage::Pending,
                    document_id: None,
                    error: None,
                })
                .await;
        }
    }

    let mut results: Vec<BatchItemResult> =
        futures::stream::iter(items.into_iter().enumerate().map(|(index, item)| {
            let progress = progress.clone();
            let item_progress = ItemProgress {
                index,
                tx: progress.clone(),
            };
            let fut = run(index, item, item_progress);
            async move {
                let result = match fut.await {
                    Ok(document_id) => BatchItemResult {
                        index,
                        document_id: Some(document_id),
                        error: None,
                    },
                    Err(e) => BatchItemResult {
                        index,
                        document_id: None,
                        error: Some(e.to_string()),
                    },
                };

                if let Some(tx) = &progress {
                    let stage = if result.succeeded() {
                        BatchStage::Completed
                    } else {
                        BatchStage::Failed
                    };
                    let _ = tx
                        .send(BatchEvent {
                            index,
                            stage,
                            document_id: result.document_id,
                            error: result.error.clone(),
                        })
                        .await;
                }

                result
            }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|r| r.index);

    let succeeded = results.iter().filter(|r| r.succeeded()).count();
    let summary = BatchSummary {
        total,
        succeeded,
        failed: total - succeeded,
        results,
    };

    debug!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Batch complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use veridoc_common::errors::AppError;

    #[tokio::test]
    async fn test_all_items_succeed() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let expected = ids.clone();

        let summary = run_batch((0..5).collect(), 3, None, |index, _item: usize, _p| {
            let id = ids[index];
            async move { Ok(id) }
        })
        .await;

        assert_eq!(summary.total, 5);
        assert_eq!(summary.succeeded, 5);
        assert_eq!(summary.failed, 0);
        for (i, result) in summary.results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert_eq!(result.document_id, Some(expected[i]));
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_poison_the_rest() {
        let summary = run_batch((0..4).collect(), 2, None, |_index, item: usize, _p| async move {
            if item == 2 {
                Err(AppError::RateLimited)
            } else {
                Ok(Uuid::new_v4())
            }
        })
        .await;

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert!(summary.results[2].error.is_some());
        assert!(summary.results[0].succeeded());
        assert!(summary.results[3].succeeded());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let summary = run_batch((0..10).collect(), 3, None, |_index, _item: usize, _p| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(Uuid::new_v4())
            }
        })
        .await;

        assert_eq!(summary.succeeded, 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_item_walks_through_every_stage() {
        let (tx, mut rx) = mpsc::channel(64);

        let summary = run_batch(vec![1usize], 1, Some(tx), |_index, _item, progress| async move {
            progress.stage(BatchStage::Uploading).await;
            progress.stage(BatchStage::Analyzing).await;
            Ok(Uuid::new_v4())
        })
        .await;
        assert_eq!(summary.succeeded, 1);

        let mut stages = Vec::new();
        while let Some(event) = rx.recv().await {
            assert_eq!(event.index, 0);
            stages.push(event.stage);
        }
        assert_eq!(
            stages,
            vec![
                BatchStage::Pending,
                BatchStage::Uploading,
                BatchStage::Analyzing,
                BatchStage::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_events_cover_every_item() {
        let (tx, mut rx) = mpsc::channel(64);

        let summary = run_batch((0..3).collect(), 2, Some(tx), |index, _item: usize, _p| async move {
            if index == 1 {
                Err(AppError::EmptyAnalysis)
            } else {
                Ok(Uuid::new_v4())
            }
        })
        .await;
        assert_eq!(summary.total, 3);

        let mut pending = 0;
        let mut terminal = 0;
        let mut failed_index = None;
        while let Some(event) = rx.recv().await {
            match event.stage {
                BatchStage::Pending => pending += 1,
                BatchStage::Completed => terminal += 1,
                BatchStage::Failed => {
                    terminal += 1;
                    assert!(event.error.is_some());
                    failed_index = Some(event.index);
                }
                _ => {}
            }
        }
        assert_eq!(pending, 3);
        assert_eq!(terminal, 3);
        assert_eq!(failed_index, Some(1));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let summary =
            run_batch(Vec::<usize>::new(), 3, None, |_i, _item, _p| async { Ok(Uuid::new_v4()) })
                .await;
        assert_eq!(summary.total, 0);
        assert_eq!(summary.succeeded, 0);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs() {
        let summary = run_batch(vec![1usize], 0, None, |_i, _item, _p| async { Ok(Uuid::new_v4()) })
            .await;
        assert_eq!(summary.succeeded, 1);
    }
}
