//! Batch upload handler
//!
//! Accepts several files in one multipart submission. The whole batch is
//! validated up front; processing then runs with bounded concurrency and
//! each file lands in its own terminal state. The response is a
//! server-sent event stream: one `progress` event per stage transition,
//! then a single `summary` event once the batch settles.

use axum::{
    extract::{Multipart, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{stream, Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::handlers::documents::collect_files;
use crate::AppState;
use veridoc_common::{auth::AuthContext, errors::Result};
use veridoc_pipeline::{gate::FileMeta, run_batch, BatchEvent, BatchStage};

#[derive(Serialize)]
pub struct BatchItemResponse {
    pub index: usize,
    pub filename: String,
    pub document_id: Option<Uuid>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResponse>,
}

/// Upload and analyze a batch of documents, streaming per-file progress
pub async fn upload_batch(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let files = collect_files(multipart).await?;

    let metas: Vec<FileMeta> = files.iter().map(|f| f.meta()).collect();
    state.pipeline.gate().check_batch(&metas)?;

    let filenames: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();
    let user_id = auth.user_id;
    let pipeline = state.pipeline.clone();
    let concurrency = state.config.validation.batch_concurrency;

    let (tx, rx) = mpsc::channel(64);
    let batch = tokio::spawn(async move {
        run_batch(files, concurrency, Some(tx), |_index, file, progress| {
            let pipeline = pipeline.clone();
            async move {
                progress.stage(BatchStage::Uploading).await;
                let document = pipeline.ingest(user_id, file).await?;
                progress.stage(BatchStage::Analyzing).await;
                pipeline.analyze(user_id, document.id).await?;
                Ok(document.id)
            }
        })
        .await
    });

    let progress_events = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (progress_event(&event), rx))
    });

    let summary_event = stream::once(async move {
        match batch.await {
            Ok(summary) => {
                let results = summary
                    .results
                    .into_iter()
                    .map(|r| BatchItemResponse {
                        filename: filenames.get(r.index).cloned().unwrap_or_default(),
                        index: r.index,
                        document_id: r.document_id,
                        error: r.error,
                    })
                    .collect();

                let response = BatchResponse {
                    total: summary.total,
                    succeeded: summary.succeeded,
                    failed: summary.failed,
                    results,
                };
                Event::default()
                    .event("summary")
                    .json_data(&response)
                    .unwrap_or_else(|_| Event::default().event("summary"))
            }
            Err(e) => Event::default().event("error").data(e.to_string()),
        }
    });

    let events = progress_events.chain(summary_event).map(Ok);
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn progress_event(event: &BatchEvent) -> Event {
    Event::default()
        .event("progress")
        .json_data(event)
        .unwrap_or_else(|_| Event::default().event("progress"))
}
