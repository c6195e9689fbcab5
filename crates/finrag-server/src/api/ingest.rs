//! `POST /ingest/build` — wipe and reload the collection from the configured corpus.

use axum::{extract::State, Extension, Json};
use finrag_answer::Generator;
use finrag_core::SentimentLabel;
use finrag_retrieval::{Embedder, IndexReport, VectorIndex};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct LabelCounts {
    positive: usize,
    neutral: usize,
    negative: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct BuildResponse {
    status: &'static str,
    collection: String,
    records: usize,
    uploaded: usize,
    auto_labeled: bool,
    labels: LabelCounts,
    unexpected_labels: Vec<String>,
}

impl From<IndexReport> for BuildResponse {
    fn from(report: IndexReport) -> Self {
        let count = |label: SentimentLabel| {
            report
                .distribution
                .iter()
                .find(|(l, _)| *l == label)
                .map_or(0, |(_, n)| *n)
        };
        let labels = LabelCounts {
            positive: count(SentimentLabel::Positive),
            neutral: count(SentimentLabel::Neutral),
            negative: count(SentimentLabel::Negative),
        };
        Self {
            status: "Index built successfully!",
            auto_labeled: report.auto_labeled(),
            collection: report.collection,
            records: report.records,
            uploaded: report.uploaded,
            labels,
            unexpected_labels: report.unexpected_labels,
        }
    }
}

pub(super) async fn build_index<E, V, G>(
    State(state): State<AppState<E, V, G>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<BuildResponse>>, ApiError>
where
    E: Embedder + 'static,
    V: VectorIndex + 'static,
    G: Generator + 'static,
{
    let rid = &req_id.0;

    let Ok(_guard) = state.rebuild_lock.try_lock() else {
        return Err(ApiError::new(
            rid,
            "conflict",
            "an index rebuild is already running",
        ));
    };

    tracing::info!(path = %state.data_path.display(), "index rebuild requested");
    let report = state
        .pipeline
        .retriever()
        .build_index(&state.data_path)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "index rebuild failed");
            ApiError::new(rid, "index_build_failed", e.to_string())
        })?;

    Ok(Json(ApiResponse {
        data: BuildResponse::from(report),
        meta: ResponseMeta::new(req_id.0),
    }))
}
