//! `POST /rag/query`.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use finrag_answer::Generator;
use finrag_core::QueryResult;
use finrag_retrieval::{Embedder, VectorIndex};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// Answer one question. Pipeline failures come back as text in the answer,
/// so the only error here is a missing or blank `query`.
pub(super) async fn query<E, V, G>(
    State(state): State<AppState<E, V, G>>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<QueryResult>>, ApiError>
where
    E: Embedder + 'static,
    V: VectorIndex + 'static,
    G: Generator + 'static,
{
    let rid = &req_id.0;

    let Json(body) =
        body.map_err(|e| ApiError::new(rid, "validation_error", e.body_text()))?;
    let question = body
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::new(rid, "validation_error", "Query text missing"))?;

    let result = state.pipeline.query(question).await;

    Ok(Json(ApiResponse {
        data: result,
        meta: ResponseMeta::new(req_id.0),
    }))
}
