mod ingest;
mod rag;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use finrag_answer::{Generator, RagPipeline};
use finrag_retrieval::{Embedder, VectorIndex};
use serde::Serialize;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId};

/// Shared handler state.
///
/// `rebuild_lock` keeps two rebuilds from wiping the same collection at once;
/// queries never take it.
pub struct AppState<E, V, G> {
    pub pipeline: RagPipeline<E, V, G>,
    pub data_path: Arc<PathBuf>,
    pub rebuild_lock: Arc<Mutex<()>>,
}

impl<E, V, G> Clone for AppState<E, V, G> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            data_path: Arc::clone(&self.data_path),
            rebuild_lock: Arc::clone(&self.rebuild_lock),
        }
    }
}

impl<E, V, G> AppState<E, V, G> {
    pub fn new(pipeline: RagPipeline<E, V, G>, data_path: PathBuf) -> Self {
        Self {
            pipeline,
            data_path: Arc::new(data_path),
            rebuild_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct WelcomeData {
    message: &'static str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    vector_store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    points: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collections: Option<Vec<String>>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app<E, V, G>(state: AppState<E, V, G>) -> Router
where
    E: Embedder + 'static,
    V: VectorIndex + 'static,
    G: Generator + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health::<E, V, G>))
        .route("/ingest/build", post(ingest::build_index::<E, V, G>))
        .route("/rag/query", post(rag::query::<E, V, G>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn root(Extension(req_id): Extension<RequestId>) -> Json<ApiResponse<WelcomeData>> {
    Json(ApiResponse {
        data: WelcomeData {
            message: "Welcome to the finrag API",
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

async fn health<E, V, G>(
    State(state): State<AppState<E, V, G>>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse
where
    E: Embedder + 'static,
    V: VectorIndex + 'static,
    G: Generator + 'static,
{
    let meta = ResponseMeta::new(req_id.0);
    let retriever = state.pipeline.retriever();
    match retriever.status().await {
        Ok(status) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    vector_store: "ok",
                    collection: Some(retriever.collection().to_string()),
                    collection_exists: Some(status.collection_exists),
                    points: status.points,
                    collections: Some(status.collections),
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: vector store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        vector_store: "unavailable",
                        collection: Some(retriever.collection().to_string()),
                        collection_exists: None,
                        points: None,
                        collections: None,
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
