use std::io::Write;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use finrag_answer::{GenerationError, PromptItem};
use finrag_core::Payload;
use finrag_retrieval::{
    similarity::l2_normalize, IndexedItem, MemoryIndex, RetrievalError, Retriever, ScoredPayload,
};
use tower::ServiceExt;

use super::*;

const DIM: usize = 26;

struct LetterEmbedder;

impl Embedder for LetterEmbedder {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0_f32; DIM];
                for b in t.bytes().filter(u8::is_ascii_alphabetic) {
                    v[usize::from(b.to_ascii_lowercase() - b'a')] += 1.0;
                }
                l2_normalize(&mut v);
                v
            })
            .collect())
    }
}

struct EchoGenerator;

impl Generator for EchoGenerator {
    async fn generate(
        &self,
        question: &str,
        context: &[PromptItem],
    ) -> Result<String, GenerationError> {
        Ok(format!("{question} ({} context lines)", context.len()))
    }
}

/// A store that is never reachable.
struct DownIndex;

fn down() -> RetrievalError {
    RetrievalError::Qdrant("collection list request failed: connection refused".to_string())
}

impl VectorIndex for DownIndex {
    async fn list_collections(&self) -> Result<Vec<String>, RetrievalError> {
        Err(down())
    }

    async fn ensure_collection(&self, _: &str, _: usize) -> Result<(), RetrievalError> {
        Err(down())
    }

    async fn reset_collection(&self, _: &str, _: usize) -> Result<(), RetrievalError> {
        Err(down())
    }

    async fn bulk_upload(&self, _: &str, _: Vec<IndexedItem>) -> Result<(), RetrievalError> {
        Err(down())
    }

    async fn search(
        &self,
        _: &str,
        _: &[f32],
        _: usize,
    ) -> Result<Vec<ScoredPayload>, RetrievalError> {
        Err(down())
    }

    async fn sample_payloads(&self, _: &str, _: usize) -> Result<Vec<Payload>, RetrievalError> {
        Err(down())
    }

    async fn sample_labels(&self, _: &str, _: usize) -> Result<Vec<Option<String>>, RetrievalError> {
        Err(down())
    }

    async fn count(&self, _: &str) -> Result<usize, RetrievalError> {
        Err(down())
    }
}

fn state_with<V: VectorIndex>(
    store: V,
    data_path: PathBuf,
) -> AppState<LetterEmbedder, V, EchoGenerator> {
    let retriever = Retriever::new(Arc::new(LetterEmbedder), Arc::new(store), "finrag_test");
    AppState::new(
        RagPipeline::new(retriever, Arc::new(EchoGenerator)),
        data_path,
    )
}

fn memory_state(data_path: PathBuf) -> AppState<LetterEmbedder, MemoryIndex, EchoGenerator> {
    state_with(MemoryIndex::new(), data_path)
}

fn corpus_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("tempfile");
    file.write_all(
        b"sentence,label\n\
          positive,Operating profit rose to a record\n\
          negative,The company swung to a net loss\n\
          neutral,The meeting is scheduled for March\n",
    )
    .expect("write corpus");
    file
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

#[test]
fn api_error_validation_error_maps_to_bad_request() {
    let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn api_error_unknown_code_maps_to_internal_error() {
    let response = ApiError::new("req-1", "index_build_failed", "boom").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn root_returns_welcome_in_envelope() {
    let app = build_app(memory_state(PathBuf::from("unused.csv")));
    let response = app.oneshot(get_req("/")).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["message"], "Welcome to the finrag API");
    assert!(json["meta"]["request_id"].is_string());
    assert!(json["meta"]["timestamp"].is_string());
}

#[tokio::test]
async fn request_id_header_is_echoed() {
    let app = build_app(memory_state(PathBuf::from("unused.csv")));
    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("abc-123")
    );
    let json = json_body(response).await;
    assert_eq!(json["meta"]["request_id"], "abc-123");
}

#[tokio::test]
async fn health_ok_reports_collection_state() {
    let app = build_app(memory_state(PathBuf::from("unused.csv")));
    let response = app.oneshot(get_req("/health")).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["vector_store"], "ok");
    assert_eq!(json["data"]["collection"], "finrag_test");
    assert_eq!(json["data"]["collection_exists"], false);
}

#[tokio::test]
async fn health_degraded_when_store_down() {
    let app = build_app(state_with(DownIndex, PathBuf::from("unused.csv")));
    let response = app.oneshot(get_req("/health")).await.expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "degraded");
    assert_eq!(json["data"]["vector_store"], "unavailable");
}

#[tokio::test]
async fn query_rejects_blank_or_missing_text() {
    for body in [r#"{"query":""}"#, r#"{"query":"   "}"#, "{}", "not json"] {
        let app = build_app(memory_state(PathBuf::from("unused.csv")));
        let response = app
            .oneshot(post_json("/rag/query", body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }
}

#[tokio::test]
async fn query_on_empty_index_returns_no_data_answer() {
    let app = build_app(memory_state(PathBuf::from("unused.csv")));
    let response = app
        .oneshot(post_json("/rag/query", r#"{"query":"interest rates"}"#))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["query"], "interest rates");
    assert_eq!(json["data"]["answer"], finrag_answer::NO_RELEVANT_DATA_ANSWER);
    assert_eq!(json["data"]["context"], serde_json::json!([]));
    assert!(json["data"].get("sentiment_summary").is_none());
}

#[tokio::test]
async fn build_then_query_returns_context() {
    let corpus = corpus_file();
    let state = memory_state(corpus.path().to_path_buf());

    let response = build_app(state.clone())
        .oneshot(post_empty("/ingest/build"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "Index built successfully!");
    assert_eq!(json["data"]["records"], 3);
    assert_eq!(json["data"]["uploaded"], 3);
    assert_eq!(json["data"]["auto_labeled"], false);
    assert_eq!(
        json["data"]["labels"],
        serde_json::json!({ "positive": 1, "neutral": 1, "negative": 1 })
    );
    assert_eq!(json["data"]["unexpected_labels"], serde_json::json!([]));

    let response = build_app(state)
        .oneshot(post_json("/rag/query", r#"{"query":"profit record"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let context = json["data"]["context"].as_array().expect("context array");
    assert_eq!(context.len(), 3);
    assert!(context
        .iter()
        .all(|c| ["positive", "neutral", "negative"].contains(&c["sentiment"].as_str().unwrap())));
    assert_eq!(json["data"]["answer"], "profit record (4 context lines)");
    assert!(json["data"]["sentiment_summary"]
        .as_str()
        .unwrap()
        .starts_with("Most retrieved sentences are positive in tone"));
}

#[tokio::test]
async fn concurrent_rebuild_is_a_conflict() {
    let corpus = corpus_file();
    let state = memory_state(corpus.path().to_path_buf());
    let _held = state.rebuild_lock.lock().await;

    let response = build_app(state.clone())
        .oneshot(post_empty("/ingest/build"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "conflict");
}

#[tokio::test]
async fn rebuild_failure_is_reported() {
    let app = build_app(memory_state(PathBuf::from("/nonexistent/finrag.csv")));
    let response = app
        .oneshot(post_empty("/ingest/build"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "index_build_failed");
}
