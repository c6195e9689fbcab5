//! The [`VectorIndex`] seam and its Qdrant REST client.

use std::future::Future;
use std::time::Duration;

use finrag_core::Payload;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::RetrievalError;

/// Points per upsert request.
const UPLOAD_BATCH_SIZE: usize = 64;

/// A vector plus the payload stored beside it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedItem {
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A search hit, `score` being cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPayload {
    pub score: f32,
    pub payload: Payload,
}

/// Collection management and nearest-neighbor search over named collections.
///
/// There is no incremental upsert or delete: [`VectorIndex::reset_collection`]
/// followed by [`VectorIndex::bulk_upload`] is the only way the members of a
/// collection change. Implementations do not serialize calls; a reset racing
/// a search may observe an empty or partially loaded collection.
pub trait VectorIndex: Send + Sync {
    /// Names of every collection in the store.
    fn list_collections(&self) -> impl Future<Output = Result<Vec<String>, RetrievalError>> + Send;

    /// Create `name` with `dimension` and cosine distance unless it is already
    /// listed. An existing collection must declare the same dimension.
    fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> impl Future<Output = Result<(), RetrievalError>> + Send;

    /// Drop `name` if present and recreate it empty.
    fn reset_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> impl Future<Output = Result<(), RetrievalError>> + Send;

    /// Write every item. A failure leaves the collection in an unknown state.
    fn bulk_upload(
        &self,
        name: &str,
        items: Vec<IndexedItem>,
    ) -> impl Future<Output = Result<(), RetrievalError>> + Send;

    /// Up to `top_k` stored payloads, most similar first.
    fn search(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
    ) -> impl Future<Output = Result<Vec<ScoredPayload>, RetrievalError>> + Send;

    /// The first `limit` stored payloads in storage order.
    fn sample_payloads(
        &self,
        name: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Payload>, RetrievalError>> + Send;

    /// The raw `sentiment` value of the first `limit` stored points, `None`
    /// where a point has none. Nothing is normalized.
    fn sample_labels(
        &self,
        name: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Option<String>>, RetrievalError>> + Send;

    /// Exact number of points in `name`.
    fn count(&self, name: &str) -> impl Future<Output = Result<usize, RetrievalError>> + Send;
}

/// Qdrant HTTP client.
pub struct QdrantClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

/// Single unnamed vector config. Named vector maps carry no top-level `size`.
#[derive(Deserialize)]
struct VectorParams {
    #[serde(default)]
    size: Option<usize>,
}

#[derive(Serialize)]
struct CreateCollectionRequest {
    vectors: VectorsConfig,
}

#[derive(Serialize)]
struct VectorsConfig {
    size: usize,
    distance: &'static str,
}

#[derive(Serialize)]
struct UpsertPointsRequest<'a> {
    points: Vec<Point<'a>>,
}

#[derive(Serialize)]
struct Point<'a> {
    id: u64,
    vector: &'a [f32],
    payload: &'a Payload,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ScrollRequest {
    limit: usize,
    with_payload: bool,
    with_vector: bool,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<ScrolledPoint>,
}

#[derive(Deserialize)]
struct ScrolledPoint {
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct CountRequest {
    exact: bool,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

impl QdrantClient {
    /// Create a new `QdrantClient`.
    ///
    /// `api_key`, when present, is sent as the `api-key` header on every request.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        qdrant_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: qdrant_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToOwned::to_owned),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        action: &str,
    ) -> Result<T, RetrievalError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| RetrievalError::Qdrant(format!("{action} request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RetrievalError::Qdrant(format!(
                "{action} returned status {status}: {body}"
            )));
        }

        let envelope: QdrantResponse<T> = resp
            .json()
            .await
            .map_err(|e| RetrievalError::Qdrant(format!("{action} response parse error: {e}")))?;
        Ok(envelope.result)
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> Result<(), RetrievalError> {
        let body = CreateCollectionRequest {
            vectors: VectorsConfig {
                size: dimension,
                distance: "Cosine",
            },
        };
        let builder = self
            .request(Method::PUT, &format!("/collections/{name}"))
            .json(&body);
        self.send_json::<serde_json::Value>(builder, "collection create")
            .await?;

        tracing::info!(collection = name, dimension, "created Qdrant collection");
        Ok(())
    }

    async fn collection_dimension(&self, name: &str) -> Result<usize, RetrievalError> {
        let builder = self.request(Method::GET, &format!("/collections/{name}"));
        let info: CollectionInfo = self.send_json(builder, "collection info").await?;
        info.config.params.vectors.size.ok_or_else(|| {
            RetrievalError::Qdrant(format!(
                "collection '{name}' has no single vector size (named vectors are not supported)"
            ))
        })
    }

    async fn scroll(&self, name: &str, limit: usize) -> Result<Vec<ScrolledPoint>, RetrievalError> {
        let body = ScrollRequest {
            limit,
            with_payload: true,
            with_vector: false,
        };
        let builder = self
            .request(Method::POST, &format!("/collections/{name}/points/scroll"))
            .json(&body);
        let result: ScrollResult = self.send_json(builder, "points scroll").await?;
        Ok(result.points)
    }
}

impl VectorIndex for QdrantClient {
    async fn list_collections(&self) -> Result<Vec<String>, RetrievalError> {
        let builder = self.request(Method::GET, "/collections");
        let result: CollectionsResult = self.send_json(builder, "collection list").await?;
        Ok(result.collections.into_iter().map(|c| c.name).collect())
    }

    /// Ensure the collection exists, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Qdrant`] if the store is unreachable or
    /// rejects the request, and [`RetrievalError::DimensionMismatch`] if an
    /// existing collection was created with another vector size.
    async fn ensure_collection(&self, name: &str, dimension: usize) -> Result<(), RetrievalError> {
        let collections = self.list_collections().await?;
        if !collections.iter().any(|c| c == name) {
            return self.create_collection(name, dimension).await;
        }

        let declared = self.collection_dimension(name).await?;
        if declared != dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: declared,
                got: dimension,
            });
        }
        tracing::debug!(collection = name, dimension, "Qdrant collection already exists");
        Ok(())
    }

    /// Delete and recreate the collection. A missing collection is not an error.
    async fn reset_collection(&self, name: &str, dimension: usize) -> Result<(), RetrievalError> {
        let resp = self
            .request(Method::DELETE, &format!("/collections/{name}"))
            .send()
            .await
            .map_err(|e| RetrievalError::Qdrant(format!("collection delete request failed: {e}")))?;

        match resp.status() {
            s if s.is_success() => {
                tracing::info!(collection = name, "deleted Qdrant collection");
            }
            StatusCode::NOT_FOUND => {
                tracing::debug!(collection = name, "no collection to delete");
            }
            s => {
                return Err(RetrievalError::Qdrant(format!(
                    "collection delete returned status {s}"
                )));
            }
        }

        self.create_collection(name, dimension).await
    }

    /// Upsert every item, [`UPLOAD_BATCH_SIZE`] points per request.
    ///
    /// Point IDs are the item's position in `items`, which is only safe because
    /// uploads always follow a reset.
    async fn bulk_upload(&self, name: &str, items: Vec<IndexedItem>) -> Result<(), RetrievalError> {
        let path = format!("/collections/{name}/points?wait=true");

        for (batch_index, batch) in items.chunks(UPLOAD_BATCH_SIZE).enumerate() {
            let offset = batch_index * UPLOAD_BATCH_SIZE;
            let points = batch
                .iter()
                .enumerate()
                .map(|(i, item)| Point {
                    id: (offset + i) as u64,
                    vector: &item.vector,
                    payload: &item.payload,
                })
                .collect();

            let builder = self
                .request(Method::PUT, &path)
                .json(&UpsertPointsRequest { points });
            self.send_json::<serde_json::Value>(builder, "points upsert")
                .await?;
        }

        tracing::debug!(collection = name, count = items.len(), "uploaded points");
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPayload>, RetrievalError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let body = SearchRequest {
            vector,
            limit: top_k,
            with_payload: true,
        };
        let builder = self
            .request(Method::POST, &format!("/collections/{name}/points/search"))
            .json(&body);
        let hits: Vec<SearchHit> = self.send_json(builder, "points search").await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                parse_payload(hit.payload).map(|payload| ScoredPayload {
                    score: hit.score,
                    payload,
                })
            })
            .collect())
    }

    async fn sample_payloads(&self, name: &str, limit: usize) -> Result<Vec<Payload>, RetrievalError> {
        Ok(self
            .scroll(name, limit)
            .await?
            .into_iter()
            .filter_map(|p| parse_payload(p.payload))
            .collect())
    }

    async fn sample_labels(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<Option<String>>, RetrievalError> {
        Ok(self
            .scroll(name, limit)
            .await?
            .into_iter()
            .map(|p| {
                p.payload
                    .as_ref()
                    .and_then(|v| v.get("sentiment"))
                    .and_then(serde_json::Value::as_str)
                    .map(ToOwned::to_owned)
            })
            .collect())
    }

    async fn count(&self, name: &str) -> Result<usize, RetrievalError> {
        let builder = self
            .request(Method::POST, &format!("/collections/{name}/points/count"))
            .json(&CountRequest { exact: true });
        let result: CountResult = self.send_json(builder, "points count").await?;
        Ok(result.count)
    }
}

/// Payloads without a `sentence` string are skipped.
fn parse_payload(raw: Option<serde_json::Value>) -> Option<Payload> {
    let raw = raw?;
    match serde_json::from_value::<Payload>(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::debug!(error = %e, "skipping point with unusable payload");
            None
        }
    }
}
