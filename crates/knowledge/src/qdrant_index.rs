//! Qdrant vector index over gRPC.
//!
//! Points carry the payload `{source, text, chunk_index}`. Every call is
//! bounded by the configured store timeout.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance as QdrantDistance, PointStruct,
    ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use ragline_core::config::{Distance, StoreSettings};
use ragline_core::{AppError, AppResult};
use tokio::sync::RwLock;
use tonic::Code;
use tracing::{debug, info, warn};

use crate::types::{Point, SearchResult};
use crate::vector_index::{check_top_k, rank, validate_points, UpsertAtomicity, VectorIndex};

/// A [`VectorIndex`] backed by a Qdrant server.
pub struct QdrantIndex {
    client: Qdrant,
    timeout: Duration,
    /// Dimension and metric of collections seen by this handle
    schemas: RwLock<HashMap<String, (usize, Distance)>>,
}

impl QdrantIndex {
    /// Connect to `url`. The connection itself is lazy; nothing is sent yet.
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> AppResult<Self> {
        let mut builder = Qdrant::from_url(url).timeout(timeout);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("Invalid Qdrant client settings: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            schemas: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_settings(settings: &StoreSettings, api_key: Option<String>) -> AppResult<Self> {
        Self::new(&settings.url, api_key, settings.timeout())
    }

    async fn call<T, F>(&self, collection: &str, operation: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, QdrantError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(self.handle_error(collection, operation, err).await),
            Err(_) => Err(AppError::timeout(operation, self.timeout)),
        }
    }

    /// Map a failed call, forgetting the cached schema if the collection is gone.
    async fn handle_error(
        &self,
        collection: &str,
        operation: &str,
        err: QdrantError,
    ) -> AppError {
        if status_code(&err) == Some(Code::NotFound)
            && self.schemas.write().await.remove(collection).is_some()
        {
            warn!(collection, "Qdrant collection disappeared; dropped cached schema");
        }
        map_err(err, operation, self.timeout)
    }

    /// Dimension and metric of an existing collection, or `None` if absent.
    async fn describe(&self, name: &str) -> AppResult<Option<(usize, Distance)>> {
        if let Some(schema) = self.schemas.read().await.get(name) {
            return Ok(Some(*schema));
        }

        let exists = self
            .call(name, "qdrant collection_exists", self.client.collection_exists(name))
            .await?;
        if !exists {
            return Ok(None);
        }

        let info = self
            .call(name, "qdrant collection_info", self.client.collection_info(name))
            .await?;

        let params = info
            .result
            .and_then(|i| i.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config);

        let schema = match params {
            Some(VectorsConfigKind::Params(p)) => {
                let distance = QdrantDistance::try_from(p.distance)
                    .ok()
                    .and_then(from_qdrant_distance)
                    .ok_or_else(|| {
                        AppError::SchemaConflict(format!(
                            "collection '{}' uses an unsupported distance metric",
                            name
                        ))
                    })?;
                (p.size as usize, distance)
            }
            _ => {
                return Err(AppError::SchemaConflict(format!(
                    "collection '{}' does not have a single unnamed vector",
                    name
                )))
            }
        };

        self.schemas.write().await.insert(name.to_string(), schema);
        Ok(Some(schema))
    }

    async fn require(&self, name: &str) -> AppResult<(usize, Distance)> {
        self.describe(name).await?.ok_or_else(|| {
            AppError::InvalidArgument(format!("collection '{}' does not exist", name))
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn backend_name(&self) -> &str {
        "qdrant"
    }

    fn upsert_atomicity(&self) -> UpsertAtomicity {
        UpsertAtomicity::PerPoint
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> AppResult<()> {
        if let Some((existing_dim, existing_distance)) = self.describe(name).await? {
            if existing_dim != dimension || existing_distance != distance {
                return Err(AppError::SchemaConflict(format!(
                    "collection '{}' has dimension {} / {}, requested {} / {}",
                    name, existing_dim, existing_distance, dimension, distance
                )));
            }
            debug!(collection = name, "Qdrant collection already exists");
            return Ok(());
        }

        let created = self
            .call(
                name,
                "qdrant create_collection",
                self.client.create_collection(
                    CreateCollectionBuilder::new(name).vectors_config(VectorParamsBuilder::new(
                        dimension as u64,
                        to_qdrant_distance(distance),
                    )),
                ),
            )
            .await;

        // A concurrent creator may have won; accept it if the schema matches.
        if let Err(err) = created {
            self.schemas.write().await.remove(name);
            match self.describe(name).await? {
                Some(schema) if schema == (dimension, distance) => {}
                Some(_) => {
                    return Err(AppError::SchemaConflict(format!(
                        "collection '{}' was created concurrently with another schema",
                        name
                    )))
                }
                None => return Err(err),
            }
        }

        self.schemas
            .write()
            .await
            .insert(name.to_string(), (dimension, distance));
        info!(collection = name, dimension, %distance, "Created Qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> AppResult<()> {
        let (dimension, _) = self.require(collection).await?;
        validate_points(points, dimension)?;

        if points.is_empty() {
            return Ok(());
        }

        let structs = points
            .iter()
            .map(to_point_struct)
            .collect::<AppResult<Vec<_>>>()?;

        self.call(
            collection,
            "qdrant upsert_points",
            self.client
                .upsert_points(UpsertPointsBuilder::new(collection, structs).wait(true)),
        )
        .await?;

        debug!(collection, count = points.len(), "Upserted points to Qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<SearchResult>> {
        check_top_k(top_k)?;
        let (dimension, distance) = self.require(collection).await?;
        if query.len() != dimension {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let response = self
            .call(
                collection,
                "qdrant search_points",
                self.client.search_points(
                    SearchPointsBuilder::new(collection, query.to_vec(), top_k as u64)
                        .with_payload(true),
                ),
            )
            .await?;

        let results = response
            .result
            .into_iter()
            .map(|scored| from_scored_point(scored, distance))
            .collect();

        Ok(rank(results, top_k))
    }

    async fn count(&self, collection: &str) -> AppResult<u64> {
        if self.describe(collection).await?.is_none() {
            return Ok(0);
        }

        let response = self
            .call(
                collection,
                "qdrant count",
                self.client
                    .count(CountPointsBuilder::new(collection).exact(true)),
            )
            .await?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn reset_collection(&self, name: &str) -> AppResult<()> {
        if self.describe(name).await?.is_some() {
            self.call(
                name,
                "qdrant delete_collection",
                self.client.delete_collection(name),
            )
            .await?;
        }
        self.schemas.write().await.remove(name);
        info!(collection = name, "Reset Qdrant collection");
        Ok(())
    }
}

fn status_code(err: &QdrantError) -> Option<Code> {
    match err {
        QdrantError::ResponseError { status } => Some(status.code()),
        _ => None,
    }
}

/// Map a Qdrant failure onto the error taxonomy.
///
/// Only transport failures and transient server states stay retryable.
/// Rejections of the request itself need the caller or an operator to act.
fn map_err(err: QdrantError, operation: &str, timeout: Duration) -> AppError {
    let status = match &err {
        QdrantError::ResponseError { status } => status,
        _ => return AppError::StoreUnavailable(format!("{}: {}", operation, err)),
    };
    let message = format!("{}: {}", operation, status.message());

    match status.code() {
        Code::DeadlineExceeded => AppError::timeout(operation, timeout),
        Code::NotFound | Code::InvalidArgument | Code::OutOfRange => {
            AppError::InvalidArgument(message)
        }
        Code::FailedPrecondition | Code::AlreadyExists => AppError::SchemaConflict(message),
        Code::Unauthenticated | Code::PermissionDenied => AppError::Config(message),
        _ => AppError::StoreUnavailable(message),
    }
}

fn to_qdrant_distance(distance: Distance) -> QdrantDistance {
    match distance {
        Distance::Cosine => QdrantDistance::Cosine,
        Distance::Dot => QdrantDistance::Dot,
        Distance::Euclid => QdrantDistance::Euclid,
    }
}

fn from_qdrant_distance(distance: QdrantDistance) -> Option<Distance> {
    match distance {
        QdrantDistance::Cosine => Some(Distance::Cosine),
        QdrantDistance::Dot => Some(Distance::Dot),
        QdrantDistance::Euclid => Some(Distance::Euclid),
        _ => None,
    }
}

/// Qdrant reports Euclid as a distance; flip it so higher is closer.
fn normalize_score(distance: Distance, score: f32) -> f32 {
    match distance {
        Distance::Euclid => -score,
        Distance::Cosine | Distance::Dot => score,
    }
}

fn to_point_struct(point: &Point) -> AppResult<PointStruct> {
    let value = serde_json::to_value(&point.payload)?;
    let payload = Payload::try_from(value)
        .map_err(|e| AppError::Serialization(format!("Invalid Qdrant payload: {}", e)))?;
    Ok(PointStruct::new(
        point.id.clone(),
        point.vector.clone(),
        payload,
    ))
}

fn extract_string(value: &QdrantValue) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn from_scored_point(scored: ScoredPoint, distance: Distance) -> SearchResult {
    let id = scored
        .id
        .as_ref()
        .and_then(|pid| match &pid.point_id_options {
            Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
            Some(PointIdOptions::Num(n)) => Some(n.to_string()),
            None => None,
        })
        .unwrap_or_default();

    SearchResult {
        id,
        text: scored
            .payload
            .get("text")
            .and_then(extract_string)
            .unwrap_or_default(),
        source: scored
            .payload
            .get("source")
            .and_then(extract_string)
            .unwrap_or_default(),
        score: normalize_score(distance, scored.score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PointPayload;
    use crate::vector_index::point_id;
    use qdrant_client::qdrant::PointId;

    fn scored(id: &str, text: Option<&str>, score: f32) -> ScoredPoint {
        let mut payload = HashMap::new();
        payload.insert("source".to_string(), QdrantValue::from("doc.pdf"));
        if let Some(text) = text {
            payload.insert("text".to_string(), QdrantValue::from(text));
        }
        ScoredPoint {
            id: Some(PointId::from(id.to_string())),
            payload,
            score,
            ..Default::default()
        }
    }

    #[test]
    fn test_distance_mapping() {
        for distance in [Distance::Cosine, Distance::Dot, Distance::Euclid] {
            assert_eq!(
                from_qdrant_distance(to_qdrant_distance(distance)),
                Some(distance)
            );
        }
        assert_eq!(from_qdrant_distance(QdrantDistance::Manhattan), None);
    }

    #[test]
    fn test_euclid_scores_are_negated() {
        assert_eq!(normalize_score(Distance::Euclid, 0.5), -0.5);
        assert_eq!(normalize_score(Distance::Cosine, 0.5), 0.5);
    }

    #[test]
    fn test_scored_point_conversion() {
        let id = point_id("doc.pdf", 0);
        let result = from_scored_point(scored(&id, Some("hello"), 0.8), Distance::Cosine);

        assert_eq!(result.id, id);
        assert_eq!(result.text, "hello");
        assert_eq!(result.source, "doc.pdf");
        assert!((result.score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_missing_text_is_filtered_by_rank() {
        let results = vec![
            from_scored_point(scored("a", None, 0.9), Distance::Cosine),
            from_scored_point(scored("b", Some("kept"), 0.4), Distance::Cosine),
        ];
        let ranked = rank(results, 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].text, "kept");
    }

    #[test]
    fn test_point_struct_payload() {
        let point = Point {
            id: point_id("doc.pdf", 2),
            vector: vec![0.1, 0.2],
            payload: PointPayload {
                source: "doc.pdf".to_string(),
                text: "chunk".to_string(),
                chunk_index: Some(2),
            },
        };

        let converted = to_point_struct(&point).unwrap();
        assert_eq!(
            converted.payload.get("source").and_then(extract_string),
            Some("doc.pdf".to_string())
        );
        assert_eq!(
            converted.payload.get("text").and_then(extract_string),
            Some("chunk".to_string())
        );
    }

    fn response_error(code: Code) -> QdrantError {
        QdrantError::ResponseError {
            status: tonic::Status::new(code, "rejected"),
        }
    }

    #[test]
    fn test_error_mapping() {
        let timeout = Duration::from_secs(3);
        let map = |code| map_err(response_error(code), "qdrant search_points", timeout);

        assert!(matches!(map(Code::DeadlineExceeded), AppError::Timeout { .. }));
        assert!(matches!(map(Code::Unavailable), AppError::StoreUnavailable(_)));
        assert!(matches!(map(Code::NotFound), AppError::InvalidArgument(_)));
        assert!(matches!(map(Code::InvalidArgument), AppError::InvalidArgument(_)));
        assert!(matches!(map(Code::FailedPrecondition), AppError::SchemaConflict(_)));
        assert!(matches!(map(Code::Unauthenticated), AppError::Config(_)));

        assert_eq!(map(Code::DeadlineExceeded).kind(), "TimeoutError");
        assert!(map(Code::Unavailable).is_retryable());
        for code in [Code::NotFound, Code::InvalidArgument, Code::FailedPrecondition] {
            assert!(!map(code).is_retryable());
        }
    }

    #[tokio::test]
    async fn test_not_found_drops_cached_schema() {
        let index = QdrantIndex::new("http://127.0.0.1:1", None, Duration::from_secs(2)).unwrap();
        index
            .schemas
            .write()
            .await
            .insert("docs".to_string(), (4, Distance::Cosine));

        let err = index
            .handle_error("docs", "qdrant upsert_points", response_error(Code::NotFound))
            .await;
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(index.schemas.read().await.get("docs").is_none());

        index
            .schemas
            .write()
            .await
            .insert("docs".to_string(), (4, Distance::Cosine));
        index
            .handle_error("docs", "qdrant upsert_points", response_error(Code::Unavailable))
            .await;
        assert!(index.schemas.read().await.get("docs").is_some());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_store_unavailable() {
        let index = QdrantIndex::new("http://127.0.0.1:1", None, Duration::from_secs(2)).unwrap();
        let err = index.count("docs").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::StoreUnavailable(_) | AppError::Timeout { .. }
        ));
        assert!(err.is_retryable());
    }
}
