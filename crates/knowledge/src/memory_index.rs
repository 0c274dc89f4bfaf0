//! In-memory vector index.
//!
//! Brute-force search over a `HashMap` guarded by a `tokio::sync::RwLock`.
//! Used in tests and for local development; nothing survives the process.

use std::collections::HashMap;

use async_trait::async_trait;
use ragline_core::config::Distance;
use ragline_core::{AppError, AppResult};
use tokio::sync::RwLock;

use crate::types::{Point, PointPayload, SearchResult};
use crate::vector_index::{
    check_top_k, rank, similarity, validate_points, UpsertAtomicity, VectorIndex,
};

#[derive(Debug)]
struct Collection {
    dimension: usize,
    distance: Distance,
    points: HashMap<String, (Vec<f32>, PointPayload)>,
}

/// An in-memory [`VectorIndex`].
///
/// Upserts validate the whole batch before taking the write lock, so a
/// batch is applied entirely or not at all.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(collection: &str) -> AppError {
        AppError::InvalidArgument(format!("collection '{}' does not exist", collection))
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn backend_name(&self) -> &str {
        "memory"
    }

    fn upsert_atomicity(&self) -> UpsertAtomicity {
        UpsertAtomicity::Batch
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> AppResult<()> {
        let mut collections = self.collections.write().await;

        if let Some(existing) = collections.get(name) {
            if existing.dimension != dimension || existing.distance != distance {
                return Err(AppError::SchemaConflict(format!(
                    "collection '{}' has dimension {} / {}, requested {} / {}",
                    name, existing.dimension, existing.distance, dimension, distance
                )));
            }
            return Ok(());
        }

        collections.insert(
            name.to_string(),
            Collection {
                dimension,
                distance,
                points: HashMap::new(),
            },
        );
        tracing::debug!(collection = name, dimension, %distance, "Created in-memory collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        let store = collections
            .get_mut(collection)
            .ok_or_else(|| Self::missing(collection))?;

        validate_points(points, store.dimension)?;

        for point in points {
            store.points.insert(
                point.id.clone(),
                (point.vector.clone(), point.payload.clone()),
            );
        }

        tracing::debug!(collection, count = points.len(), "Upserted points in memory");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<SearchResult>> {
        check_top_k(top_k)?;

        let collections = self.collections.read().await;
        let store = collections
            .get(collection)
            .ok_or_else(|| Self::missing(collection))?;

        if query.len() != store.dimension {
            return Err(AppError::DimensionMismatch {
                expected: store.dimension,
                actual: query.len(),
            });
        }

        let scored = store
            .points
            .iter()
            .map(|(id, (vector, payload))| SearchResult {
                id: id.clone(),
                text: payload.text.clone(),
                source: payload.source.clone(),
                score: similarity(store.distance, query, vector),
            })
            .collect();

        Ok(rank(scored, top_k))
    }

    async fn count(&self, collection: &str) -> AppResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.points.len() as u64)
            .unwrap_or(0))
    }

    async fn reset_collection(&self, name: &str) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        if let Some(store) = collections.get_mut(name) {
            store.points.clear();
        }
        tracing::info!(collection = name, "Reset in-memory collection");
        Ok(())
    }
}
