//! Vector index abstraction for knowledge points.
//!
//! Defines a trait for backend-agnostic vector storage and retrieval, plus
//! the helpers every backend shares: point id derivation, boundary
//! validation and result ranking.

use async_trait::async_trait;
use ragline_core::config::Distance;
use ragline_core::{AppError, AppResult};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{Point, SearchResult};

/// What a failed `upsert` may leave behind.
///
/// No backend ever exposes a partially written point; this only describes
/// whether a failed batch can leave some of its points written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAtomicity {
    /// The whole batch is applied or none of it is
    Batch,
    /// Each point is replaced atomically; a failed batch may be partially applied
    PerPoint,
}

impl UpsertAtomicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::PerPoint => "per_point",
        }
    }
}

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Creating a collection lazily, rejecting incompatible existing ones
/// - Upserting points by id (same id overwrites)
/// - Searching for the top-k most similar points
/// - Counting and explicitly resetting a collection
///
/// Handles are shared across concurrent pipeline invocations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logs and stats (e.g. "qdrant").
    fn backend_name(&self) -> &str;

    /// Partial-failure guarantee of [`VectorIndex::upsert`].
    fn upsert_atomicity(&self) -> UpsertAtomicity;

    /// Create `name` if absent.
    ///
    /// Fails with `SchemaConflict` if it exists with another dimension or metric.
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> AppResult<()>;

    /// Insert or replace points by id.
    async fn upsert(&self, collection: &str, points: &[Point]) -> AppResult<()>;

    /// Return up to `top_k` points ordered by descending similarity.
    ///
    /// Points without a non-empty `text` payload are skipped. `top_k == 0`
    /// fails with `InvalidArgument`.
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<SearchResult>>;

    /// Number of points stored in `collection` (zero if it does not exist).
    async fn count(&self, collection: &str) -> AppResult<u64>;

    /// Remove every point from `collection`.
    async fn reset_collection(&self, name: &str) -> AppResult<()>;
}

/// Deterministic point id for chunk `index` of `source_id`.
///
/// UUIDv5 in the URL namespace over `"{source_id}:{index}"`, stable across
/// processes and compatible with points written by earlier deployments.
pub fn point_id(source_id: &str, index: u32) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{}:{}", source_id, index).as_bytes(),
    )
    .to_string()
}

/// Reject `top_k == 0`.
pub fn check_top_k(top_k: usize) -> AppResult<()> {
    if top_k == 0 {
        return Err(AppError::InvalidArgument(
            "top_k must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validate points at the store boundary.
///
/// Every point needs an id, a `source` payload field and a vector of the
/// collection's dimension. Empty `text` is allowed here and filtered at search.
pub fn validate_points(points: &[Point], dimension: usize) -> AppResult<()> {
    for point in points {
        if point.id.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "point id must not be empty".to_string(),
            ));
        }
        if point.payload.source.trim().is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "point {} is missing its source payload",
                point.id
            )));
        }
        if point.vector.len() != dimension {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: point.vector.len(),
            });
        }
    }
    Ok(())
}

/// Similarity of `a` and `b` under `distance`; higher is always closer.
pub fn similarity(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => {
            let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                return 0.0;
            }
            dot / (norm_a * norm_b)
        }
        Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Distance::Euclid => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

/// Drop results without text, sort by score (ties by id) and keep `top_k`.
pub fn rank(results: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    let mut kept: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| {
            let keep = !r.text.trim().is_empty();
            if !keep {
                tracing::warn!(point_id = %r.id, "Skipping search hit without text payload");
            }
            keep
        })
        .collect();

    kept.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    kept.truncate(top_k);
    kept
}
