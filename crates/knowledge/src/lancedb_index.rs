//! LanceDB-backed vector index implementation.
//!
//! Each collection is a LanceDB table with the columns
//! `id, source, text, chunk_index, vector`. The metric is kept in the
//! table's schema metadata. Every call is bounded by the store timeout.

use crate::types::{Point, SearchResult};
use crate::vector_index::{
    check_top_k, rank, similarity, validate_points, UpsertAtomicity, VectorIndex,
};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use ragline_core::config::{Distance, StoreSettings};
use ragline_core::{AppError, AppResult};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DISTANCE_KEY: &str = "ragline.distance";

/// LanceDB-backed vector index stored in a local directory.
pub struct LanceDbIndex {
    conn: Connection,
    timeout: Duration,
}

impl LanceDbIndex {
    /// Open (or create) a LanceDB database at `db_path`.
    pub async fn open(db_path: &Path, timeout: Duration) -> AppResult<Self> {
        std::fs::create_dir_all(db_path).map_err(|e| {
            AppError::StoreUnavailable(format!(
                "Failed to create index directory {}: {}",
                db_path.display(),
                e
            ))
        })?;

        let uri = db_path.to_string_lossy().to_string();
        let conn = bounded(
            timeout,
            "Failed to connect to LanceDB",
            lancedb::connect(&uri).execute(),
        )
        .await?;

        tracing::debug!("Initialized LanceDB index at {:?}", db_path);
        Ok(Self { conn, timeout })
    }

    pub async fn from_settings(settings: &StoreSettings) -> AppResult<Self> {
        Self::open(Path::new(&settings.path), settings.timeout()).await
    }

    async fn call<T, F>(&self, operation: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = lancedb::Result<T>>,
    {
        bounded(self.timeout, operation, fut).await
    }

    fn create_schema(dimension: usize, distance: Distance) -> SchemaRef {
        let metadata = HashMap::from([(DISTANCE_KEY.to_string(), distance.as_str().to_string())]);
        Arc::new(Schema::new_with_metadata(
            vec![
                Field::new("id", DataType::Utf8, false),
                Field::new("source", DataType::Utf8, false),
                Field::new("text", DataType::Utf8, false),
                Field::new("chunk_index", DataType::UInt32, true),
                Field::new(
                    "vector",
                    DataType::FixedSizeList(
                        Arc::new(Field::new("item", DataType::Float32, true)),
                        dimension as i32,
                    ),
                    false,
                ),
            ],
            metadata,
        ))
    }

    async fn open_table(&self, name: &str) -> AppResult<Option<Table>> {
        let names = self
            .call("Failed to list tables", self.conn.table_names().execute())
            .await?;

        if !names.iter().any(|n| n == name) {
            return Ok(None);
        }

        let table = self
            .call("Failed to open table", self.conn.open_table(name).execute())
            .await?;
        Ok(Some(table))
    }

    async fn require_table(&self, name: &str) -> AppResult<Table> {
        self.open_table(name).await?.ok_or_else(|| {
            AppError::InvalidArgument(format!("collection '{}' does not exist", name))
        })
    }

    /// Dimension and metric recorded in a table's schema.
    async fn describe(&self, table: &Table) -> AppResult<(usize, Distance)> {
        let schema = self
            .call("Failed to read table schema", table.schema())
            .await?;
        schema_params(&schema)
    }

    fn points_to_batch(
        points: &[Point],
        schema: SchemaRef,
        dimension: usize,
    ) -> AppResult<RecordBatch> {
        let ids = StringArray::from_iter_values(points.iter().map(|p| p.id.as_str()));
        let sources =
            StringArray::from_iter_values(points.iter().map(|p| p.payload.source.as_str()));
        let texts = StringArray::from_iter_values(points.iter().map(|p| p.payload.text.as_str()));
        let indices: UInt32Array = points.iter().map(|p| p.payload.chunk_index).collect();

        let values = Float32Array::from_iter_values(
            points.iter().flat_map(|p| p.vector.iter().copied()),
        );
        let vectors = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            dimension as i32,
            Arc::new(values),
            None,
        )
        .map_err(|e| AppError::InvalidArgument(format!("Failed to build vector column: {}", e)))?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(sources),
                Arc::new(texts),
                Arc::new(indices),
                Arc::new(vectors),
            ],
        )
        .map_err(|e| AppError::InvalidArgument(format!("Failed to create RecordBatch: {}", e)))
    }

    fn batch_to_results(
        batch: &RecordBatch,
        distance: Distance,
        query: &[f32],
    ) -> AppResult<Vec<SearchResult>> {
        let ids = string_column(batch, "id")?;
        let sources = string_column(batch, "source")?;
        let texts = string_column(batch, "text")?;
        let vectors = batch
            .column_by_name("vector")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| AppError::StoreUnavailable("Invalid vector column".to_string()))?;

        let mut results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let row_vector = vectors.value(row);
            let values = row_vector
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| AppError::StoreUnavailable("Invalid vector values".to_string()))?;

            results.push(SearchResult {
                id: ids.value(row).to_string(),
                source: sources.value(row).to_string(),
                text: texts.value(row).to_string(),
                score: similarity(distance, query, values.values()),
            });
        }
        Ok(results)
    }
}

#[async_trait]
impl VectorIndex for LanceDbIndex {
    fn backend_name(&self) -> &str {
        "lancedb"
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
        if let Some(table) = self.open_table(name).await? {
            let (existing_dim, existing_distance) = self.describe(&table).await?;
            if existing_dim != dimension || existing_distance != distance {
                return Err(AppError::SchemaConflict(format!(
                    "collection '{}' has dimension {} / {}, requested {} / {}",
                    name, existing_dim, existing_distance, dimension, distance
                )));
            }
            return Ok(());
        }

        let schema = Self::create_schema(dimension, distance);
        let empty_batch = RecordBatch::new_empty(schema.clone());

        self.call(
            "Failed to create table",
            self.conn
                .create_table(
                    name,
                    RecordBatchIterator::new(vec![Ok(empty_batch)], schema),
                )
                .execute(),
        )
        .await?;

        tracing::info!(collection = name, dimension, %distance, "Created LanceDB table");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> AppResult<()> {
        let table = self.require_table(collection).await?;
        let (dimension, _) = self.describe(&table).await?;
        validate_points(points, dimension)?;

        if points.is_empty() {
            return Ok(());
        }

        let schema = self
            .call("Failed to read table schema", table.schema())
            .await?;
        let batch = Self::points_to_batch(points, schema.clone(), dimension)?;

        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        self.call(
            "Failed to upsert points",
            merge.execute(Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema))),
        )
        .await?;

        tracing::debug!("Upserted {} points into LanceDB", points.len());
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<SearchResult>> {
        check_top_k(top_k)?;
        let table = self.require_table(collection).await?;
        let (dimension, distance) = self.describe(&table).await?;

        if query.len() != dimension {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let rows = self
            .call("Failed to count rows", table.count_rows(None))
            .await?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let vector_query = table
            .query()
            .only_if("text != ''")
            .nearest_to(query.to_vec())
            .map_err(|e| store_err("Failed to create query", e))?
            .distance_type(to_distance_type(distance))
            .limit(top_k);

        let batches = self
            .call("Failed to execute search", async {
                vector_query.execute().await?.try_collect::<Vec<_>>().await
            })
            .await?;

        let mut results = Vec::new();
        for batch in &batches {
            results.extend(Self::batch_to_results(batch, distance, query)?);
        }

        tracing::debug!(
            "Retrieved {} points (requested top-{})",
            results.len(),
            top_k
        );
        Ok(rank(results, top_k))
    }

    async fn count(&self, collection: &str) -> AppResult<u64> {
        match self.open_table(collection).await? {
            Some(table) => self
                .call("Failed to count rows", table.count_rows(None))
                .await
                .map(|n| n as u64),
            None => Ok(0),
        }
    }

    async fn reset_collection(&self, name: &str) -> AppResult<()> {
        if let Some(table) = self.open_table(name).await? {
            let count = self
                .call("Failed to count rows", table.count_rows(None))
                .await?;

            if count > 0 {
                self.call("Failed to reset collection", table.delete("id IS NOT NULL"))
                    .await?;
            }
        }

        tracing::info!(collection = name, "Reset LanceDB collection");
        Ok(())
    }
}

fn store_err(context: &str, err: lancedb::Error) -> AppError {
    AppError::StoreUnavailable(format!("{}: {}", context, err))
}

async fn bounded<T, F>(timeout: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = lancedb::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|e| store_err(operation, e)),
        Err(_) => Err(AppError::timeout(operation, timeout)),
    }
}

fn to_distance_type(distance: Distance) -> DistanceType {
    match distance {
        Distance::Cosine => DistanceType::Cosine,
        Distance::Dot => DistanceType::Dot,
        Distance::Euclid => DistanceType::L2,
    }
}

fn schema_params(schema: &Schema) -> AppResult<(usize, Distance)> {
    let dimension = match schema.field_with_name("vector").map(|f| f.data_type()) {
        Ok(DataType::FixedSizeList(_, size)) => *size as usize,
        _ => {
            return Err(AppError::SchemaConflict(
                "table has no fixed-size 'vector' column".to_string(),
            ))
        }
    };

    let distance = match schema.metadata().get(DISTANCE_KEY) {
        Some(name) => Distance::parse(name).ok_or_else(|| {
            AppError::SchemaConflict(format!("table uses an unknown distance metric '{}'", name))
        })?,
        None => Distance::default(),
    };

    Ok((dimension, distance))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| AppError::StoreUnavailable(format!("Invalid {} column", name)))
}
