#[cfg(test)]
mod tests;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatchIterator, StringArray,
    UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use itertools::Itertools;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::RecallError;
use crate::database::{ChunkMetadata, MetadataFilter, SearchHit, VectorIndex, VectorRecord};

/// Vector store backed by LanceDB.
///
/// The vector dimension is pinned at construction and constant across the
/// table; mixing embedding-model versions without re-indexing breaks
/// similarity semantics, so a mismatched record or query vector is a hard
/// error rather than a trigger for silent re-creation.
pub struct LanceVectorIndex {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

impl LanceVectorIndex {
    #[inline]
    pub async fn new(db_path: &Path, dimension: usize) -> Result<Self, RecallError> {
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RecallError::Index(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RecallError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            table_name: "chunks".to_string(),
            dimension,
        };
        store.initialize_table().await?;

        info!("Vector store initialized with {} dimensions", dimension);
        Ok(store)
    }

    async fn initialize_table(&self) -> Result<(), RecallError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RecallError::Index(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            debug!("Chunks table already exists");
            return Ok(());
        }

        let schema = self.create_schema();
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| RecallError::Index(format!("Failed to create table: {}", e)))?;

        debug!("Chunks table created");
        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("document", DataType::Utf8, false),
            Field::new("parent_id", DataType::Int64, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("url", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("collection", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(&self, records: &[VectorRecord]) -> Result<RecordBatch, RecallError> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut documents = Vec::with_capacity(len);
        let mut parent_ids = Vec::with_capacity(len);
        let mut titles = Vec::with_capacity(len);
        let mut urls = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut collections = Vec::with_capacity(len);

        for record in records {
            ids.push(record.id.as_str());
            documents.push(record.document.as_str());
            parent_ids.push(record.metadata.parent_id);
            titles.push(record.metadata.title.as_str());
            urls.push(record.metadata.url.as_str());
            chunk_indices.push(record.metadata.chunk_index);
            collections.push(record.metadata.collection.as_str());
        }

        let mut flat_values = Vec::with_capacity(len * self.dimension);
        for record in records {
            flat_values.extend_from_slice(&record.vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| RecallError::Index(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(documents)),
            Arc::new(Int64Array::from(parent_ids)),
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(urls)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(collections)),
        ];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| RecallError::Index(format!("Failed to create record batch: {}", e)))
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), RecallError> {
        if vector.len() != self.dimension {
            return Err(RecallError::Index(format!(
                "Vector dimension mismatch: expected {}, got {} (re-indexing is required after changing embedding models)",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }

    async fn open_table(&self) -> Result<lancedb::Table, RecallError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| RecallError::Index(format!("Failed to open table: {}", e)))
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>, RecallError> {
        fn string_column<'a>(
            batch: &'a RecordBatch,
            name: &str,
        ) -> Result<&'a StringArray, RecallError> {
            batch
                .column_by_name(name)
                .ok_or_else(|| RecallError::Index(format!("Missing {} column", name)))?
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| RecallError::Index(format!("Invalid {} column type", name)))
        }

        let documents = string_column(batch, "document")?;
        let titles = string_column(batch, "title")?;
        let urls = string_column(batch, "url")?;
        let collections = string_column(batch, "collection")?;

        let parent_ids = batch
            .column_by_name("parent_id")
            .ok_or_else(|| RecallError::Index("Missing parent_id column".to_string()))?
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| RecallError::Index("Invalid parent_id column type".to_string()))?;

        let chunk_indices = batch
            .column_by_name("chunk_index")
            .ok_or_else(|| RecallError::Index("Missing chunk_index column".to_string()))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| RecallError::Index("Invalid chunk_index column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut hits = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            hits.push(SearchHit {
                document: documents.value(row).to_string(),
                metadata: ChunkMetadata {
                    parent_id: parent_ids.value(row),
                    title: titles.value(row).to_string(),
                    url: urls.value(row).to_string(),
                    chunk_index: chunk_indices.value(row),
                    collection: collections.value(row).to_string(),
                },
                distance,
            });
        }

        Ok(hits)
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    #[inline]
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), RecallError> {
        if records.is_empty() {
            debug!("No records to upsert");
            return Ok(());
        }

        for record in records {
            self.check_dimension(&record.vector)?;
        }

        let table = self.open_table().await?;

        // Insert-or-replace: clear any existing rows for these ids first
        let id_list = records
            .iter()
            .map(|r| format!("'{}'", r.id.replace('\'', "''")))
            .join(", ");
        table
            .delete(&format!("id IN ({id_list})"))
            .await
            .map_err(|e| RecallError::Index(format!("Failed to clear existing records: {}", e)))?;

        let record_batch = self.create_record_batch(records)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RecallError::Index(format!("Failed to insert records: {}", e)))?;

        debug!("Upserted {} vector records", records.len());
        Ok(())
    }

    #[inline]
    async fn query(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>, RecallError> {
        self.check_dimension(query_vector)?;

        let table = self.open_table().await?;

        let mut query = table
            .vector_search(query_vector)
            .map_err(|e| RecallError::Index(format!("Failed to create vector search: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .column("vector")
            .limit(top_k);

        if let Some(predicate) = filter.and_then(MetadataFilter::to_sql_predicate) {
            query = query.only_if(predicate);
        }

        let mut results = query
            .execute()
            .await
            .map_err(|e| RecallError::Index(format!("Failed to execute search: {}", e)))?;

        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RecallError::Index(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("Vector query returned {} hits", hits.len());
        Ok(hits)
    }
}
