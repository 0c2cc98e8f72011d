use super::*;
use tempfile::TempDir;

const DIM: usize = 4;

async fn test_index() -> (LanceVectorIndex, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index = LanceVectorIndex::new(&temp_dir.path().join("vectors"), DIM)
        .await
        .expect("should initialize vector store");
    (index, temp_dir)
}

fn record(id: &str, vector: Vec<f32>, collection: &str) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        vector,
        document: format!("document for {id}"),
        metadata: ChunkMetadata {
            parent_id: 7,
            title: "Test chat".to_string(),
            url: "https://chat.example/c/7".to_string(),
            chunk_index: 0,
            collection: collection.to_string(),
        },
    }
}

#[tokio::test]
async fn initializes_empty_store() {
    let (index, _temp_dir) = test_index().await;

    let hits = index
        .query(&[1.0, 0.0, 0.0, 0.0], 5, None)
        .await
        .expect("query should succeed");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn upsert_then_query_returns_nearest_first() {
    let (index, _temp_dir) = test_index().await;

    index
        .upsert(&[
            record("7_0", vec![1.0, 0.0, 0.0, 0.0], "Rust"),
            record("7_1", vec![0.0, 1.0, 0.0, 0.0], "Rust"),
        ])
        .await
        .expect("upsert should succeed");

    let hits = index
        .query(&[0.9, 0.1, 0.0, 0.0], 5, None)
        .await
        .expect("query should succeed");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document, "document for 7_0");
    assert!(hits[0].distance < hits[1].distance);
    assert_eq!(hits[0].metadata.parent_id, 7);
    assert_eq!(hits[0].metadata.collection, "Rust");
}

#[tokio::test]
async fn collection_filter_excludes_other_collections() {
    let (index, _temp_dir) = test_index().await;

    index
        .upsert(&[
            record("7_0", vec![1.0, 0.0, 0.0, 0.0], "Rust"),
            record("8_0", vec![1.0, 0.1, 0.0, 0.0], "Python"),
        ])
        .await
        .expect("upsert should succeed");

    let filter = MetadataFilter::new().equals("collection", "Python");
    let hits = index
        .query(&[1.0, 0.0, 0.0, 0.0], 5, Some(&filter))
        .await
        .expect("query should succeed");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata.collection, "Python");
}

#[tokio::test]
async fn upsert_replaces_existing_id() {
    let (index, _temp_dir) = test_index().await;

    index
        .upsert(&[record("7_0", vec![1.0, 0.0, 0.0, 0.0], "Rust")])
        .await
        .expect("first upsert should succeed");

    let mut replacement = record("7_0", vec![0.0, 0.0, 1.0, 0.0], "Rust");
    replacement.document = "updated document".to_string();
    index
        .upsert(&[replacement])
        .await
        .expect("second upsert should succeed");

    let hits = index
        .query(&[0.0, 0.0, 1.0, 0.0], 5, None)
        .await
        .expect("query should succeed");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document, "updated document");
}

#[tokio::test]
async fn rejects_mismatched_record_dimension() {
    let (index, _temp_dir) = test_index().await;

    let result = index
        .upsert(&[record("7_0", vec![1.0, 0.0], "Rust")])
        .await;

    assert!(matches!(result, Err(RecallError::Index(_))));
}

#[tokio::test]
async fn rejects_mismatched_query_dimension() {
    let (index, _temp_dir) = test_index().await;

    let result = index.query(&[1.0, 0.0, 0.0], 5, None).await;

    assert!(matches!(result, Err(RecallError::Index(_))));
}

#[tokio::test]
async fn empty_upsert_is_a_no_op() {
    let (index, _temp_dir) = test_index().await;

    index.upsert(&[]).await.expect("empty upsert should succeed");
}
