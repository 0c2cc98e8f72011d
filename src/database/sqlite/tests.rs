use super::*;
use tempfile::TempDir;

#[tokio::test]
async fn creates_database_file_and_schema() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("chats.db");

    let database = Database::new(&db_path).await.expect("should create database");

    assert!(db_path.exists());
    assert_eq!(
        database.count_chats().await.expect("count should succeed"),
        0
    );
}

#[tokio::test]
async fn schema_init_is_idempotent() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("chats.db");

    let first = Database::new(&db_path).await.expect("should create database");
    first
        .insert_if_absent(&NewChat {
            title: "t".to_string(),
            url: "https://chat.example/c/1".to_string(),
            messages: "[]".to_string(),
            collection: "Uncategorized".to_string(),
        })
        .await
        .expect("insert should succeed");
    drop(first);

    // Reopening must not clobber existing rows
    let second = Database::new(&db_path).await.expect("should reopen database");
    assert_eq!(second.count_chats().await.expect("count should succeed"), 1);
}

#[tokio::test]
async fn optimize_runs_cleanly() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let database = Database::new(temp_dir.path().join("chats.db"))
        .await
        .expect("should create database");

    database.optimize().await.expect("optimize should succeed");
}
