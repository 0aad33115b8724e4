//! Database initialization tests against on-disk files

use taxo_common::db::init::init_database;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("taxo.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("taxo.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO vocabularies (machine_name, name) VALUES ('regions', 'Regions')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    // Second open keeps existing data
    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vocabularies")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
