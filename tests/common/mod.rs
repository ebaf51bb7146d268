//! Shared helpers for integration tests.
#![allow(dead_code)]

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// A private in-memory database with the schema applied. One connection so
/// every query sees the same memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    patrol_inspect::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Minimal bytes that decode-validate as a PNG (signature check only).
pub fn sample_png() -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 16]);
    bytes
}
