//! Vector index snapshots.
//!
//! A snapshot is a single SQLite file holding the indexed chunks and their
//! embedding vectors, plus a `meta` table recording the embedding model and
//! dimensionality it was built with. Snapshots are versionless and written
//! whole: the build flow writes to a temp file next to the target and
//! renames it into place, so a prior snapshot either survives untouched or
//! is replaced in one step — never half-overwritten.
//!
//! Search is brute-force cosine over the loaded entries; at this scale
//! (one user's documents) that beats maintaining an ANN structure.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::QaError;
use crate::models::SearchHit;

/// One indexed chunk: its source document, text, and embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk_id: String,
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
    pub vector: Vec<f32>,
}

/// An in-memory searchable index loaded from a snapshot.
#[derive(Debug)]
pub struct VectorIndex {
    dims: usize,
    entries: Vec<IndexEntry>,
}

/// Summary of a persisted snapshot, for the status surface.
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    pub model: String,
    pub dims: usize,
    pub entries: i64,
    pub created_at: String,
}

pub fn snapshot_exists(path: &Path) -> bool {
    path.is_file()
}

/// Persist entries as a named snapshot, atomically replacing any prior
/// snapshot at `path`.
pub async fn write_snapshot(
    path: &Path,
    model: &str,
    dims: usize,
    entries: &[IndexEntry],
) -> Result<(), QaError> {
    if entries.is_empty() {
        return Err(QaError::IndexBuild(
            "refusing to persist an empty snapshot".to_string(),
        ));
    }
    for entry in entries {
        if entry.vector.len() != dims {
            return Err(QaError::IndexBuild(format!(
                "chunk {} produced a {}-dimensional vector, expected {}",
                entry.chunk_id,
                entry.vector.len(),
                dims
            )));
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(build_err)?;
    }

    let tmp: PathBuf = path.with_extension("sqlite.tmp");
    if tmp.exists() {
        std::fs::remove_file(&tmp).map_err(build_err)?;
    }

    let pool = connect(&tmp, true).await.map_err(build_err)?;
    let result = write_tables(&pool, model, dims, entries).await;
    pool.close().await;

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(build_err(e));
    }

    // The rename makes the new snapshot visible in one step.
    std::fs::rename(&tmp, path).map_err(build_err)?;
    Ok(())
}

async fn write_tables(
    pool: &SqlitePool,
    model: &str,
    dims: usize,
    entries: &[IndexEntry],
) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE TABLE meta (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
        .execute(pool)
        .await?;
    sqlx::query(
        r#"
        CREATE TABLE entries (
            pos INTEGER PRIMARY KEY,
            chunk_id TEXT NOT NULL,
            source TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let mut tx = pool.begin().await?;

    for (key, value) in [
        ("model", model.to_string()),
        ("dims", dims.to_string()),
        ("entries", entries.len().to_string()),
        ("created_at", Utc::now().to_rfc3339()),
    ] {
        sqlx::query("INSERT INTO meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }

    for (pos, entry) in entries.iter().enumerate() {
        sqlx::query(
            "INSERT INTO entries (pos, chunk_id, source, chunk_index, text, hash, embedding) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(pos as i64)
        .bind(&entry.chunk_id)
        .bind(&entry.source)
        .bind(entry.chunk_index)
        .bind(&entry.text)
        .bind(&entry.hash)
        .bind(vec_to_blob(&entry.vector))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Load a snapshot into memory.
///
/// Fails with [`QaError::IndexNotFound`] when no snapshot exists at `path`
/// and [`QaError::DimensionMismatch`] when the snapshot was built with a
/// different embedding dimensionality than `expected_dims`.
pub async fn load_snapshot(path: &Path, expected_dims: usize) -> Result<VectorIndex, QaError> {
    if !snapshot_exists(path) {
        return Err(QaError::IndexNotFound(path.to_path_buf()));
    }

    let pool = connect(path, false).await.map_err(read_err)?;
    let result = read_entries(&pool, expected_dims).await;
    pool.close().await;
    result
}

async fn read_entries(pool: &SqlitePool, expected_dims: usize) -> Result<VectorIndex, QaError> {
    let dims_text: Option<String> =
        sqlx::query_scalar("SELECT value FROM meta WHERE key = 'dims'")
            .fetch_optional(pool)
            .await
            .map_err(read_err)?;

    let dims: usize = dims_text
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| read_err("snapshot is missing its dims metadata"))?;

    if dims != expected_dims {
        return Err(QaError::DimensionMismatch {
            expected: expected_dims,
            found: dims,
        });
    }

    let rows = sqlx::query(
        "SELECT chunk_id, source, chunk_index, text, hash, embedding FROM entries ORDER BY pos",
    )
    .fetch_all(pool)
    .await
    .map_err(read_err)?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let blob: Vec<u8> = row.get("embedding");
        let vector = blob_to_vec(&blob);
        if vector.len() != dims {
            return Err(QaError::DimensionMismatch {
                expected: dims,
                found: vector.len(),
            });
        }
        entries.push(IndexEntry {
            chunk_id: row.get("chunk_id"),
            source: row.get("source"),
            chunk_index: row.get("chunk_index"),
            text: row.get("text"),
            hash: row.get("hash"),
            vector,
        });
    }

    Ok(VectorIndex { dims, entries })
}

/// Read a snapshot's `meta` table without loading its entries.
pub async fn snapshot_info(path: &Path) -> Result<Option<SnapshotInfo>, QaError> {
    if !snapshot_exists(path) {
        return Ok(None);
    }

    let pool = connect(path, false).await.map_err(read_err)?;
    let rows = sqlx::query("SELECT key, value FROM meta")
        .fetch_all(&pool)
        .await
        .map_err(read_err)?;
    pool.close().await;

    let mut info = SnapshotInfo {
        model: String::new(),
        dims: 0,
        entries: 0,
        created_at: String::new(),
    };
    for row in &rows {
        let key: String = row.get("key");
        let value: String = row.get("value");
        match key.as_str() {
            "model" => info.model = value,
            "dims" => info.dims = value.parse().unwrap_or(0),
            "entries" => info.entries = value.parse().unwrap_or(0),
            "created_at" => info.created_at = value,
            _ => {}
        }
    }
    Ok(Some(info))
}

impl VectorIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Return up to `k` entries ordered by descending cosine similarity to
    /// `query`. The sort is stable, so ties keep insertion order. When the
    /// index holds fewer than `k` entries, all of them are returned.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                source: entry.source.clone(),
                text: entry.text.clone(),
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }
}

async fn connect(path: &Path, create: bool) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

fn build_err(e: impl std::fmt::Display) -> QaError {
    QaError::IndexBuild(e.to_string())
}

fn read_err(e: impl std::fmt::Display) -> QaError {
    QaError::IndexBuild(format!("snapshot could not be read: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, text: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk_id: id.to_string(),
            source: "doc.txt".to_string(),
            chunk_index: 0,
            text: text.to_string(),
            hash: format!("hash-{}", id),
            vector,
        }
    }

    #[tokio::test]
    async fn snapshot_roundtrip_preserves_order_and_vectors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main.sqlite");

        let entries = vec![
            entry("c0", "first", vec![1.0, 0.0]),
            entry("c1", "second", vec![0.0, 1.0]),
            entry("c2", "third", vec![0.5, 0.5]),
        ];
        write_snapshot(&path, "test-model", 2, &entries).await.unwrap();

        let index = load_snapshot(&path, 2).await.unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.dims(), 2);

        let info = snapshot_info(&path).await.unwrap().unwrap();
        assert_eq!(info.model, "test-model");
        assert_eq!(info.dims, 2);
        assert_eq!(info.entries, 3);
    }

    #[tokio::test]
    async fn search_orders_by_descending_similarity() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main.sqlite");
        let entries = vec![
            entry("far", "far away", vec![0.0, 1.0]),
            entry("near", "spot on", vec![1.0, 0.0]),
            entry("mid", "partway", vec![1.0, 1.0]),
        ];
        write_snapshot(&path, "test-model", 2, &entries).await.unwrap();
        let index = load_snapshot(&path, 2).await.unwrap();

        let hits = index.search(&[1.0, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "spot on");
        assert_eq!(hits[1].text, "partway");
        assert_eq!(hits[2].text, "far away");
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[tokio::test]
    async fn search_caps_at_k_and_returns_all_when_small() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main.sqlite");
        let entries = vec![
            entry("a", "a", vec![1.0, 0.0]),
            entry("b", "b", vec![0.9, 0.1]),
        ];
        write_snapshot(&path, "test-model", 2, &entries).await.unwrap();
        let index = load_snapshot(&path, 2).await.unwrap();

        assert_eq!(index.search(&[1.0, 0.0], 1).len(), 1);
        assert_eq!(index.search(&[1.0, 0.0], 5).len(), 2);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main.sqlite");
        // Same direction, same similarity to any query.
        let entries = vec![
            entry("first", "inserted first", vec![1.0, 0.0]),
            entry("second", "inserted second", vec![2.0, 0.0]),
        ];
        write_snapshot(&path, "test-model", 2, &entries).await.unwrap();
        let index = load_snapshot(&path, 2).await.unwrap();

        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].text, "inserted first");
        assert_eq!(hits[1].text, "inserted second");
    }

    #[tokio::test]
    async fn missing_snapshot_is_index_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = load_snapshot(&tmp.path().join("absent.sqlite"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn dimension_mismatch_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main.sqlite");
        let entries = vec![entry("a", "a", vec![1.0, 0.0])];
        write_snapshot(&path, "test-model", 2, &entries).await.unwrap();

        let err = load_snapshot(&path, 384).await.unwrap_err();
        match err {
            QaError::DimensionMismatch { expected, found } => {
                assert_eq!(expected, 384);
                assert_eq!(found, 2);
            }
            other => panic!("expected DimensionMismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_entry_set_is_refused_and_prior_snapshot_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main.sqlite");
        let entries = vec![entry("a", "keep me", vec![1.0, 0.0])];
        write_snapshot(&path, "test-model", 2, &entries).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = write_snapshot(&path, "test-model", 2, &[]).await.unwrap_err();
        assert!(matches!(err, QaError::IndexBuild(_)));

        let after = std::fs::read(&path).unwrap();
        assert_eq!(before, after, "failed build must leave the old snapshot byte-identical");
    }

    #[tokio::test]
    async fn rebuild_replaces_prior_snapshot() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main.sqlite");

        write_snapshot(&path, "m", 2, &[entry("a", "old", vec![1.0, 0.0])])
            .await
            .unwrap();
        write_snapshot(
            &path,
            "m",
            2,
            &[
                entry("b", "new one", vec![1.0, 0.0]),
                entry("c", "new two", vec![0.0, 1.0]),
            ],
        )
        .await
        .unwrap();

        let index = load_snapshot(&path, 2).await.unwrap();
        assert_eq!(index.len(), 2);
        let hits = index.search(&[1.0, 0.0], 10);
        assert!(hits.iter().all(|h| h.text != "old"));
    }

    #[tokio::test]
    async fn wrong_dims_entry_rejected_at_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("main.sqlite");
        let entries = vec![entry("a", "a", vec![1.0, 0.0, 0.0])];
        let err = write_snapshot(&path, "m", 2, &entries).await.unwrap_err();
        assert!(matches!(err, QaError::IndexBuild(_)));
        assert!(!snapshot_exists(&path));
    }
}
