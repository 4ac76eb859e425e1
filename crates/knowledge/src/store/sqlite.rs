//! SQLite persistence for chunks and their embeddings.

use crate::chunk::{Chunk, ChunkMetadata};
use chrono::{DateTime, Utc};
use ragchat_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;

/// A chunk and its vector as persisted.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

fn index_err(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Index(format!("{}: {}", context, e))
}

/// Open (and create if needed) the index database.
pub fn open_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path).map_err(index_err("Failed to open SQLite index"))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            chunk_id TEXT PRIMARY KEY,
            parent_id TEXT NOT NULL,
            parent_source TEXT NOT NULL,
            page INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            total_chunks INTEGER NOT NULL,
            text TEXT NOT NULL,
            byte_start INTEGER NOT NULL,
            byte_end INTEGER NOT NULL,
            hash TEXT NOT NULL,
            splitter TEXT NOT NULL,
            created_at TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_parent ON chunks(parent_id);
        "#,
    )
    .map_err(index_err("Failed to create tables"))?;

    tracing::debug!("Opened SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Insert chunks with their embeddings in one transaction.
pub fn insert_chunks(conn: &mut Connection, rows: &[StoredChunk]) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(index_err("Failed to begin transaction"))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO chunks (chunk_id, parent_id, parent_source, page, chunk_index, \
                 total_chunks, text, byte_start, byte_end, hash, splitter, created_at, embedding) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )
            .map_err(index_err("Failed to prepare insert"))?;

        for row in rows {
            let chunk = &row.chunk;
            stmt.execute(params![
                chunk.chunk_id,
                chunk.parent_id,
                chunk.parent_source,
                chunk.page as i64,
                chunk.chunk_index as i64,
                chunk.total_chunks as i64,
                chunk.text,
                chunk.metadata.byte_range.0 as i64,
                chunk.metadata.byte_range.1 as i64,
                chunk.metadata.hash,
                chunk.metadata.splitter_used,
                chunk.metadata.created_at.to_rfc3339(),
                embedding_to_bytes(&row.embedding),
            ])
            .map_err(index_err("Failed to insert chunk"))?;
        }
    }
    tx.commit().map_err(index_err("Failed to commit chunks"))?;

    Ok(())
}

/// Every stored chunk, in insertion order.
pub fn load_chunks(conn: &Connection) -> AppResult<Vec<StoredChunk>> {
    let mut stmt = conn
        .prepare(
            "SELECT chunk_id, parent_id, parent_source, page, chunk_index, total_chunks, text, \
             byte_start, byte_end, hash, splitter, created_at, embedding FROM chunks ORDER BY rowid",
        )
        .map_err(index_err("Failed to prepare query"))?;

    let rows = stmt
        .query_map([], |row| {
            let text: String = row.get(6)?;
            let created_at: String = row.get(11)?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
                })?;
            let blob: Vec<u8> = row.get(12)?;

            Ok(StoredChunk {
                chunk: Chunk {
                    chunk_id: row.get(0)?,
                    parent_id: row.get(1)?,
                    parent_source: row.get(2)?,
                    page: row.get::<_, i64>(3)? as u32,
                    chunk_index: row.get::<_, i64>(4)? as u32,
                    total_chunks: row.get::<_, i64>(5)? as u32,
                    metadata: ChunkMetadata {
                        byte_range: (row.get::<_, i64>(7)? as usize, row.get::<_, i64>(8)? as usize),
                        char_count: text.chars().count(),
                        hash: row.get(9)?,
                        created_at,
                        splitter_used: row.get(10)?,
                    },
                    text,
                    rerank_score: None,
                },
                embedding: bytes_to_embedding(&blob),
            })
        })
        .map_err(index_err("Failed to query chunks"))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(index_err("Failed to read chunk row"))
}

/// Serialize a vector as little-endian f32 bytes.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`embedding_to_bytes`]; trailing partial values are dropped.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
