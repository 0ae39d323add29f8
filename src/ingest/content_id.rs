// src/ingest/content_id.rs
use sha2::{Digest, Sha256};

/// Stable item id for a source entry identifier: lowercase hex SHA-256.
/// Total over all inputs, including the empty string.
pub fn content_id(source_id: &str) -> String {
    let digest = Sha256::digest(source_id.as_bytes());
    format!("{digest:x}")
}
