//! Identifier and hash helpers.

use sha2::{Digest, Sha256};

/// Parent id used when a source has no usable file name.
pub const UNKNOWN_PARENT: &str = "unknown_document";

/// Calculate SHA-256 hash of text.
pub fn calculate_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Parent id for a URL or path: the basename up to its first `.`.
///
/// `https://host/docs/Rules.pdf?dl=1` and `/tmp/Rules.pdf` both give `Rules`.
pub fn parent_id_for(source: &str) -> String {
    let without_query = source.split('?').next().unwrap_or(source);
    let trimmed = without_query.trim_end_matches(|c: char| c == '/' || c == '\\');
    let basename = trimmed
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(trimmed);
    let stem = basename.split('.').next().unwrap_or("");

    if stem.trim().is_empty() {
        UNKNOWN_PARENT.to_string()
    } else {
        stem.to_string()
    }
}

/// Deterministic chunk id.
pub fn chunk_id_for(parent_id: &str, page: u32, chunk_index: u32) -> String {
    format!("{}_p{}_c{}", parent_id, page, chunk_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_hash() {
        let hash = calculate_hash("Hello, world!");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, calculate_hash("Hello, world!"));
        assert_ne!(hash, calculate_hash("Different text"));
    }

    #[test]
    fn test_parent_id_for() {
        assert_eq!(parent_id_for("https://example.com/docs/Rules.pdf"), "Rules");
        assert_eq!(parent_id_for("https://example.com/Rules.pdf?download=1"), "Rules");
        assert_eq!(parent_id_for("documents/Cookbook.v2.pdf"), "Cookbook");
        assert_eq!(parent_id_for("C:\\docs\\Manual.pdf"), "Manual");
        assert_eq!(parent_id_for("Rules"), "Rules");
        assert_eq!(parent_id_for(""), UNKNOWN_PARENT);
        assert_eq!(parent_id_for("https://example.com/"), "example");
        assert_eq!(parent_id_for("/tmp/.hidden"), UNKNOWN_PARENT);
    }

    #[test]
    fn test_chunk_id_for() {
        assert_eq!(chunk_id_for("Rules", 2, 7), "Rules_p2_c7");
    }
}
