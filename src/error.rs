//! Flow-level error taxonomy.
//!
//! Every failure that crosses the pipeline boundary is one of these kinds,
//! and each `Display` message is written to be shown to the user as-is.
//! Per-file ingestion problems are not represented here — they are
//! swallowed with a notice so a batch completes (see [`crate::ingest`]).

use std::path::PathBuf;

/// Errors surfaced by the build and query flows.
#[derive(Debug)]
pub enum QaError {
    /// The staging directory produced no chunks to index.
    EmptyDocumentSet,
    /// No snapshot exists under the configured name; the user must build first.
    IndexNotFound(PathBuf),
    /// Index rebuild failed; any previous snapshot is untouched.
    IndexBuild(String),
    /// A snapshot's vectors do not match the active embedding model.
    DimensionMismatch { expected: usize, found: usize },
    /// Embedding the query failed.
    Embedding(String),
    /// The answer backend failed or timed out.
    Generation(String),
}

impl std::fmt::Display for QaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QaError::EmptyDocumentSet => write!(
                f,
                "no valid documents found in the staging directory; upload PDF, DOCX, or TXT files and rebuild the index"
            ),
            QaError::IndexNotFound(path) => write!(
                f,
                "no index snapshot found at {}; build the index before asking questions",
                path.display()
            ),
            QaError::IndexBuild(msg) => write!(
                f,
                "index build failed: {} (the previous snapshot, if any, is unchanged)",
                msg
            ),
            QaError::DimensionMismatch { expected, found } => write!(
                f,
                "snapshot holds {}-dimensional vectors but the configured embedding model produces {}; rebuild the index",
                found, expected
            ),
            QaError::Embedding(msg) => write!(f, "query embedding failed: {}", msg),
            QaError::Generation(msg) => write!(f, "answer generation failed: {}", msg),
        }
    }
}

impl std::error::Error for QaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_displayable() {
        let err = QaError::IndexNotFound(PathBuf::from("/tmp/index/main.sqlite"));
        let msg = err.to_string();
        assert!(msg.contains("main.sqlite"));
        assert!(msg.contains("build the index"));
    }

    #[test]
    fn dimension_mismatch_names_both_sizes() {
        let err = QaError::DimensionMismatch {
            expected: 384,
            found: 768,
        };
        let msg = err.to_string();
        assert!(msg.contains("384"));
        assert!(msg.contains("768"));
    }
}
