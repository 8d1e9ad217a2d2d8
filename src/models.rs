//! Core data models used throughout docqa.
//!
//! These types represent the documents, chunks, and results that flow
//! through the build and query pipelines.

use std::path::PathBuf;

/// Declared format of a staged document, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    /// Returns the format for a file extension (case-insensitive), or
    /// `None` for unsupported extensions.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "txt" => Some(DocumentFormat::Text),
            _ => None,
        }
    }
}

/// A staged document after text extraction, before chunking.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub filename: String,
    pub format: DocumentFormat,
    pub text: String,
}

/// A chunk of a document's extracted text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Filename of the document this chunk was cut from.
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A staged file that ingestion skipped, with the reason it was skipped.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// Outcome of scanning the staging directory.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: Vec<RawDocument>,
    pub skipped: Vec<SkippedFile>,
}

/// Outcome of a successful index build.
#[derive(Debug)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedFile>,
    pub snapshot: PathBuf,
}

/// One retrieval result: a chunk text and its similarity to the query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub source: String,
    pub text: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("Docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("txt"), Some(DocumentFormat::Text));
    }

    #[test]
    fn unsupported_extension_is_none() {
        assert_eq!(DocumentFormat::from_extension("csv"), None);
        assert_eq!(DocumentFormat::from_extension(""), None);
    }
}
