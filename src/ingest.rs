//! Staging directory ingestion.
//!
//! Scans the flat staging directory, dispatches each file to a format
//! extractor by extension, and collects raw per-document text. Unsupported
//! extensions and per-file extraction failures are recorded with a notice
//! and skipped so the rest of the batch completes.

use anyhow::{Context, Result};
use std::path::Path;

use crate::extract;
use crate::models::{IngestReport, RawDocument, SkippedFile};

/// Read every staged file and extract its text.
///
/// Document order follows the directory listing and is platform-dependent;
/// callers must not rely on it. A missing staging directory is treated the
/// same as an empty one.
pub fn load_staged(staging_dir: &Path) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    if !staging_dir.exists() {
        return Ok(report);
    }

    let entries = std::fs::read_dir(staging_dir).with_context(|| {
        format!(
            "Failed to read staging directory: {}",
            staging_dir.display()
        )
    })?;

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let filename = entry.file_name().to_string_lossy().to_string();

        let format = match extract::format_for_path(&path) {
            Some(format) => format,
            None => {
                let reason = "unsupported file extension".to_string();
                eprintln!("skipped {}: {}", filename, reason);
                report.skipped.push(SkippedFile { filename, reason });
                continue;
            }
        };

        match extract::extract_document(&path, format) {
            Ok(text) => report.documents.push(RawDocument {
                filename,
                format,
                text,
            }),
            Err(e) => {
                let reason = e.to_string();
                eprintln!("skipped {}: {}", filename, reason);
                report.skipped.push(SkippedFile { filename, reason });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn txt_files_are_ingested_verbatim() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("facts.txt"), "The capital of France is Paris.").unwrap();

        let report = load_staged(tmp.path()).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert!(report.skipped.is_empty());
        assert_eq!(report.documents[0].filename, "facts.txt");
        assert_eq!(report.documents[0].text, "The capital of France is Paris.");
    }

    #[test]
    fn unsupported_extension_is_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("table.csv"), "a,b,c").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "useful notes").unwrap();

        let report = load_staged(tmp.path()).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].filename, "table.csv");
        assert!(report.skipped[0].reason.contains("unsupported"));
    }

    #[test]
    fn corrupt_pdf_is_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("broken.pdf"), "not actually a pdf").unwrap();
        std::fs::write(tmp.path().join("good.txt"), "still readable").unwrap();

        let report = load_staged(tmp.path()).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].filename, "broken.pdf");
    }

    #[test]
    fn missing_staging_dir_yields_empty_report() {
        let tmp = TempDir::new().unwrap();
        let report = load_staged(&tmp.path().join("nothing-here")).unwrap();
        assert!(report.documents.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn subdirectories_are_ignored() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("top.txt"), "top level").unwrap();

        let report = load_staged(tmp.path()).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert!(report.skipped.is_empty());
    }
}
