//! Staging directory management.
//!
//! Uploaded files land in a flat directory under their original filenames.
//! Re-uploading a same-named file overwrites it in place. Staging is
//! independent of the index: adding files does not trigger a rebuild.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// A file currently sitting in the staging directory.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub name: String,
    pub bytes: u64,
}

/// Copy files into the staging directory, preserving filenames and
/// overwriting any existing file of the same name. Returns the number of
/// files staged.
pub fn stage_files(staging_dir: &Path, files: &[PathBuf]) -> Result<usize> {
    std::fs::create_dir_all(staging_dir).with_context(|| {
        format!(
            "Failed to create staging directory: {}",
            staging_dir.display()
        )
    })?;

    let mut staged = 0usize;
    for file in files {
        if !file.is_file() {
            bail!("Not a file: {}", file.display());
        }
        let name = file
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid filename: {}", file.display()))?;
        std::fs::copy(file, staging_dir.join(name))
            .with_context(|| format!("Failed to stage {}", file.display()))?;
        staged += 1;
    }
    Ok(staged)
}

/// Write raw bytes into the staging directory under `name`. Used by the
/// HTTP upload endpoint, which receives file content inline.
pub fn stage_bytes(staging_dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    // Filenames come from the uploader; keep them inside the staging dir.
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        bail!("Invalid upload filename: {:?}", name);
    }
    std::fs::create_dir_all(staging_dir).with_context(|| {
        format!(
            "Failed to create staging directory: {}",
            staging_dir.display()
        )
    })?;
    std::fs::write(staging_dir.join(name), bytes)
        .with_context(|| format!("Failed to stage {}", name))?;
    Ok(())
}

/// List staged files, sorted by name for stable display.
pub fn list_staged(staging_dir: &Path) -> Result<Vec<StagedFile>> {
    if !staging_dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(staging_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        files.push(StagedFile {
            name: entry.file_name().to_string_lossy().to_string(),
            bytes: entry.metadata()?.len(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stage_copies_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let staging = tmp.path().join("staging");
        std::fs::create_dir_all(&src).unwrap();

        let file = src.join("doc.txt");
        std::fs::write(&file, "first version").unwrap();
        assert_eq!(stage_files(&staging, &[file.clone()]).unwrap(), 1);

        std::fs::write(&file, "second version").unwrap();
        assert_eq!(stage_files(&staging, &[file]).unwrap(), 1);

        let content = std::fs::read_to_string(staging.join("doc.txt")).unwrap();
        assert_eq!(content, "second version");

        let listed = list_staged(&staging).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "doc.txt");
    }

    #[test]
    fn stage_bytes_rejects_path_traversal() {
        let tmp = TempDir::new().unwrap();
        assert!(stage_bytes(tmp.path(), "../escape.txt", b"x").is_err());
        assert!(stage_bytes(tmp.path(), "a/b.txt", b"x").is_err());
        assert!(stage_bytes(tmp.path(), "", b"x").is_err());
        assert!(stage_bytes(tmp.path(), "ok.txt", b"x").is_ok());
    }

    #[test]
    fn listing_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(list_staged(&missing).unwrap().is_empty());
    }
}
