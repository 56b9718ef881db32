//! Filesystem writer: puts reconstructed files on disk under an output
//! root, creating intermediate directories and refusing to step outside
//! the root or clobber existing files without permission.

use crate::error::SliceError;
use crate::slicer::ReconstructedFile;
use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};

/// Write one reconstructed file under `root`.
///
/// The declared path was already validated at parse time; this re-checks
/// containment on the joined path so the writer is safe even when called
/// with paths from another producer.
pub fn write_reconstructed(
    root: &Path,
    file: &ReconstructedFile,
    overwrite: bool,
) -> Result<PathBuf> {
    let rel = Path::new(&file.path);
    if rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        bail!(SliceError::PathTraversal(file.path.clone()));
    }

    let target = root.join(rel);
    if target.exists() && !overwrite {
        bail!(SliceError::WriteConflict(file.path.clone()));
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(&target, &file.content)
        .with_context(|| format!("Failed to write file: {}", target.display()))?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(path: &str, content: &str) -> ReconstructedFile {
        ReconstructedFile {
            path: path.to_string(),
            content: content.to_string(),
            parts_merged: 1,
            overlap_bytes_removed: 0,
        }
    }

    #[test]
    fn creates_intermediate_directories() {
        let tmp = TempDir::new().unwrap();
        let written =
            write_reconstructed(tmp.path(), &file("deep/nested/dir/x.txt", "hi\n"), false)
                .unwrap();
        assert_eq!(std::fs::read_to_string(written).unwrap(), "hi\n");
    }

    #[test]
    fn refuses_existing_without_overwrite() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("x.txt"), "old").unwrap();

        let err = write_reconstructed(tmp.path(), &file("x.txt", "new"), false).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));
        // Original content untouched.
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("x.txt")).unwrap(),
            "old"
        );

        write_reconstructed(tmp.path(), &file("x.txt", "new"), true).unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("x.txt")).unwrap(),
            "new"
        );
    }

    #[test]
    fn rejects_traversal_even_if_parser_was_bypassed() {
        let tmp = TempDir::new().unwrap();
        let err =
            write_reconstructed(tmp.path(), &file("../outside.txt", "x"), true).unwrap_err();
        assert!(err.to_string().contains("escape the output root"));
        assert!(err.downcast_ref::<SliceError>().is_some());
    }

    #[test]
    fn writes_empty_file() {
        let tmp = TempDir::new().unwrap();
        let written = write_reconstructed(tmp.path(), &file("empty.py", ""), false).unwrap();
        assert_eq!(std::fs::metadata(written).unwrap().len(), 0);
    }
}
