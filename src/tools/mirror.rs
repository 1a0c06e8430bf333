use crate::github::FileUnit;
use std::io;
use std::path::{Component, Path};
use tempfile::TempDir;
use tracing::warn;

/// Write the changed files into a scratch directory, preserving their
/// repository-relative layout, so tools can run against real paths.
/// The directory is removed when the returned guard drops.
pub fn materialize(files: &[FileUnit]) -> io::Result<TempDir> {
    let dir = tempfile::Builder::new().prefix("autorev-").tempdir()?;

    for file in files {
        if !is_clean_relative(&file.path) {
            warn!(
                "Skipping {} (path would escape the mirror)",
                file.path.display()
            );
            continue;
        }
        let dest = dir.path().join(&file.path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, &file.content)?;
    }

    Ok(dir)
}

/// Only plain relative components are allowed. `..`, absolute paths and
/// drive prefixes would let a hostile filename write outside the mirror.
fn is_clean_relative(path: &Path) -> bool {
    let mut components = path.components();
    let clean = components.by_ref().all(|c| matches!(c, Component::Normal(_)));
    clean && path.components().next().is_some()
}
