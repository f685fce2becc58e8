use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// Name of the extracted source directory inside a scratch area
pub const SOURCE_DIR: &str = "source";

/// Per-invocation scratch directory, removed when dropped
#[derive(Debug)]
pub struct ScratchArea {
    dir: TempDir,
}

impl ScratchArea {
    /// Allocates a fresh, uniquely named directory under `root`
    pub fn acquire(root: &Path, invocation_id: Uuid) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("invocation-{}-", invocation_id.simple()))
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The working tree; its root does not exist until extraction creates it
    pub fn working_tree(&self) -> WorkingTree {
        WorkingTree::new(self.path().join(SOURCE_DIR))
    }

    /// Removes the scratch directory, reporting failures instead of ignoring them
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTree {
    root: PathBuf,
}

impl WorkingTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_is_unique_and_cleaned_up() {
        let root = tempfile::TempDir::new().unwrap();
        let id = Uuid::new_v4();

        let first = ScratchArea::acquire(root.path(), id).unwrap();
        let second = ScratchArea::acquire(root.path(), id).unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(root.path()));

        let first_path = first.path().to_path_buf();
        first.close().unwrap();
        drop(second);

        assert!(!first_path.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_working_tree_starts_absent() {
        let root = tempfile::TempDir::new().unwrap();
        let scratch = ScratchArea::acquire(root.path(), Uuid::new_v4()).unwrap();

        let tree = scratch.working_tree();
        assert_eq!(tree.root(), scratch.path().join("source"));
        assert!(!tree.root().exists());
    }

    #[test]
    fn test_acquire_creates_missing_root() {
        let base = tempfile::TempDir::new().unwrap();
        let root = base.path().join("nested/scratch");

        let scratch = ScratchArea::acquire(&root, Uuid::new_v4()).unwrap();
        assert!(scratch.path().is_dir());
    }
}
