use std::path::{Path, PathBuf};

use refract_core::FileIdentity;
use tempfile::TempDir;

/// A throwaway on-disk project.
pub struct TempProject {
    _dir: TempDir,
    /// Canonical spelling of the temp dir, so identities of missing files still line up with
    /// identities of existing ones.
    root: PathBuf,
}

impl TempProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = FileIdentity::new(dir.path()).into_path_buf();
        Self { _dir: dir, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Writes `text` to `rel` (creating parent directories) and returns its identity.
    pub fn write(&self, rel: &str, text: &str) -> FileIdentity {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture directory");
        }
        std::fs::write(&path, text).expect("failed to write fixture file");
        FileIdentity::new(path)
    }

    pub fn remove(&self, file: &FileIdentity) {
        std::fs::remove_file(file.as_path()).expect("failed to remove fixture file");
    }

    /// Identity of `rel` whether or not it exists.
    pub fn file(&self, rel: &str) -> FileIdentity {
        FileIdentity::new(self.root.join(rel))
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}
