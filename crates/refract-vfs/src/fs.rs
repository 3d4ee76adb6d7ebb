use std::fs;
use std::io;

use refract_core::FileIdentity;

/// File system abstraction used for files the editor does not manage.
pub trait FileSystem: Send + Sync {
    fn read_bytes(&self, file: &FileIdentity) -> io::Result<Vec<u8>>;

    fn exists(&self, file: &FileIdentity) -> bool;
}

/// Local OS file system implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn read_bytes(&self, file: &FileIdentity) -> io::Result<Vec<u8>> {
        fs::read(file.as_path())
    }

    fn exists(&self, file: &FileIdentity) -> bool {
        file.as_path().is_file()
    }
}
