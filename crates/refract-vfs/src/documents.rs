use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use refract_core::FileIdentity;

/// The editor's document model, seen from the content resolver.
pub trait EditorDocuments {
    /// `true` if the editor currently manages `file`.
    fn is_open(&self, file: &FileIdentity) -> bool;

    /// The current buffer text, or `None` if `file` is not open.
    fn buffer_text(&self, file: &FileIdentity) -> Option<Arc<[u8]>>;

    /// All files the editor currently manages.
    fn open_files(&self) -> Vec<FileIdentity>;
}

impl<T: EditorDocuments + ?Sized> EditorDocuments for Arc<T> {
    fn is_open(&self, file: &FileIdentity) -> bool {
        (**self).is_open(file)
    }

    fn buffer_text(&self, file: &FileIdentity) -> Option<Arc<[u8]>> {
        (**self).buffer_text(file)
    }

    fn open_files(&self) -> Vec<FileIdentity> {
        (**self).open_files()
    }
}

/// In-memory editor buffers keyed by file identity.
///
/// Hosts that do not have their own document model (and tests) use this directly. Changing the
/// store does not notify anyone; the host is expected to forward the change to
/// [`crate::ContentResolver::on_content_changed`] / [`crate::ContentResolver::on_closed`].
#[derive(Debug, Default)]
pub struct DocumentStore {
    inner: Mutex<BTreeMap<FileIdentity, Arc<[u8]>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    fn lock_inner(&self) -> MutexGuard<'_, BTreeMap<FileIdentity, Arc<[u8]>>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(err) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    target: "refract.vfs",
                    file = loc.file(),
                    line = loc.line(),
                    column = loc.column(),
                    error = %err,
                    "mutex poisoned; continuing with recovered guard"
                );
                err.into_inner()
            }
        }
    }

    pub fn open(&self, file: FileIdentity, text: impl Into<Arc<[u8]>>) {
        self.lock_inner().insert(file, text.into());
    }

    /// Replaces the buffer text of an open document. Returns `false` if it is not open.
    pub fn update(&self, file: &FileIdentity, text: impl Into<Arc<[u8]>>) -> bool {
        match self.lock_inner().get_mut(file) {
            Some(slot) => {
                *slot = text.into();
                true
            }
            None => false,
        }
    }

    pub fn close(&self, file: &FileIdentity) -> bool {
        self.lock_inner().remove(file).is_some()
    }
}

impl EditorDocuments for DocumentStore {
    fn is_open(&self, file: &FileIdentity) -> bool {
        self.lock_inner().contains_key(file)
    }

    fn buffer_text(&self, file: &FileIdentity) -> Option<Arc<[u8]>> {
        self.lock_inner().get(file).cloned()
    }

    fn open_files(&self) -> Vec<FileIdentity> {
        self.lock_inner().keys().cloned().collect()
    }
}
