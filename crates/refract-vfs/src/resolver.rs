use std::collections::HashMap;
use std::io;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use refract_core::FileIdentity;
use thiserror::Error;

use crate::documents::EditorDocuments;
use crate::fs::{FileSystem, LocalFs};
use crate::snapshot::{ContentSnapshot, VirtualFileSink};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot read {file}: {source}")]
    NotFound {
        file: FileIdentity,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    pub fn file(&self) -> &FileIdentity {
        match self {
            ResolveError::NotFound { file, .. } => file,
        }
    }
}

/// Monotonic counter bumped whenever cached content is invalidated.
///
/// Only the thread owning the [`ContentResolver`] writes it; the analysis worker reads it through
/// a [`GenerationWatcher`] to decide whether its cached analysis tool is stale.
#[derive(Debug, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Release) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn watcher(&self) -> GenerationWatcher {
        GenerationWatcher(self.0.clone())
    }
}

/// Read-only view of a [`Generation`], safe to move to the worker thread.
#[derive(Debug, Clone)]
pub struct GenerationWatcher(Arc<AtomicU64>);

impl GenerationWatcher {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// `true` if content was invalidated after `seen` was observed.
    pub fn is_dirty_since(&self, seen: u64) -> bool {
        self.current() != seen
    }
}

/// A cached editor buffer.
#[derive(Debug)]
struct CacheEntry {
    snapshot: ContentSnapshot,
    /// Set for buffer content the analysis worker has not been handed yet.
    dirty: bool,
}

/// Immutable copy of every open buffer, captured on the owning thread and shipped to the worker.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    files: Vec<(FileIdentity, ContentSnapshot)>,
    generation: u64,
}

impl Overlay {
    pub fn new(files: Vec<(FileIdentity, ContentSnapshot)>, generation: u64) -> Self {
        Self { files, generation }
    }

    /// Generation of the resolver at the moment the overlay was captured.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn files(&self) -> impl Iterator<Item = (&FileIdentity, &ContentSnapshot)> {
        self.files.iter().map(|(file, snapshot)| (file, snapshot))
    }

    pub fn get(&self, file: &FileIdentity) -> Option<&ContentSnapshot> {
        self.files
            .iter()
            .find(|(candidate, _)| candidate == file)
            .map(|(_, snapshot)| snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn seed(&self, tool: &mut dyn VirtualFileSink) {
        for (file, snapshot) in &self.files {
            tool.map_virtual_file(file, snapshot);
        }
    }
}

/// Source of the content replacements are mapped against.
pub trait ContentView {
    fn snapshot(&mut self, file: &FileIdentity) -> Result<ContentSnapshot, ResolveError>;
}

/// What an analysis tool seeded with `overlay` saw: the overlay's buffers, disk for the rest.
///
/// Buffers edited, opened or closed after the overlay was captured do not show through.
pub struct SeededView<'a, D, F = LocalFs> {
    overlay: &'a Overlay,
    resolver: &'a ContentResolver<D, F>,
}

impl<D: EditorDocuments, F: FileSystem> ContentView for SeededView<'_, D, F> {
    fn snapshot(&mut self, file: &FileIdentity) -> Result<ContentSnapshot, ResolveError> {
        match self.overlay.get(file) {
            Some(snapshot) => Ok(snapshot.clone()),
            None => self.resolver.disk_snapshot(file),
        }
    }
}

/// Maps file identities to their authoritative text.
///
/// Open editor buffers win over disk. All mutation happens on the thread that owns the editor
/// model, which is why the resolver is neither `Send` nor `Sync`; the worker only ever sees
/// [`Overlay`] copies.
pub struct ContentResolver<D, F = LocalFs> {
    documents: D,
    fs: F,
    cache: HashMap<FileIdentity, CacheEntry>,
    generation: Generation,
    _owning_thread: PhantomData<Rc<()>>,
}

impl<D: EditorDocuments> ContentResolver<D, LocalFs> {
    pub fn new(documents: D) -> Self {
        Self::with_file_system(documents, LocalFs)
    }
}

impl<D: EditorDocuments, F: FileSystem> ContentResolver<D, F> {
    pub fn with_file_system(documents: D, fs: F) -> Self {
        Self {
            documents,
            fs,
            cache: HashMap::new(),
            generation: Generation::default(),
            _owning_thread: PhantomData,
        }
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn is_open(&self, file: &FileIdentity) -> bool {
        self.documents.is_open(file)
    }

    /// Returns the editor buffer if `file` is open, otherwise the on-disk content.
    ///
    /// Only buffer content is cached. Disk content is read on every call, the same way the
    /// analysis tool reads files that are not in its overlay.
    pub fn snapshot(&mut self, file: &FileIdentity) -> Result<ContentSnapshot, ResolveError> {
        if let Some(entry) = self.cache.get(file) {
            return Ok(entry.snapshot.clone());
        }

        match self.documents.buffer_text(file) {
            Some(text) => {
                let snapshot = ContentSnapshot::new(text);
                self.cache.insert(
                    file.clone(),
                    CacheEntry {
                        snapshot: snapshot.clone(),
                        dirty: true,
                    },
                );
                Ok(snapshot)
            }
            None => self.disk_snapshot(file),
        }
    }

    /// The on-disk content of `file`, ignoring any editor buffer.
    pub fn disk_snapshot(&self, file: &FileIdentity) -> Result<ContentSnapshot, ResolveError> {
        match self.fs.read_bytes(file) {
            Ok(bytes) => Ok(ContentSnapshot::new(bytes)),
            Err(source) => {
                tracing::debug!(
                    target: "refract.vfs",
                    file = %file,
                    error = %source,
                    "failed to read file from disk"
                );
                Err(ResolveError::NotFound {
                    file: file.clone(),
                    source,
                })
            }
        }
    }

    /// Drops the cached snapshot for `file`; the next query re-fetches it.
    pub fn on_content_changed(&mut self, file: &FileIdentity) {
        self.cache.remove(file);
        let generation = self.generation.bump();
        tracing::debug!(
            target: "refract.vfs",
            file = %file,
            generation,
            "content changed; cached snapshot invalidated"
        );
    }

    /// Evicts the cache entry for a document the editor no longer manages.
    pub fn on_closed(&mut self, file: &FileIdentity) {
        let evicted = self.cache.remove(file).is_some();
        let generation = self.generation.bump();
        tracing::debug!(
            target: "refract.vfs",
            file = %file,
            evicted,
            generation,
            "document closed"
        );
    }

    /// `true` if `file` has buffer content the analysis worker has not been handed yet.
    pub fn is_dirty(&self, file: &FileIdentity) -> bool {
        self.cache.get(file).is_some_and(|entry| entry.dirty)
    }

    pub fn is_cached(&self, file: &FileIdentity) -> bool {
        self.cache.contains_key(file)
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    pub fn generation_watcher(&self) -> GenerationWatcher {
        self.generation.watcher()
    }

    /// Captures every open buffer as an immutable [`Overlay`].
    ///
    /// Open files whose buffer disappeared between listing and reading are skipped.
    pub fn overlay(&mut self) -> Overlay {
        let mut files = Vec::new();
        for file in self.documents.open_files() {
            if !self.documents.is_open(&file) {
                continue;
            }
            match self.snapshot(&file) {
                Ok(snapshot) => {
                    if let Some(entry) = self.cache.get_mut(&file) {
                        entry.dirty = false;
                    }
                    files.push((file, snapshot));
                }
                Err(err) => {
                    tracing::debug!(
                        target: "refract.vfs",
                        file = %file,
                        error = %err,
                        "skipping open file without readable content"
                    );
                }
            }
        }
        files.sort_by(|(a, _), (b, _)| a.cmp(b));
        Overlay::new(files, self.generation.current())
    }

    /// The content a tool seeded with `overlay` works on.
    pub fn seeded_view<'a>(&'a self, overlay: &'a Overlay) -> SeededView<'a, D, F> {
        SeededView {
            overlay,
            resolver: self,
        }
    }

    /// Pushes every open buffer into `tool`'s virtual file overlay.
    pub fn seed(&mut self, tool: &mut dyn VirtualFileSink) {
        self.overlay().seed(tool);
    }
}

impl<D: EditorDocuments, F: FileSystem> ContentView for ContentResolver<D, F> {
    fn snapshot(&mut self, file: &FileIdentity) -> Result<ContentSnapshot, ResolveError> {
        ContentResolver::snapshot(self, file)
    }
}
