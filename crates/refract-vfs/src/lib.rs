//! Content resolution for refract.
//!
//! The VFS is responsible for:
//! - Reading files from the OS file system.
//! - Tracking editor buffers, which take precedence over disk.
//! - Handing immutable snapshots of open buffers to the analysis worker as a virtual overlay.

mod documents;
mod fs;
mod resolver;
mod snapshot;

pub use documents::{DocumentStore, EditorDocuments};
pub use fs::{FileSystem, LocalFs};
pub use refract_core::FileIdentity;
pub use resolver::{
    ContentResolver, ContentView, Generation, GenerationWatcher, Overlay, ResolveError,
    SeededView,
};
pub use snapshot::{ContentSnapshot, VirtualFileSink};
