//! Refactorings on top of the refract coordination layer.
//!
//! A [`Refactoring`] computes raw replacements on the analysis worker, matching declarations
//! across translation units with the [`IdentityResolver`]. Back on the owning thread the
//! replacements are translated into editor changes against the same content the tool was
//! seeded with ([`to_editor_changes`]). [`RefactoringContext`] wires the two halves together.

mod change_signature;
mod context;
mod encapsulate;
mod error;
mod extract;
pub mod identity;
mod materialize;
mod refactorings;
mod rename;

pub use change_signature::{ChangeSignature, ParameterChange};
pub use context::{LogReporter, RefactoringContext, Reporter};
pub use encapsulate::{AccessorStyle, EncapsulateField};
pub use error::RefactorError;
pub use extract::{ExtractFunction, ExtractVariable};
pub use identity::{equivalent, IdentityCache, IdentityResolver};
pub use materialize::{to_editor_changes, ChangeSet};
pub use refactorings::{suggest_getter_name, suggest_setter_name, Refactoring};
pub use rename::RenameDeclaration;
