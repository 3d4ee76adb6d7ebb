//! Boundary to the C/C++ front-end.
//!
//! refract never parses C/C++ itself. Everything it needs from a front-end (declaration nodes,
//! match callbacks, replacements, the compilation database) is described here as traits and
//! plain data, so any front-end that can parse translation units and emit byte-offset
//! replacements can drive the refactoring engine.

mod buddies;
mod database;
mod decl;
mod error;
mod replacement;
mod tool;

pub use buddies::{potential_buddies, SourceKinds};
pub use database::{
    CompilationDatabase, CompileCommand, FixedCompilationDatabase, JsonCompilationDatabase,
    COMPILE_COMMANDS_FILE,
};
pub use decl::{
    Access, DeclKind, DeclarationNode, Linkage, ParameterInfo, SourceLocation, SourceRange,
    TranslationUnitId, Usr,
};
pub use error::FrontendError;
pub use replacement::RawReplacement;
pub use tool::{
    AnalysisTool, Assignment, ExpressionInfo, Frontend, MatchCallback, MatchEvent, Reference,
    ReferenceKind,
};
