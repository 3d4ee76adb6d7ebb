use refract_core::{FileIdentity, TextRange};
use refract_vfs::VirtualFileSink;

use crate::database::CompilationDatabase;
use crate::decl::{DeclarationNode, SourceLocation, SourceRange};
use crate::error::FrontendError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// From the start of the assigned member name to the end of the assigned value.
    pub range: SourceRange,
    pub value_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    Read,
    /// A plain `lhs = value` store. Compound assignments and increments are reported as
    /// `Write { assignment: None }`.
    Write { assignment: Option<Assignment> },
    Call,
}

/// A use of a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<D> {
    pub referenced: D,
    /// The range of the referring name token.
    pub range: SourceRange,
    pub kind: ReferenceKind,
}

#[derive(Debug)]
pub enum MatchEvent<'a, D> {
    Declaration(&'a D),
    Reference(&'a Reference<D>),
}

/// Receives every node the tool's matchers visit. The same node may be visited more than once.
pub trait MatchCallback<D> {
    fn on_match(&mut self, event: MatchEvent<'_, D>);
}

impl<D, F> MatchCallback<D> for F
where
    F: FnMut(MatchEvent<'_, D>),
{
    fn on_match(&mut self, event: MatchEvent<'_, D>) {
        self(event)
    }
}

/// A selected expression, as seen by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionInfo {
    pub range: SourceRange,
    pub text: String,
    pub type_spelling: String,
    /// Start of the statement containing the expression; where a new variable is declared.
    pub statement_start: SourceLocation,
    /// Every redeclaration of the function containing the expression, as
    /// `(extent, is_definition)`; where extracted functions are declared.
    pub enclosing_function_redeclarations: Vec<(SourceRange, bool)>,
    /// Local declarations the expression uses, as `(type, name)`, in order of first use.
    pub free_variables: Vec<(String, String)>,
}

/// A front-end tool parsing a fixed set of translation units.
///
/// Tools are built, seeded and run on the analysis worker only.
pub trait AnalysisTool: VirtualFileSink {
    type Decl: DeclarationNode;

    /// The main source files this tool parses.
    fn sources(&self) -> &[FileIdentity];

    /// Parses every source (using any mapped virtual files) and reports every declaration and
    /// reference to `callback`.
    fn run(&mut self, callback: &mut dyn MatchCallback<Self::Decl>) -> Result<(), FrontendError>;

    /// The declaration whose name covers `location`, if any.
    fn declaration_at(
        &mut self,
        location: &SourceLocation,
    ) -> Result<Option<Self::Decl>, FrontendError>;

    /// The expression exactly covering `range` in `file`, if any.
    fn expression_at(
        &mut self,
        file: &FileIdentity,
        range: TextRange,
    ) -> Result<Option<ExpressionInfo>, FrontendError>;

    /// Leading whitespace of the line containing `location`, in the tool's view of the file.
    fn line_indentation(&mut self, location: &SourceLocation) -> Result<String, FrontendError>;
}

/// Creates analysis tools and exposes the project's compilation database.
///
/// A front-end is moved onto the analysis worker when the scheduler starts.
pub trait Frontend: Send + 'static {
    type Tool: AnalysisTool;

    fn compilation_database(&self) -> &dyn CompilationDatabase;

    fn create_tool(&self, sources: &[FileIdentity]) -> Result<Self::Tool, FrontendError>;
}
