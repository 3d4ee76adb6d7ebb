use std::fmt;

use refract_core::{FileIdentity, TextRange, TextSize};

/// Identifies one parse of one translation unit inside an analysis tool.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TranslationUnitId(pub u32);

/// A lexical position as reported by the front-end.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceLocation {
    pub file: FileIdentity,
    pub offset: TextSize,
}

impl SourceLocation {
    pub fn new(file: FileIdentity, offset: impl Into<TextSize>) -> Self {
        Self {
            file,
            offset: offset.into(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.file, u32::from(self.offset))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRange {
    pub file: FileIdentity,
    pub range: TextRange,
}

impl SourceRange {
    pub fn new(file: FileIdentity, range: TextRange) -> Self {
        Self { file, range }
    }

    pub fn start(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.range.start())
    }
}

/// A universal symbol reference: a mangling-derived name that is stable for the same entity
/// across independent parses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usr(pub String);

impl Usr {
    pub fn new(usr: impl Into<String>) -> Self {
        Self(usr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Linkage {
    /// Locals, parameters and members of local classes.
    None,
    /// `static` functions/variables and anything in an anonymous namespace.
    Internal,
    /// External linkage, but the entity can only be named from one translation unit (e.g. a
    /// member of a class declared in an anonymous namespace).
    UniqueExternal,
    External,
}

impl Linkage {
    pub fn is_external(self) -> bool {
        matches!(self, Linkage::External)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Variable,
    Field,
    Function,
    Method,
    Parameter,
    Record,
    Other,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Access {
    Public,
    Protected,
    Private,
    #[default]
    None,
}

impl Access {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Access::Public => Some("public"),
            Access::Protected => Some("protected"),
            Access::Private => Some("private"),
            Access::None => None,
        }
    }
}

/// Per-parameter ranges of a function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: String,
    pub type_spelling: String,
    pub type_range: SourceRange,
    pub name_range: Option<SourceRange>,
    /// Range of the default argument expression, excluding the `=`.
    pub default_argument: Option<SourceRange>,
}

/// A declaration node from one parse of one translation unit.
///
/// Nodes from different parses never share identity at the Rust level; deciding whether two of
/// them denote the same program entity is the job of the identity resolver.
pub trait DeclarationNode: Clone + fmt::Debug {
    fn translation_unit(&self) -> TranslationUnitId;

    fn kind(&self) -> DeclKind;

    /// Location of the declared name.
    fn location(&self) -> SourceLocation;

    fn name(&self) -> String;

    fn name_range(&self) -> SourceRange;

    /// The full declaration, from its first token to its last.
    fn extent(&self) -> SourceRange;

    /// The representative of all redeclarations of this entity within the same parse.
    fn canonical_declaration(&self) -> Self;

    /// Every redeclaration of this entity within the same parse, including `self`.
    fn redeclarations(&self) -> Vec<Self>;

    fn linkage(&self) -> Linkage;

    /// `None` when the front-end cannot produce a universal symbol reference for this
    /// declaration kind.
    fn usr(&self) -> Option<Usr>;

    fn qualified_name(&self) -> String;

    fn is_definition(&self) -> bool;

    /// Spelling and range of the declared type, if the declaration has one.
    fn type_spelling(&self) -> Option<String> {
        None
    }

    fn type_range(&self) -> Option<SourceRange> {
        None
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        Vec::new()
    }

    /// The enclosing record for fields and methods.
    fn semantic_parent(&self) -> Option<Self> {
        None
    }

    fn access(&self) -> Access {
        Access::None
    }

    fn is_static(&self) -> bool {
        false
    }
}
