use refract_core::FileIdentity;
use refract_frontend::{Access, DeclKind, Linkage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub type_text: String,
    pub name: String,
    pub default: Option<String>,
}

impl ParamSpec {
    pub fn new(type_text: &str, name: &str) -> Self {
        Self {
            type_text: type_text.to_owned(),
            name: name.to_owned(),
            default: None,
        }
    }

    pub fn default_argument(mut self, value: &str) -> Self {
        self.default = Some(value.to_owned());
        self
    }
}

/// A declaration, located by `needle` (which must occur exactly once in `file`).
///
/// All declarations of one translation unit that share an `entity` form a redeclaration chain;
/// the first one visible in the unit is canonical.
#[derive(Debug, Clone)]
pub struct DeclSpec {
    pub entity: String,
    pub file: FileIdentity,
    pub needle: String,
    pub name: String,
    pub kind: DeclKind,
    pub linkage: Linkage,
    pub usr: Option<String>,
    pub qualified_name: String,
    pub is_definition: bool,
    pub type_text: Option<String>,
    pub params: Vec<ParamSpec>,
    pub parent: Option<String>,
    pub access: Access,
    pub is_static: bool,
}

impl DeclSpec {
    pub fn new(kind: DeclKind, entity: &str, file: &FileIdentity, needle: &str, name: &str) -> Self {
        Self {
            entity: entity.to_owned(),
            file: file.clone(),
            needle: needle.to_owned(),
            name: name.to_owned(),
            kind,
            linkage: Linkage::External,
            usr: None,
            qualified_name: name.to_owned(),
            is_definition: false,
            type_text: None,
            params: Vec::new(),
            parent: None,
            access: Access::None,
            is_static: false,
        }
    }

    pub fn usr(mut self, usr: &str) -> Self {
        self.usr = Some(usr.to_owned());
        self
    }

    pub fn linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn qualified(mut self, qualified_name: &str) -> Self {
        self.qualified_name = qualified_name.to_owned();
        self
    }

    pub fn definition(mut self) -> Self {
        self.is_definition = true;
        self
    }

    /// The declared type; must occur in `needle` before the name.
    pub fn type_text(mut self, type_text: &str) -> Self {
        self.type_text = Some(type_text.to_owned());
        self
    }

    /// Parameters in order; each must occur in `needle` after the name.
    pub fn params(mut self, params: impl IntoIterator<Item = ParamSpec>) -> Self {
        self.params = params.into_iter().collect();
        self
    }

    pub fn parent(mut self, entity: &str) -> Self {
        self.parent = Some(entity.to_owned());
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefKindSpec {
    Read,
    Call,
    /// A store the front-end cannot rewrite as a setter call (`x += 1`, `++x`).
    Write,
    /// `name = value`; `value` must follow the name in the needle.
    Assign { value: String },
}

/// A reference to `entity`, located by the `name` occurrence inside `needle`.
#[derive(Debug, Clone)]
pub struct RefSpec {
    pub entity: String,
    pub file: FileIdentity,
    pub needle: String,
    pub name: String,
    pub kind: RefKindSpec,
}

impl RefSpec {
    pub fn new(entity: &str, file: &FileIdentity, needle: &str, name: &str) -> Self {
        Self {
            entity: entity.to_owned(),
            file: file.clone(),
            needle: needle.to_owned(),
            name: name.to_owned(),
            kind: RefKindSpec::Read,
        }
    }

    pub fn kind(mut self, kind: RefKindSpec) -> Self {
        self.kind = kind;
        self
    }
}

/// An extractable expression.
#[derive(Debug, Clone)]
pub struct ExprSpec {
    pub file: FileIdentity,
    /// The exact expression text.
    pub text: String,
    pub type_spelling: String,
    /// Text the enclosing statement starts with.
    pub statement: String,
    /// Entity of the enclosing function.
    pub function: String,
    pub free_variables: Vec<(String, String)>,
}

impl ExprSpec {
    pub fn new(
        file: &FileIdentity,
        text: &str,
        type_spelling: &str,
        statement: &str,
        function: &str,
    ) -> Self {
        Self {
            file: file.clone(),
            text: text.to_owned(),
            type_spelling: type_spelling.to_owned(),
            statement: statement.to_owned(),
            function: function.to_owned(),
            free_variables: Vec::new(),
        }
    }

    pub fn free_variable(mut self, type_spelling: &str, name: &str) -> Self {
        self.free_variables
            .push((type_spelling.to_owned(), name.to_owned()));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixtureProject {
    pub decls: Vec<DeclSpec>,
    pub refs: Vec<RefSpec>,
    pub exprs: Vec<ExprSpec>,
    /// Report every match twice, like two matcher patterns hitting the same node.
    pub duplicate_matches: bool,
}

impl FixtureProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decl(mut self, decl: DeclSpec) -> Self {
        self.decls.push(decl);
        self
    }

    pub fn reference(mut self, reference: RefSpec) -> Self {
        self.refs.push(reference);
        self
    }

    pub fn expr(mut self, expr: ExprSpec) -> Self {
        self.exprs.push(expr);
        self
    }

    pub fn duplicate_matches(mut self) -> Self {
        self.duplicate_matches = true;
        self
    }
}
