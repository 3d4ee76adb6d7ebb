use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use refract_core::{FileIdentity, TextRange, TextSize};
use refract_frontend::{
    Access, AnalysisTool, Assignment, CompilationDatabase, DeclKind, DeclarationNode,
    ExpressionInfo, FixedCompilationDatabase, Frontend, FrontendError, Linkage, MatchCallback,
    MatchEvent, ParameterInfo, Reference, ReferenceKind, SourceLocation, SourceRange,
    TranslationUnitId, Usr,
};
use refract_vfs::{ContentSnapshot, VirtualFileSink};

use crate::fixture::{DeclSpec, ExprSpec, FixtureProject, RefKindSpec};

/// Records the sources of every tool the fixture front-end created.
#[derive(Debug, Default)]
pub struct ToolLog {
    created: Mutex<Vec<Vec<FileIdentity>>>,
}

impl ToolLog {
    pub fn created(&self) -> Vec<Vec<FileIdentity>> {
        self.created
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.created().len()
    }

    fn record(&self, sources: &[FileIdentity]) {
        self.created
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(sources.to_vec());
    }
}

/// A front-end whose "parser" locates fixture declarations by text.
pub struct FixtureFrontend {
    db: FixedCompilationDatabase,
    project: Arc<FixtureProject>,
    log: Arc<ToolLog>,
}

impl FixtureFrontend {
    /// `sources` are the main files of the compilation database.
    pub fn new(sources: impl IntoIterator<Item = FileIdentity>, project: FixtureProject) -> Self {
        Self {
            db: FixedCompilationDatabase::new("/", sources, ["c++".to_owned(), "-c".to_owned()]),
            project: Arc::new(project),
            log: Arc::default(),
        }
    }

    pub fn log(&self) -> Arc<ToolLog> {
        self.log.clone()
    }
}

impl Frontend for FixtureFrontend {
    type Tool = FixtureTool;

    fn compilation_database(&self) -> &dyn CompilationDatabase {
        &self.db
    }

    fn create_tool(&self, sources: &[FileIdentity]) -> Result<FixtureTool, FrontendError> {
        self.log.record(sources);
        Ok(FixtureTool {
            sources: sources.to_vec(),
            project: self.project.clone(),
            virtual_files: HashMap::new(),
        })
    }
}

pub struct FixtureTool {
    sources: Vec<FileIdentity>,
    project: Arc<FixtureProject>,
    virtual_files: HashMap<FileIdentity, ContentSnapshot>,
}

impl FixtureTool {
    /// Files currently served from memory.
    pub fn virtual_files(&self) -> Vec<FileIdentity> {
        let mut files: Vec<_> = self.virtual_files.keys().cloned().collect();
        files.sort();
        files
    }

    fn read(&self, file: &FileIdentity) -> Result<Vec<u8>, FrontendError> {
        if let Some(snapshot) = self.virtual_files.get(file) {
            return Ok(snapshot.bytes().to_vec());
        }
        std::fs::read(file.as_path()).map_err(|err| FrontendError::Parse {
            file: file.clone(),
            message: err.to_string(),
        })
    }

    fn parse_all(&self) -> Result<Vec<Arc<TuData>>, FrontendError> {
        self.sources
            .iter()
            .enumerate()
            .map(|(idx, source)| self.parse(TranslationUnitId(idx as u32), source))
            .collect()
    }

    fn parse(&self, id: TranslationUnitId, source: &FileIdentity) -> Result<Arc<TuData>, FrontendError> {
        let mut order = Vec::new();
        let mut texts = HashMap::new();
        self.collect_includes(source, &mut HashSet::new(), &mut order, &mut texts)?;

        let mut decls = Vec::new();
        for file in &order {
            let text = &texts[file];
            let mut located: Vec<DeclData> = self
                .project
                .decls
                .iter()
                .filter(|spec| &spec.file == file)
                .filter_map(|spec| locate_decl(spec, text))
                .collect();
            located.sort_by_key(|decl| decl.extent.range.start());
            decls.extend(located);
        }

        let mut refs = Vec::new();
        for file in &order {
            let text = &texts[file];
            for spec in self.project.refs.iter().filter(|spec| &spec.file == file) {
                let Some(target) = decls.iter().position(|d| d.spec.entity == spec.entity) else {
                    continue;
                };
                let Some(needle_start) = find(text, spec.needle.as_bytes(), 0) else {
                    continue;
                };
                let needle_end = needle_start + spec.needle.len();
                let Some(name_start) = find_word(&text[..needle_end], &spec.name, needle_start)
                else {
                    continue;
                };
                let name_end = name_start + spec.name.len();
                let kind = match &spec.kind {
                    RefKindSpec::Read => ReferenceKind::Read,
                    RefKindSpec::Call => ReferenceKind::Call,
                    RefKindSpec::Write => ReferenceKind::Write { assignment: None },
                    RefKindSpec::Assign { value } => {
                        let value_start = find(&text[..needle_end], value.as_bytes(), name_end);
                        ReferenceKind::Write {
                            assignment: value_start.map(|value_start| Assignment {
                                range: source_range(file, name_start, value_start + value.len()),
                                value_text: value.clone(),
                            }),
                        }
                    }
                };
                refs.push(RefData {
                    target,
                    range: source_range(file, name_start, name_end),
                    kind,
                });
            }
        }

        Ok(Arc::new(TuData {
            id,
            decls,
            refs,
            texts,
        }))
    }

    /// Visits `#include "..."` directives depth-first so included declarations precede the
    /// including file's own.
    fn collect_includes(
        &self,
        file: &FileIdentity,
        visited: &mut HashSet<FileIdentity>,
        order: &mut Vec<FileIdentity>,
        texts: &mut HashMap<FileIdentity, Vec<u8>>,
    ) -> Result<(), FrontendError> {
        if !visited.insert(file.clone()) {
            return Ok(());
        }
        let text = self.read(file)?;
        let dir = file
            .as_path()
            .parent()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_default();
        for line in String::from_utf8_lossy(&text).lines() {
            let Some(rest) = line.trim().strip_prefix("#include \"") else {
                continue;
            };
            let Some(name) = rest.split('"').next() else {
                continue;
            };
            let include = FileIdentity::resolve(&dir, name);
            self.collect_includes(&include, visited, order, texts)?;
        }
        order.push(file.clone());
        texts.insert(file.clone(), text);
        Ok(())
    }

    fn expression(&self, tu: &TuData, spec: &ExprSpec, range: TextRange) -> Option<ExpressionInfo> {
        let text = tu.texts.get(&spec.file)?;
        let start = u32::from(range.start()) as usize;
        let end = u32::from(range.end()) as usize;
        if text.get(start..end)? != spec.text.as_bytes() {
            return None;
        }

        let mut statement_start = None;
        let mut from = 0;
        while let Some(candidate) = find(text, spec.statement.as_bytes(), from) {
            if candidate > start {
                break;
            }
            statement_start = Some(candidate);
            from = candidate + 1;
        }
        let statement_start = statement_start?;

        let enclosing_function_redeclarations = tu
            .decls
            .iter()
            .filter(|decl| decl.spec.entity == spec.function)
            .map(|decl| (decl.extent.clone(), decl.spec.is_definition))
            .collect();

        Some(ExpressionInfo {
            range: SourceRange::new(spec.file.clone(), range),
            text: spec.text.clone(),
            type_spelling: spec.type_spelling.clone(),
            statement_start: SourceLocation::new(
                spec.file.clone(),
                TextSize::from(statement_start as u32),
            ),
            enclosing_function_redeclarations,
            free_variables: spec.free_variables.clone(),
        })
    }
}

impl VirtualFileSink for FixtureTool {
    fn map_virtual_file(&mut self, file: &FileIdentity, content: &ContentSnapshot) {
        self.virtual_files.insert(file.clone(), content.clone());
    }
}

impl AnalysisTool for FixtureTool {
    type Decl = FixtureDecl;

    fn sources(&self) -> &[FileIdentity] {
        &self.sources
    }

    fn run(&mut self, callback: &mut dyn MatchCallback<FixtureDecl>) -> Result<(), FrontendError> {
        let repeat = if self.project.duplicate_matches { 2 } else { 1 };
        for tu in self.parse_all()? {
            for _ in 0..repeat {
                for index in 0..tu.decls.len() {
                    let decl = FixtureDecl {
                        tu: tu.clone(),
                        index,
                    };
                    callback.on_match(MatchEvent::Declaration(&decl));
                }
                for data in &tu.refs {
                    let reference = Reference {
                        referenced: FixtureDecl {
                            tu: tu.clone(),
                            index: data.target,
                        },
                        range: data.range.clone(),
                        kind: data.kind.clone(),
                    };
                    callback.on_match(MatchEvent::Reference(&reference));
                }
            }
        }
        Ok(())
    }

    fn declaration_at(
        &mut self,
        location: &SourceLocation,
    ) -> Result<Option<FixtureDecl>, FrontendError> {
        for tu in self.parse_all()? {
            let covers = |range: &SourceRange| {
                range.file == location.file && range.range.contains_inclusive(location.offset)
            };
            if let Some(index) = tu.decls.iter().position(|d| covers(&d.name_range)) {
                return Ok(Some(FixtureDecl { tu, index }));
            }
            if let Some(data) = tu.refs.iter().find(|r| covers(&r.range)) {
                let index = data.target;
                return Ok(Some(FixtureDecl { tu, index }));
            }
        }
        Ok(None)
    }

    fn expression_at(
        &mut self,
        file: &FileIdentity,
        range: TextRange,
    ) -> Result<Option<ExpressionInfo>, FrontendError> {
        for tu in self.parse_all()? {
            for spec in self.project.exprs.iter().filter(|spec| &spec.file == file) {
                if let Some(info) = self.expression(&tu, spec, range) {
                    return Ok(Some(info));
                }
            }
        }
        Ok(None)
    }

    fn line_indentation(&mut self, location: &SourceLocation) -> Result<String, FrontendError> {
        let text = self.read(&location.file)?;
        let offset = (u32::from(location.offset) as usize).min(text.len());
        let line_start = text[..offset]
            .iter()
            .rposition(|&b| b == b'\n' || b == b'\r')
            .map_or(0, |pos| pos + 1);
        let indentation: Vec<u8> = text[line_start..offset]
            .iter()
            .copied()
            .take_while(|&b| b == b' ' || b == b'\t')
            .collect();
        Ok(String::from_utf8_lossy(&indentation).into_owned())
    }
}

#[derive(Debug)]
struct DeclData {
    spec: DeclSpec,
    name_range: SourceRange,
    extent: SourceRange,
    type_range: Option<SourceRange>,
    params: Vec<ParameterInfo>,
}

#[derive(Debug)]
struct RefData {
    target: usize,
    range: SourceRange,
    kind: ReferenceKind,
}

#[derive(Debug)]
struct TuData {
    id: TranslationUnitId,
    decls: Vec<DeclData>,
    refs: Vec<RefData>,
    texts: HashMap<FileIdentity, Vec<u8>>,
}

/// A declaration from one fixture parse.
#[derive(Clone)]
pub struct FixtureDecl {
    tu: Arc<TuData>,
    index: usize,
}

impl FixtureDecl {
    fn data(&self) -> &DeclData {
        &self.tu.decls[self.index]
    }

    fn same_entity(&self, entity: &str) -> impl Iterator<Item = usize> + '_ {
        let entity = entity.to_owned();
        self.tu
            .decls
            .iter()
            .enumerate()
            .filter(move |(_, d)| d.spec.entity == entity)
            .map(|(index, _)| index)
    }

    fn sibling(&self, index: usize) -> FixtureDecl {
        FixtureDecl {
            tu: self.tu.clone(),
            index,
        }
    }

    /// The fixture entity key this declaration was created from.
    pub fn entity(&self) -> &str {
        &self.data().spec.entity
    }
}

impl fmt::Debug for FixtureDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureDecl")
            .field("tu", &self.tu.id)
            .field("name", &self.data().spec.qualified_name)
            .field("location", &self.location())
            .finish()
    }
}

impl DeclarationNode for FixtureDecl {
    fn translation_unit(&self) -> TranslationUnitId {
        self.tu.id
    }

    fn kind(&self) -> DeclKind {
        self.data().spec.kind
    }

    fn location(&self) -> SourceLocation {
        self.data().name_range.start()
    }

    fn name(&self) -> String {
        self.data().spec.name.clone()
    }

    fn name_range(&self) -> SourceRange {
        self.data().name_range.clone()
    }

    fn extent(&self) -> SourceRange {
        self.data().extent.clone()
    }

    fn canonical_declaration(&self) -> Self {
        let first = self
            .same_entity(&self.data().spec.entity)
            .next()
            .unwrap_or(self.index);
        self.sibling(first)
    }

    fn redeclarations(&self) -> Vec<Self> {
        self.same_entity(&self.data().spec.entity)
            .map(|index| self.sibling(index))
            .collect()
    }

    fn linkage(&self) -> Linkage {
        self.data().spec.linkage
    }

    fn usr(&self) -> Option<Usr> {
        self.data().spec.usr.clone().map(Usr)
    }

    fn qualified_name(&self) -> String {
        self.data().spec.qualified_name.clone()
    }

    fn is_definition(&self) -> bool {
        self.data().spec.is_definition
    }

    fn type_spelling(&self) -> Option<String> {
        self.data().spec.type_text.clone()
    }

    fn type_range(&self) -> Option<SourceRange> {
        self.data().type_range.clone()
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        self.data().params.clone()
    }

    fn semantic_parent(&self) -> Option<Self> {
        let parent = self.data().spec.parent.as_deref()?;
        self.same_entity(parent).next().map(|index| self.sibling(index))
    }

    fn access(&self) -> Access {
        self.data().spec.access
    }

    fn is_static(&self) -> bool {
        self.data().spec.is_static
    }
}

fn source_range(file: &FileIdentity, start: usize, end: usize) -> SourceRange {
    SourceRange::new(
        file.clone(),
        TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32)),
    )
}

fn locate_decl(spec: &DeclSpec, text: &[u8]) -> Option<DeclData> {
    let file = &spec.file;
    let needle_start = find(text, spec.needle.as_bytes(), 0)?;
    let needle_end = needle_start + spec.needle.len();
    let needle = &text[..needle_end];

    let (type_range, name_from) = match &spec.type_text {
        Some(type_text) => {
            let start = find(needle, type_text.as_bytes(), needle_start)?;
            let end = start + type_text.len();
            (Some(source_range(file, start, end)), end)
        }
        None => (None, needle_start),
    };
    let name_start = find_word(needle, &spec.name, name_from)?;
    let name_end = name_start + spec.name.len();

    let mut params = Vec::new();
    let mut cursor = name_end;
    for param in &spec.params {
        let type_start = find(needle, param.type_text.as_bytes(), cursor)?;
        let type_end = type_start + param.type_text.len();
        let param_name_start = find_word(needle, &param.name, type_end)?;
        let param_name_end = param_name_start + param.name.len();
        cursor = param_name_end;

        let default_argument = match &param.default {
            Some(value) => {
                let eq = find(needle, b"=", cursor)?;
                let value_start = find(needle, value.as_bytes(), eq + 1)?;
                cursor = value_start + value.len();
                Some(source_range(file, value_start, cursor))
            }
            None => None,
        };

        params.push(ParameterInfo {
            name: param.name.clone(),
            type_spelling: param.type_text.clone(),
            type_range: source_range(file, type_start, type_end),
            name_range: Some(source_range(file, param_name_start, param_name_end)),
            default_argument,
        });
    }

    Some(DeclData {
        spec: spec.clone(),
        name_range: source_range(file, name_start, name_end),
        extent: source_range(file, needle_start, needle_end),
        type_range,
        params,
    })
}

fn find(hay: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > hay.len() {
        return None;
    }
    hay[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn is_ident(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Like [`find`], but only matches `word` as a whole identifier.
fn find_word(hay: &[u8], word: &str, from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(start) = find(hay, word.as_bytes(), from) {
        let end = start + word.len();
        let before_ok = start == 0 || !is_ident(hay[start - 1]);
        let after_ok = end == hay.len() || !is_ident(hay[end]);
        if before_ok && after_ok {
            return Some(start);
        }
        from = start + 1;
    }
    None
}
