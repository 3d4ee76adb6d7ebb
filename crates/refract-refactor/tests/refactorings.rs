use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use refract_core::{FileIdentity, LineCol, TextRange, TextSize};
use refract_frontend::{Access, DeclKind, Linkage, SourceLocation};
use refract_refactor::{
    ChangeSet, ChangeSignature, EncapsulateField, ExtractFunction, ExtractVariable,
    RefactorError, RefactoringContext, RenameDeclaration, Reporter,
};
use refract_scheduler::{NoopBusyIndicator, SchedulerConfig};
use refract_test_utils::{
    DeclSpec, ExprSpec, FixtureFrontend, FixtureProject, ParamSpec, RefKindSpec, RefSpec,
    TempProject,
};
use refract_vfs::{ContentResolver, DocumentStore};

#[derive(Default)]
struct RecordingReporter {
    errors: RefCell<Vec<String>>,
    information: RefCell<Vec<String>>,
}

impl Reporter for RecordingReporter {
    fn report_error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_owned());
    }

    fn report_information(&self, message: &str) {
        self.information.borrow_mut().push(message.to_owned());
    }
}

struct Session {
    _project: TempProject,
    documents: Arc<DocumentStore>,
    reporter: Rc<RecordingReporter>,
    ctx: RefactoringContext<FixtureFrontend, Arc<DocumentStore>>,
}

fn start(project: TempProject, sources: &[FileIdentity], fixture: FixtureProject) -> Session {
    let documents = Arc::new(DocumentStore::new());
    let reporter = Rc::new(RecordingReporter::default());
    let ctx = RefactoringContext::new(
        FixtureFrontend::new(sources.iter().cloned(), fixture),
        ContentResolver::new(documents.clone()),
        reporter.clone(),
        SchedulerConfig::default(),
    )
    .expect("start refactoring context");
    Session {
        _project: project,
        documents,
        reporter,
        ctx,
    }
}

fn at(file: &FileIdentity, text: &str, needle: &str) -> SourceLocation {
    let offset = text.find(needle).expect("needle in fixture text");
    SourceLocation::new(file.clone(), TextSize::from(offset as u32))
}

fn range_of(text: &str, needle: &str) -> TextRange {
    let offset = text.find(needle).expect("needle in fixture text") as u32;
    TextRange::at(offset.into(), TextSize::from(needle.len() as u32))
}

fn preview(session: &Session, changes: &ChangeSet) -> BTreeMap<FileIdentity, String> {
    session
        .ctx
        .preview(changes)
        .unwrap()
        .into_iter()
        .map(|(file, bytes)| (file, String::from_utf8(bytes).unwrap()))
        .collect()
}

const BAR_H: &str = "int bar(int a, char* b, int c = 10);\n";
const BAR_CPP: &str = "#include \"bar.h\"\n\nint bar(int a, char* b, int c)\n{\n    return a + c;\n}\n";

fn bar_project() -> (TempProject, FileIdentity, FileIdentity, FixtureProject) {
    let project = TempProject::new();
    let header = project.write("bar.h", BAR_H);
    let source = project.write("bar.cpp", BAR_CPP);
    let usr = "c:@F@bar#I#*C#I#";
    let fixture = FixtureProject::new()
        .decl(
            DeclSpec::new(DeclKind::Function, "bar", &header, BAR_H.trim_end(), "bar")
                .usr(usr)
                .type_text("int")
                .params([
                    ParamSpec::new("int", "a"),
                    ParamSpec::new("char*", "b"),
                    ParamSpec::new("int", "c").default_argument("10"),
                ]),
        )
        .decl(
            DeclSpec::new(
                DeclKind::Function,
                "bar",
                &source,
                "int bar(int a, char* b, int c)\n{",
                "bar",
            )
            .usr(usr)
            .definition()
            .type_text("int")
            .params([
                ParamSpec::new("int", "a"),
                ParamSpec::new("char*", "b"),
                ParamSpec::new("int", "c"),
            ]),
        );
    (project, header, source, fixture)
}

#[test]
fn change_signature_retypes_declaration_and_definition_but_not_defaults() {
    let (project, header, source, fixture) = bar_project();
    let session = start(project, &[source.clone()], fixture);

    let refactoring = ChangeSignature::new(at(&header, BAR_H, "bar")).retype(0, "char");
    let changes = session
        .ctx
        .refactor_blocking(refactoring.into(), &mut NoopBusyIndicator)
        .unwrap();

    assert_eq!(changes.changes.len(), 2);
    assert!(changes.changes.iter().all(|c| c.new_text == "char"));
    assert!(changes.changes.iter().all(|c| c.ignore_old_text));

    let files = preview(&session, &changes);
    assert_eq!(files[&header], "int bar(char a, char* b, int c = 10);\n");
    assert_eq!(
        files[&source],
        "#include \"bar.h\"\n\nint bar(char a, char* b, int c)\n{\n    return a + c;\n}\n"
    );
}

#[test]
fn replacements_are_mapped_against_the_edited_buffer() {
    let project = TempProject::new();
    let disk = "int total = 0;\nint use() { return total; }\n";
    let main = project.write("main.cpp", disk);
    let fixture = FixtureProject::new()
        .decl(
            DeclSpec::new(DeclKind::Variable, "total", &main, "int total = 0;", "total")
                .usr("c:@total"),
        )
        .reference(RefSpec::new("total", &main, "return total;", "total"));
    let session = start(project, &[main.clone()], fixture);

    let buffer = "// edited\r\nint total = 0;\r\nint use() { return total; }\r\n";
    session.documents.open(main.clone(), buffer.as_bytes());
    session.ctx.document_changed(&main);

    let rename = RenameDeclaration::new(at(&main, buffer, "total"), "sum");
    let changes = session
        .ctx
        .refactor_blocking(rename.into(), &mut NoopBusyIndicator)
        .unwrap();

    assert_eq!(changes.changes.len(), 2);
    assert_eq!(changes.changes[0].range.start, LineCol { line: 1, column: 4 });
    assert_eq!(changes.changes[1].range.start, LineCol { line: 2, column: 19 });
    assert_eq!(
        preview(&session, &changes)[&main],
        "// edited\r\nint sum = 0;\r\nint use() { return sum; }\r\n"
    );
}

#[test]
fn nodes_visited_twice_produce_one_change() {
    let project = TempProject::new();
    let text = "static int hits;\nvoid hit() { hits += 1; }\n";
    let main = project.write("main.cpp", text);
    let fixture = FixtureProject::new()
        .decl(
            DeclSpec::new(DeclKind::Variable, "hits", &main, "static int hits;", "hits")
                .linkage(Linkage::Internal),
        )
        .reference(RefSpec::new("hits", &main, "hits += 1", "hits").kind(RefKindSpec::Write))
        .duplicate_matches();
    let session = start(project, &[main.clone()], fixture);

    let rename = RenameDeclaration::new(at(&main, text, "hits"), "count");
    let replacements = session
        .ctx
        .schedule_refactoring_blocking(rename.clone().into(), &mut NoopBusyIndicator)
        .unwrap();
    assert_eq!(replacements.len(), 4);

    let changes = session
        .ctx
        .refactor_blocking(rename.into(), &mut NoopBusyIndicator)
        .unwrap();
    assert_eq!(changes.changes.len(), 2);
}

const SHARED_H: &str = "int shared_value();\n";
const A_CPP: &str = "#include \"shared.h\"\nint shared_value() { return 1; }\n";
const B_CPP: &str = "#include \"shared.h\"\nint twice() { return 2 * shared_value(); }\n";

#[test]
fn rename_follows_universal_references_across_translation_units() {
    let project = TempProject::new();
    let header = project.write("shared.h", SHARED_H);
    let a = project.write("a.cpp", A_CPP);
    let b = project.write("b.cpp", B_CPP);
    let usr = "c:@F@shared_value#";
    let fixture = FixtureProject::new()
        .decl(
            DeclSpec::new(DeclKind::Function, "shared", &header, "int shared_value();", "shared_value")
                .usr(usr),
        )
        .decl(
            DeclSpec::new(DeclKind::Function, "shared", &a, "int shared_value() {", "shared_value")
                .usr(usr)
                .definition(),
        )
        .reference(
            RefSpec::new("shared", &b, "shared_value();", "shared_value").kind(RefKindSpec::Call),
        );
    let session = start(project, &[a.clone(), b.clone()], fixture);

    // Started from the call site in the other translation unit.
    let rename = RenameDeclaration::new(at(&b, B_CPP, "shared_value"), "common_value");
    let changes = session
        .ctx
        .refactor_blocking(rename.into(), &mut NoopBusyIndicator)
        .unwrap();

    let files = preview(&session, &changes);
    assert_eq!(files.len(), 3);
    assert_eq!(files[&header], "int common_value();\n");
    assert_eq!(
        files[&a],
        "#include \"shared.h\"\nint common_value() { return 1; }\n"
    );
    assert_eq!(
        files[&b],
        "#include \"shared.h\"\nint twice() { return 2 * common_value(); }\n"
    );
}

// Known limitation: a declaration whose front-end cannot produce a universal reference is not
// unified with a declaration in another translation unit that has one, even when both name the
// same external entity. This pins the current behavior.
#[test]
fn forward_declaration_without_universal_reference_is_not_unified_across_units() {
    let project = TempProject::new();
    let a_text = "int legacy();\nint legacy() { return 0; }\n";
    let b_text = "int legacy();\nint caller() { return legacy(); }\n";
    let a = project.write("a.cpp", a_text);
    let b = project.write("b.cpp", b_text);
    let fixture = FixtureProject::new()
        .decl(
            DeclSpec::new(DeclKind::Function, "legacy", &a, "int legacy();", "legacy")
                .usr("c:@F@legacy#"),
        )
        .decl(
            DeclSpec::new(DeclKind::Function, "legacy", &a, "int legacy() {", "legacy")
                .usr("c:@F@legacy#")
                .definition(),
        )
        .decl(DeclSpec::new(DeclKind::Function, "legacy_fwd", &b, "int legacy();", "legacy"))
        .reference(
            RefSpec::new("legacy_fwd", &b, "return legacy();", "legacy").kind(RefKindSpec::Call),
        );
    let session = start(project, &[a.clone(), b.clone()], fixture);

    let rename = RenameDeclaration::new(at(&a, a_text, "legacy"), "modern");
    let changes = session
        .ctx
        .refactor_blocking(rename.into(), &mut NoopBusyIndicator)
        .unwrap();

    let files = preview(&session, &changes);
    assert_eq!(files.keys().collect::<Vec<_>>(), vec![&a]);
    assert_eq!(files[&a], "int modern();\nint modern() { return 0; }\n");
}

const UTIL_H: &str = "static int helper() { return 1; }\n";
const USES_A_CPP: &str = "#include \"util.h\"\nint first() { return 0; }\n";
const USES_B_CPP: &str = "#include \"util.h\"\nint second() { return helper(); }\n";

#[test]
fn rename_of_internal_function_from_second_unit_finds_its_own_copy() {
    let project = TempProject::new();
    let header = project.write("util.h", UTIL_H);
    let a = project.write("a.cpp", USES_A_CPP);
    let b = project.write("b.cpp", USES_B_CPP);
    let fixture = FixtureProject::new()
        .decl(
            DeclSpec::new(DeclKind::Function, "helper", &header, "static int helper()", "helper")
                .linkage(Linkage::Internal)
                .definition(),
        )
        .reference(
            RefSpec::new("helper", &b, "return helper();", "helper").kind(RefKindSpec::Call),
        );
    let session = start(project, &[a, b.clone()], fixture);

    // a.cpp is parsed first; its copy of the header must not decide for b.cpp's.
    let rename = RenameDeclaration::new(at(&b, USES_B_CPP, "helper"), "assist");
    let changes = session
        .ctx
        .refactor_blocking(rename.into(), &mut NoopBusyIndicator)
        .unwrap();

    assert_eq!(changes.changes.len(), 2);
    let files = preview(&session, &changes);
    assert_eq!(files[&header], "static int assist() { return 1; }\n");
    assert_eq!(
        files[&b],
        "#include \"util.h\"\nint second() { return assist(); }\n"
    );
}

#[test]
fn buffer_edits_during_a_refactoring_do_not_shift_its_changes() {
    let project = TempProject::new();
    let text = "int total = 0;\nint use() { return total; }\n";
    let main = project.write("main.cpp", text);
    let fixture = FixtureProject::new()
        .decl(
            DeclSpec::new(DeclKind::Variable, "total", &main, "int total = 0;", "total")
                .usr("c:@total"),
        )
        .reference(RefSpec::new("total", &main, "return total;", "total"));
    let session = start(project, &[main.clone()], fixture);
    session.documents.open(main.clone(), text.as_bytes());
    session.ctx.document_changed(&main);

    let delivered = Rc::new(RefCell::new(None));
    session.ctx.refactor(
        RenameDeclaration::new(at(&main, text, "total"), "sum").into(),
        {
            let delivered = delivered.clone();
            move |result| *delivered.borrow_mut() = Some(result)
        },
    );

    let typed = format!("// typed meanwhile\n{text}");
    session.documents.update(&main, typed.as_bytes());
    session.ctx.document_changed(&main);
    while session.ctx.scheduler().pending_tasks() > 0 {
        session.ctx.scheduler().wait_for_event(Duration::from_secs(5));
    }

    let changes = delivered.borrow_mut().take().unwrap().unwrap();
    let starts: Vec<LineCol> = changes.changes.iter().map(|c| c.range.start).collect();
    assert_eq!(
        starts,
        vec![LineCol { line: 0, column: 4 }, LineCol { line: 1, column: 19 }]
    );
    let information = session.reporter.information.borrow();
    assert_eq!(information.len(), 1);
    assert!(information[0].starts_with("Rename: files changed"));
}

const AREA_H: &str = "int area(int w, int h);\n";
const AREA_CPP: &str = "#include \"area.h\"\n\nint area(int w, int h)\n{\n    int r = w * h + 1;\n    return r;\n}\n";

fn area_project() -> (TempProject, FileIdentity, FileIdentity, FixtureProject) {
    let project = TempProject::new();
    let header = project.write("area.h", AREA_H);
    let source = project.write("area.cpp", AREA_CPP);
    let usr = "c:@F@area#I#I#";
    let fixture = FixtureProject::new()
        .decl(DeclSpec::new(DeclKind::Function, "area", &header, "int area(int w, int h);", "area").usr(usr))
        .decl(
            DeclSpec::new(DeclKind::Function, "area", &source, "int area(int w, int h)\n{", "area")
                .usr(usr)
                .definition(),
        )
        .expr(
            ExprSpec::new(&source, "w * h", "int", "int r = ", "area")
                .free_variable("int", "w")
                .free_variable("int", "h"),
        );
    (project, header, source, fixture)
}

#[test]
fn extract_variable_declares_before_the_statement() {
    let (project, _header, source, fixture) = area_project();
    let session = start(project, &[source.clone()], fixture);

    let extract = ExtractVariable::new(source.clone(), range_of(AREA_CPP, "w * h"), "product");
    let changes = session
        .ctx
        .refactor_blocking(extract.into(), &mut NoopBusyIndicator)
        .unwrap();

    assert_eq!(
        preview(&session, &changes)[&source],
        "#include \"area.h\"\n\nint area(int w, int h)\n{\n    int product = w * h;\n    int r = product + 1;\n    return r;\n}\n"
    );
}

#[test]
fn extract_function_defines_and_forward_declares() {
    let (project, header, source, fixture) = area_project();
    let session = start(project, &[source.clone()], fixture);

    let extract = ExtractFunction::new(source.clone(), range_of(AREA_CPP, "w * h"), "multiply");
    let changes = session
        .ctx
        .refactor_blocking(extract.into(), &mut NoopBusyIndicator)
        .unwrap();

    let files = preview(&session, &changes);
    assert_eq!(
        files[&header],
        "int multiply(int w, int h);\nint area(int w, int h);\n"
    );
    assert_eq!(
        files[&source],
        "#include \"area.h\"\n\nint multiply(int w, int h)\n{\n    return w * h;\n}\n\nint area(int w, int h)\n{\n    int r = multiply(w, h) + 1;\n    return r;\n}\n"
    );
}

const COUNTER_H: &str = "\
class Counter
{
public:
    void bump() { m_count += 1; }
    void reset() { m_count = 0; }
    int read() const { return m_count; }

private:
    int m_count;
};
";

#[test]
fn encapsulate_field_routes_reads_and_assignments_through_accessors() {
    let project = TempProject::new();
    let header = project.write("counter.h", COUNTER_H);
    let source = project.write("counter.cpp", "#include \"counter.h\"\n");
    let fixture = FixtureProject::new()
        .decl(DeclSpec::new(DeclKind::Record, "Counter", &header, "class Counter", "Counter"))
        .decl(
            DeclSpec::new(DeclKind::Field, "m_count", &header, "int m_count;", "m_count")
                .usr("c:@S@Counter@FI@m_count")
                .qualified("Counter::m_count")
                .type_text("int")
                .parent("Counter")
                .access(Access::Private),
        )
        .reference(
            RefSpec::new("m_count", &header, "m_count += 1", "m_count").kind(RefKindSpec::Write),
        )
        .reference(
            RefSpec::new("m_count", &header, "m_count = 0", "m_count").kind(RefKindSpec::Assign {
                value: "0".to_owned(),
            }),
        )
        .reference(RefSpec::new("m_count", &header, "return m_count;", "m_count"));
    let session = start(project, &[source], fixture);

    let encapsulate = EncapsulateField::new(at(&header, COUNTER_H, "m_count;"), "m_count");
    let changes = session
        .ctx
        .refactor_blocking(encapsulate.into(), &mut NoopBusyIndicator)
        .unwrap();

    assert_eq!(
        preview(&session, &changes)[&header],
        "\
class Counter
{
public:
    void bump() { m_count += 1; }
    void reset() { setCount(0); }
    int read() const { return getCount(); }

private:
public:
    const int &getCount() const { return m_count; }
    void setCount(const int &value) { m_count = value; }
private:
    int m_count;
};
"
    );
}

#[test]
fn failed_refactoring_is_reported_and_changes_nothing() {
    let (project, header, source, fixture) = bar_project();
    let session = start(project, &[source], fixture);

    let nowhere = SourceLocation::new(header.clone(), TextSize::from(BAR_H.len() as u32 - 1));
    let err = session
        .ctx
        .refactor_blocking(RenameDeclaration::new(nowhere, "baz").into(), &mut NoopBusyIndicator)
        .unwrap_err();

    assert!(matches!(err, RefactorError::TargetNotFound(_)));
    assert_eq!(session.reporter.errors.borrow().len(), 1);
    assert!(session.reporter.errors.borrow()[0].starts_with("Rename failed"));
}

#[test]
fn cancelled_refactoring_yields_no_replacements() {
    let (project, header, source, fixture) = bar_project();
    let session = start(project, &[source], fixture);

    let replacements = session
        .ctx
        .schedule_refactoring_blocking(
            RenameDeclaration::new(at(&header, BAR_H, "bar"), "").into(),
            &mut NoopBusyIndicator,
        )
        .unwrap();
    assert!(replacements.is_empty());
    assert!(session.reporter.errors.borrow().is_empty());
}

#[test]
fn asynchronous_refactoring_delivers_changes_on_the_owning_thread() {
    let (project, header, source, fixture) = bar_project();
    let session = start(project, &[source], fixture);

    let delivered = Rc::new(RefCell::new(None));
    session.ctx.refactor(
        RenameDeclaration::new(at(&header, BAR_H, "bar"), "baz").into(),
        {
            let delivered = delivered.clone();
            move |result| *delivered.borrow_mut() = Some(result)
        },
    );
    while session.ctx.scheduler().pending_tasks() > 0 {
        session.ctx.scheduler().wait_for_event(Duration::from_secs(5));
    }

    let changes = delivered.borrow_mut().take().unwrap().unwrap();
    assert_eq!(changes.changes.len(), 2);
    assert!(changes.changes.iter().all(|c| c.new_text == "baz"));
}

#[test]
fn cursor_positions_translate_through_the_open_buffer() {
    let (project, header, source, fixture) = bar_project();
    let session = start(project, &[source], fixture);
    session
        .documents
        .open(header.clone(), "// note\r\nint bar();\r\n".as_bytes());
    session.ctx.document_changed(&header);

    assert_eq!(session.ctx.offset(&header, 1, 4).unwrap(), TextSize::from(13));
    assert!(matches!(
        session.ctx.offset(&header, 7, 0),
        Err(RefactorError::InvalidPosition { line: 7, .. })
    ));
}
