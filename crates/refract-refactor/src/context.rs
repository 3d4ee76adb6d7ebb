use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::rc::Rc;

use refract_core::{apply_editor_changes, group_by_file, FileIdentity, LineCol, TextSize};
use refract_frontend::{Frontend, RawReplacement};
use refract_scheduler::{
    BusyIndicator, ContentSource, Scheduler, SchedulerConfig, TaskError, Ticket,
};
use refract_vfs::{
    ContentResolver, EditorDocuments, FileSystem, GenerationWatcher, LocalFs, Overlay,
};

use crate::materialize::{to_editor_changes, ChangeSet};
use crate::refactorings::Refactoring;
use crate::RefactorError;

/// Where user-facing messages go.
pub trait Reporter {
    fn report_error(&self, message: &str);
    fn report_information(&self, message: &str);
}

/// Sends user-facing messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report_error(&self, message: &str) {
        tracing::error!(target: "refract.refactor", "{message}");
    }

    fn report_information(&self, message: &str) {
        tracing::info!(target: "refract.refactor", "{message}");
    }
}

/// The overlay taken at submission time, so no resolver borrow outlives the call.
struct Captured {
    overlay: Overlay,
    watcher: GenerationWatcher,
}

impl ContentSource for Captured {
    fn overlay(&mut self) -> Overlay {
        self.overlay.clone()
    }

    fn generation_watcher(&self) -> GenerationWatcher {
        self.watcher.clone()
    }
}

/// Ties the content resolver, the scheduler and the replacement translator together for one
/// editor session. Lives on the thread that owns the editor model.
pub struct RefactoringContext<Fe, D, F = LocalFs>
where
    Fe: Frontend,
    D: EditorDocuments + 'static,
    F: FileSystem + 'static,
{
    resolver: Rc<RefCell<ContentResolver<D, F>>>,
    scheduler: Scheduler<Fe>,
    reporter: Rc<dyn Reporter>,
}

impl<Fe, D, F> RefactoringContext<Fe, D, F>
where
    Fe: Frontend,
    D: EditorDocuments + 'static,
    F: FileSystem + 'static,
{
    pub fn new(
        frontend: Fe,
        resolver: ContentResolver<D, F>,
        reporter: Rc<dyn Reporter>,
        config: SchedulerConfig,
    ) -> io::Result<Self> {
        let scheduler = Scheduler::new(frontend, &resolver, config)?;
        Ok(Self {
            resolver: Rc::new(RefCell::new(resolver)),
            scheduler,
            reporter,
        })
    }

    pub fn resolver(&self) -> &Rc<RefCell<ContentResolver<D, F>>> {
        &self.resolver
    }

    pub fn scheduler(&self) -> &Scheduler<Fe> {
        &self.scheduler
    }

    /// Byte offset of an editor cursor position in the file's current content.
    pub fn offset(&self, file: &FileIdentity, line: u32, column: u32) -> Result<TextSize, RefactorError> {
        let snapshot = self.resolver.borrow_mut().snapshot(file)?;
        snapshot
            .to_byte_offset(LineCol { line, column })
            .ok_or_else(|| RefactorError::InvalidPosition {
                file: file.clone(),
                line,
                column,
            })
    }

    pub fn document_changed(&self, file: &FileIdentity) {
        self.resolver.borrow_mut().on_content_changed(file);
    }

    pub fn document_closed(&self, file: &FileIdentity) {
        self.resolver.borrow_mut().on_closed(file);
    }

    pub fn report_error(&self, message: &str) {
        self.reporter.report_error(message);
    }

    pub fn report_information(&self, message: &str) {
        self.reporter.report_information(message);
    }

    pub fn schedule<T, Task, Callback>(&self, task: Task, callback: Callback) -> Ticket
    where
        T: Send + 'static,
        Task: FnOnce(&mut Fe::Tool) -> T + Send + 'static,
        Callback: FnOnce(Result<T, TaskError>) + 'static,
    {
        let mut content = self.capture();
        self.scheduler.schedule(&mut content, task, callback)
    }

    pub fn schedule_on_single_file<T, Task, Callback>(
        &self,
        file: FileIdentity,
        task: Task,
        callback: Callback,
    ) -> Ticket
    where
        T: Send + 'static,
        Task: FnOnce(&mut Fe::Tool) -> T + Send + 'static,
        Callback: FnOnce(Result<T, TaskError>) + 'static,
    {
        let mut content = self.capture();
        self.scheduler
            .schedule_on_single_file(&mut content, file, task, callback)
    }

    /// Computes `refactoring`'s replacements while the editor keeps processing events.
    ///
    /// A cancelled refactoring yields no replacements.
    pub fn schedule_refactoring_blocking(
        &self,
        refactoring: Refactoring,
        indicator: &mut dyn BusyIndicator,
    ) -> Result<Vec<RawReplacement>, RefactorError> {
        self.compute_blocking(refactoring, indicator).1
    }

    /// Computes and translates `refactoring` without blocking; `on_done` runs on this thread.
    ///
    /// Replacements are mapped against the content the analysis tool was seeded with, even if
    /// buffers changed while it ran. Failures are reported before `on_done` sees them.
    pub fn refactor(
        &self,
        refactoring: Refactoring,
        on_done: impl FnOnce(Result<ChangeSet, RefactorError>) + 'static,
    ) -> Ticket {
        let name = refactoring.name();
        let resolver = self.resolver.clone();
        let reporter = self.reporter.clone();
        let mut content = self.capture();
        let seeded = content.overlay.clone();
        self.scheduler.schedule(
            &mut content,
            move |tool| refactoring.compute(tool),
            move |result: Result<Result<Vec<RawReplacement>, RefactorError>, TaskError>| {
                on_done(finish(&resolver, &seeded, &*reporter, name, settle(result)))
            },
        )
    }

    /// Like [`RefactoringContext::refactor`], but waits for the change set.
    pub fn refactor_blocking(
        &self,
        refactoring: Refactoring,
        indicator: &mut dyn BusyIndicator,
    ) -> Result<ChangeSet, RefactorError> {
        let name = refactoring.name();
        let (seeded, replacements) = self.compute_blocking(refactoring, indicator);
        finish(&self.resolver, &seeded, &*self.reporter, name, replacements)
    }

    /// The content every touched file would have after applying `changes`.
    pub fn preview(&self, changes: &ChangeSet) -> Result<BTreeMap<FileIdentity, Vec<u8>>, RefactorError> {
        let mut out = BTreeMap::new();
        for (file, file_changes) in group_by_file(&changes.changes) {
            let snapshot = self.resolver.borrow_mut().snapshot(&file)?;
            let text = apply_editor_changes(snapshot.bytes(), snapshot.end_of_line(), &file_changes)?;
            out.insert(file, text);
        }
        Ok(out)
    }

    /// Runs `refactoring` on the worker and returns the overlay it was seeded with alongside its
    /// replacements.
    fn compute_blocking(
        &self,
        refactoring: Refactoring,
        indicator: &mut dyn BusyIndicator,
    ) -> (Overlay, Result<Vec<RawReplacement>, RefactorError>) {
        let title = refactoring.name();
        let mut content = self.capture();
        let seeded = content.overlay.clone();
        let result = self
            .scheduler
            .schedule_blocking(&mut content, title, indicator, move |tool| {
                refactoring.compute(tool)
            });
        (seeded, settle(result))
    }

    fn capture(&self) -> Captured {
        let mut resolver = self.resolver.borrow_mut();
        Captured {
            overlay: resolver.overlay(),
            watcher: resolver.generation_watcher(),
        }
    }
}

fn settle(
    result: Result<Result<Vec<RawReplacement>, RefactorError>, TaskError>,
) -> Result<Vec<RawReplacement>, RefactorError> {
    match result {
        Ok(Err(RefactorError::Cancelled)) => {
            tracing::debug!(target: "refract.refactor", "refactoring cancelled");
            Ok(Vec::new())
        }
        Ok(replacements) => replacements,
        Err(err) => Err(err.into()),
    }
}

fn finish<D, F>(
    resolver: &RefCell<ContentResolver<D, F>>,
    seeded: &Overlay,
    reporter: &dyn Reporter,
    name: &str,
    replacements: Result<Vec<RawReplacement>, RefactorError>,
) -> Result<ChangeSet, RefactorError>
where
    D: EditorDocuments,
    F: FileSystem,
{
    let resolver = resolver.borrow();
    let outcome = replacements.and_then(|replacements| {
        to_editor_changes(replacements, &mut resolver.seeded_view(seeded))
    });
    match &outcome {
        Ok(set) => {
            for err in &set.errors {
                reporter.report_information(&format!("{name}: skipped a change: {err}"));
            }
            if !set.is_empty() && resolver.generation() != seeded.generation() {
                tracing::debug!(
                    target: "refract.refactor",
                    seeded = seeded.generation(),
                    current = resolver.generation(),
                    "content changed while the refactoring was computed"
                );
                reporter.report_information(&format!(
                    "{name}: files changed while the refactoring was computed; \
                     the changes refer to the earlier content"
                ));
            }
        }
        Err(err) => reporter.report_error(&format!("{name} failed: {err}")),
    }
    outcome
}
