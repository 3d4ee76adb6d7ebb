use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crossbeam_channel as channel;
use refract_frontend::{potential_buddies, Frontend, SourceKinds};
use refract_vfs::{GenerationWatcher, Overlay};

use crate::event_loop::EventSender;
use crate::scheduler::{Scope, Ticket};
use crate::TaskError;

/// Runs the task against the prepared tool and reports whether it panicked.
pub(crate) type TaskFn<Fe> =
    Box<dyn FnOnce(Result<&mut <Fe as Frontend>::Tool, TaskError>) -> bool + Send>;

pub(crate) struct Job<Fe: Frontend> {
    pub(crate) ticket: Ticket,
    pub(crate) scope: Scope,
    pub(crate) overlay: Overlay,
    pub(crate) run: TaskFn<Fe>,
}

pub(crate) struct Worker<Fe: Frontend> {
    frontend: Fe,
    generation: GenerationWatcher,
    source_kinds: SourceKinds,
    /// Whole-project tool and the content generation of the overlay it was seeded with.
    project_tool: Option<(u64, Fe::Tool)>,
    events: EventSender,
}

impl<Fe: Frontend> Worker<Fe> {
    pub(crate) fn new(
        frontend: Fe,
        generation: GenerationWatcher,
        source_kinds: SourceKinds,
        events: EventSender,
    ) -> Self {
        Self {
            frontend,
            generation,
            source_kinds,
            project_tool: None,
            events,
        }
    }

    pub(crate) fn run(mut self, jobs: channel::Receiver<Job<Fe>>) {
        tracing::debug!(target: "refract.scheduler", "analysis worker started");
        for job in jobs.iter() {
            let ticket = job.ticket;
            self.execute(job);
            if !self.events.task_completed(ticket) {
                tracing::debug!(
                    target: "refract.scheduler",
                    ticket = ticket.0,
                    "event loop is gone; dropping completion"
                );
            }
        }
        tracing::debug!(target: "refract.scheduler", "analysis worker stopped");
    }

    fn execute(&mut self, job: Job<Fe>) {
        let Job {
            ticket,
            scope,
            overlay,
            run,
        } = job;
        tracing::debug!(
            target: "refract.scheduler",
            ticket = ticket.0,
            scope = ?scope,
            overlay_files = overlay.files().count(),
            "task started"
        );

        if self.generation.is_dirty_since(overlay.generation()) {
            tracing::debug!(
                target: "refract.scheduler",
                ticket = ticket.0,
                seeded = overlay.generation(),
                current = self.generation.current(),
                "content changed after the task was submitted; it runs on the submitted content"
            );
        }

        let prepared = match catch_unwind(AssertUnwindSafe(|| self.prepare(&scope, &overlay))) {
            Ok(prepared) => prepared,
            Err(panic) => {
                let message = panic_message(&*panic);
                tracing::error!(
                    target: "refract.scheduler",
                    ticket = ticket.0,
                    panic = %message,
                    "analysis tool construction panicked"
                );
                self.project_tool = None;
                Err(TaskError::Panicked(message))
            }
        };

        let panicked = match prepared {
            Ok(Some(mut tool)) => {
                overlay.seed(&mut tool);
                run(Ok(&mut tool))
            }
            Ok(None) => match self.project_tool.as_mut() {
                Some((_, tool)) => {
                    overlay.seed(tool);
                    let panicked = run(Ok(tool));
                    if panicked {
                        // The tool may have been left half-way through a run.
                        self.project_tool = None;
                    }
                    panicked
                }
                None => run(Err(TaskError::WorkerUnavailable)),
            },
            Err(err) => run(Err(err)),
        };

        tracing::debug!(
            target: "refract.scheduler",
            ticket = ticket.0,
            panicked,
            "task finished"
        );
    }

    /// Returns a dedicated tool for single-file scope, or `None` after making sure the
    /// whole-project tool is current.
    fn prepare(&mut self, scope: &Scope, overlay: &Overlay) -> Result<Option<Fe::Tool>, TaskError> {
        if let Scope::SingleFile(file) = scope {
            let db = self.frontend.compilation_database();
            let sources = if db.contains(file) {
                vec![file.clone()]
            } else {
                potential_buddies(file, db, &self.source_kinds)
            };

            if !sources.is_empty() {
                tracing::debug!(
                    target: "refract.scheduler",
                    file = %file,
                    sources = sources.len(),
                    "using single-file analysis tool"
                );
                return Ok(Some(self.frontend.create_tool(&sources)?));
            }
            tracing::debug!(
                target: "refract.scheduler",
                file = %file,
                "no compile command or buddy translation unit; using the project tool"
            );
        }

        self.ensure_project_tool(overlay.generation())?;
        Ok(None)
    }

    /// Makes sure the project tool was built for content generation `seeded`.
    ///
    /// Virtual files are only ever added to a tool, so a tool seeded at another generation may
    /// still serve buffers that were closed or replaced since.
    fn ensure_project_tool(&mut self, seeded: u64) -> Result<(), TaskError> {
        if let Some((built_at, _)) = &self.project_tool {
            if *built_at == seeded {
                return Ok(());
            }
            tracing::debug!(
                target: "refract.scheduler",
                built_at,
                seeded,
                "project tool was seeded with other content; rebuilding"
            );
        }

        // Drop the stale tool first so a failed rebuild never leaves it around.
        self.project_tool = None;
        let sources = self.frontend.compilation_database().all_files();
        let tool = self.frontend.create_tool(&sources)?;
        self.project_tool = Some((seeded, tool));
        Ok(())
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}
