use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use refract_core::FileIdentity;
use refract_frontend::{Frontend, SourceKinds};
use refract_vfs::{ContentResolver, EditorDocuments, FileSystem, GenerationWatcher, Overlay};

use crate::event_loop::{Event, EventLoop, EventSender};
use crate::progress::BusyIndicator;
use crate::worker::{panic_message, Job, TaskFn, Worker};
use crate::TaskError;

/// Identifies a scheduled task. Tickets increase in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

/// Which translation units the task's analysis tool parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every file in the compilation database.
    Project,
    /// Just the file (or, for files without a compile command, the translation units that
    /// probably include it). Falls back to [`Scope::Project`] when neither exists.
    SingleFile(FileIdentity),
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub worker_thread_name: String,
    /// How long a blocking wait sleeps on the event queue before checking on the worker.
    pub blocking_poll_interval: Duration,
    pub source_kinds: SourceKinds,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_thread_name: "refract-analysis".to_owned(),
            blocking_poll_interval: Duration::from_millis(50),
            source_kinds: SourceKinds::default(),
        }
    }
}

/// Where scheduled tasks get the editor buffers they are seeded with.
pub trait ContentSource {
    /// Immutable copy of every open buffer.
    fn overlay(&mut self) -> Overlay;

    fn generation_watcher(&self) -> GenerationWatcher;
}

impl<D: EditorDocuments, F: FileSystem> ContentSource for ContentResolver<D, F> {
    fn overlay(&mut self) -> Overlay {
        ContentResolver::overlay(self)
    }

    fn generation_watcher(&self) -> GenerationWatcher {
        ContentResolver::generation_watcher(self)
    }
}

type Completion = Box<dyn FnOnce()>;

/// Owning-thread handle to the analysis worker.
///
/// The scheduler is deliberately `!Send`: it is created on the thread that owns the editor
/// model, and every callback it runs is delivered on that thread from [`Scheduler::process_events`]
/// (or while a blocking task waits).
pub struct Scheduler<Fe: Frontend> {
    jobs: Option<channel::Sender<Job<Fe>>>,
    worker: Option<thread::JoinHandle<()>>,
    events: EventLoop,
    pending: RefCell<HashMap<Ticket, Completion>>,
    next_ticket: Cell<u64>,
    poll_interval: Duration,
}

impl<Fe: Frontend> Scheduler<Fe> {
    /// Moves `frontend` onto a freshly spawned worker thread.
    pub fn new(
        frontend: Fe,
        content: &dyn ContentSource,
        config: SchedulerConfig,
    ) -> io::Result<Self> {
        let events = EventLoop::new();
        let (jobs_tx, jobs_rx) = channel::unbounded::<Job<Fe>>();
        let generation = content.generation_watcher();
        let source_kinds = config.source_kinds;
        let completions = events.sender();
        // The worker (and every tool it builds) lives and dies on the worker thread.
        let handle = thread::Builder::new()
            .name(config.worker_thread_name)
            .spawn(move || {
                Worker::new(frontend, generation, source_kinds, completions).run(jobs_rx)
            })?;

        Ok(Self {
            jobs: Some(jobs_tx),
            worker: Some(handle),
            events,
            pending: RefCell::new(HashMap::new()),
            next_ticket: Cell::new(1),
            poll_interval: config.blocking_poll_interval,
        })
    }

    /// Lets other threads queue work for the owning thread.
    pub fn event_sender(&self) -> EventSender {
        self.events.sender()
    }

    /// Runs `task` against a tool covering the whole project.
    ///
    /// Returns immediately. `callback` runs later on this thread, exactly once.
    pub fn schedule<T, Task, Callback>(
        &self,
        content: &mut dyn ContentSource,
        task: Task,
        callback: Callback,
    ) -> Ticket
    where
        T: Send + 'static,
        Task: FnOnce(&mut Fe::Tool) -> T + Send + 'static,
        Callback: FnOnce(Result<T, TaskError>) + 'static,
    {
        self.submit(Scope::Project, content.overlay(), task, callback)
    }

    /// Like [`Scheduler::schedule`], but the tool only parses `file` (or its buddies).
    pub fn schedule_on_single_file<T, Task, Callback>(
        &self,
        content: &mut dyn ContentSource,
        file: FileIdentity,
        task: Task,
        callback: Callback,
    ) -> Ticket
    where
        T: Send + 'static,
        Task: FnOnce(&mut Fe::Tool) -> T + Send + 'static,
        Callback: FnOnce(Result<T, TaskError>) + 'static,
    {
        self.submit(Scope::SingleFile(file), content.overlay(), task, callback)
    }

    /// Runs `task` with project scope and waits for its result.
    ///
    /// The wait keeps dispatching this thread's events (including other tasks' callbacks and
    /// host events), so the editor stays responsive while the operation looks synchronous to
    /// the caller.
    pub fn schedule_blocking<T, Task>(
        &self,
        content: &mut dyn ContentSource,
        title: &str,
        indicator: &mut dyn BusyIndicator,
        task: Task,
    ) -> Result<T, TaskError>
    where
        T: Send + 'static,
        Task: FnOnce(&mut Fe::Tool) -> T + Send + 'static,
    {
        let slot: Rc<RefCell<Option<Result<T, TaskError>>>> = Rc::new(RefCell::new(None));
        let ticket = self.schedule(content, task, {
            let slot = slot.clone();
            move |result| *slot.borrow_mut() = Some(result)
        });

        indicator.begin(title);
        let result = loop {
            if let Some(result) = slot.borrow_mut().take() {
                break result;
            }
            match self.events.next_timeout(self.poll_interval) {
                Some(event) => self.dispatch(event),
                None => {
                    indicator.tick();
                    if self.worker_exited() {
                        // Nothing will post this completion any more; deliver what there is.
                        self.complete(ticket);
                    }
                }
            }
        };
        indicator.end();
        result
    }

    /// Dispatches every queued event. Returns the number of events handled.
    pub fn process_events(&self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.events.try_next() {
            self.dispatch(event);
            handled += 1;
        }
        handled
    }

    /// Blocks until at least one event arrived (or `timeout` elapsed) and dispatches it.
    pub fn wait_for_event(&self, timeout: Duration) -> bool {
        match self.events.next_timeout(timeout) {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Number of tasks whose callback has not run yet.
    pub fn pending_tasks(&self) -> usize {
        self.pending.borrow().len()
    }

    fn worker_exited(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(true, |worker| worker.is_finished())
    }

    fn submit<T, Task, Callback>(
        &self,
        scope: Scope,
        overlay: Overlay,
        task: Task,
        callback: Callback,
    ) -> Ticket
    where
        T: Send + 'static,
        Task: FnOnce(&mut Fe::Tool) -> T + Send + 'static,
        Callback: FnOnce(Result<T, TaskError>) + 'static,
    {
        let ticket = Ticket(self.next_ticket.get());
        self.next_ticket.set(ticket.0 + 1);

        let (result_tx, result_rx) = channel::bounded::<Result<T, TaskError>>(1);
        let run: TaskFn<Fe> = Box::new(move |tool: Result<&mut Fe::Tool, TaskError>| -> bool {
            let result = match tool {
                Ok(tool) => match catch_unwind(AssertUnwindSafe(|| task(tool))) {
                    Ok(value) => Ok(value),
                    Err(panic) => {
                        let message = panic_message(&*panic);
                        tracing::error!(
                            target: "refract.scheduler",
                            ticket = ticket.0,
                            panic = %message,
                            "task panicked"
                        );
                        Err(TaskError::Panicked(message))
                    }
                },
                Err(err) => Err(err),
            };
            let panicked = matches!(result, Err(TaskError::Panicked(_)));
            let _ = result_tx.send(result);
            panicked
        });

        self.pending.borrow_mut().insert(
            ticket,
            Box::new(move || {
                // A disconnected channel means the job was dropped without running.
                let result = result_rx
                    .try_recv()
                    .unwrap_or(Err(TaskError::WorkerUnavailable));
                callback(result);
            }),
        );

        let job = Job {
            ticket,
            scope,
            overlay,
            run,
        };
        let sent = match &self.jobs {
            Some(jobs) => jobs.send(job).is_ok(),
            None => false,
        };
        if !sent {
            tracing::warn!(
                target: "refract.scheduler",
                ticket = ticket.0,
                "analysis worker is not running; failing task"
            );
            self.events.sender().task_completed(ticket);
        }

        tracing::debug!(target: "refract.scheduler", ticket = ticket.0, "task scheduled");
        ticket
    }

    fn dispatch(&self, event: Event) {
        match event {
            Event::TaskCompleted(ticket) => self.complete(ticket),
            Event::Host(f) => f(),
        }
    }

    fn complete(&self, ticket: Ticket) {
        // Release the borrow before running the callback; it may schedule more work.
        let completion = self.pending.borrow_mut().remove(&ticket);
        match completion {
            Some(completion) => completion(),
            None => tracing::debug!(
                target: "refract.scheduler",
                ticket = ticket.0,
                "completion for unknown ticket"
            ),
        }
    }
}

impl<Fe: Frontend> Drop for Scheduler<Fe> {
    fn drop(&mut self) {
        // Closing the job channel stops the worker after the task it is running.
        drop(self.jobs.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!(target: "refract.scheduler", "analysis worker panicked");
            }
        }

        self.process_events();
        let mut leftovers: Vec<Ticket> = self.pending.borrow().keys().copied().collect();
        leftovers.sort();
        for ticket in leftovers {
            self.complete(ticket);
        }
    }
}
