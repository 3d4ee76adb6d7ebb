//! Runs front-end analyses on a dedicated worker thread and hands results back to the thread
//! that owns the editor.
//!
//! There are exactly two actors: the owning thread, which schedules tasks and receives their
//! callbacks from its [`EventLoop`], and a single worker thread that executes tasks strictly
//! serially. Callbacks therefore fire in submission order.

mod error;
mod event_loop;
mod progress;
mod scheduler;
mod worker;

pub use error::TaskError;
pub use event_loop::{Event, EventLoop, EventSender};
pub use progress::{BusyIndicator, NoopBusyIndicator};
pub use scheduler::{ContentSource, Scheduler, SchedulerConfig, Scope, Ticket};
