use std::fmt;
use std::time::Duration;

use crossbeam_channel as channel;

use crate::scheduler::Ticket;

/// Something the owning thread has to handle.
pub enum Event {
    /// The worker finished the task with this ticket; its result is waiting.
    TaskCompleted(Ticket),
    /// Work the host wants to run on the owning thread (redraws, input handling, ...).
    Host(Box<dyn FnOnce() + Send>),
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::TaskCompleted(ticket) => f.debug_tuple("TaskCompleted").field(ticket).finish(),
            Event::Host(_) => f.write_str("Host(..)"),
        }
    }
}

/// Posts events to an [`EventLoop`] from any thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: channel::Sender<Event>,
}

impl EventSender {
    /// Queues `f` to run on the owning thread. Returns `false` if the loop is gone.
    pub fn post(&self, f: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Event::Host(Box::new(f))).is_ok()
    }

    pub(crate) fn task_completed(&self, ticket: Ticket) -> bool {
        self.tx.send(Event::TaskCompleted(ticket)).is_ok()
    }
}

/// FIFO event queue of the owning thread.
#[derive(Debug)]
pub struct EventLoop {
    tx: channel::Sender<Event>,
    rx: channel::Receiver<Event>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub(crate) fn try_next(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn next_timeout(&self, timeout: Duration) -> Option<Event> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
