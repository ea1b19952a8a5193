use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Severity switch for a trace source. Ordered: raising the level lets more
/// detailed events through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    Off,
    Error,
    Warning,
    Information,
    Verbose,
}

/// One message emitted by a subsystem. Binding evaluation tags its events with
/// the owning expression id so listeners can correlate them.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub level: TraceLevel,
    pub message: String,
    pub expression_id: Option<u64>,
}

pub trait TraceListener {
    fn write(&self, event: &TraceEvent);
}

/// A process-wide trace source with a level switch and identity-removable
/// listeners. All access happens on the thread that owns the source; there is
/// no mutual exclusion, only the single-thread assumption.
pub struct TraceSource {
    level: Cell<TraceLevel>,
    listeners: RefCell<Vec<Rc<dyn TraceListener>>>,
}

impl TraceSource {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            level: Cell::new(TraceLevel::Off),
            listeners: RefCell::new(Vec::new()),
        })
    }

    pub fn level(&self) -> TraceLevel {
        self.level.get()
    }

    pub fn set_level(&self, level: TraceLevel) {
        self.level.set(level);
    }

    /// Raise the switch to `Information` if it is currently below that;
    /// binding-failure messages are only emitted above the default `Off`.
    pub fn ensure_information_level(&self) {
        if self.level.get() < TraceLevel::Information {
            self.level.set(TraceLevel::Information);
        }
    }

    pub fn add_listener(&self, listener: Rc<dyn TraceListener>) {
        self.listeners.borrow_mut().push(listener);
    }

    /// Remove a listener by identity. Returns whether it was registered.
    pub fn remove_listener(&self, listener: &Rc<dyn TraceListener>) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|l| Rc::ptr_eq(l, listener)) {
            Some(pos) => {
                listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Forward an event to every listener if the switch level admits it.
    ///
    /// Listeners are snapshotted first so a listener may add or remove
    /// listeners while being notified.
    pub fn trace(&self, event: TraceEvent) {
        if self.level.get() < event.level {
            return;
        }
        let listeners: Vec<_> = self.listeners.borrow().clone();
        for listener in &listeners {
            listener.write(&event);
        }
    }
}

thread_local! {
    static DATA_BINDING_SOURCE: Rc<TraceSource> = TraceSource::new();
}

/// The process-wide trace source of the data-binding subsystem (one per UI
/// thread, matching the single-threaded affinity of the inspected context).
pub fn data_binding_source() -> Rc<TraceSource> {
    DATA_BINDING_SOURCE.with(Rc::clone)
}
