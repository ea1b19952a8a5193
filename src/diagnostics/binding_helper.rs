use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;
use crate::model::binding::{self, BindingExpression};
use crate::model::dispatcher::Priority;
use crate::model::object::{Element, Property};
use crate::model::trace::{data_binding_source, TraceEvent, TraceLevel, TraceListener, TraceSource};

/// Coordinates temporary instrumentation of the binding trace source.
///
/// The trace level and listener registration are one process-wide resource
/// shared by every caller on this thread, so activation is reference counted:
/// the first `increase_usage_count` installs the failure cache and raises the
/// level, and only the decrement that returns the count to zero tears both
/// down again.
pub struct BindingDiagnosticHelper {
    usage_count: Cell<usize>,
    saved_level: Cell<TraceLevel>,
    level_changed: Cell<bool>,
    cache: RefCell<Option<Rc<FailureCache>>>,
}

thread_local! {
    static INSTANCE: Rc<BindingDiagnosticHelper> = Rc::new(BindingDiagnosticHelper {
        usage_count: Cell::new(0),
        saved_level: Cell::new(TraceLevel::Off),
        level_changed: Cell::new(false),
        cache: RefCell::new(None),
    });
}

/// The helper for the current UI thread.
pub fn instance() -> Rc<BindingDiagnosticHelper> {
    INSTANCE.with(Rc::clone)
}

/// Caches the latest failure text per binding expression while the helper is
/// active, so later probes can answer without forcing a re-evaluation.
struct FailureCache {
    failures: RefCell<HashMap<u64, String>>,
}

impl TraceListener for FailureCache {
    fn write(&self, event: &TraceEvent) {
        if event.level != TraceLevel::Error {
            return;
        }
        if let Some(id) = event.expression_id {
            self.failures
                .borrow_mut()
                .insert(id, event.message.clone());
        }
    }
}

/// Collects failure text for exactly one expression. The id filter is what
/// keeps concurrent captures from seeing each other's traffic.
struct CaptureBuffer {
    expression_id: u64,
    lines: RefCell<Vec<String>>,
}

impl CaptureBuffer {
    fn new(expression_id: u64) -> Rc<Self> {
        Rc::new(Self {
            expression_id,
            lines: RefCell::new(Vec::new()),
        })
    }

    fn take_text(&self) -> Option<String> {
        let lines = std::mem::take(&mut *self.lines.borrow_mut());
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

impl TraceListener for CaptureBuffer {
    fn write(&self, event: &TraceEvent) {
        if event.expression_id == Some(self.expression_id) {
            self.lines.borrow_mut().push(event.message.clone());
        }
    }
}

/// Guaranteed-release wrapper around the temporary trace state: removes the
/// listener and restores the level switch exactly once, on `release` or on
/// drop, whichever comes first.
struct TraceScope {
    source: Rc<TraceSource>,
    listener: Rc<dyn TraceListener>,
    restore_level: Option<TraceLevel>,
    released: Cell<bool>,
}

impl TraceScope {
    fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        self.source.remove_listener(&self.listener);
        if let Some(level) = self.restore_level {
            self.source.set_level(level);
        }
    }
}

impl Drop for TraceScope {
    fn drop(&mut self) {
        self.release();
    }
}

impl BindingDiagnosticHelper {
    pub fn usage_count(&self) -> usize {
        self.usage_count.get()
    }

    pub fn is_active(&self) -> bool {
        self.usage_count.get() > 0
    }

    /// First increment activates the instrumentation hook; further increments
    /// only bump the count.
    pub fn increase_usage_count(&self) {
        let count = self.usage_count.get();
        self.usage_count.set(count + 1);
        if count == 0 {
            self.activate();
        }
    }

    /// Deactivates only when the count returns to zero. A surplus decrement is
    /// ignored rather than driving the count negative.
    pub fn decrease_usage_count(&self) {
        let count = self.usage_count.get();
        if count == 0 {
            return;
        }
        self.usage_count.set(count - 1);
        if count == 1 {
            self.deactivate();
        }
    }

    fn activate(&self) {
        let source = data_binding_source();
        let level = source.level();
        self.saved_level.set(level);
        self.level_changed.set(level < TraceLevel::Information);
        source.ensure_information_level();

        let cache = Rc::new(FailureCache {
            failures: RefCell::new(HashMap::new()),
        });
        source.add_listener(cache.clone());
        *self.cache.borrow_mut() = Some(cache);
        tracing::debug!("binding instrumentation activated");
    }

    fn deactivate(&self) {
        let source = data_binding_source();
        if let Some(cache) = self.cache.borrow_mut().take() {
            let listener: Rc<dyn TraceListener> = cache;
            source.remove_listener(&listener);
        }
        if self.level_changed.replace(false) {
            source.set_level(self.saved_level.get());
        }
        tracing::debug!("binding instrumentation deactivated");
    }

    fn cached_failure(&self, expression_id: u64) -> Option<String> {
        self.cache
            .borrow()
            .as_ref()
            .and_then(|cache| cache.failures.borrow().get(&expression_id).cloned())
    }

    /// Capture the failure text of one binding and hand it to `callback`.
    ///
    /// Failure text only exists at evaluation time, so the binding is forced
    /// through a fresh evaluation: the property is cleared and the expression
    /// reapplied, with a temporary per-call listener recording what the trace
    /// source emits for this expression id. Because evaluation is scheduled,
    /// the finalize step (remove listener, restore level, invoke callback)
    /// runs at idle priority on the owning dispatcher, after the evaluation
    /// has drained. If the hook is active and already holds cached text for
    /// this expression, the callback fires immediately instead.
    ///
    /// `callback` receives `None` when the re-evaluation produced no failure.
    pub fn try_set_binding_error(
        &self,
        element: &Rc<Element>,
        property: &Rc<Property>,
        expression: &Rc<BindingExpression>,
        callback: impl FnOnce(Option<String>) + 'static,
    ) -> Result<()> {
        if let Some(cached) = self.cached_failure(expression.id()) {
            callback(Some(cached));
            return Ok(());
        }

        let source = data_binding_source();
        let level_before = source.level();
        source.ensure_information_level();
        let restore_level = (source.level() != level_before).then_some(level_before);

        let buffer = CaptureBuffer::new(expression.id());
        let listener: Rc<dyn TraceListener> = buffer.clone();
        source.add_listener(listener.clone());
        let scope = TraceScope {
            source,
            listener,
            restore_level,
            released: Cell::new(false),
        };

        // If reapply fails, the scope drop still restores the trace state.
        element.clear_value(property);
        binding::reapply(element, property, expression)?;

        element.dispatcher().post(Priority::ApplicationIdle, move || {
            scope.release();
            callback(buffer.take_text());
        });
        Ok(())
    }
}
