//! FILENAME: engine/src/events.rs
//! PURPOSE: Event dispatch for data mutation, protocol, and log messages.
//! CONTEXT: The engine notifies registered listeners synchronously, on the
//! calling thread, whenever data changes or an operation reports progress.
//! Listeners are an explicit interface of six callback slots; the default
//! implementation of every slot logs through the `log` facade, so a
//! listener only overrides what it cares about. A workspace-wide lock
//! suppresses the data-changed stream during bulk edits and flushes one
//! whole-table notification per touched table when released.

use std::cell::RefCell;
use std::rc::Rc;

// ============================================================================
// EVENT KINDS
// ============================================================================

/// Scope code attached to every data-changed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// Everything in the table may have changed.
    All,
    /// One column changed across rows.
    Column,
    /// One row changed across columns.
    Row,
    /// A single cell changed.
    Cell,
    RowAdded,
    RowDeleted,
    RowInserted,
    /// Table-level attributes (name, keys, structure) changed.
    Table,
}

/// Severity codes reported by log events, in engine order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeverity {
    SystemError,
    Failed,
    Error,
    Warning,
    Message,
    Info,
    StageOpen,
    StageClose,
    EnterDefault,
    Reset,
    None,
}

impl LogSeverity {
    /// Maps the engine severity to a standard log level.
    /// `None` produces no log output.
    pub fn level(&self) -> Option<log::Level> {
        match self {
            LogSeverity::SystemError | LogSeverity::Failed => Some(log::Level::Error),
            LogSeverity::Error => Some(log::Level::Error),
            LogSeverity::Warning => Some(log::Level::Warn),
            LogSeverity::Message | LogSeverity::Info => Some(log::Level::Info),
            LogSeverity::StageOpen
            | LogSeverity::StageClose
            | LogSeverity::EnterDefault
            | LogSeverity::Reset => Some(log::Level::Debug),
            LogSeverity::None => None,
        }
    }
}

// ============================================================================
// LISTENER INTERFACE
// ============================================================================

/// Callback surface invoked by the engine. All six slots have logging
/// default implementations; implementors override any subset.
///
/// Callbacks run synchronously on the thread that triggered the event and
/// must not block significantly. They may observe in-flight mutations.
pub trait EventListener {
    fn on_data_change(&self, scope: ChangeScope, table: &str, column: &str, row: Option<usize>) {
        log::info!(
            "({:?}) data changed in table [{}], column [{}], row {:?}",
            scope,
            table,
            column,
            row
        );
    }

    fn on_protocol(&self, message: &str) {
        log::info!("protocol: {}", message);
    }

    fn on_command(&self, command: &str, p1: &str, p2: &str) {
        log::info!("command: {} ({}, {})", command, p1, p2);
    }

    fn on_undo(&self, kind: &str, level: i64) {
        log::info!("undo: {} (level {})", kind, level);
    }

    fn on_history_change(&self, kind: &str) {
        log::info!("history changed: {}", kind);
    }

    fn on_log(&self, severity: LogSeverity, message: &str) {
        if let Some(level) = severity.level() {
            log::log!(level, "{}", message);
        }
    }
}

/// Listener that keeps every default slot: logs each event and nothing else.
pub struct LogListener;

impl EventListener for LogListener {}

// ============================================================================
// EVENT HUB
// ============================================================================

#[derive(Default)]
struct HubState {
    listeners: Vec<Rc<dyn EventListener>>,
    locked: bool,
    /// Tables mutated while the lock was held. Flushed as whole-table
    /// notifications on unlock, in first-touched order.
    dirty: Vec<String>,
}

/// Shared dispatch point. Tables hold a clone of their workspace's hub, so
/// one registration covers every table. Single-threaded by design, matching
/// the call-and-return model of the engine.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Rc<RefCell<HubState>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Rc<dyn EventListener>) {
        self.inner.borrow_mut().listeners.push(listener);
    }

    pub fn clear_listeners(&self) {
        self.inner.borrow_mut().listeners.clear();
    }

    pub fn locked(&self) -> bool {
        self.inner.borrow().locked
    }

    /// Sets the suppression flag. Releasing the lock flushes one
    /// whole-table data-changed notification per table touched while
    /// it was held.
    pub fn set_locked(&self, locked: bool) {
        let flush = {
            let mut state = self.inner.borrow_mut();
            let was = state.locked;
            state.locked = locked;
            if was && !locked {
                std::mem::take(&mut state.dirty)
            } else {
                Vec::new()
            }
        };
        for table in flush {
            self.dispatch(|l| l.on_data_change(ChangeScope::All, &table, "", None));
        }
    }

    /// Acquires the lock and returns a guard that restores the previous
    /// state on drop, so a failing batch edit cannot leave events
    /// suppressed.
    pub fn lock(&self) -> EventLock {
        let previous = self.locked();
        self.set_locked(true);
        EventLock {
            hub: self.clone(),
            previous,
        }
    }

    pub fn data_changed(&self, scope: ChangeScope, table: &str, column: &str, row: Option<usize>) {
        {
            let mut state = self.inner.borrow_mut();
            if state.locked {
                if !state.dirty.iter().any(|t| t == table) {
                    state.dirty.push(table.to_string());
                }
                return;
            }
        }
        self.dispatch(|l| l.on_data_change(scope, table, column, row));
    }

    pub fn protocol(&self, message: &str) {
        self.dispatch(|l| l.on_protocol(message));
    }

    pub fn command(&self, command: &str, p1: &str, p2: &str) {
        self.dispatch(|l| l.on_command(command, p1, p2));
    }

    pub fn undo(&self, kind: &str, level: i64) {
        self.dispatch(|l| l.on_undo(kind, level));
    }

    pub fn history_changed(&self, kind: &str) {
        self.dispatch(|l| l.on_history_change(kind));
    }

    pub fn log(&self, severity: LogSeverity, message: &str) {
        self.dispatch(|l| l.on_log(severity, message));
    }

    /// Invokes `f` on each listener. The listener list is cloned out of the
    /// RefCell first, so callbacks may re-enter the hub.
    fn dispatch(&self, f: impl Fn(&dyn EventListener)) {
        let listeners: Vec<Rc<dyn EventListener>> = self.inner.borrow().listeners.clone();
        for listener in listeners {
            f(listener.as_ref());
        }
    }
}

/// RAII guard returned by `EventHub::lock`.
pub struct EventLock {
    hub: EventHub,
    previous: bool,
}

impl Drop for EventLock {
    fn drop(&mut self) {
        self.hub.set_locked(self.previous);
    }
}
