//! The event table.
//!
//! A single registration table maps event names to handler lists. Host
//! events ([`HostEvent`]) and framework events (dispatch failures, command
//! load and unload) share the table, and every handler receives the same
//! [`EventPayload`] type, so there is one generic handler shape instead of
//! one type per event.
//!
//! ```rust
//! use parley_framework::events::{EventPayload, EventTable};
//!
//! let events = EventTable::new();
//! events.on(EventPayload::DISPATCH_FAIL, |payload| async move {
//!     if let EventPayload::DispatchFailed(failure) = payload {
//!         eprintln!("dispatch failed: {}", failure.kind);
//!     }
//! });
//! assert_eq!(events.handler_count(EventPayload::DISPATCH_FAIL), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{trace, warn};

use parley_core::HostEvent;

use crate::dispatcher::DispatchFailure;

/// Something that happened, as seen by event handlers.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// An event from the host platform.
    Host(HostEvent),
    /// A message could not be routed to completion.
    DispatchFailed(DispatchFailure),
    /// A command was loaded, by primary name.
    CommandLoaded(String),
    /// A command was unloaded, by primary name.
    CommandUnloaded(String),
}

impl EventPayload {
    pub const DISPATCH_FAIL: &'static str = "dispatchFail";
    pub const COMMAND_LOAD: &'static str = "commandLoad";
    pub const COMMAND_UNLOAD: &'static str = "commandUnload";

    /// Framework event names.
    pub const FRAMEWORK_NAMES: &'static [&'static str] =
        &[Self::DISPATCH_FAIL, Self::COMMAND_LOAD, Self::COMMAND_UNLOAD];

    /// Returns the registration name of this payload.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Host(event) => event.name(),
            Self::DispatchFailed(_) => Self::DISPATCH_FAIL,
            Self::CommandLoaded(_) => Self::COMMAND_LOAD,
            Self::CommandUnloaded(_) => Self::COMMAND_UNLOAD,
        }
    }

    /// Returns `true` if `name` is an event the table ever emits.
    pub fn is_known(name: &str) -> bool {
        HostEvent::NAMES.contains(&name) || Self::FRAMEWORK_NAMES.contains(&name)
    }
}

impl From<HostEvent> for EventPayload {
    fn from(event: HostEvent) -> Self {
        Self::Host(event)
    }
}

/// A type-erased event handler.
pub type EventHandler = Arc<dyn Fn(EventPayload) -> BoxFuture<'static, ()> + Send + Sync>;

/// Event name → handlers. Cheap to clone; clones share registrations.
#[derive(Clone, Default)]
pub struct EventTable {
    handlers: Arc<RwLock<HashMap<String, Vec<EventHandler>>>>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f` for the event called `name`.
    ///
    /// Names the table never emits are accepted but logged, since such a
    /// handler can only run through a manual [`emit_named`](Self::emit_named).
    pub fn on<F, Fut>(&self, name: &str, f: F)
    where
        F: Fn(EventPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if !EventPayload::is_known(name) {
            warn!(event = name, "Registering handler for unknown event");
        }
        let handler: EventHandler = Arc::new(move |payload| f(payload).boxed());
        self.handlers
            .write()
            .entry(name.to_string())
            .or_default()
            .push(handler);
    }

    /// Removes every handler of `name`, returning how many there were.
    pub fn off(&self, name: &str) -> usize {
        self.handlers
            .write()
            .remove(name)
            .map_or(0, |handlers| handlers.len())
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.read().get(name).map_or(0, Vec::len)
    }

    /// Runs the handlers registered for `payload`, in registration order.
    pub async fn emit(&self, payload: EventPayload) {
        let name = payload.name();
        self.emit_named(name, payload).await;
    }

    /// Runs the handlers registered under `name` with `payload`.
    pub async fn emit_named(&self, name: &str, payload: EventPayload) {
        let handlers: Vec<EventHandler> = match self.handlers.read().get(name) {
            Some(handlers) => handlers.clone(),
            None => return,
        };
        trace!(event = name, handlers = handlers.len(), "Emitting event");
        for handler in handlers {
            handler(payload.clone()).await;
        }
    }
}

impl fmt::Debug for EventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let mut counts: Vec<(&str, usize)> =
            handlers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        counts.sort();
        f.debug_struct("EventTable").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use parley_core::ClientInfo;

    use super::*;

    #[tokio::test]
    async fn test_handlers_run_in_order() {
        let events = EventTable::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = seen.clone();
            events.on(EventPayload::COMMAND_LOAD, move |payload| {
                let seen = seen.clone();
                async move {
                    if let EventPayload::CommandLoaded(name) = payload {
                        seen.lock().push(format!("{tag}:{name}"));
                    }
                }
            });
        }

        events.emit(EventPayload::CommandLoaded("ping".into())).await;
        events.emit(EventPayload::CommandUnloaded("ping".into())).await;

        assert_eq!(*seen.lock(), vec!["first:ping", "second:ping"]);
    }

    #[tokio::test]
    async fn test_host_events_use_host_names() {
        let events = EventTable::new();
        let ready = Arc::new(Mutex::new(None));
        {
            let ready = ready.clone();
            events.on(HostEvent::READY, move |payload| {
                let ready = ready.clone();
                async move {
                    if let EventPayload::Host(HostEvent::Ready(client)) = payload {
                        *ready.lock() = Some(client.user_id);
                    }
                }
            });
        }

        events
            .emit(HostEvent::Ready(ClientInfo::new("7", "bot")).into())
            .await;
        assert_eq!(ready.lock().as_deref(), Some("7"));
    }

    #[test]
    fn test_off_and_counts() {
        let events = EventTable::new();
        events.on("custom", |_| async {});
        events.on("custom", |_| async {});
        assert_eq!(events.handler_count("custom"), 2);
        assert_eq!(events.off("custom"), 2);
        assert_eq!(events.handler_count("custom"), 0);
        assert!(EventPayload::is_known("messageUpdate"));
        assert!(!EventPayload::is_known("custom"));
    }
}
