//! Event listeners, filters and debug observers.

use std::{collections::HashSet, sync::Arc};

use indexmap::IndexMap;
use thiserror::Error;

use crate::{Arguments, Event};

/// Error raised by a filter while deciding on an event.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Filter '{binding}' failed on event type '{event_type}': {reason}")]
    Filter {
        binding: String,
        event_type: String,
        reason: String,
    },
}

/// Receives events produced by a session.
pub trait EventListener: Send + Sync {
    /// Called once for every event that passed the binding's filter.
    fn notify(&self, event: &Event);
}

impl<F> EventListener for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn notify(&self, event: &Event) {
        self(event);
    }
}

/// Decides whether an event type reaches a listener.
pub trait EventFilter: Send + Sync {
    /// Return `Ok(true)` to deliver events of this type.
    ///
    /// # Errors
    /// An error aborts the dispatch of the current event.
    fn filter(&self, event_type: &str) -> Result<bool, String>;
}

impl<F> EventFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn filter(&self, event_type: &str) -> Result<bool, String> {
        Ok(self(event_type))
    }
}

/// Filter that lets every event through.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl EventFilter for AcceptAll {
    fn filter(&self, _event_type: &str) -> Result<bool, String> {
        Ok(true)
    }
}

/// Filter that only passes a fixed set of event types.
#[derive(Debug, Default, Clone)]
pub struct EventTypeFilter {
    types: HashSet<String>,
}

impl EventTypeFilter {
    /// Create a filter for the given event types.
    #[must_use]
    pub fn new<I>(types: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }
}

impl EventFilter for EventTypeFilter {
    fn filter(&self, event_type: &str) -> Result<bool, String> {
        Ok(self.types.contains(event_type))
    }
}

#[derive(Clone)]
struct Binding {
    listener: Arc<dyn EventListener>,
    filter: Arc<dyn EventFilter>,
}

/// Named listener bindings, consulted in registration order.
///
/// Cloning is cheap: listeners and filters are shared.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    bindings: IndexMap<String, Binding>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener that receives every event.
    ///
    /// Returns `false` if the name is taken; the existing binding is kept.
    pub fn register(&mut self, name: impl Into<String>, listener: Arc<dyn EventListener>) -> bool {
        self.register_filtered(name, listener, Arc::new(AcceptAll))
    }

    /// Register a listener behind a filter.
    ///
    /// Returns `false` if the name is taken; the existing binding is kept.
    pub fn register_filtered(
        &mut self,
        name: impl Into<String>,
        listener: Arc<dyn EventListener>,
        filter: Arc<dyn EventFilter>,
    ) -> bool {
        let name = name.into();
        if self.bindings.contains_key(&name) {
            return false;
        }
        self.bindings.insert(name, Binding { listener, filter });
        true
    }

    /// Remove a binding. Returns `false` if it did not exist.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.bindings.shift_remove(name).is_some()
    }

    /// Whether a binding with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Deliver an event to every binding whose filter accepts its type.
    ///
    /// # Errors
    /// Returns the first filter failure; later bindings are not consulted.
    pub fn dispatch(&self, event: &Event) -> Result<(), ListenerError> {
        let event_type = event.event_type();
        for (name, binding) in &self.bindings {
            let accepted = binding
                .filter
                .filter(event_type)
                .map_err(|reason| ListenerError::Filter {
                    binding: name.clone(),
                    event_type: event_type.to_string(),
                    reason,
                })?;
            if accepted {
                binding.listener.notify(event);
            }
        }
        Ok(())
    }
}

/// Raw trace of one request/response exchange.
#[derive(Debug, Clone)]
pub struct DebugTrace {
    /// Full request target, including the query string.
    pub url: String,
    /// Parameters sent with the action.
    pub parameters: Arguments,
    /// Raw response body (empty when the transport failed).
    pub response: String,
    /// Affinity token held after the exchange.
    pub affinity_token: Option<String>,
}

/// Receives a trace of every exchange, successful or not.
pub trait DebugListener: Send + Sync {
    /// Observe one exchange.
    fn debug(&self, trace: &DebugTrace);
}

/// Debug listener that writes traces to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDebugListener;

impl DebugListener for TracingDebugListener {
    fn debug(&self, trace: &DebugTrace) {
        tracing::debug!(
            url = %trace.url,
            parameters = ?trace.parameters,
            cookie = trace.affinity_token.as_deref().unwrap_or(""),
            response = %trace.response,
            "Switch exchange"
        );
    }
}

/// Named debug listeners.
#[derive(Default, Clone)]
pub struct DebugRegistry {
    listeners: IndexMap<String, Arc<dyn DebugListener>>,
}

impl DebugRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a debug listener. Returns `false` if the name is taken.
    pub fn register(&mut self, name: impl Into<String>, listener: Arc<dyn DebugListener>) -> bool {
        let name = name.into();
        if self.listeners.contains_key(&name) {
            return false;
        }
        self.listeners.insert(name, listener);
        true
    }

    /// Remove a debug listener. Returns `false` if it did not exist.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.listeners.shift_remove(name).is_some()
    }

    /// Send a trace to every debug listener.
    pub fn notify(&self, trace: &DebugTrace) {
        for listener in self.listeners.values() {
            listener.debug(trace);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl EventListener for Counter {
        fn notify(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Counter {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct Broken;

    impl EventFilter for Broken {
        fn filter(&self, _event_type: &str) -> Result<bool, String> {
            Err("filter exploded".to_string())
        }
    }

    fn event_of(kind: &str) -> Event {
        [("event", kind)].into_iter().collect()
    }

    #[test]
    fn test_filter_limits_delivery() {
        let counter = Arc::new(Counter::default());
        let mut registry = ListenerRegistry::new();
        assert!(registry.register_filtered(
            "a",
            counter.clone(),
            Arc::new(EventTypeFilter::new(["QueueMemberAdded"])),
        ));

        registry.dispatch(&event_of("QueueMemberAdded")).unwrap();
        assert_eq!(counter.count(), 1);

        registry.dispatch(&event_of("Other")).unwrap();
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_first_registration_wins() {
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        let mut registry = ListenerRegistry::new();

        assert!(registry.register("a", first.clone()));
        assert!(!registry.register("a", second.clone()));

        registry.dispatch(&event_of("Hangup")).unwrap();
        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 0);
    }

    #[test]
    fn test_unregister() {
        let mut registry = ListenerRegistry::new();
        assert!(!registry.unregister("missing"));
        registry.register("a", Arc::new(Counter::default()));
        assert!(registry.unregister("a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_type_reaches_filter_as_undefined() {
        let counter = Arc::new(Counter::default());
        let mut registry = ListenerRegistry::new();
        registry.register_filtered(
            "a",
            counter.clone(),
            Arc::new(|kind: &str| kind == "undefined"),
        );

        registry.dispatch(&Event::new()).unwrap();
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_filter_error_propagates_and_stops_dispatch() {
        let before = Arc::new(Counter::default());
        let after = Arc::new(Counter::default());
        let mut registry = ListenerRegistry::new();
        registry.register("before", before.clone());
        registry.register_filtered("broken", Arc::new(Counter::default()), Arc::new(Broken));
        registry.register("after", after.clone());

        let err = registry.dispatch(&event_of("Newchannel")).unwrap_err();
        assert!(matches!(err, ListenerError::Filter { ref binding, .. } if binding == "broken"));
        assert_eq!(before.count(), 1);
        assert_eq!(after.count(), 0);
    }

    #[test]
    fn test_closure_listener() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in = Arc::clone(&seen);
        let mut registry = ListenerRegistry::new();
        registry.register(
            "closure",
            Arc::new(move |_: &Event| {
                seen_in.fetch_add(1, Ordering::SeqCst);
            }),
        );
        registry.dispatch(&event_of("Agents")).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_registry_names_are_unique() {
        let mut registry = DebugRegistry::new();
        assert!(registry.register("trace", Arc::new(TracingDebugListener)));
        assert!(!registry.register("trace", Arc::new(TracingDebugListener)));
        assert!(registry.unregister("trace"));
        assert!(!registry.unregister("trace"));
    }
}
