//! Deferred commands and their stored results.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{Arguments, Event};

/// Queue item identifier, assigned by the storage backend.
pub type QueueId = i64;

/// Current Unix time in seconds.
#[must_use]
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Result of an executed command, as stored in the queue.
///
/// A failed command (the boolean `false` outcome) is never stored; its item
/// stays pending instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueueResponse {
    /// The switch acknowledged the command.
    Acknowledged,
    /// A single event.
    Event(Event),
    /// Zero or more events, in the order the switch sent them.
    Events(Vec<Event>),
    /// The command ran but reported nothing found.
    NotFound,
}

impl QueueResponse {
    /// Events carried by this response.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        match self {
            Self::Event(event) => std::slice::from_ref(event),
            Self::Events(events) => events,
            Self::Acknowledged | Self::NotFound => &[],
        }
    }
}

/// One deferred command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Identifier, `None` until inserted.
    pub id: Option<QueueId>,
    /// Action name of the command.
    pub command: String,
    /// Arguments, bound positionally to the command's parameters.
    pub arguments: Arguments,
    /// Stored result; `None` while pending.
    pub response: Option<QueueResponse>,
    /// When the command was queued (Unix epoch seconds).
    pub date_added: i64,
    /// When the command was executed.
    pub date_executed: Option<i64>,
    /// When a worker claimed the item for execution.
    #[serde(default)]
    pub claimed_at: Option<i64>,
}

impl QueueItem {
    /// Create a pending item stamped with the current time.
    #[must_use]
    pub fn new(command: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: None,
            command: command.into(),
            arguments,
            response: None,
            date_added: now(),
            date_executed: None,
            claimed_at: None,
        }
    }

    /// Whether the item still waits for execution.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.response.is_none()
    }

    /// Record the result of a successful execution.
    pub fn mark_executed(&mut self, response: QueueResponse, at: i64) {
        self.response = Some(response);
        self.date_executed = Some(at);
        self.claimed_at = None;
    }
}

/// Serialize arguments for storage.
///
/// # Errors
/// Returns error if serialization fails.
pub fn encode_arguments(arguments: &Arguments) -> Result<String, serde_json::Error> {
    serde_json::to_string(arguments)
}

/// Restore arguments from storage.
///
/// # Errors
/// Returns error if the stored text is not a string map.
pub fn decode_arguments(raw: &str) -> Result<Arguments, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Serialize a response for storage.
///
/// # Errors
/// Returns error if serialization fails.
pub fn encode_response(response: &QueueResponse) -> Result<String, serde_json::Error> {
    serde_json::to_string(response)
}

/// Restore a response from storage.
///
/// # Errors
/// Returns error if the stored text is not a response.
pub fn decode_response(raw: &str) -> Result<QueueResponse, serde_json::Error> {
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use proptest::collection::vec;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_new_item_is_pending() {
        let item = QueueItem::new("QueueStatus", Arguments::new());
        assert!(item.is_pending());
        assert!(item.id.is_none());
        assert!(item.date_executed.is_none());
    }

    #[test]
    fn test_mark_executed() {
        let mut item = QueueItem::new("Reload", Arguments::new());
        item.claimed_at = Some(10);
        item.mark_executed(QueueResponse::Acknowledged, 42);
        assert!(!item.is_pending());
        assert_eq!(item.date_executed, Some(42));
        assert_eq!(item.claimed_at, None);
    }

    #[test]
    fn test_response_events() {
        let event: Event = [("event", "Agents")].into_iter().collect();
        assert_eq!(QueueResponse::Event(event.clone()).events(), &[event.clone()]);
        assert!(QueueResponse::Acknowledged.events().is_empty());
        assert!(QueueResponse::NotFound.events().is_empty());
        assert_eq!(QueueResponse::Events(vec![event.clone(), event]).events().len(), 2);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_arguments("[1,2]").is_err());
        assert!(decode_response("{\"kind\":\"nope\"}").is_err());
    }

    fn arb_map() -> impl Strategy<Value = Vec<(String, String)>> {
        vec((".*", ".*"), 0..8)
    }

    proptest! {
        #[test]
        fn prop_arguments_roundtrip(pairs in arb_map()) {
            let arguments: Arguments = pairs.into_iter().collect();
            let decoded = decode_arguments(&encode_arguments(&arguments).unwrap()).unwrap();
            prop_assert_eq!(
                decoded.iter().collect::<Vec<_>>(),
                arguments.iter().collect::<Vec<_>>()
            );
        }

        #[test]
        fn prop_events_roundtrip(events in vec(arb_map(), 0..5)) {
            let events: Vec<Event> = events.into_iter().map(|e| e.into_iter().collect()).collect();
            let response = QueueResponse::Events(events);
            let decoded = decode_response(&encode_response(&response).unwrap()).unwrap();
            prop_assert_eq!(decoded, response);
        }
    }
}
