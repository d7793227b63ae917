//! Bounded history of switch exchanges with live broadcast.

use std::collections::VecDeque;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::listener::{DebugListener, DebugTrace};

/// Default history size limit (4 MB).
const HISTORY_BYTES: usize = 4 * 1024 * 1024;

struct StoredTrace {
    trace: DebugTrace,
    bytes: usize,
}

struct Inner {
    history: VecDeque<StoredTrace>,
    total_bytes: usize,
}

/// Debug listener that keeps recent exchanges in memory.
///
/// Oldest traces are dropped once the history exceeds its byte budget.
/// Subscribers receive new traces as they arrive.
pub struct TraceLog {
    inner: RwLock<Inner>,
    limit_bytes: usize,
    sender: broadcast::Sender<DebugTrace>,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceLog {
    /// Create a trace log with the default budget.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(HISTORY_BYTES)
    }

    /// Create a trace log that keeps at most `limit_bytes` of traces.
    #[must_use]
    pub fn with_limit(limit_bytes: usize) -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            inner: RwLock::new(Inner {
                history: VecDeque::with_capacity(32),
                total_bytes: 0,
            }),
            limit_bytes,
            sender,
        }
    }

    /// Record a trace.
    pub fn push(&self, trace: DebugTrace) {
        let _ = self.sender.send(trace.clone());
        let bytes = approx_bytes(&trace);

        let mut inner = self.inner.write();
        while inner.total_bytes.saturating_add(bytes) > self.limit_bytes {
            if let Some(front) = inner.history.pop_front() {
                inner.total_bytes = inner.total_bytes.saturating_sub(front.bytes);
            } else {
                break;
            }
        }
        inner.history.push_back(StoredTrace { trace, bytes });
        inner.total_bytes = inner.total_bytes.saturating_add(bytes);
    }

    /// Receiver for traces recorded from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DebugTrace> {
        self.sender.subscribe()
    }

    /// Snapshot of the retained history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<DebugTrace> {
        self.inner
            .read()
            .history
            .iter()
            .map(|s| s.trace.clone())
            .collect()
    }

    /// The most recent trace.
    #[must_use]
    pub fn last(&self) -> Option<DebugTrace> {
        self.inner.read().history.back().map(|s| s.trace.clone())
    }

    /// Number of retained traces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().history.len()
    }

    /// Whether no traces are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().history.is_empty()
    }
}

impl DebugListener for TraceLog {
    fn debug(&self, trace: &DebugTrace) {
        self.push(trace.clone());
    }
}

fn approx_bytes(trace: &DebugTrace) -> usize {
    let params: usize = trace
        .parameters
        .iter()
        .map(|(k, v)| k.len() + v.len())
        .sum();
    trace.url.len()
        + trace.response.len()
        + trace.affinity_token.as_ref().map_or(0, String::len)
        + params
}
