//! Core types for remote PBX control.
//!
//! This crate provides the fundamental building blocks:
//! - `Event` - Ordered attribute record returned by the switch
//! - `ListenerRegistry` - Named listener/filter bindings
//! - `TraceLog` - Debug listener with bounded history
//! - `QueueItem` and the `QueueStorage` trait
//! - `PbxConfig` - Connection and queue settings

pub mod config;
pub mod event;
pub mod item;
pub mod listener;
pub mod trace_log;
pub mod traits;

pub use config::{ConfigError, PbxConfig};
pub use event::{Arguments, Event};
pub use item::{QueueId, QueueItem, QueueResponse};
pub use listener::{
    AcceptAll, DebugListener, DebugRegistry, DebugTrace, EventFilter, EventListener,
    EventTypeFilter, ListenerError, ListenerRegistry, TracingDebugListener,
};
pub use trace_log::TraceLog;
pub use traits::{QueueStorage, StorageError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
