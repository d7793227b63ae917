//! Deferred command queue for remote PBX control.
//!
//! Provides:
//! - `QueueEngine` - Enqueue commands, drain them against a session later
//! - `CommandRegistry` - Typed handlers for every queueable operation
//! - Storage implementations (memory, SQLite)

pub mod commands;
pub mod engine;
pub mod storage;

pub use commands::{BoundArgs, CommandRegistry, CommandSpec, IntoQueueResponse};
pub use engine::{DEFAULT_DENYLIST, DrainSummary, QueueEngine, QueueError};
