//! Typed manager operations.
//!
//! Each submodule adds an `impl Session` block for one family of actions.

mod channel;
mod config;
mod connection;
mod database;
mod monitor;
mod queue;
mod sip;

pub use channel::{DEFAULT_ORIGINATE_TIMEOUT_MS, OriginateRequest};
pub use config::{ConfigChange, ConfigEdit, ModuleLoadType};
