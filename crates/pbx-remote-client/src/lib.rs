//! HTTP manager session for remote PBX control.
//!
//! Provides:
//! - `Session` - action invocation with session affinity and event dispatch
//! - Typed operations for queues, channels, peers, monitoring and config
//! - `Transport` trait with a `reqwest` implementation

pub mod action;
pub mod actions;
pub mod error;
pub mod response;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use action::{Action, build_target};
pub use actions::{
    ConfigChange, ConfigEdit, DEFAULT_ORIGINATE_TIMEOUT_MS, ModuleLoadType, OriginateRequest,
};
pub use error::{SessionError, TransportError};
pub use response::{ParseError, parse_records};
pub use session::{ActionResponse, Session, SessionBuilder, UNREACHABLE_MESSAGE};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
