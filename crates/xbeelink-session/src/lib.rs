//! Request/response correlation for XBee radios.
//!
//! A [`Session`] owns one serial link. It stamps every outgoing request with
//! a fresh frame id, matches the radio's reply by id and frame type, enforces
//! per-request timeouts and turns non-success statuses into errors. On top of
//! that it resolves node identifiers (cached), discovers nodes and exposes
//! the raw inbound frame stream.

mod config;
mod correlator;
mod deadline;
pub mod destination;
pub mod discovery;
pub mod dispatch;
pub mod error;
mod link;
pub mod monitor;
pub mod resolver;
mod session;

pub use config::{
    ModuleKind, SessionConfig, DEFAULT_FRAME_BUFFER, DEFAULT_TIMEOUT, DEFAULT_WRITE_QUEUE,
    MIN_TIMEOUT,
};
pub use destination::{to_hex, Destination};
pub use discovery::DiscoveredNode;
pub use dispatch::{LocalCommand, RemoteCommand, RemoteTransmit};
pub use error::{Result, SessionError};
pub use monitor::FrameStream;
pub use resolver::NODE_LOOKUP_COMMAND;
pub use session::Session;
