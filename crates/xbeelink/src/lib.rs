//! Talk to XBee radios over a serial link.
//!
//! xbeelink sends AT commands to the local radio and to remote nodes, sends
//! data to remote nodes and watches the frames the radio reports, with every
//! request matched to its reply and bounded by a timeout.
//!
//! # Crate Structure
//!
//! - [`transport`]: Async serial port transport
//! - [`frame`]: API frame model and wire codec (API modes 1 and 2)
//! - [`session`]: Request/response correlation, node resolution and monitoring
//!   (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use xbeelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xbeelink_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use xbeelink_session::*;
}
