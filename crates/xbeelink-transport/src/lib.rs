//! Serial transport for XBee radios.
//!
//! Provides the byte stream the frame codec runs over:
//! - Serial TTY devices (Linux/macOS), configured raw at a fixed baud rate
//! - Any other async byte stream through the [`ByteStream`] trait
//!
//! This is the lowest layer of xbeelink. Everything else builds on top of
//! the [`ByteStream`] type provided here.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use traits::ByteStream;

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort};
