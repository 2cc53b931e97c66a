use tokio::io::{AsyncRead, AsyncWrite};

/// A connected byte stream to the radio, readable and writable.
///
/// This is the fundamental I/O type consumed by the session layer. On Unix
/// it is usually a [`crate::SerialPort`]; tests use `tokio::io::duplex`.
///
/// `poll_shutdown` must not complete until buffered output has left the
/// device ("drained").
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> ByteStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}
