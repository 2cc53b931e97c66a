use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};

/// Line settings for a serial device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Baud rate. Must match the radio's `BD` setting.
    pub baud_rate: u32,
    /// Use two stop bits instead of one.
    pub two_stop_bits: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            two_stop_bits: false,
        }
    }
}

/// Serial TTY transport.
///
/// The device is opened non-blocking, switched to raw mode and driven by
/// tokio's reactor. Shutting down drains the kernel output queue
/// (`tcdrain`), so a completed shutdown means every byte has gone out on the
/// wire. The descriptor itself is closed on drop.
pub struct SerialPort {
    fd: AsyncFd<File>,
    path: PathBuf,
    drain: Option<JoinHandle<io::Result<()>>>,
}

impl SerialPort {
    /// Open and configure a serial device.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(config.baud_rate)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        configure_raw(file.as_raw_fd(), speed, config).map_err(|source| {
            TransportError::Configure {
                path: path.clone(),
                source,
            }
        })?;

        let fd = AsyncFd::try_new(file).map_err(|err| TransportError::Open {
            path: path.clone(),
            source: err.into_parts().1,
        })?;

        info!(?path, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            fd,
            path,
            drain: None,
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "serial-tty"
    }
}

impl AsyncRead for SerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.fd.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| {
                let mut file: &File = inner.get_ref();
                file.read(unfilled)
            }) {
                Ok(Ok(len)) => {
                    trace!(len, "serial read");
                    buf.advance(len);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsyncWrite for SerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.fd.poll_write_ready(cx))?;
            match guard.try_io(|inner| {
                let mut file: &File = inner.get_ref();
                file.write(buf)
            }) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // Writes go straight to the kernel; there is no userspace buffer.
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.drain.is_none() {
            // The drain task owns a duplicate, so dropping the port mid-drain
            // cannot close the descriptor under it.
            let file = this.fd.get_ref().try_clone()?;
            this.drain = Some(tokio::task::spawn_blocking(move || drain_fd(&file)));
        }
        let Some(handle) = this.drain.as_mut() else {
            return Poll::Ready(Ok(()));
        };

        let joined = ready!(Pin::new(handle).poll(cx));
        this.drain = None;
        debug!(path = ?this.path, "serial output drained");

        Poll::Ready(match joined {
            Ok(result) => result,
            Err(join_err) => Err(io::Error::other(join_err)),
        })
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("type", &self.transport_name())
            .finish()
    }
}

/// Block until all queued output on `file` has been transmitted.
fn drain_fd(file: &File) -> io::Result<()> {
    loop {
        // SAFETY: `file` is an open descriptor owned by the caller for the
        // duration of the call; `tcdrain` does not retain it.
        let rc = unsafe { libc::tcdrain(file.as_raw_fd()) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn configure_raw(fd: RawFd, speed: libc::speed_t, config: &SerialConfig) -> io::Result<()> {
    // SAFETY: `termios` is a plain C struct; an all-zero value is valid
    // storage for `tcgetattr` to fill in.
    let mut tty: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor and `tty` is a valid, writable termios.
    if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `tty` was initialised by `tcgetattr` above.
    unsafe { libc::cfmakeraw(&mut tty) };
    tty.c_cflag |= libc::CLOCAL | libc::CREAD;
    if config.two_stop_bits {
        tty.c_cflag |= libc::CSTOPB;
    } else {
        tty.c_cflag &= !libc::CSTOPB;
    }
    tty.c_cc[libc::VMIN] = 0;
    tty.c_cc[libc::VTIME] = 0;

    // SAFETY: `tty` is a valid termios; `speed` is one of the libc `B*` constants.
    if unsafe { libc::cfsetispeed(&mut tty, speed) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::cfsetospeed(&mut tty, speed) } != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `fd` is an open descriptor and `tty` a fully initialised termios.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tty) } != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `fd` is an open descriptor; discarding stale I/O is harmless.
    unsafe { libc::tcflush(fd, libc::TCIOFLUSH) };
    Ok(())
}

fn baud_constant(baud_rate: u32) -> Result<libc::speed_t> {
    let speed = match baud_rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(speed)
}
