use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};
use xbeelink_frame::{carries_frame_id, encode_frame, frame_type_name, Frame};
use xbeelink_transport::ByteStream;

use crate::config::{check_timeout, SessionConfig};
use crate::correlator::Correlator;
use crate::deadline;
use crate::error::{Result, SessionError};
use crate::link::{Link, Outbound};
use crate::monitor::FrameStream;
use crate::resolver::DestinationCache;

/// A connection to one local XBee radio.
///
/// Cheap to clone; clones share the transport, the frame id space and the
/// destination cache. Requests may be issued concurrently from any clone.
/// The I/O task stops when the session is closed or every clone is dropped.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    correlator: Arc<Correlator>,
    cache: DestinationCache,
    outbound: mpsc::Sender<Outbound>,
    // Template receiver; new subscribers are cloned from it. Only the I/O
    // task holds the sender, so streams end when the transport does.
    frames: broadcast::Receiver<Frame>,
}

impl Session {
    /// Start a session over a transport that is still being opened.
    ///
    /// Returns immediately. Requests issued before `opener` resolves are
    /// written, in order, once it does. If it fails, those requests and all
    /// later ones fail with a transport error. Must be called from within a
    /// tokio runtime.
    pub fn with_opener<F, S>(opener: F, config: SessionConfig) -> Result<Self>
    where
        F: Future<Output = xbeelink_transport::Result<S>> + Send + 'static,
        S: ByteStream,
    {
        config.validate()?;

        let (outbound_tx, outbound_rx) = mpsc::channel(config.write_queue_capacity);
        let (inbound_tx, frames) = broadcast::channel(config.frame_buffer_capacity);
        let correlator = Arc::new(Correlator::new());

        let link = Link {
            outbound: outbound_rx,
            inbound: inbound_tx,
            correlator: Arc::clone(&correlator),
            api_mode: config.api_mode,
        };
        tokio::spawn(link.run(opener));

        info!(
            module = %config.module,
            api_mode = config.api_mode.ap(),
            "session started"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                correlator,
                cache: DestinationCache::default(),
                outbound: outbound_tx,
                frames,
            }),
        })
    }

    /// Start a session over an already-open byte stream.
    pub fn from_stream<S: ByteStream>(stream: S, config: SessionConfig) -> Result<Self> {
        Self::with_opener(async move { Ok(stream) }, config)
    }

    /// Open a serial device and start a session on it.
    #[cfg(unix)]
    pub fn open_serial(
        path: impl AsRef<std::path::Path>,
        serial: xbeelink_transport::SerialConfig,
        config: SessionConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        Self::with_opener(
            async move { xbeelink_transport::SerialPort::open(&path, &serial) },
            config,
        )
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Number of requests currently waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    /// Whether the I/O task has stopped.
    pub fn is_closed(&self) -> bool {
        self.inner.outbound.is_closed()
    }

    /// Subscribe to every inbound frame, matched or not.
    pub fn frames(&self) -> FrameStream {
        FrameStream::new(self.inner.frames.resubscribe())
    }

    /// Send `frame` with a fresh frame id and wait for the first inbound
    /// frame carrying that id and `response_type`.
    ///
    /// The frame's own id is overwritten. Frames and response types without
    /// an id field are rejected before an id is reserved. The timeout covers
    /// queueing, the write and the wait for the response.
    pub async fn send_and_await(
        &self,
        mut frame: Frame,
        response_type: u8,
        timeout: Duration,
    ) -> Result<Frame> {
        check_timeout(timeout)?;
        if !carries_frame_id(response_type) {
            return Err(SessionError::Validation(format!(
                "{} responses carry no frame id",
                frame_type_name(response_type)
            )));
        }
        if frame.frame_id().is_none() {
            return Err(uncorrelated(&frame));
        }

        let mut pending = self.inner.correlator.register(response_type)?;
        let frame_id = pending.id();
        if !frame.set_frame_id(frame_id) {
            return Err(uncorrelated(&frame));
        }

        let mut encoded = BytesMut::new();
        encode_frame(&frame, self.inner.config.api_mode, &mut encoded)?;
        debug!(
            frame_id,
            frame_type = frame_type_name(frame.frame_type()),
            expect = frame_type_name(response_type),
            "frame out"
        );

        let outbound = self.inner.outbound.clone();
        deadline::within(timeout, frame_id, async move {
            let (written_tx, written_rx) = oneshot::channel();
            outbound
                .send(Outbound::Frame {
                    frame_id,
                    bytes: encoded.freeze(),
                    written: written_tx,
                })
                .await
                .map_err(|_| SessionError::Closed)?;
            written_rx.await.map_err(|_| SessionError::Closed)??;
            pending.recv().await
        })
        .await
    }

    /// Write everything queued so far, drain the transport and shut it down.
    ///
    /// Outstanding requests fail with [`SessionError::Closed`]. Closing an
    /// already closed session is a no-op.
    pub async fn close(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .inner
            .outbound
            .send(Outbound::Close { done: done_tx })
            .await
            .is_err()
        {
            debug!("session already closed");
            return Ok(());
        }
        match done_rx.await {
            Ok(result) => Ok(result?),
            Err(_) => Ok(()),
        }
    }

    pub(crate) fn cache(&self) -> &DestinationCache {
        &self.inner.cache
    }

    pub(crate) fn effective_timeout(&self, requested: Option<Duration>) -> Result<Duration> {
        let timeout = requested.unwrap_or(self.inner.config.default_timeout);
        check_timeout(timeout)?;
        Ok(timeout)
    }
}

fn uncorrelated(frame: &Frame) -> SessionError {
    SessionError::Validation(format!(
        "{} frame (0x{:02X}) cannot carry a frame id",
        frame_type_name(frame.frame_type()),
        frame.frame_type()
    ))
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("module", &self.inner.config.module)
            .field("api_mode", &self.inner.config.api_mode)
            .field("pending", &self.pending_requests())
            .field("closed", &self.is_closed())
            .finish()
    }
}
