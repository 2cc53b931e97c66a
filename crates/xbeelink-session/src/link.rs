//! The I/O task that owns the transport.
//!
//! One task per session serialises every write in submission order and
//! decodes every inbound frame. Inbound frames are offered to the correlator
//! and then published to subscribers.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, trace, warn};
use xbeelink_frame::{frame_type_name, ApiMode, Frame, XBeeCodec};
use xbeelink_transport::{ByteStream, TransportError};

use crate::correlator::Correlator;

type Ack = oneshot::Sender<Result<(), TransportError>>;

/// Work submitted to the I/O task.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// Write one encoded frame.
    Frame {
        frame_id: u8,
        bytes: Bytes,
        written: Ack,
    },
    /// Drain and shut the transport down once everything queued before it
    /// has been written.
    Close { done: Ack },
}

impl Outbound {
    fn reject(self, reason: impl Fn() -> TransportError) {
        let ack = match self {
            Self::Frame { written, .. } => written,
            Self::Close { done } => done,
        };
        let _ = ack.send(Err(reason()));
    }
}

pub(crate) struct Link {
    pub(crate) outbound: mpsc::Receiver<Outbound>,
    pub(crate) inbound: broadcast::Sender<Frame>,
    pub(crate) correlator: Arc<Correlator>,
    pub(crate) api_mode: ApiMode,
}

impl Link {
    /// Wait for the transport to open, then serve it until closed.
    pub(crate) async fn run<F, S>(mut self, opener: F)
    where
        F: Future<Output = xbeelink_transport::Result<S>>,
        S: ByteStream,
    {
        if let Some((stream, backlog)) = self.open(opener).await {
            self.serve(stream, backlog).await;
        }
        self.correlator.close();
        self.outbound.close();
        while let Ok(leftover) = self.outbound.try_recv() {
            match leftover {
                Outbound::Close { done } => {
                    let _ = done.send(Ok(()));
                }
                frame => frame.reject(|| TransportError::Closed),
            }
        }
        debug!("link task stopped");
    }

    /// Await the opener while holding back writes submitted in the meantime.
    async fn open<F, S>(&mut self, opener: F) -> Option<(S, Vec<Outbound>)>
    where
        F: Future<Output = xbeelink_transport::Result<S>>,
        S: ByteStream,
    {
        tokio::pin!(opener);
        let mut backlog = Vec::new();
        loop {
            tokio::select! {
                opened = &mut opener => {
                    return match opened {
                        Ok(stream) => {
                            info!(queued = backlog.len(), "transport open");
                            Some((stream, backlog))
                        }
                        Err(err) => {
                            error!(%err, "transport failed to open");
                            let reason = err.to_string();
                            for queued in backlog {
                                queued.reject(|| TransportError::Unavailable(reason.clone()));
                            }
                            // Anything submitted later fails the same way.
                            while let Some(late) = self.outbound.recv().await {
                                match late {
                                    Outbound::Close { done } => {
                                        let _ = done.send(Ok(()));
                                        break;
                                    }
                                    frame => frame.reject(|| TransportError::Unavailable(reason.clone())),
                                }
                            }
                            None
                        }
                    };
                }
                command = self.outbound.recv() => match command {
                    Some(Outbound::Close { done }) => {
                        debug!(queued = backlog.len(), "closed before transport opened");
                        for queued in backlog {
                            queued.reject(|| TransportError::Closed);
                        }
                        let _ = done.send(Ok(()));
                        return None;
                    }
                    Some(frame) => backlog.push(frame),
                    None => return None,
                },
            }
        }
    }

    async fn serve<S: ByteStream>(&mut self, stream: S, backlog: Vec<Outbound>) {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut frames = FramedRead::new(reader, XBeeCodec::new(self.api_mode));

        for queued in backlog {
            if let Outbound::Frame {
                frame_id,
                bytes,
                written,
            } = queued
            {
                let _ = written.send(write_frame(&mut writer, frame_id, &bytes).await);
            }
        }

        loop {
            tokio::select! {
                command = self.outbound.recv() => match command {
                    Some(Outbound::Frame { frame_id, bytes, written }) => {
                        let _ = written.send(write_frame(&mut writer, frame_id, &bytes).await);
                    }
                    Some(Outbound::Close { done }) => {
                        let result = shutdown(&mut writer).await;
                        if let Err(err) = &result {
                            warn!(%err, "transport shutdown failed");
                        } else {
                            info!("transport closed");
                        }
                        let _ = done.send(result);
                        return;
                    }
                    None => {
                        debug!("every session handle dropped");
                        if let Err(err) = shutdown(&mut writer).await {
                            warn!(%err, "transport shutdown failed");
                        }
                        return;
                    }
                },
                inbound = frames.next() => match inbound {
                    Some(Ok(frame)) => self.deliver(frame),
                    Some(Err(err)) => {
                        error!(%err, "inbound stream failed");
                        return;
                    }
                    None => {
                        info!("transport reached end of stream");
                        return;
                    }
                },
            }
        }
    }

    fn deliver(&self, frame: Frame) {
        debug!(
            frame_type = frame_type_name(frame.frame_type()),
            frame_id = ?frame.frame_id(),
            "frame in"
        );
        self.correlator.route(&frame);
        // No subscribers is fine.
        let _ = self.inbound.send(frame);
    }
}

async fn write_frame<W>(writer: &mut W, frame_id: u8, bytes: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    trace!(frame_id, bytes = ?bytes, "frame out");
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

async fn shutdown<W>(writer: &mut W) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    writer.flush().await?;
    writer.shutdown().await?;
    Ok(())
}
