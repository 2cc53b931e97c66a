use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_core::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::ReusableBoxFuture;
use tracing::warn;
use xbeelink_frame::{Frame, ZIGBEE_IO_DATA_SAMPLE_RX, ZIGBEE_RECEIVE_PACKET};

type Received = (Result<Frame, RecvError>, broadcast::Receiver<Frame>);

async fn next_frame(mut rx: broadcast::Receiver<Frame>) -> Received {
    let result = rx.recv().await;
    (result, rx)
}

/// Inbound frames from a session, optionally narrowed to one frame type.
///
/// Ends when the session's transport stops. A subscriber that falls more
/// than the configured buffer behind skips the missed frames.
pub struct FrameStream {
    inner: ReusableBoxFuture<'static, Received>,
    frame_type: Option<u8>,
}

impl FrameStream {
    pub(crate) fn new(rx: broadcast::Receiver<Frame>) -> Self {
        Self {
            inner: ReusableBoxFuture::new(next_frame(rx)),
            frame_type: None,
        }
    }

    /// Keep only frames of `frame_type`.
    pub fn of_type(mut self, frame_type: u8) -> Self {
        self.frame_type = Some(frame_type);
        self
    }

    /// Data packets received from remote nodes.
    pub fn transmissions(self) -> Self {
        self.of_type(ZIGBEE_RECEIVE_PACKET)
    }

    /// I/O sample reports from remote nodes.
    pub fn io_samples(self) -> Self {
        self.of_type(ZIGBEE_IO_DATA_SAMPLE_RX)
    }

    /// Next frame, or `None` once the transport has stopped.
    pub async fn recv(&mut self) -> Option<Frame> {
        std::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }
}

impl Stream for FrameStream {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        loop {
            let (result, rx) = ready!(self.inner.poll(cx));
            self.inner.set(next_frame(rx));
            match result {
                Ok(frame) => {
                    if self.frame_type.is_some_and(|t| t != frame.frame_type()) {
                        continue;
                    }
                    return Poll::Ready(Some(frame));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "frame subscriber fell behind");
                }
                Err(RecvError::Closed) => return Poll::Ready(None),
            }
        }
    }
}

impl fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameStream")
            .field("frame_type", &self.frame_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::StreamExt;
    use xbeelink_frame::{ModemStatus, ZigbeeReceivePacket};

    use super::*;

    fn packet(data: &'static [u8]) -> Frame {
        Frame::ZigbeeReceivePacket(ZigbeeReceivePacket {
            remote64: [0, 0x13, 0xA2, 0, 1, 2, 3, 4],
            remote16: [0x12, 0x34],
            options: 1,
            data: Bytes::from_static(data),
        })
    }

    #[tokio::test]
    async fn filters_by_frame_type_and_ends_with_sender() {
        let (tx, rx) = broadcast::channel(8);
        let mut stream = FrameStream::new(rx).transmissions();

        tx.send(Frame::ModemStatus(ModemStatus { status: 6 })).unwrap();
        tx.send(packet(b"one")).unwrap();
        drop(tx);

        assert_eq!(stream.next().await, Some(packet(b"one")));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let (tx, rx) = broadcast::channel(2);
        let mut stream = FrameStream::new(rx);

        for data in [&b"a"[..], &b"b"[..], &b"c"[..], &b"d"[..]] {
            tx.send(packet(data)).unwrap();
        }

        assert_eq!(stream.recv().await, Some(packet(b"c")));
        assert_eq!(stream.recv().await, Some(packet(b"d")));
    }
}
