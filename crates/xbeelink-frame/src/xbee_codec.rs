use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{decode_frame, encode_frame, ApiMode};
use crate::error::FrameError;
use crate::frame::Frame;

/// `tokio_util` codec for API frames.
///
/// Corrupt frames (bad checksum, truncated fields) are logged and skipped,
/// so a noisy serial line never ends a `FramedRead` stream. Only I/O errors
/// are surfaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct XBeeCodec {
    mode: ApiMode,
    discarded: u64,
}

impl XBeeCodec {
    pub fn new(mode: ApiMode) -> Self {
        Self { mode, discarded: 0 }
    }

    /// Number of corrupt frames skipped so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl Decoder for XBeeCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            match decode_frame(src, self.mode) {
                Ok(frame) => return Ok(frame),
                Err(err) if err.is_recoverable() => {
                    self.discarded += 1;
                    warn!(%err, discarded = self.discarded, "discarding corrupt frame");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Encoder<Frame> for XBeeCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(&item, self.mode, dst)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::frame::{ModemStatus, TxStatus, ZigbeeReceivePacket};

    #[tokio::test]
    async fn framed_roundtrip_over_duplex() {
        let (client, server) = tokio::io::duplex(256);
        let mut sink = FramedWrite::new(client, XBeeCodec::new(ApiMode::Escaped));
        let mut stream = FramedRead::new(server, XBeeCodec::new(ApiMode::Escaped));

        let packet = Frame::ZigbeeReceivePacket(ZigbeeReceivePacket {
            remote64: [0, 0x13, 0xA2, 0, 0x40, 0x7D, 0x11, 0x13],
            remote16: [0x7E, 0x7E],
            options: 1,
            data: Bytes::from_static(b"hello"),
        });
        sink.send(packet.clone()).await.unwrap();
        sink.send(Frame::TxStatus(TxStatus { id: 3, delivery_status: 0 }))
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), packet);
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            Frame::TxStatus(TxStatus { id: 3, delivery_status: 0 })
        );
    }

    #[test]
    fn decoder_skips_corrupt_frames() {
        let mut codec = XBeeCodec::new(ApiMode::Unescaped);
        let mut buf = BytesMut::new();
        codec
            .encode(Frame::ModemStatus(ModemStatus { status: 0 }), &mut buf)
            .unwrap();
        let last = buf.len() - 1;
        buf[last] = buf[last].wrapping_add(1);
        codec
            .encode(Frame::ModemStatus(ModemStatus { status: 6 }), &mut buf)
            .unwrap();

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, Frame::ModemStatus(ModemStatus { status: 6 }));
        assert_eq!(codec.discarded(), 1);
    }
}
