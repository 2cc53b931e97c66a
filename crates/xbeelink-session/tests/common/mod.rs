#![allow(dead_code)]

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};
use xbeelink_frame::{
    Address64, ApiMode, AtCommandResponse, Frame, RemoteCommandResponse, XBeeCodec,
};
use xbeelink_session::{ModuleKind, Session, SessionConfig};

/// The radio end of an in-memory serial link. Reads what the session
/// writes and answers with encoded frames.
pub struct MockRadio {
    requests: FramedRead<ReadHalf<DuplexStream>, XBeeCodec>,
    replies: FramedWrite<WriteHalf<DuplexStream>, XBeeCodec>,
}

impl MockRadio {
    pub fn new(stream: DuplexStream, mode: ApiMode) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            requests: FramedRead::new(reader, XBeeCodec::new(mode)),
            replies: FramedWrite::new(writer, XBeeCodec::new(mode)),
        }
    }

    /// Next frame written by the session.
    pub async fn next_request(&mut self) -> Frame {
        tokio::time::timeout(Duration::from_secs(2), self.requests.next())
            .await
            .expect("session wrote nothing")
            .expect("link closed")
            .expect("undecodable request")
    }

    /// Assert the session writes nothing for `window`.
    pub async fn assert_quiet(&mut self, window: Duration) {
        if let Ok(Some(frame)) = tokio::time::timeout(window, self.requests.next()).await {
            panic!("unexpected frame written: {frame:?}");
        }
    }

    /// Wait for the session to shut its side of the link.
    pub async fn expect_eof(&mut self) {
        let next = tokio::time::timeout(Duration::from_secs(2), self.requests.next())
            .await
            .expect("link still open");
        assert!(next.is_none(), "expected end of stream, got {next:?}");
    }

    pub async fn reply(&mut self, frame: Frame) {
        self.replies.send(frame).await.expect("reply write failed");
    }
}

pub fn connect(module: ModuleKind) -> (Session, MockRadio) {
    connect_with(SessionConfig::new(module))
}

pub fn connect_with(config: SessionConfig) -> (Session, MockRadio) {
    let (host, radio) = tokio::io::duplex(4096);
    let mode = config.api_mode;
    let session = Session::from_stream(host, config).expect("valid config");
    (session, MockRadio::new(radio, mode))
}

pub fn at_response(id: u8, command: &str, status: u8, data: &[u8]) -> Frame {
    Frame::AtCommandResponse(AtCommandResponse {
        id,
        command: command.to_string(),
        status,
        data: Bytes::copy_from_slice(data),
    })
}

pub fn remote_response(id: u8, remote64: Address64, command: &str, status: u8, data: &[u8]) -> Frame {
    Frame::RemoteCommandResponse(RemoteCommandResponse {
        id,
        remote64,
        remote16: [0x12, 0x34],
        command: command.to_string(),
        status,
        data: Bytes::copy_from_slice(data),
    })
}

/// Poll until `check` holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}
