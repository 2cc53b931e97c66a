mod common;

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use common::{at_response, connect, MockRadio};
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::oneshot;
use xbeelink_frame::{ApiMode, Frame};
use xbeelink_session::{LocalCommand, ModuleKind, Session, SessionConfig, SessionError};
use xbeelink_transport::TransportError;

#[tokio::test]
async fn writes_wait_for_the_transport_to_open() {
    let (open_tx, open_rx) = oneshot::channel::<DuplexStream>();
    let session = Session::with_opener(
        async move {
            open_rx
                .await
                .map_err(|_| TransportError::Unavailable("opener dropped".to_string()))
        },
        SessionConfig::new(ModuleKind::ZigBee),
    )
    .unwrap();

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.local_command(LocalCommand::new("SH")?).await }
    });
    let second = tokio::spawn({
        let session = session.clone();
        async move { session.local_command(LocalCommand::new("SL")?).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (host, radio) = tokio::io::duplex(4096);
    open_tx.send(host).unwrap();
    let mut radio = MockRadio::new(radio, ApiMode::Unescaped);

    for _ in 0..2 {
        match radio.next_request().await {
            Frame::AtCommand(request) => {
                let command = request.command.clone();
                radio
                    .reply(at_response(request.id, &command, 0, command.as_bytes()))
                    .await;
            }
            other => panic!("expected AT command, got {other:?}"),
        }
    }

    assert_eq!(first.await.unwrap().unwrap().as_ref(), b"SH");
    assert_eq!(second.await.unwrap().unwrap().as_ref(), b"SL");
}

#[tokio::test]
async fn failed_open_fails_queued_and_later_writes() {
    let session = Session::with_opener(
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err::<DuplexStream, _>(TransportError::Unavailable("no such device".to_string()))
        },
        SessionConfig::new(ModuleKind::ZigBee),
    )
    .unwrap();

    let queued = session.local_command(LocalCommand::new("SH").unwrap()).await;
    assert!(matches!(
        queued,
        Err(SessionError::Transport(TransportError::Unavailable(_)))
    ));

    let later = session.local_command(LocalCommand::new("SL").unwrap()).await;
    assert!(matches!(later, Err(SessionError::Transport(_))));
    assert_eq!(session.pending_requests(), 0);
}

#[tokio::test]
async fn slow_open_counts_against_the_timeout() {
    let session = Session::with_opener(
        std::future::pending::<xbeelink_transport::Result<DuplexStream>>(),
        SessionConfig::new(ModuleKind::ZigBee),
    )
    .unwrap();

    let outcome = session
        .local_command(
            LocalCommand::new("SH")
                .unwrap()
                .with_timeout(Duration::from_millis(40)),
        )
        .await;
    assert!(matches!(outcome, Err(SessionError::Timeout(_))));

    // Closing never waits on the opener.
    tokio::time::timeout(Duration::from_secs(1), session.close())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn close_fails_outstanding_requests() {
    let (session, mut radio) = connect(ModuleKind::ZigBee);
    let call = tokio::spawn({
        let session = session.clone();
        async move { session.local_command(LocalCommand::new("SL")?).await }
    });
    let _ = radio.next_request().await;

    session.close().await.unwrap();
    assert!(matches!(call.await.unwrap(), Err(SessionError::Closed)));
    radio.expect_eof().await;

    // Idempotent, and nothing new is accepted.
    session.close().await.unwrap();
    let after = session.local_command(LocalCommand::new("SH").unwrap()).await;
    assert!(matches!(after, Err(SessionError::Closed)));
    assert!(session.is_closed());
}

#[tokio::test]
async fn radio_hangup_ends_requests_and_streams() {
    let (session, mut radio) = connect(ModuleKind::ZigBee);
    let mut frames = session.frames();
    let call = tokio::spawn({
        let session = session.clone();
        async move { session.local_command(LocalCommand::new("SL")?).await }
    });
    let _ = radio.next_request().await;

    drop(radio);

    assert!(matches!(call.await.unwrap(), Err(SessionError::Closed)));
    let end = tokio::time::timeout(Duration::from_secs(1), frames.next())
        .await
        .unwrap();
    assert_eq!(end, None);
}

/// Duplex stream that records the order of write-side operations.
struct Recorder {
    inner: DuplexStream,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Recorder {
    fn note(&self, event: &'static str) {
        self.log.lock().unwrap().push(event);
    }
}

impl AsyncRead for Recorder {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for Recorder {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if matches!(poll, Poll::Ready(Ok(_))) {
            self.note("write");
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let poll = Pin::new(&mut self.inner).poll_flush(cx);
        if poll.is_ready() {
            self.note("flush");
        }
        poll
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let poll = Pin::new(&mut self.inner).poll_shutdown(cx);
        if poll.is_ready() {
            self.note("shutdown");
        }
        poll
    }
}

#[tokio::test]
async fn close_writes_queued_frames_then_drains_then_shuts_down() {
    let (host, radio) = tokio::io::duplex(4096);
    let log = Arc::new(Mutex::new(Vec::new()));
    let session = Session::from_stream(
        Recorder {
            inner: host,
            log: Arc::clone(&log),
        },
        SessionConfig::new(ModuleKind::ZigBee),
    )
    .unwrap();
    let mut radio = MockRadio::new(radio, ApiMode::Unescaped);

    let call = tokio::spawn({
        let session = session.clone();
        async move { session.local_command(LocalCommand::new("SL")?).await }
    });
    // Let the request reach the queue ahead of the close marker.
    common::eventually(|| session.pending_requests() == 1).await;
    session.close().await.unwrap();

    match radio.next_request().await {
        Frame::AtCommand(request) => assert_eq!(request.command, "SL"),
        other => panic!("expected AT command, got {other:?}"),
    }
    radio.expect_eof().await;
    assert!(matches!(call.await.unwrap(), Err(SessionError::Closed)));

    let log = log.lock().unwrap().clone();
    assert!(log.contains(&"write"));
    assert_eq!(&log[log.len() - 2..], ["flush", "shutdown"]);
    let last_write = log.iter().rposition(|e| *e == "write").unwrap();
    let shutdown = log.iter().position(|e| *e == "shutdown").unwrap();
    assert!(last_write < shutdown);
}
