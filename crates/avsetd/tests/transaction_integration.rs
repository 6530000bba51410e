//! Integration tests for the transaction engine over a real byte stream.
//!
//! # Purpose
//!
//! The unit tests in `application::transaction` drive the engine through the
//! scripted mock.  These tests put a [`StreamTransport`] over an in-memory
//! duplex pipe and run a tiny fake controller on the other end, so framing,
//! partial reads and stream closure are exercised byte for byte.
//!
//! ```text
//! TransactionEngine ── StreamTransport ══ duplex ══ fake controller task
//!                                                  (reads request, writes
//!                                                   events, then the reply)
//! ```

use std::sync::Arc;
use std::time::Duration;

use avset_core::protocol::commands::encode_reply;
use avset_core::protocol::frame::{build_request, decode_header, FrameError};
use avset_core::protocol::messages::{Status, HEADER_SIZE, PROTOCOL_VERSION};
use avset_core::{Cid, EventKind};
use avsetd::application::transaction::{AvEvent, TransactionEngine, TransactionError, TransportError};
use avsetd::infrastructure::transport::StreamTransport;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

const TIMEOUT: Duration = Duration::from_millis(500);

// ── Fake controller ───────────────────────────────────────────────────────────

/// Reads one request frame from `peer` and returns its command id.
async fn read_request(peer: &mut DuplexStream) -> Cid {
    let mut head = [0u8; HEADER_SIZE];
    peer.read_exact(&mut head).await.expect("request header");
    let header = decode_header(&head).expect("decode");
    let mut body = vec![0u8; header.size as usize];
    peer.read_exact(&mut body).await.expect("request body");
    header.cid
}

/// Answers one request: each of `events` first, then a success reply
/// carrying `data`.
async fn serve_once(mut peer: DuplexStream, events: Vec<Cid>, data: Vec<u8>) -> DuplexStream {
    let cid = read_request(&mut peer).await;
    for event in events {
        let frame = build_request(event, &[0, 0, 0, 0]).expect("event frame");
        peer.write_all(&frame).await.expect("write event");
    }
    let reply = encode_reply(cid, Status::Success, &data).expect("reply frame");
    peer.write_all(&reply).await.expect("write reply");
    peer
}

fn engine(local: DuplexStream) -> TransactionEngine {
    let engine = TransactionEngine::new(Box::new(StreamTransport::new(local)), TIMEOUT);
    engine.set_available(true);
    engine
}

// ── Event interleaving ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reply_found_after_any_number_of_events() {
    for n in 0..4 {
        // Arrange
        let (local, peer) = duplex(1024);
        let (tx, mut rx) = mpsc::channel(8);
        let engine = engine(local).with_events(tx);
        let events = vec![Cid(Cid::EVENT_UNPLUGGED.0 | (n << 16)); n as usize];
        let server = tokio::spawn(serve_once(peer, events, vec![]));

        // Act
        let reply = assert_ok!(engine.transact(Cid::AV_FIN, &[], 12).await);

        // Assert
        assert_eq!(decode_header(&reply).unwrap().cid, Cid::AV_FIN.reply(), "n={n}");
        for _ in 0..n {
            assert_eq!(
                rx.recv().await,
                Some(AvEvent {
                    kind: EventKind::Unplugged,
                    port: n as u8
                })
            );
        }
        assert!(rx.try_recv().is_err(), "no extra events for n={n}");
        server.await.unwrap();
    }
}

#[tokio::test]
async fn test_unregistered_event_is_skipped() {
    let (local, peer) = duplex(1024);
    let engine = engine(local);
    let server = tokio::spawn(serve_once(peer, vec![Cid(0x1000_0042)], vec![]));

    let reply = assert_ok!(engine.transact(Cid::AV_FIN, &[], 12).await);

    assert_eq!(decode_header(&reply).unwrap().cid, Cid::AV_FIN.reply());
    server.await.unwrap();
}

// ── Reply sizing ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_long_reply_is_truncated_to_capacity() {
    // Arrange: a 40-byte data section, but the caller keeps only 16 bytes
    let (local, peer) = duplex(1024);
    let engine = engine(local);
    let data: Vec<u8> = (0..40).collect();
    let server = tokio::spawn(serve_once(peer, vec![], data));

    // Act
    let mut buf = [0u8; 16];
    let n = assert_ok!(engine.transact_into(Cid::AV_GET_HW_CONF, &[], &mut buf).await);

    // Assert
    assert_eq!(n, 16);
    let header = decode_header(&buf).unwrap();
    assert_eq!(header.size as usize, 4 + 40);
    assert_eq!(&buf[12..16], &[0, 1, 2, 3]);
    server.await.unwrap();
}

#[tokio::test]
async fn test_short_reply_copies_only_what_arrived() {
    let (local, peer) = duplex(1024);
    let engine = engine(local);
    let server = tokio::spawn(serve_once(peer, vec![], vec![]));

    let mut buf = [0xEEu8; 64];
    let n = assert_ok!(engine.transact_into(Cid::AV_FIN, &[], &mut buf).await);

    assert_eq!(n, HEADER_SIZE + 4);
    assert_eq!(buf[n], 0xEE);
    server.await.unwrap();
}

// ── Failures ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_truncated_body_is_short_read() {
    // Arrange: header declares 20 body bytes, only 4 arrive before close
    let (local, mut peer) = duplex(1024);
    let engine = engine(local);
    let server = tokio::spawn(async move {
        read_request(&mut peer).await;
        let mut frame = encode_reply(Cid::AV_FIN, Status::Success, &[]).unwrap();
        frame[2..4].copy_from_slice(&20u16.to_be_bytes());
        peer.write_all(&frame).await.unwrap();
    });

    // Act
    let mut buf = [0x55u8; 32];
    let result = engine.transact_into(Cid::AV_FIN, &[], &mut buf).await;

    // Assert
    assert!(matches!(
        result,
        Err(TransactionError::ShortRead {
            expected: 20,
            got: 4
        })
    ));
    assert_eq!(buf, [0x55; 32]);
    server.await.unwrap();
}

#[tokio::test]
async fn test_oversized_declared_frame_is_rejected() {
    let (local, mut peer) = duplex(1024);
    let engine = engine(local);
    let server = tokio::spawn(async move {
        read_request(&mut peer).await;
        let mut head = [0u8; HEADER_SIZE];
        head[0..2].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        head[2..4].copy_from_slice(&600u16.to_be_bytes());
        head[4..8].copy_from_slice(&Cid::AV_FIN.reply().0.to_be_bytes());
        peer.write_all(&head).await.unwrap();
        peer
    });

    let result = engine.transact(Cid::AV_FIN, &[], 12).await;

    assert!(matches!(
        result,
        Err(TransactionError::Frame(FrameError::PacketTooLarge { size: 608 }))
    ));
    drop(server.await.unwrap());
}

#[tokio::test]
async fn test_closed_stream_is_transport_error() {
    let (local, mut peer) = duplex(1024);
    let engine = engine(local);
    let server = tokio::spawn(async move {
        read_request(&mut peer).await;
        drop(peer);
    });

    let result = engine.transact(Cid::AV_FIN, &[], 12).await;

    assert!(matches!(
        result,
        Err(TransactionError::Transport(TransportError::Closed))
    ));
    server.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_silent_controller_times_out_without_retry() {
    let (local, mut peer) = duplex(1024);
    let engine = engine(local);
    let server = tokio::spawn(async move {
        let cid = read_request(&mut peer).await;
        // Keep the pipe open; a second request would be visible here.
        let mut extra = [0u8; 1];
        let more = tokio::time::timeout(Duration::from_secs(60), peer.read(&mut extra)).await;
        (cid, more.is_err())
    });

    let result = engine.transact(Cid::AV_FIN, &[], 12).await;
    assert_err!(&result);
    assert!(matches!(
        result,
        Err(TransactionError::Transport(TransportError::Timeout(t))) if t == TIMEOUT
    ));

    let (cid, nothing_more) = server.await.unwrap();
    assert_eq!(cid, Cid::AV_FIN);
    assert!(nothing_more, "engine must not resend");
}

// ── Serialisation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_transactions_do_not_interleave() {
    // Arrange: the controller answers strictly one request at a time
    let (local, peer) = duplex(1024);
    let engine = Arc::new(engine(local));
    let server = tokio::spawn(async move {
        let peer = serve_once(peer, vec![Cid::EVENT_HDCP_DONE], vec![]).await;
        serve_once(peer, vec![], vec![]).await;
    });

    // Act
    let a = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.transact(Cid::VIDEO_INIT, &[], 12).await })
    };
    let b = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.transact(Cid::AUDIO_INIT, &[], 12).await })
    };
    let reply_a = a.await.unwrap().unwrap();
    let reply_b = b.await.unwrap().unwrap();

    // Assert: each caller got the reply to its own request
    assert_eq!(decode_header(&reply_a).unwrap().cid, Cid::VIDEO_INIT.reply());
    assert_eq!(decode_header(&reply_b).unwrap().cid, Cid::AUDIO_INIT.reply());
    server.await.unwrap();
}
