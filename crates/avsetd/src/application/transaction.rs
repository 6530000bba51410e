//! Transaction engine: one request out, one matching reply back.
//!
//! # Why a loop? (for beginners)
//!
//! The AV controller can push unsolicited *event* frames (cable plugged,
//! HDCP done) at any moment, including between our request and its reply.
//! After writing a request the engine therefore keeps reading frames,
//! reporting and skipping every event, until a non-event frame arrives.
//! That frame must be the reply: its command id is the request's id with
//! the reply bit set.
//!
//! The transport is a single shared channel, so a `tokio::sync::Mutex`
//! around it is held for the whole transaction.  Two transactions can never
//! interleave their frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use avset_core::protocol::cid::FrameClass;
use avset_core::protocol::frame::{decode_header, FrameError, FrameHeader};
use avset_core::protocol::messages::{HEADER_SIZE, MAX_PACKET_SIZE};
use avset_core::{Cid, CommandTable, EventKind};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

/// Default bound on every transport read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

// ── Transport seam ────────────────────────────────────────────────────────────

/// Errors raised by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No data arrived within the read timeout.
    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    /// The peer closed the channel.
    #[error("transport closed")]
    Closed,

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-level access to the AV controller channel.
///
/// `read` fills as much of `buf` as arrives before the channel goes idle or
/// closes and returns the count; a count smaller than `buf.len()` is a short
/// read.  A timeout with nothing received is an error.
#[async_trait]
pub trait AvTransport: Send {
    async fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;
}

// ── Errors and events ─────────────────────────────────────────────────────────

/// Why a transaction failed.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The engine has not been started or was shut down.
    #[error("AV controller is not available")]
    Unavailable,

    /// The command id is not in the command table.
    #[error("unsupported command id {0}")]
    UnsupportedCommand(Cid),

    /// The caller's reply buffer is smaller than the request itself.
    #[error("reply capacity {capacity} is smaller than the request length {request_len}")]
    ReplyCapacityTooSmall { capacity: usize, request_len: usize },

    /// The caller's reply buffer exceeds the controller's packet size.
    #[error("reply capacity {capacity} exceeds the maximum packet size {MAX_PACKET_SIZE}")]
    ReplyCapacityTooLarge { capacity: usize },

    /// The request could not be framed, or a received frame is oversized.
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Fewer bytes arrived than the frame declared.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    /// A non-event frame arrived that does not answer the request.
    #[error("reply command id {got} does not match request {expected}")]
    ReplyMismatch { expected: Cid, got: Cid },

    /// The reply carries a protocol version other than the supported one.
    #[error("malformed reply: unsupported protocol version 0x{0:04x}")]
    UnsupportedVersion(u16),
}

/// An unsolicited notification seen while waiting for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvEvent {
    pub kind: EventKind,
    /// Port id carried in the event's command id.
    pub port: u8,
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Serialises all traffic with the AV controller.
pub struct TransactionEngine {
    transport: Mutex<Box<dyn AvTransport>>,
    table: CommandTable,
    timeout: Duration,
    available: AtomicBool,
    events: Option<mpsc::Sender<AvEvent>>,
}

impl TransactionEngine {
    /// Creates an engine in the unavailable state.  Call
    /// [`set_available`](Self::set_available) once the controller is ready.
    pub fn new(transport: Box<dyn AvTransport>, timeout: Duration) -> Self {
        Self {
            transport: Mutex::new(transport),
            table: CommandTable::standard(),
            timeout,
            available: AtomicBool::new(false),
            events: None,
        }
    }

    /// Forwards every event observed during a transaction to `events`.
    pub fn with_events(mut self, events: mpsc::Sender<AvEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one transaction and returns the reply frame (header included),
    /// truncated to `reply_capacity` bytes.
    pub async fn transact(
        &self,
        cid: Cid,
        body: &[u8],
        reply_capacity: usize,
    ) -> Result<Vec<u8>, TransactionError> {
        let mut reply = vec![0u8; reply_capacity];
        let n = self.transact_into(cid, body, &mut reply).await?;
        reply.truncate(n);
        Ok(reply)
    }

    /// Runs one transaction, copying the reply frame into `reply`.
    ///
    /// Returns the number of bytes copied: the reply's full length, or
    /// `reply.len()` when the reply is longer.  Truncation is silent.  On
    /// any error `reply` is left untouched.
    ///
    /// # Errors
    ///
    /// Precondition violations ([`TransactionError::Unavailable`],
    /// [`TransactionError::UnsupportedCommand`], the capacity checks) are
    /// reported before anything is written.  Transport and protocol
    /// failures are returned as soon as they occur; nothing is retried.
    pub async fn transact_into(
        &self,
        cid: Cid,
        body: &[u8],
        reply: &mut [u8],
    ) -> Result<usize, TransactionError> {
        let result = self.run(cid, body, reply).await;
        if let Err(e) = &result {
            error!("transaction failed cid:{cid}: {e}");
        }
        result
    }

    async fn run(&self, cid: Cid, body: &[u8], reply: &mut [u8]) -> Result<usize, TransactionError> {
        if !self.is_available() {
            return Err(TransactionError::Unavailable);
        }

        let mut transport = self.transport.lock().await;

        if !self.table.is_supported(cid) {
            return Err(TransactionError::UnsupportedCommand(cid));
        }
        let header = FrameHeader::for_request(cid, HEADER_SIZE + body.len())?;
        let request_len = header.frame_len();
        if reply.len() < request_len {
            return Err(TransactionError::ReplyCapacityTooSmall {
                capacity: reply.len(),
                request_len,
            });
        }
        if reply.len() > MAX_PACKET_SIZE {
            return Err(TransactionError::ReplyCapacityTooLarge {
                capacity: reply.len(),
            });
        }

        let mut frame = Vec::with_capacity(request_len);
        frame.extend_from_slice(&header.to_bytes());
        frame.extend_from_slice(body);
        transport.write(&frame).await?;
        debug!("sent cid:{cid} size:{}", header.size);

        let received = loop {
            let received = self.read_frame(&mut **transport).await?;
            let header = decode_header(&received)?;
            match self.table.classify(header.cid) {
                FrameClass::Reply => break received,
                FrameClass::Event { kind, port } => {
                    debug!(
                        "recv event packet cid:{} port:0x{port:x} size:{}",
                        header.cid, header.size
                    );
                    self.dispatch_event(AvEvent { kind, port });
                }
                FrameClass::UnknownEvent { .. } => {
                    error!(
                        "failed event packet, cid:{} size:{}",
                        header.cid, header.size
                    );
                }
            }
        };

        let reply_header = decode_header(&received)?;
        if reply_header.cid != cid.reply() {
            return Err(TransactionError::ReplyMismatch {
                expected: cid.reply(),
                got: reply_header.cid,
            });
        }
        reply_header
            .ensure_supported_version()
            .map_err(|_| TransactionError::UnsupportedVersion(reply_header.version))?;

        let n = received.len().min(reply.len());
        reply[..n].copy_from_slice(&received[..n]);
        Ok(n)
    }

    /// Reads one header and its declared body.
    async fn read_frame(&self, transport: &mut dyn AvTransport) -> Result<Vec<u8>, TransactionError> {
        let mut head = [0u8; HEADER_SIZE];
        let got = transport.read(&mut head, self.timeout).await?;
        if got != HEADER_SIZE {
            return Err(TransactionError::ShortRead {
                expected: HEADER_SIZE,
                got,
            });
        }

        let header = decode_header(&head)?;
        let total = header.frame_len();
        if total > MAX_PACKET_SIZE {
            return Err(FrameError::PacketTooLarge { size: total }.into());
        }

        let mut frame = Vec::with_capacity(total);
        frame.extend_from_slice(&head);
        frame.resize(total, 0);
        if header.size > 0 {
            let got = transport.read(&mut frame[HEADER_SIZE..], self.timeout).await?;
            if got != header.size as usize {
                return Err(TransactionError::ShortRead {
                    expected: header.size as usize,
                    got,
                });
            }
        }
        Ok(frame)
    }

    fn dispatch_event(&self, event: AvEvent) {
        if let Some(events) = &self.events {
            if let Err(e) = events.try_send(event) {
                debug!("event {:?} not forwarded: {e}", event.kind);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
