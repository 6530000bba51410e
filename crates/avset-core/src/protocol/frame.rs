//! Binary codec for AV controller frame headers.
//!
//! Wire format:
//! ```text
//! [version:2][size:2][cid:4][body:size]
//! ```
//! Total header size: 8 bytes. All multi-byte integers are big-endian.
//! `size` counts the body only, so a request of `total` bytes carries
//! `size = total - HEADER_SIZE`.

use crate::protocol::cid::Cid;
use crate::protocol::messages::{HEADER_SIZE, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use thiserror::Error;

/// Errors that can occur while building or parsing a frame header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The byte slice is shorter than the header.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The declared frame length cannot even hold the header.
    #[error("frame length {0} is smaller than the {HEADER_SIZE}-byte header")]
    FrameTooShort(usize),

    /// The frame would exceed the controller's packet size limit.
    #[error("frame length {size} exceeds the maximum packet size {MAX_PACKET_SIZE}")]
    PacketTooLarge { size: usize },

    /// The version field of a received header is not the supported version.
    #[error("unsupported protocol version: 0x{0:04X}")]
    UnsupportedVersion(u16),
}

/// The 8-byte header in front of every request, reply, and event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version; always [`PROTOCOL_VERSION`] on requests.
    pub version: u16,
    /// Body length in bytes, header excluded.
    pub size: u16,
    /// Command identifier.
    pub cid: Cid,
}

impl FrameHeader {
    /// Builds the header for a request whose total length (header included)
    /// is `total_len`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::FrameTooShort`] when `total_len` cannot hold the
    /// header and [`FrameError::PacketTooLarge`] when it exceeds
    /// [`MAX_PACKET_SIZE`].
    pub fn for_request(cid: Cid, total_len: usize) -> Result<Self, FrameError> {
        if total_len < HEADER_SIZE {
            return Err(FrameError::FrameTooShort(total_len));
        }
        if total_len > MAX_PACKET_SIZE {
            return Err(FrameError::PacketTooLarge { size: total_len });
        }
        Ok(Self {
            version: PROTOCOL_VERSION,
            size: (total_len - HEADER_SIZE) as u16,
            cid,
        })
    }

    /// Total frame length: header plus declared body.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.size as usize
    }

    /// Serialises the header into its 8 wire bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..2].copy_from_slice(&self.version.to_be_bytes());
        out[2..4].copy_from_slice(&self.size.to_be_bytes());
        out[4..8].copy_from_slice(&self.cid.0.to_be_bytes());
        out
    }

    /// Rejects headers whose version differs from [`PROTOCOL_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnsupportedVersion`] carrying the received value.
    pub fn ensure_supported_version(&self) -> Result<(), FrameError> {
        if self.version != PROTOCOL_VERSION {
            return Err(FrameError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes a header from the first [`HEADER_SIZE`] bytes of `bytes`.
///
/// The version is *not* checked here; receivers decide when a version
/// mismatch matters (see [`FrameHeader::ensure_supported_version`]).
///
/// # Errors
///
/// Returns [`FrameError::InsufficientData`] if fewer than 8 bytes are given.
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader, FrameError> {
    if bytes.len() < HEADER_SIZE {
        return Err(FrameError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }
    Ok(FrameHeader {
        version: u16::from_be_bytes([bytes[0], bytes[1]]),
        size: u16::from_be_bytes([bytes[2], bytes[3]]),
        cid: Cid(u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])),
    })
}

/// Builds a complete request frame: header followed by `body`.
///
/// # Errors
///
/// Returns [`FrameError::PacketTooLarge`] if the frame would not fit in
/// [`MAX_PACKET_SIZE`].
///
/// # Examples
///
/// ```rust
/// use avset_core::protocol::{build_request, decode_header, cid::Cid};
///
/// let frame = build_request(Cid::AV_GET_HW_CONF, &[]).unwrap();
/// let header = decode_header(&frame).unwrap();
/// assert_eq!(header.cid, Cid::AV_GET_HW_CONF);
/// assert_eq!(header.size, 0);
/// ```
pub fn build_request(cid: Cid, body: &[u8]) -> Result<Vec<u8>, FrameError> {
    let header = FrameHeader::for_request(cid, HEADER_SIZE + body.len())?;
    let mut buf = Vec::with_capacity(header.frame_len());
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(body);
    Ok(buf)
}

/// Appends one framed sub-packet (header + `body`) to `buf` and returns the
/// number of bytes appended.
///
/// Sub-packets are nested inside a batched set-parameters body, so the
/// packet size limit is enforced on the outer frame, not here.
pub fn append_subpacket(buf: &mut Vec<u8>, cid: Cid, body: &[u8]) -> usize {
    let header = FrameHeader {
        version: PROTOCOL_VERSION,
        size: body.len() as u16,
        cid,
    };
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(body);
    HEADER_SIZE + body.len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
