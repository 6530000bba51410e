//! Command identifiers and the classification table.
//!
//! # How are replies told apart from events? (for beginners)
//!
//! Every frame carries a 32-bit command id (CID).  Two bit ranges matter:
//!
//! - **Reply bit** (`0x8000_0000`): the controller answers a request with the
//!   same CID plus this bit set.  A request for `0x0000_0003` is answered by
//!   `0x8000_0003`.
//! - **Event bit** (`0x1000_0000`): unsolicited notifications such as "cable
//!   plugged".  Bits 16..24 of an event CID carry the port that raised it.
//!
//! The [`CommandTable`] lists every CID this host understands, in a fixed
//! order.  A lookup compares entries under a *mask*: the full mask asks "is
//! this exact command supported?", the event mask asks "is this frame an
//! event?".  The first entry that matches wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mask for exact (dispatch) lookups.
pub const CID_MASK: u32 = 0xFFFF_FFFF;

/// Mask selecting the event class bit.
pub const EVENT_CMD_MASK: u32 = 0x1000_0000;

/// Mask selecting the event id, port bits excluded.
pub const EVENT_ID_MASK: u32 = 0x0000_FFFF;

/// Bit set by the controller on the reply to a request.
pub const REPLY_BIT: u32 = 0x8000_0000;

/// A 32-bit command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cid(pub u32);

impl Cid {
    // init
    pub const AV_INIT: Cid = Cid(0x0000_0001);
    pub const AV_FIN: Cid = Cid(0x0000_0002);
    pub const VIDEO_INIT: Cid = Cid(0x0100_0001);
    pub const AUDIO_INIT: Cid = Cid(0x0200_0001);

    // set
    pub const AV_ENABLE_EVENT: Cid = Cid(0x0000_0006);
    pub const AV_DISABLE_EVENT: Cid = Cid(0x0000_0007);
    pub const AV_VIDEO_CS: Cid = Cid(0x0001_0001);
    pub const AV_VIDEO_MUTE: Cid = Cid(0x0001_0002);
    pub const AV_VIDEO_DISABLE_SIG: Cid = Cid(0x0001_0003);
    pub const AV_AUDIO_PARAM: Cid = Cid(0x0002_0001);
    pub const AV_AUDIO_MUTE: Cid = Cid(0x0002_0002);
    pub const AV_HDMI_MODE: Cid = Cid(0x0004_0001);
    pub const AV_TV_MUTE: Cid = Cid(0x0000_000A);
    pub const VIDEO_MODE: Cid = Cid(0x0100_0002);
    pub const VIDEO_FORMAT: Cid = Cid(0x0100_0004);
    pub const VIDEO_PITCH: Cid = Cid(0x0100_0005);
    pub const AUDIO_MODE: Cid = Cid(0x0200_0002);
    pub const AUDIO_MUTE: Cid = Cid(0x0200_0003);
    pub const AUDIO_ACTIVE: Cid = Cid(0x0200_0004);
    pub const AUDIO_INACTIVE: Cid = Cid(0x0200_0005);
    pub const AVB_PARAM: Cid = Cid(0x0400_0001);

    // get
    pub const AV_GET_HW_CONF: Cid = Cid(0x0000_0003);
    pub const AV_GET_MONITOR_INFO: Cid = Cid(0x0000_0004);

    // event
    pub const EVENT_UNPLUGGED: Cid = Cid(0x1000_0001);
    pub const EVENT_PLUGGED: Cid = Cid(0x1000_0002);
    pub const EVENT_HDCP_DONE: Cid = Cid(0x1000_0003);
    pub const EVENT_HDCP_FAIL: Cid = Cid(0x1000_0004);
    pub const EVENT_HDCP_AUTH: Cid = Cid(0x1000_0005);
    pub const EVENT_HDCP_ERROR: Cid = Cid(0x1000_0006);

    /// The CID the controller uses when replying to this request.
    pub fn reply(self) -> Cid {
        Cid(self.0 | REPLY_BIT)
    }

    /// Whether the event class bit is set.
    pub fn has_event_bit(self) -> bool {
        self.0 & EVENT_CMD_MASK != 0
    }

    /// Port id embedded in an event CID.
    pub fn event_port(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    fn matches(self, other: Cid, mask: u32) -> bool {
        self.0 & mask == other.0 & mask
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Unsolicited notifications the controller can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Unplugged,
    Plugged,
    HdcpDone,
    HdcpFail,
    HdcpAuth,
    HdcpError,
}

impl EventKind {
    fn from_cid(cid: Cid) -> Option<Self> {
        match cid {
            Cid::EVENT_UNPLUGGED => Some(EventKind::Unplugged),
            Cid::EVENT_PLUGGED => Some(EventKind::Plugged),
            Cid::EVENT_HDCP_DONE => Some(EventKind::HdcpDone),
            Cid::EVENT_HDCP_FAIL => Some(EventKind::HdcpFail),
            Cid::EVENT_HDCP_AUTH => Some(EventKind::HdcpAuth),
            Cid::EVENT_HDCP_ERROR => Some(EventKind::HdcpError),
            _ => None,
        }
    }
}

/// Result of classifying an inbound frame's CID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    /// Not an event: the frame is a candidate reply.
    Reply,
    /// A registered event, with the port that raised it.
    Event { kind: EventKind, port: u8 },
    /// The event bit is set but no registered event matches the id.
    UnknownEvent { port: u8 },
}

/// Every CID recognised by this host, in lookup order.
const SUPPORTED_CIDS: &[Cid] = &[
    // init
    Cid::AV_INIT,
    Cid::AV_FIN,
    Cid::VIDEO_INIT,
    Cid::AUDIO_INIT,
    // set
    Cid::AV_ENABLE_EVENT,
    Cid::AV_DISABLE_EVENT,
    Cid::AV_VIDEO_CS,
    Cid::AV_VIDEO_MUTE,
    Cid::AV_VIDEO_DISABLE_SIG,
    Cid::AV_AUDIO_PARAM,
    Cid::AV_AUDIO_MUTE,
    Cid::AV_HDMI_MODE,
    Cid::AV_TV_MUTE,
    Cid::VIDEO_MODE,
    Cid::VIDEO_FORMAT,
    Cid::VIDEO_PITCH,
    Cid::AUDIO_MODE,
    Cid::AUDIO_MUTE,
    Cid::AUDIO_ACTIVE,
    Cid::AUDIO_INACTIVE,
    Cid::AVB_PARAM,
    // get
    Cid::AV_GET_HW_CONF,
    Cid::AV_GET_MONITOR_INFO,
    // event
    Cid::EVENT_UNPLUGGED,
    Cid::EVENT_PLUGGED,
    Cid::EVENT_HDCP_DONE,
    Cid::EVENT_HDCP_FAIL,
    Cid::EVENT_HDCP_AUTH,
    Cid::EVENT_HDCP_ERROR,
];

/// Ordered, read-only table of recognised CIDs.
#[derive(Debug, Clone, Copy)]
pub struct CommandTable {
    entries: &'static [Cid],
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl CommandTable {
    /// The controller's full command set.
    pub const fn standard() -> Self {
        Self {
            entries: SUPPORTED_CIDS,
        }
    }

    /// Entries in lookup order.
    pub fn entries(&self) -> &'static [Cid] {
        self.entries
    }

    /// Returns the first entry whose bits under `mask` equal `cid`'s bits
    /// under `mask`, or `None` when no entry matches.
    pub fn find(&self, cid: Cid, mask: u32) -> Option<Cid> {
        self.entries
            .iter()
            .copied()
            .find(|entry| entry.matches(cid, mask))
    }

    /// Exact-match lookup used before a request is built.
    pub fn is_supported(&self, cid: Cid) -> bool {
        self.find(cid, CID_MASK).is_some()
    }

    /// Decides whether an inbound CID is an unsolicited event.
    ///
    /// The event-class lookup gates classification; a registered event is
    /// then identified with the port bits ignored.
    pub fn classify(&self, cid: Cid) -> FrameClass {
        if !cid.has_event_bit() || self.find(cid, EVENT_CMD_MASK).is_none() {
            return FrameClass::Reply;
        }
        let port = cid.event_port();
        match self
            .find(cid, EVENT_CMD_MASK | EVENT_ID_MASK)
            .and_then(EventKind::from_cid)
        {
            Some(kind) => FrameClass::Event { kind, port },
            None => FrameClass::UnknownEvent { port },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
