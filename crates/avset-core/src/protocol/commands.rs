//! Request encoders, the batched set-parameters builder, and reply parsers.
//!
//! Every encoder returns a [`Request`]: the command id, the body bytes, and
//! how many reply bytes the caller wants back.  Nothing here touches the
//! transport; the application layer hands a `Request` to its transaction
//! engine.
//!
//! Body layouts (all big-endian):
//! ```text
//! mute list         [num:2][res:2] then [port:2][mute:2] per port
//! tv mute           [port:2][mute:2]
//! disable sig       [port:2][res:2]
//! monitor info      [port:2][res:2]
//! audio active      [port mask:4]
//! hdmi mode         [mode:1][res:3]
//! event bits        [bits:4]
//! audio mode        [port:2][res:2][ch:4][fs:4][bits:4][format:4][source:4]
//! batched params    [video:2][audio:2][av video:2][av audio:2] then sub-packets
//! ```

use crate::domain::hw_config::{AvPort, HwConfig, HwConfigError};
use crate::domain::mode::{ModeFlags, ModeId};
use crate::domain::monitor::{MonitorInfo, MonitorType, ResolutionReport};
use crate::domain::video_mode::VideoMode;
use crate::protocol::cid::Cid;
use crate::protocol::frame::{append_subpacket, build_request, FrameError};
use crate::protocol::messages::{
    color_space, AudioMode, HdmiMode, Mute, Status, HEADER_SIZE, STATUS_SIZE,
};
use thiserror::Error;

/// Reply body size of `AV_GET_HW_CONF`: status + three counts + reserved.
pub const HW_CONF_REPLY_BODY: usize = STATUS_SIZE + 8;

/// Length of the monitor name field.
pub const MONITOR_NAME_LEN: usize = 16;

/// Reply body size of `AV_GET_MONITOR_INFO`.
pub const MONITOR_INFO_REPLY_BODY: usize = STATUS_SIZE + 4 + 16 + MONITOR_NAME_LEN;

/// Errors from parsing a reply frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplyError {
    /// The reply is shorter than its layout requires.
    #[error("{context} reply truncated: need {needed} bytes, got {available}")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// The hardware configuration reply names more ports than exist.
    #[error(transparent)]
    HwConfig(#[from] HwConfigError),
}

// ── Request ───────────────────────────────────────────────────────────────────

/// One request ready for the transaction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub cid: Cid,
    pub body: Vec<u8>,
    /// Bytes of the reply frame (header included) the caller keeps.
    pub reply_capacity: usize,
}

impl Request {
    /// Builds a request whose reply carries `reply_body` bytes.  The
    /// capacity never drops below the request's own length.
    pub fn new(cid: Cid, body: Vec<u8>, reply_body: usize) -> Self {
        let request_len = HEADER_SIZE + body.len();
        Self {
            cid,
            body,
            reply_capacity: request_len.max(HEADER_SIZE + reply_body),
        }
    }

    /// A request answered by a bare status word.
    pub fn status_only(cid: Cid, body: Vec<u8>) -> Self {
        Self::new(cid, body, STATUS_SIZE)
    }

    /// Total request length, header included.
    pub fn request_len(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }
}

// ── Init / fin ────────────────────────────────────────────────────────────────

pub fn av_init(event_bits: u32) -> Request {
    Request::status_only(Cid::AV_INIT, event_bits.to_be_bytes().to_vec())
}

pub fn av_fin() -> Request {
    Request::status_only(Cid::AV_FIN, Vec::new())
}

pub fn video_init() -> Request {
    Request::status_only(Cid::VIDEO_INIT, Vec::new())
}

pub fn audio_init() -> Request {
    Request::status_only(Cid::AUDIO_INIT, Vec::new())
}

pub fn enable_event(event_bits: u32) -> Request {
    Request::status_only(Cid::AV_ENABLE_EVENT, event_bits.to_be_bytes().to_vec())
}

pub fn disable_event(event_bits: u32) -> Request {
    Request::status_only(Cid::AV_DISABLE_EVENT, event_bits.to_be_bytes().to_vec())
}

// ── Mute and signal control ───────────────────────────────────────────────────

fn mute_list(ports: &[AvPort], mute: Mute) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + ports.len() * 4);
    body.extend_from_slice(&(ports.len() as u16).to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    for port in ports {
        body.extend_from_slice(&port.0.to_be_bytes());
        body.extend_from_slice(&(mute as u16).to_be_bytes());
    }
    body
}

fn port_only(port: AvPort) -> Vec<u8> {
    let mut body = Vec::with_capacity(4);
    body.extend_from_slice(&port.0.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body
}

pub fn av_video_mute(ports: &[AvPort], mute: Mute) -> Request {
    Request::status_only(Cid::AV_VIDEO_MUTE, mute_list(ports, mute))
}

pub fn av_audio_mute(ports: &[AvPort], mute: Mute) -> Request {
    Request::status_only(Cid::AV_AUDIO_MUTE, mute_list(ports, mute))
}

/// Mute for the optical ports, which the controller addresses through the
/// audio command group.
pub fn audio_mute(ports: &[AvPort], mute: Mute) -> Request {
    Request::status_only(Cid::AUDIO_MUTE, mute_list(ports, mute))
}

pub fn av_tv_mute(port: AvPort, mute: Mute) -> Request {
    let mut body = Vec::with_capacity(4);
    body.extend_from_slice(&port.0.to_be_bytes());
    body.extend_from_slice(&(mute as u16).to_be_bytes());
    Request::status_only(Cid::AV_TV_MUTE, body)
}

pub fn av_video_disable_sig(port: AvPort) -> Request {
    Request::status_only(Cid::AV_VIDEO_DISABLE_SIG, port_only(port))
}

/// `AUDIO_ACTIVE` or `AUDIO_INACTIVE` for the ports in `port_mask`.
pub fn audio_active(active: bool, port_mask: u32) -> Request {
    let cid = if active {
        Cid::AUDIO_ACTIVE
    } else {
        Cid::AUDIO_INACTIVE
    };
    Request::status_only(cid, port_mask.to_be_bytes().to_vec())
}

pub fn av_hdmi_mode(mode: HdmiMode) -> Request {
    Request::status_only(Cid::AV_HDMI_MODE, vec![mode as u8, 0, 0, 0])
}

/// One port's audio mode.  Sent as its own transaction, never batched.
pub fn audio_mode(port: AvPort, mode: &AudioMode) -> Request {
    let mut body = Vec::with_capacity(24);
    body.extend_from_slice(&port.0.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    for word in [
        mode.channels as u32,
        mode.sample_rate as u32,
        mode.word_bits as u32,
        mode.format as u32,
        mode.source as u32,
    ] {
        body.extend_from_slice(&word.to_be_bytes());
    }
    Request::status_only(Cid::AUDIO_MODE, body)
}

// ── Queries ───────────────────────────────────────────────────────────────────

pub fn get_hw_conf() -> Request {
    Request::new(Cid::AV_GET_HW_CONF, Vec::new(), HW_CONF_REPLY_BODY)
}

pub fn get_monitor_info(port: AvPort) -> Request {
    Request::new(
        Cid::AV_GET_MONITOR_INFO,
        port_only(port),
        MONITOR_INFO_REPLY_BODY,
    )
}

// ── Batched set-parameters ────────────────────────────────────────────────────

/// Builder for one `AVB_PARAM` request.
///
/// Each `push_*` appends a framed sub-packet, bumps the matching count, and
/// returns the number of bytes appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvbParam {
    num_video: u16,
    num_audio: u16,
    num_av_video: u16,
    num_av_audio: u16,
    buf: Vec<u8>,
}

impl AvbParam {
    pub fn new() -> Self {
        Self::default()
    }

    /// Video mode for one display head.
    pub fn push_video_mode(&mut self, head: u32, mode: &VideoMode, id: ModeId) -> usize {
        let mut flags = 0u32;
        if id.has(ModeFlags::DITHER) {
            flags |= 0x01;
        }
        if id.has(ModeFlags::FULL) {
            flags |= 0x02;
        }

        let mut body = Vec::with_capacity(24);
        body.extend_from_slice(&head.to_be_bytes());
        body.extend_from_slice(&(mode.vid as u32).to_be_bytes());
        body.extend_from_slice(&(mode.width as u16).to_be_bytes());
        body.extend_from_slice(&(mode.height as u16).to_be_bytes());
        body.extend_from_slice(&(mode.width * 4).to_be_bytes()); // pitch
        body.extend_from_slice(&mode.pixel_format.to_be_bytes());
        body.extend_from_slice(&flags.to_be_bytes());

        self.num_video += 1;
        append_subpacket(&mut self.buf, Cid::VIDEO_MODE, &body)
    }

    /// Output colour space for one AV port.
    pub fn push_av_video_cs(
        &mut self,
        port: AvPort,
        mode: &VideoMode,
        cs_out: u16,
        id: ModeId,
    ) -> usize {
        let mut body = Vec::with_capacity(12);
        body.extend_from_slice(&port.0.to_be_bytes());
        body.extend_from_slice(&(mode.vid as u16).to_be_bytes());
        body.extend_from_slice(&cs_out.to_be_bytes());
        body.extend_from_slice(&color_space::RGB_8.to_be_bytes()); // cs_in
        body.push(mode.aspect);
        body.push(id.has(ModeFlags::DITHER) as u8);
        body.push(id.has(ModeFlags::FULL) as u8);
        body.push(0);

        self.num_av_video += 1;
        append_subpacket(&mut self.buf, Cid::AV_VIDEO_CS, &body)
    }

    /// HDMI audio parameters tied to the active video id.
    pub fn push_av_audio_param(&mut self, port: AvPort, mode: &AudioMode, vid: u8) -> usize {
        let mut body = Vec::with_capacity(20);
        body.extend_from_slice(&port.0.to_be_bytes());
        body.extend_from_slice(&(vid as u16).to_be_bytes());
        body.extend_from_slice(&(mode.channels as u32).to_be_bytes());
        body.extend_from_slice(&(mode.sample_rate as u32).to_be_bytes());
        body.extend_from_slice(&(mode.word_bits as u32).to_be_bytes());
        body.extend_from_slice(&(mode.format as u32).to_be_bytes());

        self.num_av_audio += 1;
        append_subpacket(&mut self.buf, Cid::AV_AUDIO_PARAM, &body)
    }

    /// `(video, audio, av video, av audio)` sub-packet counts.
    pub fn counts(&self) -> (u16, u16, u16, u16) {
        (
            self.num_video,
            self.num_audio,
            self.num_av_video,
            self.num_av_audio,
        )
    }

    /// Bytes of sub-packets accumulated so far.
    pub fn payload_len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_request(self) -> Request {
        let mut body = Vec::with_capacity(8 + self.buf.len());
        for count in [
            self.num_video,
            self.num_audio,
            self.num_av_video,
            self.num_av_audio,
        ] {
            body.extend_from_slice(&count.to_be_bytes());
        }
        body.extend_from_slice(&self.buf);
        Request::status_only(Cid::AVB_PARAM, body)
    }
}

// ── Reply parsing ─────────────────────────────────────────────────────────────

fn require_len(reply: &[u8], needed: usize, context: &'static str) -> Result<(), ReplyError> {
    if reply.len() < needed {
        Err(ReplyError::Truncated {
            context,
            needed,
            available: reply.len(),
        })
    } else {
        Ok(())
    }
}

fn be_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

fn be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Reads the status word that opens every reply body.  `reply` is the whole
/// frame, header included.
pub fn reply_status(reply: &[u8]) -> Result<Status, ReplyError> {
    require_len(reply, HEADER_SIZE + STATUS_SIZE, "status")?;
    Ok(Status::from_u32(be_u32(reply, HEADER_SIZE)))
}

/// Decodes the port counts from an `AV_GET_HW_CONF` reply.  Counts over
/// their class maximum are rejected.
pub fn parse_hw_conf(reply: &[u8]) -> Result<HwConfig, ReplyError> {
    require_len(reply, HEADER_SIZE + HW_CONF_REPLY_BODY, "hw conf")?;
    let off = HEADER_SIZE + STATUS_SIZE;
    let config = HwConfig {
        num_hdmi: be_u16(reply, off),
        num_avmulti: be_u16(reply, off + 2),
        num_spdif: be_u16(reply, off + 4),
    };
    config.validate()?;
    Ok(config)
}

/// Decodes an `AV_GET_MONITOR_INFO` reply.
pub fn parse_monitor_info(reply: &[u8]) -> Result<MonitorInfo, ReplyError> {
    require_len(reply, HEADER_SIZE + MONITOR_INFO_REPLY_BODY, "monitor info")?;
    let off = HEADER_SIZE + STATUS_SIZE;
    let name_start = off + 20;
    let raw_name = &reply[name_start..name_start + MONITOR_NAME_LEN];
    let name_len = raw_name.iter().position(|&b| b == 0).unwrap_or(MONITOR_NAME_LEN);

    Ok(MonitorInfo {
        port: be_u16(reply, off),
        monitor_type: MonitorType::from_code(reply[off + 2]),
        res_60: ResolutionReport {
            native: be_u32(reply, off + 4),
            res_bits: be_u32(reply, off + 8),
        },
        res_50: ResolutionReport {
            native: be_u32(reply, off + 12),
            res_bits: be_u32(reply, off + 16),
        },
        name: String::from_utf8_lossy(&raw_name[..name_len]).into_owned(),
    })
}

// ── Reply encoding (controller side) ──────────────────────────────────────────

/// Builds a reply frame for `request_cid` carrying `status` then `data`.
pub fn encode_reply(request_cid: Cid, status: Status, data: &[u8]) -> Result<Vec<u8>, FrameError> {
    let mut body = Vec::with_capacity(STATUS_SIZE + data.len());
    body.extend_from_slice(&status.as_u32().to_be_bytes());
    body.extend_from_slice(data);
    build_request(request_cid.reply(), &body)
}

/// Data section of an `AV_GET_HW_CONF` reply.
pub fn encode_hw_conf(config: &HwConfig) -> Vec<u8> {
    let mut data = Vec::with_capacity(8);
    data.extend_from_slice(&config.num_hdmi.to_be_bytes());
    data.extend_from_slice(&config.num_avmulti.to_be_bytes());
    data.extend_from_slice(&config.num_spdif.to_be_bytes());
    data.extend_from_slice(&0u16.to_be_bytes());
    data
}

/// Data section of an `AV_GET_MONITOR_INFO` reply.  Long names are cut to
/// the field width.
pub fn encode_monitor_info(info: &MonitorInfo) -> Vec<u8> {
    let mut data = Vec::with_capacity(MONITOR_INFO_REPLY_BODY - STATUS_SIZE);
    data.extend_from_slice(&info.port.to_be_bytes());
    data.push(info.monitor_type.code());
    data.push(0);
    for word in [
        info.res_60.native,
        info.res_60.res_bits,
        info.res_50.native,
        info.res_50.res_bits,
    ] {
        data.extend_from_slice(&word.to_be_bytes());
    }
    let mut name = [0u8; MONITOR_NAME_LEN];
    let bytes = info.name.as_bytes();
    let n = bytes.len().min(MONITOR_NAME_LEN);
    name[..n].copy_from_slice(&bytes[..n]);
    data.extend_from_slice(&name);
    data
}

// ── Tests ─────────────────────────────────────────────────────────────────────
