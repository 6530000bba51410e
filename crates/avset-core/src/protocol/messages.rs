//! Wire constants shared by requests, replies, and events.
//!
//! Values follow the AV controller's command set.  The names mirror the
//! controller documentation so a packet dump can be read side by side with
//! this file.

use serde::{Deserialize, Serialize};

// ── Frame constants ───────────────────────────────────────────────────────────

/// Protocol version carried in every frame header.
pub const PROTOCOL_VERSION: u16 = 0x0205;

/// Size of the frame header in bytes: version (2) + size (2) + cid (4).
pub const HEADER_SIZE: usize = 8;

/// Largest frame (header included) the controller accepts or produces.
pub const MAX_PACKET_SIZE: usize = 512;

/// Size of the status word that opens every reply body.
pub const STATUS_SIZE: usize = 4;

// ── Ports and heads ───────────────────────────────────────────────────────────

/// Physical AV output port identifiers.
pub mod avport {
    pub const HDMI_0: u16 = 0x0000;
    pub const HDMI_1: u16 = 0x0001;
    pub const AVMULTI_0: u16 = 0x0010;
    pub const SPDIF_0: u16 = 0x0020;
    pub const SPDIF_1: u16 = 0x0021;
}

/// Display head identifiers.
pub mod head {
    pub const HEAD_A: u32 = 0x0000;
    pub const HEAD_B: u32 = 0x0001;
}

/// Number of display heads the controller drives.
pub const HEAD_MAX: usize = 2;

/// Number of optical (S/PDIF) ports addressed through the audio-mute command.
pub const OPT_PORT_MAX: usize = 1;

/// Most ports of each class the controller can report.  Each class owns a
/// block of port ids starting at its `avport` base.
pub const HDMI_MAX: usize = 2;
pub const AVMULTI_MAX: usize = 1;
pub const SPDIF_MAX: usize = 2;

/// Bits of the audio port mask used by the audio active/inactive commands.
pub mod audio_port {
    pub const HDMI_0: u32 = 0x01;
    pub const HDMI_1: u32 = 0x02;
    pub const AVMULTI_0: u32 = 0x10;
    pub const SPDIF_0: u32 = 0x20;
    pub const SPDIF_1: u32 = 0x40;

    /// Every audio-capable port.  Set unconditionally after hardware discovery.
    pub const ALL: u32 = HDMI_0 | HDMI_1 | AVMULTI_0 | SPDIF_0 | SPDIF_1;
}

// ── Video signal parameters ───────────────────────────────────────────────────

/// Colour space codes used by the colour-space sub-packet.
pub mod color_space {
    pub const RGB_8: u16 = 0x0000;
    pub const YUV422_8: u16 = 0x0001;
    pub const YUV444_8: u16 = 0x0002;
}

/// Pixel format codes used by the video-mode sub-packet.
pub mod pixel_format {
    pub const X8R8G8B8: u32 = 0x0000;
}

/// Aspect ratio codes used by the colour-space sub-packet.
pub mod aspect {
    pub const WIDE_16_9: u8 = 0x00;
    pub const NORMAL_4_3: u8 = 0x01;
}

/// Catalog keys for concrete signal timings.
pub mod vid {
    pub const VID_480I: u8 = 0x01;
    pub const VID_576I: u8 = 0x03;
    pub const VID_480P: u8 = 0x05;
    pub const VID_576P: u8 = 0x06;
    pub const VID_1080I_60HZ: u8 = 0x07;
    pub const VID_1080I_50HZ: u8 = 0x08;
    pub const VID_720P_60HZ: u8 = 0x09;
    pub const VID_720P_50HZ: u8 = 0x0A;
    pub const VID_1080P_60HZ: u8 = 0x0B;
    pub const VID_1080P_50HZ: u8 = 0x0C;
    pub const VID_WXGA: u8 = 0x0D;
    pub const VID_SXGA: u8 = 0x0E;
    pub const VID_WUXGA: u8 = 0x0F;
}

/// Mute argument shared by every mute command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum Mute {
    Off = 0x0000,
    On = 0x0001,
}

impl From<bool> for Mute {
    fn from(mute: bool) -> Self {
        if mute {
            Mute::On
        } else {
            Mute::Off
        }
    }
}

/// HDMI output mode requested through `AV_HDMI_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum HdmiMode {
    Normal = 0x00,
    HdcpOff = 0xFF,
}

/// Event bits enabled at controller init.
pub mod event_bit {
    pub const UNPLUGGED: u32 = 0x01;
    pub const PLUGGED: u32 = 0x02;
    pub const HDCP_DONE: u32 = 0x04;
    pub const HDCP_FAIL: u32 = 0x08;
    pub const HDCP_AUTH: u32 = 0x10;
    pub const HDCP_ERROR: u32 = 0x20;

    pub const ALL: u32 = UNPLUGGED | PLUGGED | HDCP_DONE | HDCP_FAIL | HDCP_AUTH | HDCP_ERROR;
}

// ── Audio parameters ──────────────────────────────────────────────────────────

/// Number of audio channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum AudioChannels {
    Two = 0x01,
    Three = 0x02,
    Four = 0x03,
    Five = 0x04,
    Six = 0x05,
    Seven = 0x06,
    Eight = 0x07,
}

/// Audio sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum SampleRate {
    Fs32k = 0x01,
    Fs44k = 0x02,
    Fs48k = 0x03,
    Fs88k = 0x04,
    Fs96k = 0x05,
    Fs176k = 0x06,
    Fs192k = 0x07,
}

/// Audio sample word length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum WordBits {
    Bits16 = 0x01,
    Bits20 = 0x02,
    Bits24 = 0x03,
}

/// Audio stream encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum AudioFormat {
    Pcm = 0x01,
    Bitstream = 0xFF,
}

/// Where the audio samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum AudioSource {
    Serial = 0x00,
    Spdif = 0x01,
}

/// Parameters of one "set audio mode" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMode {
    pub channels: AudioChannels,
    pub sample_rate: SampleRate,
    pub word_bits: WordBits,
    pub format: AudioFormat,
    pub source: AudioSource,
}

impl Default for AudioMode {
    /// Two-channel 48 kHz 16-bit PCM from the serial source.
    fn default() -> Self {
        Self {
            channels: AudioChannels::Two,
            sample_rate: SampleRate::Fs48k,
            word_bits: WordBits::Bits16,
            format: AudioFormat::Pcm,
            source: AudioSource::Serial,
        }
    }
}

// ── Reply status ──────────────────────────────────────────────────────────────

/// Status word returned in the first body word of every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    ReceiveVuartError,
    SysconCommunicateFail,
    InvalidCommand,
    InvalidPort,
    InvalidVid,
    InvalidColorSpace,
    InvalidFs,
    InvalidAudioCh,
    UnsupportedVersion,
    InvalidSampleSize,
    Failure,
    UnsupportedCommand,
    BufferOverflow,
    InvalidVideoParam,
    NoSel,
    InvalidAvParam,
    InvalidAudioParam,
    /// The HDMI mode request is not supported by this hardware revision.
    UnsupportedHdmiMode,
    /// No sync on a head; the user should retry the request.
    NoSyncHead,
    Unknown(u32),
}

impl Status {
    /// Maps a raw status word to its variant.  Unlisted values are kept.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x00 => Status::Success,
            0x01 => Status::ReceiveVuartError,
            0x02 => Status::SysconCommunicateFail,
            0x03 => Status::InvalidCommand,
            0x04 => Status::InvalidPort,
            0x05 => Status::InvalidVid,
            0x06 => Status::InvalidColorSpace,
            0x07 => Status::InvalidFs,
            0x08 => Status::InvalidAudioCh,
            0x09 => Status::UnsupportedVersion,
            0x0A => Status::InvalidSampleSize,
            0x0B => Status::Failure,
            0x0C => Status::UnsupportedCommand,
            0x0D => Status::BufferOverflow,
            0x0E => Status::InvalidVideoParam,
            0x0F => Status::NoSel,
            0x10 => Status::InvalidAvParam,
            0x11 => Status::InvalidAudioParam,
            0x12 => Status::UnsupportedHdmiMode,
            0x13 => Status::NoSyncHead,
            other => Status::Unknown(other),
        }
    }

    /// Returns the raw status word.
    pub fn as_u32(self) -> u32 {
        match self {
            Status::Success => 0x00,
            Status::ReceiveVuartError => 0x01,
            Status::SysconCommunicateFail => 0x02,
            Status::InvalidCommand => 0x03,
            Status::InvalidPort => 0x04,
            Status::InvalidVid => 0x05,
            Status::InvalidColorSpace => 0x06,
            Status::InvalidFs => 0x07,
            Status::InvalidAudioCh => 0x08,
            Status::UnsupportedVersion => 0x09,
            Status::InvalidSampleSize => 0x0A,
            Status::Failure => 0x0B,
            Status::UnsupportedCommand => 0x0C,
            Status::BufferOverflow => 0x0D,
            Status::InvalidVideoParam => 0x0E,
            Status::NoSel => 0x0F,
            Status::InvalidAvParam => 0x10,
            Status::InvalidAudioParam => 0x11,
            Status::UnsupportedHdmiMode => 0x12,
            Status::NoSyncHead => 0x13,
            Status::Unknown(raw) => raw,
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}
