//! The fixed video mode catalog.
//!
//! Entry 0 is the "automatic" sentinel with every field zero.  All lookups
//! take a [`ModeId`] and only ever look at its index, so flag bits never
//! affect which entry is returned.

use crate::domain::mode::ModeId;
use crate::protocol::messages::{aspect, color_space, pixel_format, vid};
use serde::Serialize;
use thiserror::Error;

/// Errors returned by catalog lookups.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CatalogError {
    /// The mode index is past the end of the catalog.
    #[error("invalid mode index {0}")]
    InvalidMode(u8),

    /// No catalog entry carries this video id.
    #[error("no catalog entry for video id 0x{0:02x}")]
    UnknownVideoId(u8),
}

/// Scan type of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanMode {
    Progressive,
    Interlaced,
}

/// Concrete signal parameters for one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoMode {
    pub color_space: u16,
    pub pixel_format: u32,
    pub vid: u8,
    pub aspect: u8,
    pub width: u32,
    pub height: u32,
    pub interlaced: bool,
    pub refresh_hz: u32,
}

impl VideoMode {
    const fn entry(
        color_space: u16,
        vid: u8,
        aspect: u8,
        width: u32,
        height: u32,
        interlaced: bool,
        refresh_hz: u32,
    ) -> Self {
        Self {
            color_space,
            pixel_format: pixel_format::X8R8G8B8,
            vid,
            aspect,
            width,
            height,
            interlaced,
            refresh_hz,
        }
    }

    const AUTO: VideoMode = VideoMode {
        color_space: 0,
        pixel_format: 0,
        vid: 0,
        aspect: 0,
        width: 0,
        height: 0,
        interlaced: false,
        refresh_hz: 0,
    };
}

use aspect::{NORMAL_4_3 as A_N, WIDE_16_9 as A_W};
use color_space::{RGB_8 as RGB8, YUV444_8 as YUV444};

/// Catalog indexed by the mode index.
pub const VIDEO_MODES: [VideoMode; 14] = [
    VideoMode::AUTO,
    VideoMode::entry(YUV444, vid::VID_480I, A_N, 720, 480, true, 60),
    VideoMode::entry(YUV444, vid::VID_480P, A_N, 720, 480, false, 60),
    VideoMode::entry(YUV444, vid::VID_720P_60HZ, A_N, 1280, 720, false, 60),
    VideoMode::entry(YUV444, vid::VID_1080I_60HZ, A_W, 1920, 1080, true, 60),
    VideoMode::entry(YUV444, vid::VID_1080P_60HZ, A_W, 1920, 1080, false, 60),
    VideoMode::entry(YUV444, vid::VID_576I, A_N, 720, 576, true, 50),
    VideoMode::entry(YUV444, vid::VID_576P, A_N, 720, 576, false, 50),
    VideoMode::entry(YUV444, vid::VID_720P_50HZ, A_N, 1280, 720, false, 50),
    VideoMode::entry(YUV444, vid::VID_1080I_50HZ, A_W, 1920, 1080, true, 50),
    VideoMode::entry(YUV444, vid::VID_1080P_50HZ, A_W, 1920, 1080, false, 50),
    VideoMode::entry(RGB8, vid::VID_WXGA, A_W, 1280, 768, false, 60),
    VideoMode::entry(RGB8, vid::VID_SXGA, A_N, 1280, 1024, false, 60),
    VideoMode::entry(RGB8, vid::VID_WUXGA, A_W, 1920, 1200, false, 60),
];

// ── Lookups ───────────────────────────────────────────────────────────────────

/// Returns the catalog entry for `id`'s index.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidMode`] when the index is out of range.
pub fn lookup(id: ModeId) -> Result<&'static VideoMode, CatalogError> {
    VIDEO_MODES
        .get(id.index as usize)
        .ok_or(CatalogError::InvalidMode(id.index))
}

/// `(width, height)` of the mode.  The automatic sentinel yields `(0, 0)`.
pub fn resolution_of(id: ModeId) -> Result<(u32, u32), CatalogError> {
    lookup(id).map(|mode| (mode.width, mode.height))
}

/// Refresh rate in Hz.
pub fn refresh_rate_of(id: ModeId) -> Result<u32, CatalogError> {
    lookup(id).map(|mode| mode.refresh_hz)
}

pub fn is_interlaced(id: ModeId) -> Result<bool, CatalogError> {
    lookup(id).map(|mode| mode.interlaced)
}

pub fn scan_mode_of(id: ModeId) -> Result<ScanMode, CatalogError> {
    Ok(if is_interlaced(id)? {
        ScanMode::Interlaced
    } else {
        ScanMode::Progressive
    })
}

/// Finds the catalog index whose entry carries `video_id`.
///
/// The scan starts at index 1; the sentinel never matches.
pub fn table_id_for(video_id: u8) -> Option<u8> {
    VIDEO_MODES
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, mode)| mode.vid == video_id)
        .map(|(index, _)| index as u8)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mode::{ModeFlags, MODE_MASK};

    #[test]
    fn test_table_id_for_inverts_vid_for_every_entry() {
        for (index, mode) in VIDEO_MODES.iter().enumerate().skip(1) {
            assert_eq!(table_id_for(mode.vid), Some(index as u8));
        }
    }

    #[test]
    fn test_table_id_for_unknown_vid_is_none() {
        assert_eq!(table_id_for(0x02), None);
        assert_eq!(table_id_for(0xFE), None);
    }

    #[test]
    fn test_sentinel_is_never_matched() {
        assert_eq!(table_id_for(0), None);
    }

    #[test]
    fn test_resolution_of_1080p60() {
        assert_eq!(resolution_of(ModeId::new(5, ModeFlags::NONE)), Ok((1920, 1080)));
    }

    #[test]
    fn test_flags_do_not_change_lookup() {
        let plain = ModeId::new(4, ModeFlags::NONE);
        let flagged = plain.with_flags(ModeFlags::DVI | ModeFlags::HDCP_OFF);
        assert_eq!(lookup(plain), lookup(flagged));
    }

    #[test]
    fn test_interlaced_and_refresh_for_576i() {
        let id = ModeId::new(6, ModeFlags::NONE);
        assert_eq!(is_interlaced(id), Ok(true));
        assert_eq!(scan_mode_of(id), Ok(ScanMode::Interlaced));
        assert_eq!(refresh_rate_of(id), Ok(50));
    }

    #[test]
    fn test_out_of_range_index_is_invalid_for_all_lookups() {
        let id = ModeId::from_raw(MODE_MASK); // index 15
        assert_eq!(resolution_of(id), Err(CatalogError::InvalidMode(15)));
        assert_eq!(refresh_rate_of(id), Err(CatalogError::InvalidMode(15)));
        assert_eq!(is_interlaced(id), Err(CatalogError::InvalidMode(15)));
        assert_eq!(
            resolution_of(ModeId::from_raw(14)),
            Err(CatalogError::InvalidMode(14))
        );
    }

    #[test]
    fn test_auto_sentinel_is_all_zero() {
        assert_eq!(resolution_of(ModeId::AUTO), Ok((0, 0)));
        assert_eq!(refresh_rate_of(ModeId::AUTO), Ok(0));
    }

    #[test]
    fn test_pc_modes_use_rgb_colour_space() {
        for index in 11..=13 {
            assert_eq!(VIDEO_MODES[index].color_space, color_space::RGB_8);
        }
    }
}
