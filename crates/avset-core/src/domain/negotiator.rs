//! Decision rules for automatic mode selection.
//!
//! The application layer queries one HDMI port at a time and feeds each
//! report into an [`AutoModeSelector`].  The selector tells the caller when
//! to stop querying and, at the end, turns what it saw into a mode id.
//!
//! # The rules, in order
//!
//! 1. A DVI monitor on any port wins immediately: 480p with the DVI flag.
//! 2. Otherwise the first HDMI port that yields a video id wins.  Native
//!    resolution bits are preferred over supported bits; an HDMI monitor
//!    with no bits at all yields the region's HDMI default.
//! 3. No HDMI result: the analog multi-out default for the region, plus the
//!    RGB flag when the region asks for RGB.
//! 4. An HDMI result at boot is replaced by the safest HDMI default the
//!    monitor accepts.  The 60Hz and 50Hz regions check the 480p and 576p
//!    bits in opposite order.

use crate::domain::mode::{ModeFlags, ModeId};
use crate::domain::monitor::{resbit, MonitorInfo, MonitorType, Region};
use crate::domain::video_mode::{table_id_for, CatalogError};
use crate::protocol::messages::vid;
use std::ops::ControlFlow;
use tracing::debug;

pub const DEFAULT_DVI_VID: u8 = vid::VID_480P;
pub const DEFAULT_HDMI_VID_REG_60: u8 = vid::VID_480P;
pub const DEFAULT_HDMI_VID_REG_50: u8 = vid::VID_576P;
pub const DEFAULT_AVMULTI_VID_REG_60: u8 = vid::VID_480I;
pub const DEFAULT_AVMULTI_VID_REG_50: u8 = vid::VID_576I;

/// Picks the best video id from a pair of resolution words.
///
/// The 50Hz family is only considered when its word is strictly greater;
/// ties go to 60Hz.
pub fn resbits_to_vid(res_50: u32, res_60: u32) -> Option<u8> {
    let (bits, order) = if res_50 > res_60 {
        (
            res_50,
            [
                (resbit::R1920X1080P, vid::VID_1080P_50HZ),
                (resbit::R1920X1080I, vid::VID_1080I_50HZ),
                (resbit::R1280X720P, vid::VID_720P_50HZ),
                (resbit::R720X576P, vid::VID_576P),
            ],
        )
    } else {
        (
            res_60,
            [
                (resbit::R1920X1080P, vid::VID_1080P_60HZ),
                (resbit::R1920X1080I, vid::VID_1080I_60HZ),
                (resbit::R1280X720P, vid::VID_720P_60HZ),
                (resbit::R720X480P, vid::VID_480P),
            ],
        )
    };
    order
        .iter()
        .find(|(bit, _)| bits & bit != 0)
        .map(|&(_, video_id)| video_id)
}

fn hdmi_default(region: Region) -> u8 {
    if region.is_60hz() {
        DEFAULT_HDMI_VID_REG_60
    } else {
        DEFAULT_HDMI_VID_REG_50
    }
}

/// Video id for one HDMI port's report, or `None` when the port gives no
/// usable answer.
pub fn hdmi_vid(info: &MonitorInfo, region: Region) -> Option<u8> {
    if info.monitor_type != MonitorType::Hdmi {
        return None;
    }

    let res_50 = info.res_50.native & resbit::MASK_50;
    let res_60 = info.res_60.native & resbit::MASK_60;
    if res_50 != 0 || res_60 != 0 {
        return resbits_to_vid(res_50, res_60);
    }

    let res_50 = info.res_50.res_bits & resbit::MASK_50;
    let res_60 = info.res_60.res_bits & resbit::MASK_60;
    if res_50 != 0 || res_60 != 0 {
        return resbits_to_vid(res_50, res_60);
    }

    Some(hdmi_default(region))
}

/// Accumulates monitor reports and produces the automatic mode id.
#[derive(Debug, Clone)]
pub struct AutoModeSelector {
    region: Region,
    is_boot: bool,
    dvi: bool,
    vid: Option<u8>,
    last: Option<MonitorInfo>,
}

impl AutoModeSelector {
    pub fn new(region: Region, is_boot: bool) -> Self {
        Self {
            region,
            is_boot,
            dvi: false,
            vid: None,
            last: None,
        }
    }

    /// Feeds one HDMI port's report.  `Break` means no further ports need
    /// to be queried.
    pub fn observe(&mut self, info: MonitorInfo) -> ControlFlow<()> {
        let flow = if info.is_dvi() {
            self.dvi = true;
            ControlFlow::Break(())
        } else {
            self.vid = hdmi_vid(&info, self.region);
            if self.vid.is_some() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        };
        self.last = Some(info);
        flow
    }

    /// Resolves the collected reports into a mode id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownVideoId`] when the chosen video id has
    /// no catalog entry.
    pub fn finish(self) -> Result<ModeId, CatalogError> {
        let mut flags = ModeFlags::NONE;

        let video_id = if self.dvi {
            flags |= ModeFlags::DVI;
            DEFAULT_DVI_VID
        } else if let Some(video_id) = self.vid {
            match (&self.last, self.is_boot) {
                (Some(info), true) => {
                    let boot = self.boot_vid(info);
                    debug!("boot override: vid 0x{video_id:02x} -> 0x{boot:02x}");
                    boot
                }
                _ => video_id,
            }
        } else {
            if self.region.wants_rgb() {
                flags |= ModeFlags::RGB;
            }
            if self.region.is_60hz() {
                DEFAULT_AVMULTI_VID_REG_60
            } else {
                DEFAULT_AVMULTI_VID_REG_50
            }
        };

        let index = table_id_for(video_id).ok_or(CatalogError::UnknownVideoId(video_id))?;
        Ok(ModeId::new(index, flags))
    }

    fn boot_vid(&self, info: &MonitorInfo) -> u8 {
        let has_480p = info.res_60.res_bits & resbit::R720X480P != 0;
        let has_576p = info.res_50.res_bits & resbit::R720X576P != 0;

        if self.region.is_60hz() {
            if has_480p {
                DEFAULT_HDMI_VID_REG_60
            } else if has_576p {
                DEFAULT_HDMI_VID_REG_50
            } else {
                DEFAULT_HDMI_VID_REG_60
            }
        } else if has_576p {
            DEFAULT_HDMI_VID_REG_50
        } else if has_480p {
            DEFAULT_HDMI_VID_REG_60
        } else {
            DEFAULT_HDMI_VID_REG_50
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::monitor::{AvMultiOut, ResolutionReport};
    use crate::domain::video_mode::VIDEO_MODES;

    fn hdmi(res_60: ResolutionReport, res_50: ResolutionReport) -> MonitorInfo {
        MonitorInfo {
            port: 0,
            monitor_type: MonitorType::Hdmi,
            res_60,
            res_50,
            name: "TV".into(),
        }
    }

    fn report(native: u32, res_bits: u32) -> ResolutionReport {
        ResolutionReport { native, res_bits }
    }

    fn vid_of(id: ModeId) -> u8 {
        VIDEO_MODES[id.index as usize].vid
    }

    #[test]
    fn test_resbits_tie_prefers_60hz() {
        let bits = resbit::R1280X720P;
        assert_eq!(resbits_to_vid(bits, bits), Some(vid::VID_720P_60HZ));
    }

    #[test]
    fn test_resbits_larger_50hz_word_selects_50hz_family() {
        assert_eq!(
            resbits_to_vid(resbit::R1920X1080P, resbit::R1920X1080I),
            Some(vid::VID_1080P_50HZ)
        );
    }

    #[test]
    fn test_resbits_with_no_known_bit_is_none() {
        assert_eq!(resbits_to_vid(0, 0x0100), None);
    }

    #[test]
    fn test_native_bits_take_priority_over_supported_bits() {
        let info = hdmi(report(resbit::R1280X720P, resbit::R1920X1080P), report(0, 0));
        assert_eq!(hdmi_vid(&info, Region::HZ_60), Some(vid::VID_720P_60HZ));
    }

    #[test]
    fn test_hdmi_without_bits_uses_region_default() {
        let info = hdmi(report(0, 0), report(0, 0));
        assert_eq!(hdmi_vid(&info, Region::HZ_60), Some(vid::VID_480P));
        assert_eq!(hdmi_vid(&info, Region::HZ_50), Some(vid::VID_576P));
    }

    #[test]
    fn test_no_hdmi_in_region_60_selects_avmulti_480i_without_flags() {
        // Arrange
        let selector = AutoModeSelector::new(Region::from(AvMultiOut::Ntsc), false);

        // Act
        let id = selector.finish().unwrap();

        // Assert
        assert_eq!(vid_of(id), vid::VID_480I);
        assert!(id.flags.is_empty());
    }

    #[test]
    fn test_no_hdmi_in_pal_rgb_region_sets_rgb_flag() {
        let selector = AutoModeSelector::new(Region::from(AvMultiOut::PalRgb), true);
        let id = selector.finish().unwrap();
        assert_eq!(vid_of(id), vid::VID_576I);
        assert!(id.has(ModeFlags::RGB));
        assert!(!id.has(ModeFlags::DVI));
    }

    #[test]
    fn test_dvi_monitor_breaks_scan_with_dvi_flag() {
        let mut selector = AutoModeSelector::new(Region::HZ_50, false);
        let mut dvi = hdmi(report(0, 0), report(0, 0));
        dvi.monitor_type = MonitorType::Dvi;

        assert_eq!(selector.observe(dvi), ControlFlow::Break(()));
        let id = selector.finish().unwrap();

        assert_eq!(vid_of(id), vid::VID_480P);
        assert!(id.has(ModeFlags::DVI));
    }

    #[test]
    fn test_native_1080p60_at_runtime_resolves_to_1080p60() {
        let mut selector = AutoModeSelector::new(Region::HZ_60, false);
        selector.observe(hdmi(report(resbit::R1920X1080P, resbit::R1920X1080P), report(0, 0)));
        assert_eq!(selector.finish().unwrap(), ModeId::new(5, ModeFlags::NONE));
    }

    #[test]
    fn test_native_1080p60_at_boot_without_480p_resolves_to_60hz_boot_default() {
        let mut selector = AutoModeSelector::new(Region::HZ_60, true);
        selector.observe(hdmi(report(resbit::R1920X1080P, resbit::R1920X1080P), report(0, 0)));
        assert_eq!(vid_of(selector.finish().unwrap()), vid::VID_480P);
    }

    #[test]
    fn test_boot_region_60_falls_back_to_576p_when_only_50hz_supported() {
        let mut selector = AutoModeSelector::new(Region::HZ_60, true);
        selector.observe(hdmi(report(0, 0), report(0, resbit::R720X576P)));
        assert_eq!(vid_of(selector.finish().unwrap()), vid::VID_576P);
    }

    #[test]
    fn test_boot_region_50_chain_checks_576p_before_480p() {
        // Both families supported: the 50Hz region keeps its own default,
        // the 60Hz region keeps its own. The chains mirror each other.
        let both = || hdmi(report(0, resbit::R720X480P), report(0, resbit::R720X576P));

        let mut reg50 = AutoModeSelector::new(Region::HZ_50, true);
        reg50.observe(both());
        assert_eq!(vid_of(reg50.finish().unwrap()), vid::VID_576P);

        let mut reg60 = AutoModeSelector::new(Region::HZ_60, true);
        reg60.observe(both());
        assert_eq!(vid_of(reg60.finish().unwrap()), vid::VID_480P);
    }

    #[test]
    fn test_boot_region_50_with_only_480p_uses_60hz_default() {
        let mut selector = AutoModeSelector::new(Region::HZ_50, true);
        selector.observe(hdmi(report(resbit::R1920X1080I, resbit::R720X480P), report(0, 0)));
        assert_eq!(vid_of(selector.finish().unwrap()), vid::VID_480P);
    }

    #[test]
    fn test_unusable_port_continues_scan() {
        let mut selector = AutoModeSelector::new(Region::HZ_60, false);
        let mut empty = hdmi(report(0, 0), report(0, 0));
        empty.monitor_type = MonitorType::Other(0);

        assert_eq!(selector.observe(empty), ControlFlow::Continue(()));
        assert_eq!(
            selector.observe(hdmi(report(0, resbit::R1920X1080I), report(0, 0))),
            ControlFlow::Break(())
        );
        assert_eq!(vid_of(selector.finish().unwrap()), vid::VID_1080I_60HZ);
    }
}
