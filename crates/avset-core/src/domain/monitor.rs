//! Monitor capability reports and the console's region setting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution bits reported per refresh-rate family.
///
/// The 480p and 576p bits share a value: which one is meant depends on
/// whether the bit sits in the 60Hz or the 50Hz word.
pub mod resbit {
    pub const R720X480P: u32 = 0x0003;
    pub const R720X576P: u32 = 0x0003;
    pub const R1280X720P: u32 = 0x0004;
    pub const R1920X1080I: u32 = 0x0008;
    pub const R1920X1080P: u32 = 0x4000;

    /// Bits considered when picking a mode from a 50Hz word.
    pub const MASK_50: u32 = R1920X1080P | R1920X1080I | R1280X720P | R720X576P;
    /// Bits considered when picking a mode from a 60Hz word.
    pub const MASK_60: u32 = R1920X1080P | R1920X1080I | R1280X720P | R720X480P;
}

/// What kind of sink is attached to an HDMI port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorType {
    Hdmi,
    Dvi,
    /// Nothing attached, or a class the controller does not name.
    Other(u8),
}

impl MonitorType {
    pub const HDMI_CODE: u8 = 0x01;
    pub const DVI_CODE: u8 = 0x02;

    pub fn from_code(code: u8) -> Self {
        match code {
            Self::HDMI_CODE => MonitorType::Hdmi,
            Self::DVI_CODE => MonitorType::Dvi,
            other => MonitorType::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            MonitorType::Hdmi => Self::HDMI_CODE,
            MonitorType::Dvi => Self::DVI_CODE,
            MonitorType::Other(code) => code,
        }
    }
}

/// Native and supported resolution bits for one refresh-rate family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub native: u32,
    pub res_bits: u32,
}

/// One port's monitor capability snapshot.  Produced per query, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub port: u16,
    pub monitor_type: MonitorType,
    pub res_60: ResolutionReport,
    pub res_50: ResolutionReport,
    /// Sink name from the EDID, trailing NULs stripped.
    pub name: String,
}

impl MonitorInfo {
    pub fn is_dvi(&self) -> bool {
        self.monitor_type == MonitorType::Dvi
    }
}

impl fmt::Display for MonitorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "port 0x{:02x} {:?} \"{}\" 60Hz native 0x{:08x} bits 0x{:08x}, 50Hz native 0x{:08x} bits 0x{:08x}",
            self.port,
            self.monitor_type,
            self.name,
            self.res_60.native,
            self.res_60.res_bits,
            self.res_50.native,
            self.res_50.res_bits
        )
    }
}

// ── Region ────────────────────────────────────────────────────────────────────

/// Analog multi-out standard configured on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvMultiOut {
    #[default]
    Ntsc,
    PalYcbcr,
    Secam,
    PalRgb,
}

/// Region flags derived from [`AvMultiOut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region(pub u8);

impl Region {
    pub const HZ_60: Region = Region(0x01);
    pub const HZ_50: Region = Region(0x02);
    pub const RGB: Region = Region(0x10);

    pub fn is_60hz(self) -> bool {
        self.0 & Self::HZ_60.0 != 0
    }

    pub fn wants_rgb(self) -> bool {
        self.0 & Self::RGB.0 != 0
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::HZ_60
    }
}

impl From<AvMultiOut> for Region {
    fn from(out: AvMultiOut) -> Self {
        match out {
            AvMultiOut::Ntsc => Region::HZ_60,
            AvMultiOut::PalYcbcr | AvMultiOut::Secam => Region::HZ_50,
            AvMultiOut::PalRgb => Region(Region::HZ_50.0 | Region::RGB.0),
        }
    }
}
