//! Mode ids: a catalog index plus output flags.
//!
//! Callers and configuration files exchange mode ids as plain integers.  The
//! low four bits select a catalog entry; higher bits steer how the request
//! is built.  [`ModeId`] keeps the two halves apart so the flags can never
//! leak into a catalog lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bits of a raw mode id that index the catalog.
pub const MODE_MASK: u32 = 0x000F;

/// Flag bits carried next to the catalog index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct ModeFlags(pub u32);

impl ModeFlags {
    pub const NONE: ModeFlags = ModeFlags(0);
    /// Force RGB colour space on every port (analog multi-out RGB region).
    pub const RGB: ModeFlags = ModeFlags(0x0020);
    /// The HDMI sink is a DVI monitor.
    pub const DVI: ModeFlags = ModeFlags(0x0040);
    /// Full-range output levels.
    pub const FULL: ModeFlags = ModeFlags(0x0080);
    /// Enable output dithering.
    pub const DITHER: ModeFlags = ModeFlags(0x0800);
    /// Turn HDCP off on HDMI (not supported on retail hardware).
    pub const HDCP_OFF: ModeFlags = ModeFlags(0x1000);

    pub fn contains(self, other: ModeFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ModeFlags {
    type Output = ModeFlags;

    fn bitor(self, rhs: ModeFlags) -> ModeFlags {
        ModeFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ModeFlags {
    fn bitor_assign(&mut self, rhs: ModeFlags) {
        self.0 |= rhs.0;
    }
}

/// A mode id split into its catalog index and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct ModeId {
    /// Catalog index; 0 requests automatic selection.
    pub index: u8,
    pub flags: ModeFlags,
}

impl ModeId {
    /// The automatic-selection sentinel with no flags.
    pub const AUTO: ModeId = ModeId {
        index: 0,
        flags: ModeFlags::NONE,
    };

    pub fn new(index: u8, flags: ModeFlags) -> Self {
        Self { index, flags }
    }

    /// Splits a raw integer mode id.  Any bit outside [`MODE_MASK`] is kept
    /// as a flag.
    pub fn from_raw(raw: u32) -> Self {
        Self {
            index: (raw & MODE_MASK) as u8,
            flags: ModeFlags(raw & !MODE_MASK),
        }
    }

    /// Packs the id back into its integer form.
    pub fn to_raw(self) -> u32 {
        (self.index as u32 & MODE_MASK) | self.flags.0
    }

    pub fn is_auto(self) -> bool {
        self.index == 0
    }

    pub fn has(self, flag: ModeFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Same index with `extra` flags added.
    pub fn with_flags(self, extra: ModeFlags) -> Self {
        Self {
            index: self.index,
            flags: self.flags | extra,
        }
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04x})", self.index, self.to_raw())
    }
}
