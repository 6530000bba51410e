//! Hardware configuration: port counts and the derived port tables.
//!
//! The controller reports how many ports of each class it has.  Everything
//! else (which numeric id each port has, which head is which) is derived
//! here once and stays fixed until the next initialisation.
//!
//! The counts arrive off the wire, so each is bounded by its class maximum
//! ([`HDMI_MAX`], [`AVMULTI_MAX`], [`SPDIF_MAX`]) before any port id is
//! derived from it.
//!
//! # Port order matters
//!
//! The combined AV port list is always HDMI ports first, then analog
//! multi-out ports, then optical ports.  Code that mutes "video ports" takes
//! the first `num_hdmi + num_avmulti` entries and code that handles "HDMI
//! only" takes the first `num_hdmi`, so this order is load-bearing.

use crate::protocol::messages::{
    audio_port, avport, head, AVMULTI_MAX, HDMI_MAX, HEAD_MAX, OPT_PORT_MAX, SPDIF_MAX,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HwConfigError {
    #[error("controller reports {count} {class} ports, at most {max} are addressable")]
    TooManyPorts {
        class: &'static str,
        count: u16,
        max: usize,
    },
}

/// Port counts as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HwConfig {
    pub num_hdmi: u16,
    pub num_avmulti: u16,
    pub num_spdif: u16,
}

impl HwConfig {
    fn classes(&self) -> [(&'static str, u16, usize); 3] {
        [
            ("hdmi", self.num_hdmi, HDMI_MAX),
            ("avmulti", self.num_avmulti, AVMULTI_MAX),
            ("spdif", self.num_spdif, SPDIF_MAX),
        ]
    }

    /// Rejects counts above their class maximum.
    ///
    /// # Errors
    ///
    /// Returns [`HwConfigError::TooManyPorts`] for the first class over its
    /// limit.
    pub fn validate(&self) -> Result<(), HwConfigError> {
        for (class, count, max) in self.classes() {
            if count as usize > max {
                return Err(HwConfigError::TooManyPorts { class, count, max });
            }
        }
        Ok(())
    }

    /// The same counts, each cut to its class maximum.
    pub fn clamped(self) -> Self {
        Self {
            num_hdmi: self.num_hdmi.min(HDMI_MAX as u16),
            num_avmulti: self.num_avmulti.min(AVMULTI_MAX as u16),
            num_spdif: self.num_spdif.min(SPDIF_MAX as u16),
        }
    }
}

/// A physical AV output port id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvPort(pub u16);

impl AvPort {
    pub fn is_hdmi(self) -> bool {
        self.0 == avport::HDMI_0 || self.0 == avport::HDMI_1
    }
}

impl fmt::Display for AvPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Port id tables derived from a [`HwConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortLayout {
    pub config: HwConfig,
    /// One id per display head.
    pub heads: Vec<u32>,
    /// Optical ports addressed by the plain audio-mute command.
    pub opt_ports: Vec<AvPort>,
    /// HDMI ports, then multi-out ports, then optical ports.
    pub av_ports: Vec<AvPort>,
    /// Audio port mask; always "all ports", whatever was discovered.
    pub audio_port_mask: u32,
}

impl PortLayout {
    /// Derives the port tables.  Counts over their class maximum are
    /// clamped; callers that must refuse them check
    /// [`HwConfig::validate`] first.
    pub fn from_config(config: HwConfig) -> Self {
        let config = config.clamped();
        let heads = (0..HEAD_MAX as u32).map(|i| head::HEAD_A + i).collect();
        let opt_ports = (0..OPT_PORT_MAX as u16)
            .map(|i| AvPort(avport::SPDIF_0 + i))
            .collect();

        let hdmi = (0..config.num_hdmi).map(|i| AvPort(avport::HDMI_0 + i));
        let avmulti = (0..config.num_avmulti).map(|i| AvPort(avport::AVMULTI_0 + i));
        let spdif = (0..config.num_spdif).map(|i| AvPort(avport::SPDIF_0 + i));
        let av_ports = hdmi.chain(avmulti).chain(spdif).collect();

        Self {
            config,
            heads,
            opt_ports,
            av_ports,
            audio_port_mask: audio_port::ALL,
        }
    }

    /// The first `num_hdmi` AV ports.
    pub fn hdmi_ports(&self) -> &[AvPort] {
        &self.av_ports[..self.config.num_hdmi as usize]
    }

    /// HDMI and multi-out ports: everything that carries video.
    pub fn video_ports(&self) -> &[AvPort] {
        let n = self.config.num_hdmi as usize + self.config.num_avmulti as usize;
        &self.av_ports[..n]
    }

    /// Every audio-capable port, optical included.
    pub fn audio_ports(&self) -> &[AvPort] {
        &self.av_ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typical() -> HwConfig {
        HwConfig {
            num_hdmi: 1,
            num_avmulti: 1,
            num_spdif: 1,
        }
    }

    #[test]
    fn test_av_ports_are_hdmi_then_avmulti_then_spdif() {
        let layout = PortLayout::from_config(HwConfig {
            num_hdmi: 2,
            num_avmulti: 1,
            num_spdif: 2,
        });
        let ids: Vec<u16> = layout.av_ports.iter().map(|p| p.0).collect();
        assert_eq!(ids, vec![0x00, 0x01, 0x10, 0x20, 0x21]);
    }

    #[test]
    fn test_heads_and_opt_ports_use_fixed_maximum_counts() {
        let layout = PortLayout::from_config(HwConfig::default());
        assert_eq!(layout.heads, vec![head::HEAD_A, head::HEAD_B]);
        assert_eq!(layout.opt_ports, vec![AvPort(avport::SPDIF_0)]);
        assert!(layout.av_ports.is_empty());
    }

    #[test]
    fn test_audio_mask_is_all_ports_regardless_of_discovery() {
        let layout = PortLayout::from_config(HwConfig::default());
        assert_eq!(layout.audio_port_mask, audio_port::ALL);
    }

    #[test]
    fn test_port_slices_follow_counts() {
        let layout = PortLayout::from_config(typical());
        assert_eq!(layout.hdmi_ports(), &[AvPort(avport::HDMI_0)]);
        assert_eq!(
            layout.video_ports(),
            &[AvPort(avport::HDMI_0), AvPort(avport::AVMULTI_0)]
        );
        assert_eq!(layout.audio_ports().len(), 3);
    }

    #[test]
    fn test_oversized_counts_are_clamped_to_class_maximum() {
        // Arrange: counts that would run past the u16 port id space
        let config = HwConfig {
            num_hdmi: 0xFFFF,
            num_avmulti: 0xFFF1,
            num_spdif: 0xFFFF,
        };

        // Act
        let layout = PortLayout::from_config(config);

        // Assert
        let ids: Vec<u16> = layout.av_ports.iter().map(|p| p.0).collect();
        assert_eq!(ids, vec![0x00, 0x01, 0x10, 0x20, 0x21]);
        assert_eq!(layout.hdmi_ports().len(), HDMI_MAX);
        assert_eq!(layout.video_ports().len(), HDMI_MAX + AVMULTI_MAX);
        assert_eq!(layout.config, config.clamped());
    }

    #[test]
    fn test_validate_rejects_count_over_class_maximum() {
        let config = HwConfig {
            num_hdmi: 1,
            num_avmulti: 0xFFF1,
            num_spdif: 1,
        };

        assert_eq!(
            config.validate(),
            Err(HwConfigError::TooManyPorts {
                class: "avmulti",
                count: 0xFFF1,
                max: AVMULTI_MAX
            })
        );
        assert_eq!(typical().validate(), Ok(()));
    }

    #[test]
    fn test_only_hdmi_ids_are_hdmi() {
        assert!(AvPort(avport::HDMI_1).is_hdmi());
        assert!(!AvPort(avport::AVMULTI_0).is_hdmi());
        assert!(!AvPort(avport::SPDIF_0).is_hdmi());
    }
}
