//! Automatic mode selection against the live controller.
//!
//! The decision rules live in [`avset_core::domain::negotiator`]; this
//! module only feeds them monitor reports, one HDMI port at a time, stopping
//! as soon as the selector has an answer.

use std::ops::ControlFlow;

use avset_core::domain::negotiator::AutoModeSelector;
use avset_core::{CatalogError, ModeId, PortLayout, Region};
use thiserror::Error;
use tracing::debug;

use crate::application::commands::{AvCommands, CommandError};

#[derive(Debug, Error)]
pub enum AutoModeError {
    /// A monitor query failed.
    #[error("monitor query failed: {0}")]
    Query(#[from] CommandError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Picks the automatic mode for the attached displays.
///
/// HDMI ports are queried in order.  A DVI sink, or an HDMI sink that yields
/// a video id, ends the scan.  With no HDMI answer the analog default for
/// `region` is used.
pub async fn select_mode(
    commands: &AvCommands,
    layout: &PortLayout,
    region: Region,
    is_boot: bool,
) -> Result<ModeId, AutoModeError> {
    let mut selector = AutoModeSelector::new(region, is_boot);

    for &port in layout.hdmi_ports() {
        let info = commands.get_monitor_info(port).await?;
        debug!("monitor {info}");
        if let ControlFlow::Break(()) = selector.observe(info) {
            break;
        }
    }

    let id = selector.finish()?;
    debug!("auto mode {id} (boot:{is_boot})");
    Ok(id)
}
