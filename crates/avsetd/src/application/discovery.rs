//! Hardware discovery: ask the controller for its port counts and derive
//! the port tables.

use avset_core::PortLayout;
use tracing::info;

use crate::application::commands::{AvCommands, CommandError};

/// Queries `AV_GET_HW_CONF` and builds the [`PortLayout`].
///
/// # Errors
///
/// Any transaction or status failure, or a reply naming more ports than
/// the controller can have.  The caller treats it as fatal.
pub async fn discover(commands: &AvCommands) -> Result<PortLayout, CommandError> {
    let config = commands.get_hw_conf().await?;
    let layout = PortLayout::from_config(config);

    info!(
        "hw config: hdmi:{} avmulti:{} spdif:{}",
        config.num_hdmi, config.num_avmulti, config.num_spdif
    );
    for (i, head) in layout.heads.iter().enumerate() {
        info!("head[{i}]: 0x{head:08x}");
    }
    for (i, port) in layout.opt_ports.iter().enumerate() {
        info!("opt_port[{i}]: {port}");
    }
    for (i, port) in layout.av_ports.iter().enumerate() {
        info!("av_port[{i}]: {port}");
    }
    info!("audio_port: 0x{:08x}", layout.audio_port_mask);

    Ok(layout)
}
