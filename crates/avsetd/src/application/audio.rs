//! Audio mute and the audio mode sequence.

use avset_core::protocol::commands::AvbParam;
use avset_core::protocol::messages::{AudioMode, Mute, OPT_PORT_MAX};
use avset_core::PortLayout;
use tracing::debug;

use crate::application::commands::AvCommands;
use crate::application::report::SequenceReport;

/// Mutes or unmutes audio on every port, one request per port.
///
/// Video-capable ports are muted through the AV group; optical ports go
/// through the audio group.
pub async fn set_audio_mute(commands: &AvCommands, layout: &PortLayout, mute: Mute) -> SequenceReport {
    let mut report = SequenceReport::new();

    for &port in layout.video_ports() {
        let result = commands.av_audio_mute(&[port], mute).await;
        report.record("av audio mute", Some(port), result);
    }

    let optical = (layout.config.num_spdif as usize).min(OPT_PORT_MAX);
    for &port in &layout.opt_ports[..optical] {
        let result = commands.audio_mute(&[port], mute).await;
        report.record("optical audio mute", Some(port), result);
    }

    report
}

/// Applies `mode` to every audio port.
///
/// Steps: mute and deactivate, one `AUDIO_MODE` per port, one batched
/// parameter request carrying the HDMI audio parameters for `vid`, then
/// unmute and reactivate.  Failures are recorded and the sequence carries
/// on so the outputs never stay muted.
pub async fn run_audio_sequence(
    commands: &AvCommands,
    layout: &PortLayout,
    mode: &AudioMode,
    vid: u8,
) -> SequenceReport {
    let mut report = set_audio_mute(commands, layout, Mute::On).await;
    let inactive = commands.audio_active(false, layout.audio_port_mask).await;
    report.record("audio inactive", None, inactive);

    let mut avb = AvbParam::new();
    for &port in layout.audio_ports() {
        let result = commands.audio_mode(port, mode).await;
        report.record("audio mode", Some(port), result);
        if port.is_hdmi() {
            avb.push_av_audio_param(port, mode, vid);
        }
    }
    debug!("audio avb counts {:?}", avb.counts());
    let batched = commands.execute(avb.into_request()).await;
    report.record("audio avb param", None, batched);

    report.merge(set_audio_mute(commands, layout, Mute::Off).await);
    let active = commands.audio_active(true, layout.audio_port_mask).await;
    report.record("audio active", None, active);

    report
}
