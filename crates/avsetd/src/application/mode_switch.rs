//! The video mode switch sequence and the background worker that runs it.
//!
//! # Why a background worker? (for beginners)
//!
//! A full switch takes about two seconds because the hardware needs settle
//! time between steps.  Callers should not be blocked for that long, and
//! queries such as "what is the current mode?" must keep answering while it
//! runs.  So [`AvSettings::set_video_mode`](crate::application::av_settings::AvSettings::set_video_mode)
//! only records the new mode and hands a job to a single spawned task.
//!
//! # The "no switch in flight" permit
//!
//! A one-permit [`Semaphore`] stands for "idle".  A caller must own the
//! permit before touching mode state; the permit travels with the job and
//! the worker drops it after the last step.  A second caller therefore
//! waits in [`ModeSwitcher::acquire`] until the first switch has finished,
//! and at most one switch is ever pending or running.
//!
//! ```text
//! Idle ──acquire+submit──▶ Requested ──worker picks up──▶ Switching ──done──▶ Idle
//! ```

use std::sync::Arc;
use std::time::Duration;

use avset_core::domain::video_mode;
use avset_core::protocol::commands::AvbParam;
use avset_core::protocol::messages::{color_space, HdmiMode, Mute, Status};
use avset_core::{AvPort, ModeFlags, ModeId, PortLayout, VideoMode};
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::commands::AvCommands;
use crate::application::report::SequenceReport;

/// Wait after muting the HDMI TV outputs.
pub const TV_MUTE_SETTLE: Duration = Duration::from_millis(100);
/// Wait after disabling the video signal on every port.
pub const DISABLE_SIG_SETTLE: Duration = Duration::from_millis(300);
/// Wait after the batched mode change before unmuting.
pub const MODE_SETTLE: Duration = Duration::from_millis(1500);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwitchError {
    /// The worker has been shut down.
    #[error("mode switch worker is not running")]
    WorkerStopped,
}

/// Observable state of the switch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    Idle,
    Requested,
    Switching,
}

struct SwitchJob {
    new: ModeId,
    old: ModeId,
    permit: OwnedSemaphorePermit,
}

// ── Sequence steps ────────────────────────────────────────────────────────────

/// Mutes or unmutes video on every video-capable port, one port per
/// request so a failing port does not block the others.
pub async fn set_video_mute(commands: &AvCommands, layout: &PortLayout, mute: Mute) -> SequenceReport {
    let mut report = SequenceReport::new();
    for &port in layout.video_ports() {
        let result = commands.av_video_mute(&[port], mute).await;
        report.record("av video mute", Some(port), result);
    }
    report
}

/// TV-mutes the HDMI ports, disables the signal on every video port and
/// lifts the TV mute again, with the settle delays in between.
async fn disable_signal(commands: &AvCommands, layout: &PortLayout) -> SequenceReport {
    let mut report = SequenceReport::new();

    for &port in layout.hdmi_ports() {
        let result = commands.av_tv_mute(port, Mute::On).await;
        report.record("tv mute", Some(port), result);
    }
    tokio::time::sleep(TV_MUTE_SETTLE).await;

    for &port in layout.video_ports() {
        let result = commands.av_video_disable_sig(port).await;
        report.record("disable signal", Some(port), result);
        if port.is_hdmi() {
            let result = commands.av_tv_mute(port, Mute::Off).await;
            report.record("tv unmute", Some(port), result);
        }
    }
    tokio::time::sleep(DISABLE_SIG_SETTLE).await;

    report
}

async fn apply_hdcp(commands: &AvCommands, new: ModeId, old: ModeId, report: &mut SequenceReport) {
    if new.has(ModeFlags::HDCP_OFF) {
        match commands.av_hdmi_mode(HdmiMode::HdcpOff).await {
            Err(e) if e.status() == Some(Status::UnsupportedHdmiMode) => {
                debug!("hdcp off not supported by this hdmi controller");
            }
            result => {
                report.record("hdmi mode hdcp off", None, result);
            }
        }
    } else if old.has(ModeFlags::HDCP_OFF) {
        let result = commands.av_hdmi_mode(HdmiMode::Normal).await;
        report.record("hdmi mode normal", None, result);
    }
}

/// Colour space sent to `port` for `mode`.
///
/// DVI and RGB flagged modes always use RGB.  HDMI ports use RGB too unless
/// the `hdmi-yuv` feature is enabled.
pub fn output_color_space(port: AvPort, mode: &VideoMode, id: ModeId) -> u16 {
    if id.has(ModeFlags::DVI) || id.has(ModeFlags::RGB) {
        return color_space::RGB_8;
    }
    if port.is_hdmi() && !cfg!(feature = "hdmi-yuv") {
        return color_space::RGB_8;
    }
    mode.color_space
}

async fn apply_video_params(
    commands: &AvCommands,
    layout: &PortLayout,
    new: ModeId,
    mode: &VideoMode,
    report: &mut SequenceReport,
) {
    let mut avb = AvbParam::new();
    for &head in &layout.heads {
        avb.push_video_mode(head, mode, new);
    }
    for &port in layout.video_ports() {
        avb.push_av_video_cs(port, mode, output_color_space(port, mode, new), new);
    }
    debug!("video avb counts {:?} len {}", avb.counts(), avb.payload_len());

    let result = commands.execute(avb.into_request()).await;
    if let Err(e) = &result {
        if e.status() == Some(Status::NoSyncHead) {
            warn!("Command failed. Please try your request again.");
        }
    }
    report.record("video avb param", None, result);
}

/// Runs the full switch from `old` to `new`.
///
/// Every step is attempted even when an earlier one failed, so the outputs
/// are always unmuted at the end.
pub async fn run_video_sequence(
    commands: &AvCommands,
    layout: &PortLayout,
    new: ModeId,
    old: ModeId,
) -> SequenceReport {
    let mut report = set_video_mute(commands, layout, Mute::On).await;
    report.merge(disable_signal(commands, layout).await);
    apply_hdcp(commands, new, old, &mut report).await;

    if let Some(mode) = report.record("video mode lookup", None, video_mode::lookup(new)) {
        apply_video_params(commands, layout, new, mode, &mut report).await;
    }

    tokio::time::sleep(MODE_SETTLE).await;
    report.merge(set_video_mute(commands, layout, Mute::Off).await);
    report
}

// ── Worker ────────────────────────────────────────────────────────────────────

/// Owns the background switch worker and the idle permit.
pub struct ModeSwitcher {
    permit: Arc<Semaphore>,
    jobs: Mutex<Option<mpsc::Sender<SwitchJob>>>,
    phase: Arc<watch::Sender<SwitchPhase>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ModeSwitcher {
    /// Spawns the worker on the current runtime.
    pub fn spawn(commands: AvCommands, layout: Arc<PortLayout>) -> Self {
        let (tx, mut rx) = mpsc::channel::<SwitchJob>(1);
        let (phase_tx, _) = watch::channel(SwitchPhase::Idle);
        let phase = Arc::new(phase_tx);

        let worker_phase = Arc::clone(&phase);
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                worker_phase.send_replace(SwitchPhase::Switching);
                info!("switching video mode {} -> {}", job.old, job.new);

                let report = run_video_sequence(&commands, &layout, job.new, job.old).await;
                if !report.is_clean() {
                    warn!(
                        "video mode {} applied with {} failed step(s)",
                        job.new,
                        report.failures().len()
                    );
                }

                worker_phase.send_replace(SwitchPhase::Idle);
                drop(job.permit);
            }
            debug!("mode switch worker stopped");
        });

        Self {
            permit: Arc::new(Semaphore::new(1)),
            jobs: Mutex::new(Some(tx)),
            phase,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Waits until no switch is in flight and takes the idle permit.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, SwitchError> {
        Arc::clone(&self.permit)
            .acquire_owned()
            .await
            .map_err(|_| SwitchError::WorkerStopped)
    }

    /// Hands a switch to the worker.  The permit is released by the worker
    /// when the sequence completes, or here when submission fails.
    pub async fn submit(
        &self,
        new: ModeId,
        old: ModeId,
        permit: OwnedSemaphorePermit,
    ) -> Result<(), SwitchError> {
        let jobs = self.jobs.lock().await;
        let Some(tx) = jobs.as_ref() else {
            return Err(SwitchError::WorkerStopped);
        };

        self.phase.send_replace(SwitchPhase::Requested);
        if tx.try_send(SwitchJob { new, old, permit }).is_err() {
            self.phase.send_replace(SwitchPhase::Idle);
            return Err(SwitchError::WorkerStopped);
        }
        Ok(())
    }

    pub fn phase(&self) -> SwitchPhase {
        *self.phase.borrow()
    }

    /// A receiver that observes every phase change.
    pub fn subscribe(&self) -> watch::Receiver<SwitchPhase> {
        self.phase.subscribe()
    }

    /// Returns once no switch is pending or running.
    pub async fn wait_idle(&self) {
        match self.permit.acquire().await {
            Ok(_idle) => {}
            // Closed: the worker is gone, so nothing is in flight.
            Err(_closed) => {}
        }
    }

    /// Lets any in-flight switch finish, then stops the worker.
    ///
    /// The idle permit is held until the semaphore is closed, so callers
    /// queued in [`acquire`](Self::acquire) behind the last switch get
    /// [`SwitchError::WorkerStopped`] instead of a chance to submit.
    pub async fn shutdown(&self) {
        let idle = match self.permit.acquire().await {
            Ok(idle) => idle,
            Err(_closed) => {
                debug!("mode switch worker already stopped");
                return;
            }
        };
        self.jobs.lock().await.take();
        self.permit.close();
        drop(idle);

        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                warn!("mode switch worker ended abnormally: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avset_core::domain::video_mode::VIDEO_MODES;
    use avset_core::protocol::messages::avport;
    use avset_core::HwConfig;

    use crate::application::transaction::{TransactionEngine, DEFAULT_TIMEOUT};
    use crate::infrastructure::transport::mock::MockAvController;

    fn switcher(controller: &MockAvController) -> ModeSwitcher {
        let engine = TransactionEngine::new(Box::new(controller.clone()), DEFAULT_TIMEOUT);
        engine.set_available(true);
        let layout = PortLayout::from_config(HwConfig {
            num_hdmi: 1,
            num_avmulti: 1,
            num_spdif: 1,
        });
        ModeSwitcher::spawn(AvCommands::new(Arc::new(engine)), Arc::new(layout))
    }

    #[test]
    fn test_dvi_and_rgb_flags_force_rgb() {
        let mode = &VIDEO_MODES[5];
        let multi = AvPort(avport::AVMULTI_0);

        assert_eq!(
            output_color_space(multi, mode, ModeId::new(5, ModeFlags::DVI)),
            color_space::RGB_8
        );
        assert_eq!(
            output_color_space(multi, mode, ModeId::new(5, ModeFlags::RGB)),
            color_space::RGB_8
        );
        assert_eq!(
            output_color_space(multi, mode, ModeId::new(5, ModeFlags::NONE)),
            mode.color_space
        );
    }

    #[cfg(not(feature = "hdmi-yuv"))]
    #[test]
    fn test_hdmi_gets_rgb_without_yuv_feature() {
        let mode = &VIDEO_MODES[5];
        assert_eq!(
            output_color_space(AvPort(avport::HDMI_0), mode, ModeId::new(5, ModeFlags::NONE)),
            color_space::RGB_8
        );
    }

    #[cfg(feature = "hdmi-yuv")]
    #[test]
    fn test_hdmi_keeps_native_color_space_with_yuv_feature() {
        let mode = &VIDEO_MODES[5];
        assert_eq!(
            output_color_space(AvPort(avport::HDMI_0), mode, ModeId::new(5, ModeFlags::NONE)),
            mode.color_space
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_returns_after_shutdown() {
        // Arrange
        let switcher = switcher(&MockAvController::new());

        // Act
        switcher.shutdown().await;
        switcher.wait_idle().await;

        // Assert
        assert!(matches!(switcher.acquire().await, Err(SwitchError::WorkerStopped)));
        assert_eq!(switcher.phase(), SwitchPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_queued_behind_shutdown_is_refused() {
        // Arrange: a switch is in flight
        let controller = MockAvController::new();
        let switcher = switcher(&controller);
        let permit = switcher.acquire().await.unwrap();
        switcher
            .submit(ModeId::new(5, ModeFlags::NONE), ModeId::new(1, ModeFlags::NONE), permit)
            .await
            .unwrap();

        // Act: shutdown queues for the permit before the late caller
        let (_, late) = tokio::join!(switcher.shutdown(), switcher.acquire());

        // Assert
        assert!(matches!(late, Err(SwitchError::WorkerStopped)));
        assert_eq!(controller.sent_cids().len(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_shutdown_is_a_no_op() {
        let switcher = switcher(&MockAvController::new());

        switcher.shutdown().await;
        switcher.shutdown().await;

        assert!(switcher.worker.lock().await.is_none());
    }
}
