//! The AV settings facade.
//!
//! [`AvSettings`] owns everything the subsystem needs: the transaction
//! engine, the discovered port layout, the current and previous mode, the
//! GPU open count, and the mode switch worker.  There is no global state;
//! callers hold an `AvSettings` (usually in an `Arc`) and call its methods.
//!
//! # Locking
//!
//! Mode state and the open count sit behind one `tokio::sync::Mutex`.  It is
//! held only for short critical sections, never across the two-second video
//! sequence, so [`AvSettings::get_mode`] answers while a switch runs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use avset_core::domain::video_mode::{self, ScanMode, VIDEO_MODES};
use avset_core::protocol::messages::{event_bit, AudioMode, Mute};
use avset_core::{CatalogError, ModeId, PortLayout, Region};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::application::audio;
use crate::application::auto_mode::{self, AutoModeError};
use crate::application::commands::{AvCommands, CommandError};
use crate::application::discovery;
use crate::application::mode_switch::{self, ModeSwitcher, SwitchError, SwitchPhase};
use crate::application::report::SequenceReport;
use crate::application::transaction::{AvEvent, AvTransport, TransactionEngine, DEFAULT_TIMEOUT};

// ── GPU power seam ────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("gpu {op} failed with status {status}")]
    Failed { op: &'static str, status: i32 },
}

/// Powers the GPU up and down.  Reference counting is done by
/// [`AvSettings`]; implementations see one `open` per `close`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GpuPower: Send + Sync {
    async fn open(&self) -> Result<(), GpuError>;

    async fn close(&self) -> Result<(), GpuError>;
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AvError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("automatic mode selection failed: {0}")]
    AutoMode(#[from] AutoModeError),

    #[error("hardware discovery failed: {0}")]
    Discovery(#[from] CommandError),

    #[error(transparent)]
    Switch(#[from] SwitchError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// `close` was called more often than `open`.
    #[error("GPU already closed")]
    AlreadyClosed,
}

// ── Probe options ─────────────────────────────────────────────────────────────

/// Start-up parameters for [`AvSettings::probe`].
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Bound on every transport read.
    pub timeout: Duration,
    /// Console region, from the configured analog output standard.
    pub region: Region,
    /// Receives every event seen during a transaction.
    pub events: Option<mpsc::Sender<AvEvent>>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            region: Region::default(),
            events: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ModeState {
    mode: ModeId,
    old_mode: ModeId,
    open_count: u32,
}

// ── Facade ────────────────────────────────────────────────────────────────────

pub struct AvSettings {
    engine: Arc<TransactionEngine>,
    commands: AvCommands,
    layout: Arc<PortLayout>,
    region: Region,
    switcher: ModeSwitcher,
    state: Mutex<ModeState>,
    gpu: Box<dyn GpuPower>,
}

impl AvSettings {
    /// Brings the controller up and records the boot-time automatic mode.
    ///
    /// Init command failures are logged and ignored.  Hardware discovery
    /// failure is fatal.  A failed automatic selection falls back to the
    /// automatic sentinel.  No switch sequence runs here; call
    /// [`set_mode`](Self::set_mode) to apply a mode.
    ///
    /// Must be called inside a Tokio runtime: the switch worker is spawned
    /// here.
    pub async fn probe(
        transport: Box<dyn AvTransport>,
        gpu: Box<dyn GpuPower>,
        options: ProbeOptions,
    ) -> Result<Self, AvError> {
        debug!("init ... timeout={:?}", options.timeout);

        let mut engine = TransactionEngine::new(transport, options.timeout);
        if let Some(events) = options.events {
            engine = engine.with_events(events);
        }
        engine.set_available(true);
        let engine = Arc::new(engine);
        let commands = AvCommands::new(Arc::clone(&engine));

        if let Err(e) = commands.av_init(event_bit::ALL).await {
            error!("av init failed: {e}");
        }
        if let Err(e) = commands.video_init().await {
            error!("video init failed: {e}");
        }
        if let Err(e) = commands.audio_init().await {
            error!("audio init failed: {e}");
        }

        let layout = match discovery::discover(&commands).await {
            Ok(layout) => Arc::new(layout),
            Err(e) => {
                engine.set_available(false);
                return Err(e.into());
            }
        };

        let mode = match auto_mode::select_mode(&commands, &layout, options.region, true).await {
            Ok(id) => id,
            Err(e) => {
                warn!("boot mode selection failed, staying on auto: {e}");
                ModeId::AUTO
            }
        };

        let switcher = ModeSwitcher::spawn(commands.clone(), Arc::clone(&layout));
        info!("init...done, mode {mode}");

        Ok(Self {
            engine,
            commands,
            layout,
            region: options.region,
            switcher,
            state: Mutex::new(ModeState {
                mode,
                ..ModeState::default()
            }),
            gpu,
        })
    }

    /// Waits for any in-flight switch, stops the worker, then finalises
    /// the controller.  Switch requests still queued are refused.
    pub async fn shutdown(&self) {
        // Stop the worker first: no switch may start once AV_FIN is sent.
        self.switcher.shutdown().await;
        if let Err(e) = self.commands.av_fin().await {
            error!("av fin failed: {e}");
        }
        self.engine.set_available(false);
        info!("shutdown complete");
    }

    // ── Mode setting ─────────────────────────────────────────────────────────

    /// Requests a switch to `id`; index 0 selects automatically and keeps
    /// `id`'s flags.
    ///
    /// Returns as soon as the switch is queued.  If another switch is in
    /// flight this waits for it to finish first.  Returns the mode that
    /// will be applied.
    pub async fn set_video_mode(&self, id: ModeId, is_boot: bool) -> Result<ModeId, AvError> {
        if id.index as usize >= VIDEO_MODES.len() {
            debug!("set_video_mode: invalid id {id}");
            return Err(CatalogError::InvalidMode(id.index).into());
        }

        let target = if id.is_auto() {
            let auto = auto_mode::select_mode(&self.commands, &self.layout, self.region, is_boot)
                .await
                .map_err(|e| {
                    error!("set_video_mode: auto selection failed: {e}");
                    e
                })?;
            auto.with_flags(id.flags)
        } else {
            id
        };

        let permit = self.switcher.acquire().await?;
        let mut state = self.state.lock().await;
        let (mode, old_mode) = (state.mode, state.old_mode);
        state.old_mode = mode;
        state.mode = target;

        if let Err(e) = self.switcher.submit(target, mode, permit).await {
            state.mode = mode;
            state.old_mode = old_mode;
            return Err(e.into());
        }
        Ok(target)
    }

    /// Applies `audio` to every port, keyed to the current video mode.
    pub async fn set_audio_mode(&self, audio: AudioMode) -> Result<SequenceReport, AvError> {
        let current = self.state.lock().await.mode;
        let vid = video_mode::lookup(current)?.vid;
        Ok(audio::run_audio_sequence(&self.commands, &self.layout, &audio, vid).await)
    }

    /// Video mode followed by the default audio mode (2ch 48 kHz 16-bit PCM).
    pub async fn set_mode(&self, id: ModeId, is_boot: bool) -> Result<SequenceReport, AvError> {
        self.set_video_mode(id, is_boot).await?;
        self.set_audio_mode(AudioMode::default()).await
    }

    pub async fn get_mode(&self) -> ModeId {
        self.state.lock().await.mode
    }

    /// Runs automatic selection without switching.
    pub async fn get_auto_mode(&self, is_boot: bool) -> Result<ModeId, AvError> {
        Ok(auto_mode::select_mode(&self.commands, &self.layout, self.region, is_boot).await?)
    }

    // ── Mute ─────────────────────────────────────────────────────────────────

    pub async fn video_mute(&self, mute: bool) -> SequenceReport {
        mode_switch::set_video_mute(&self.commands, &self.layout, Mute::from(mute)).await
    }

    pub async fn audio_mute(&self, mute: bool) -> SequenceReport {
        audio::set_audio_mute(&self.commands, &self.layout, Mute::from(mute)).await
    }

    // ── Catalog queries ──────────────────────────────────────────────────────

    pub fn mode_to_resolution(&self, id: ModeId) -> Result<(u32, u32), CatalogError> {
        video_mode::resolution_of(id)
    }

    pub fn get_scan_mode(&self, id: ModeId) -> Result<ScanMode, CatalogError> {
        video_mode::scan_mode_of(id)
    }

    pub fn get_refresh_rate(&self, id: ModeId) -> Result<u32, CatalogError> {
        video_mode::refresh_rate_of(id)
    }

    // ── GPU lifecycle ────────────────────────────────────────────────────────

    /// Takes a GPU reference, powering it on for the first one.  A failed
    /// power-on leaves the count unchanged.
    pub async fn open(&self) -> Result<(), AvError> {
        let mut state = self.state.lock().await;
        if state.open_count == 0 {
            if let Err(e) = self.gpu.open().await {
                error!("gpu open failed: {e}");
                return Err(e.into());
            }
        }
        state.open_count += 1;
        Ok(())
    }

    /// Drops a GPU reference, powering it off with the last one.
    ///
    /// The count is decremented even when power-off fails; the failure is
    /// still returned.
    pub async fn close(&self) -> Result<(), AvError> {
        let mut state = self.state.lock().await;
        if state.open_count == 0 {
            error!("GPU already closed");
            return Err(AvError::AlreadyClosed);
        }
        state.open_count -= 1;
        if state.open_count == 0 {
            if let Err(e) = self.gpu.close().await {
                warn!("gpu close failed: {e}");
                return Err(e.into());
            }
        }
        Ok(())
    }

    pub async fn open_count(&self) -> u32 {
        self.state.lock().await.open_count
    }

    // ── Introspection ────────────────────────────────────────────────────────

    pub fn hardware(&self) -> &PortLayout {
        &self.layout
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn phase(&self) -> SwitchPhase {
        self.switcher.phase()
    }

    /// Returns once no switch is pending or running.
    pub async fn wait_idle(&self) {
        self.switcher.wait_idle().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
