//! AV settings daemon entry point.
//!
//! Loads configuration, connects to the AV controller, applies the
//! configured video mode and then reports controller events until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- $AVSETD_CONFIG or /etc/avsetd/config.toml
//!  └─ StreamTransport::connect -- TCP byte stream to the controller
//!  └─ AvSettings::probe()      -- init, discovery, boot mode selection
//!       └─ ModeSwitcher        (Tokio task running switch sequences)
//!  └─ set_mode(configured, boot)
//!  └─ event pump               (logs plug / HDCP events)
//! ```

use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use avset_core::{ModeId, Region};
use avsetd::application::av_settings::{AvSettings, ProbeOptions};
use avsetd::infrastructure::gpu::LoggingGpu;
use avsetd::infrastructure::storage::config::{config_file_path, load_config};
use avsetd::infrastructure::transport::StreamTransport;

/// Capacity of the controller event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // Initialise structured logging.  `RUST_LOG` overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level)),
        )
        .init();

    info!("avsetd starting (config {})", config_file_path().display());

    let transport = StreamTransport::connect(&config.transport.endpoint).await?;
    let (event_tx, mut event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let options = ProbeOptions {
        timeout: config.transport.timeout(),
        region: Region::from(config.video.av_multi_out),
        events: Some(event_tx),
    };
    let settings = AvSettings::probe(Box::new(transport), Box::new(LoggingGpu), options).await?;

    let requested = ModeId::from_raw(config.video.mode);
    match settings.set_mode(requested, true).await {
        Ok(report) if report.is_clean() => info!("mode {requested} requested"),
        Ok(report) => warn!(
            "mode {requested} requested, audio setup had {} failed step(s)",
            report.failures().len()
        ),
        Err(e) => warn!("could not set mode {requested}: {e}"),
    }

    // ── Event pump ────────────────────────────────────────────────────────────
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            info!("controller event {:?} on port 0x{:02x}", event.kind, event.port);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    settings.shutdown().await;
    Ok(())
}
