//! GPU power adapter for hosts without a power-control interface.

use async_trait::async_trait;
use tracing::info;

use crate::application::av_settings::{GpuError, GpuPower};

/// Records power transitions in the log and always succeeds.
#[derive(Debug, Default)]
pub struct LoggingGpu;

#[async_trait]
impl GpuPower for LoggingGpu {
    async fn open(&self) -> Result<(), GpuError> {
        info!("gpu power on");
        Ok(())
    }

    async fn close(&self) -> Result<(), GpuError> {
        info!("gpu power off");
        Ok(())
    }
}
