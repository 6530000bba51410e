//! Typed command wrappers over the transaction engine.
//!
//! Each method builds a request with `avset_core::protocol::commands`, runs
//! it, and checks the status word of the reply.  A non-success status is an
//! error carrying the status so callers can tolerate specific codes.

use std::sync::Arc;

use avset_core::protocol::commands::{self, ReplyError, Request};
use avset_core::protocol::messages::{AudioMode, HdmiMode, Mute, Status};
use avset_core::{AvPort, Cid, HwConfig, MonitorInfo};
use thiserror::Error;
use tracing::debug;

use crate::application::transaction::{TransactionEngine, TransactionError};

/// Errors from a typed command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// The controller answered with a non-success status.
    #[error("cid {cid} failed with status {status:?}")]
    Status { cid: Cid, status: Status },

    #[error(transparent)]
    Reply(#[from] ReplyError),
}

impl CommandError {
    /// The controller's status, when the failure was a status error.
    pub fn status(&self) -> Option<Status> {
        match self {
            CommandError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Typed access to the AV controller.
#[derive(Clone)]
pub struct AvCommands {
    engine: Arc<TransactionEngine>,
}

impl AvCommands {
    pub fn new(engine: Arc<TransactionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<TransactionEngine> {
        &self.engine
    }

    /// Runs `request` and returns the reply frame after checking its status.
    pub async fn execute(&self, request: Request) -> Result<Vec<u8>, CommandError> {
        let reply = self
            .engine
            .transact(request.cid, &request.body, request.reply_capacity)
            .await?;
        let status = commands::reply_status(&reply)?;
        if !status.is_success() {
            debug!("cid {} returned status {status:?}", request.cid);
            return Err(CommandError::Status {
                cid: request.cid,
                status,
            });
        }
        Ok(reply)
    }

    async fn run(&self, request: Request) -> Result<(), CommandError> {
        self.execute(request).await.map(|_| ())
    }

    pub async fn av_init(&self, event_bits: u32) -> Result<(), CommandError> {
        self.run(commands::av_init(event_bits)).await
    }

    pub async fn av_fin(&self) -> Result<(), CommandError> {
        self.run(commands::av_fin()).await
    }

    pub async fn video_init(&self) -> Result<(), CommandError> {
        self.run(commands::video_init()).await
    }

    pub async fn audio_init(&self) -> Result<(), CommandError> {
        self.run(commands::audio_init()).await
    }

    pub async fn enable_event(&self, event_bits: u32) -> Result<(), CommandError> {
        self.run(commands::enable_event(event_bits)).await
    }

    pub async fn disable_event(&self, event_bits: u32) -> Result<(), CommandError> {
        self.run(commands::disable_event(event_bits)).await
    }

    pub async fn av_video_mute(&self, ports: &[AvPort], mute: Mute) -> Result<(), CommandError> {
        self.run(commands::av_video_mute(ports, mute)).await
    }

    pub async fn av_audio_mute(&self, ports: &[AvPort], mute: Mute) -> Result<(), CommandError> {
        self.run(commands::av_audio_mute(ports, mute)).await
    }

    pub async fn audio_mute(&self, ports: &[AvPort], mute: Mute) -> Result<(), CommandError> {
        self.run(commands::audio_mute(ports, mute)).await
    }

    pub async fn av_tv_mute(&self, port: AvPort, mute: Mute) -> Result<(), CommandError> {
        self.run(commands::av_tv_mute(port, mute)).await
    }

    pub async fn av_video_disable_sig(&self, port: AvPort) -> Result<(), CommandError> {
        self.run(commands::av_video_disable_sig(port)).await
    }

    pub async fn audio_active(&self, active: bool, port_mask: u32) -> Result<(), CommandError> {
        self.run(commands::audio_active(active, port_mask)).await
    }

    pub async fn av_hdmi_mode(&self, mode: HdmiMode) -> Result<(), CommandError> {
        self.run(commands::av_hdmi_mode(mode)).await
    }

    pub async fn audio_mode(&self, port: AvPort, mode: &AudioMode) -> Result<(), CommandError> {
        self.run(commands::audio_mode(port, mode)).await
    }

    pub async fn get_hw_conf(&self) -> Result<HwConfig, CommandError> {
        let reply = self.execute(commands::get_hw_conf()).await?;
        Ok(commands::parse_hw_conf(&reply)?)
    }

    pub async fn get_monitor_info(&self, port: AvPort) -> Result<MonitorInfo, CommandError> {
        let reply = self.execute(commands::get_monitor_info(port)).await?;
        Ok(commands::parse_monitor_info(&reply)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::transaction::DEFAULT_TIMEOUT;
    use crate::infrastructure::transport::mock::MockAvController;
    use avset_core::protocol::messages::avport;
    use avset_core::MonitorType;

    fn commands(controller: &MockAvController) -> AvCommands {
        let engine = TransactionEngine::new(Box::new(controller.clone()), DEFAULT_TIMEOUT);
        engine.set_available(true);
        AvCommands::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn test_status_error_is_reported_with_status() {
        let controller = MockAvController::new();
        controller.set_status(Cid::AV_HDMI_MODE, Status::UnsupportedHdmiMode);
        let commands = commands(&controller);

        let err = commands.av_hdmi_mode(HdmiMode::HdcpOff).await.unwrap_err();

        assert_eq!(err.status(), Some(Status::UnsupportedHdmiMode));
    }

    #[tokio::test]
    async fn test_get_hw_conf_parses_reply() {
        let controller = MockAvController::new();
        controller.set_hw_config(HwConfig {
            num_hdmi: 2,
            num_avmulti: 1,
            num_spdif: 2,
        });

        let config = commands(&controller).get_hw_conf().await.unwrap();

        assert_eq!(config.num_hdmi, 2);
        assert_eq!(config.num_spdif, 2);
    }

    #[tokio::test]
    async fn test_get_monitor_info_for_unknown_port_reports_nothing_attached() {
        let controller = MockAvController::new();

        let info = commands(&controller)
            .get_monitor_info(AvPort(avport::HDMI_1))
            .await
            .unwrap();

        assert_eq!(info.port, avport::HDMI_1);
        assert_eq!(info.monitor_type, MonitorType::Other(0));
    }

    #[tokio::test]
    async fn test_request_body_reaches_controller() {
        let controller = MockAvController::new();

        commands(&controller)
            .av_tv_mute(AvPort(avport::HDMI_0), Mute::On)
            .await
            .unwrap();

        let sent = controller.requests();
        assert_eq!(sent[0].cid, Cid::AV_TV_MUTE);
        assert_eq!(sent[0].body, vec![0, 0, 0, 1]);
    }
}
