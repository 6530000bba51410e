//! Scripted AV controller for tests.
//!
//! [`MockAvController`] implements [`AvTransport`] by answering every
//! written request the way a healthy controller would: a success status,
//! plus the configured hardware counts or monitor report for the two query
//! commands.  Tests can then bend that behaviour per command id:
//!
//! - [`set_status`](MockAvController::set_status) answers with an error status;
//! - [`fail_next`](MockAvController::fail_next) does so for the next request only;
//! - [`script_reply`](MockAvController::script_reply) sends raw bytes instead;
//! - [`drop_reply`](MockAvController::drop_reply) sends nothing at all;
//! - [`queue_event`](MockAvController::queue_event) emits an event frame
//!   before the next reply.
//!
//! Clones share state, so a test keeps one handle while the engine owns
//! another.  Every request is recorded with the (virtual) time it was sent.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use avset_core::domain::monitor::ResolutionReport;
use avset_core::protocol::commands::{encode_hw_conf, encode_monitor_info, encode_reply};
use avset_core::protocol::frame::{build_request, decode_header};
use avset_core::protocol::messages::{Status, HEADER_SIZE};
use avset_core::{Cid, HwConfig, MonitorInfo, MonitorType};
use tokio::time::Instant;
use tracing::warn;

use crate::application::transaction::{AvTransport, TransportError};

/// One request as the controller saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub cid: Cid,
    pub body: Vec<u8>,
    pub at: Instant,
}

#[derive(Default)]
struct ControllerState {
    hw_config: HwConfig,
    monitors: HashMap<u16, MonitorInfo>,
    statuses: HashMap<Cid, Status>,
    next_statuses: HashMap<Cid, VecDeque<Status>>,
    scripted: HashMap<Cid, VecDeque<Vec<u8>>>,
    dropped: HashSet<Cid>,
    pending_events: Vec<Cid>,
    closed: bool,
    requests: Vec<SentRequest>,
    outbound: VecDeque<u8>,
}

#[derive(Clone, Default)]
pub struct MockAvController {
    state: Arc<Mutex<ControllerState>>,
}

impl MockAvController {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ControllerState) -> T) -> T {
        f(&mut self.state.lock().expect("lock poisoned"))
    }

    pub fn set_hw_config(&self, config: HwConfig) {
        self.with_state(|s| s.hw_config = config);
    }

    /// Reports `info` for queries on `info.port`.  Unconfigured ports report
    /// nothing attached.
    pub fn set_monitor(&self, info: MonitorInfo) {
        self.with_state(|s| {
            s.monitors.insert(info.port, info);
        });
    }

    /// Answers every `cid` request with `status`.
    pub fn set_status(&self, cid: Cid, status: Status) {
        self.with_state(|s| {
            s.statuses.insert(cid, status);
        });
    }

    /// Answers only the next `cid` request with `status`; later requests
    /// fall back to [`set_status`](Self::set_status) or success.
    pub fn fail_next(&self, cid: Cid, status: Status) {
        self.with_state(|s| s.next_statuses.entry(cid).or_default().push_back(status));
    }

    /// Answers the next `cid` request with `frame` verbatim.  Several
    /// frames for the same cid are used in order.
    pub fn script_reply(&self, cid: Cid, frame: Vec<u8>) {
        self.with_state(|s| s.scripted.entry(cid).or_default().push_back(frame));
    }

    /// Never answers `cid`; the engine's read then times out.
    pub fn drop_reply(&self, cid: Cid) {
        self.with_state(|s| {
            s.dropped.insert(cid);
        });
    }

    /// Sends an event frame with `cid` ahead of the next reply.
    pub fn queue_event(&self, cid: Cid) {
        self.with_state(|s| s.pending_events.push(cid));
    }

    /// Makes every later write fail as if the channel were gone.
    pub fn close(&self) {
        self.with_state(|s| s.closed = true);
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<SentRequest> {
        self.with_state(|s| s.requests.clone())
    }

    /// Command ids received so far, oldest first.
    pub fn sent_cids(&self) -> Vec<Cid> {
        self.with_state(|s| s.requests.iter().map(|r| r.cid).collect())
    }

    pub fn clear_requests(&self) {
        self.with_state(|s| s.requests.clear());
    }
}

impl ControllerState {
    fn reply_data(&self, cid: Cid, body: &[u8]) -> Vec<u8> {
        match cid {
            Cid::AV_GET_HW_CONF => encode_hw_conf(&self.hw_config),
            Cid::AV_GET_MONITOR_INFO => {
                let port = body
                    .get(..2)
                    .map(|b| u16::from_be_bytes([b[0], b[1]]))
                    .unwrap_or_default();
                let info = self.monitors.get(&port).cloned().unwrap_or(MonitorInfo {
                    port,
                    monitor_type: MonitorType::Other(0),
                    res_60: ResolutionReport::default(),
                    res_50: ResolutionReport::default(),
                    name: String::new(),
                });
                encode_monitor_info(&info)
            }
            _ => Vec::new(),
        }
    }

    fn respond(&mut self, cid: Cid, body: &[u8]) {
        for event in std::mem::take(&mut self.pending_events) {
            match build_request(event, &0u32.to_be_bytes()) {
                Ok(frame) => self.outbound.extend(frame),
                Err(e) => warn!("mock event {event} not encodable: {e}"),
            }
        }

        if let Some(frame) = self.scripted.get_mut(&cid).and_then(VecDeque::pop_front) {
            self.outbound.extend(frame);
            return;
        }
        if self.dropped.contains(&cid) {
            return;
        }

        let status = self
            .next_statuses
            .get_mut(&cid)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.statuses.get(&cid).copied())
            .unwrap_or(Status::Success);
        let data = if status.is_success() {
            self.reply_data(cid, body)
        } else {
            Vec::new()
        };
        match encode_reply(cid, status, &data) {
            Ok(frame) => self.outbound.extend(frame),
            Err(e) => warn!("mock reply for {cid} not encodable: {e}"),
        }
    }
}

#[async_trait]
impl AvTransport for MockAvController {
    async fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        let header = decode_header(bytes).map_err(|e| {
            TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        let body = bytes[HEADER_SIZE..].to_vec();

        self.with_state(|s| {
            if s.closed {
                return Err(TransportError::Closed);
            }
            s.requests.push(SentRequest {
                cid: header.cid,
                body: body.clone(),
                at: Instant::now(),
            });
            s.respond(header.cid, &body);
            Ok(bytes.len())
        })
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let n = self.with_state(|s| {
            let n = buf.len().min(s.outbound.len());
            for (dst, src) in buf.iter_mut().zip(s.outbound.drain(..n)) {
                *dst = src;
            }
            n
        });
        if n == 0 && !buf.is_empty() {
            tokio::time::sleep(timeout).await;
            return Err(TransportError::Timeout(timeout));
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_answers_with_success_reply() {
        // Arrange
        let mut controller = MockAvController::new();
        let request = build_request(Cid::AV_FIN, &[]).unwrap();

        // Act
        controller.write(&request).await.unwrap();
        let mut buf = [0u8; 12];
        let n = controller.read(&mut buf, Duration::from_millis(10)).await.unwrap();

        // Assert
        assert_eq!(n, 12);
        assert_eq!(decode_header(&buf).unwrap().cid, Cid::AV_FIN.reply());
        assert_eq!(controller.sent_cids(), vec![Cid::AV_FIN]);
    }

    #[tokio::test]
    async fn test_closed_mock_rejects_writes() {
        let mut controller = MockAvController::new();
        controller.close();

        let result = controller.write(&build_request(Cid::AV_FIN, &[]).unwrap()).await;

        assert!(matches!(result, Err(TransportError::Closed)));
        assert!(controller.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_mock_times_out() {
        let mut controller = MockAvController::new();
        let mut buf = [0u8; 8];

        let result = controller.read(&mut buf, Duration::from_secs(5)).await;

        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }
}
