//! Outcome of a best-effort multi-step sequence.
//!
//! The audio and video sequences keep going when one step fails so the
//! outputs are never left muted.  Each failure is logged where it happens
//! and recorded here for the caller.

use avset_core::AvPort;
use std::fmt;
use tracing::warn;

/// One failed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: &'static str,
    pub port: Option<AvPort>,
    pub error: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{} (port {port}): {}", self.step, self.error),
            None => write!(f, "{}: {}", self.step, self.error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    failures: Vec<StepFailure>,
}

impl SequenceReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs and keeps `error` when `result` failed.
    pub fn record<T, E: fmt::Display>(
        &mut self,
        step: &'static str,
        port: Option<AvPort>,
        result: Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let failure = StepFailure {
                    step,
                    port,
                    error: e.to_string(),
                };
                warn!("{failure}");
                self.failures.push(failure);
                None
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    pub fn merge(&mut self, other: SequenceReport) {
        self.failures.extend(other.failures);
    }
}
