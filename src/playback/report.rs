//! "Stream not working" report workflow with a fixed cool-down

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::models::Channel;

/// How long the confirmation stays up after a successful report
pub const REPORT_COOLDOWN: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("report rejected: {0}")]
    Rejected(String),
    #[error("report could not be delivered: {0}")]
    Transport(String),
    #[error("report worker went away")]
    Disconnected,
}

/// Payload sent to the report endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokenStreamReport {
    pub channel_id: String,
    pub channel_name: String,
    pub reported_at: DateTime<Utc>,
}

impl BrokenStreamReport {
    pub fn for_channel(channel: &Channel) -> Self {
        Self {
            channel_id: channel.id().to_string(),
            channel_name: channel.name().to_string(),
            reported_at: Utc::now(),
        }
    }
}

/// One in-flight submission; settles exactly once
pub struct PendingReport {
    receiver: Receiver<Result<(), ReportError>>,
}

impl PendingReport {
    /// Runs `submit` on a worker thread
    pub fn spawn<F>(submit: F) -> Self
    where
        F: FnOnce() -> Result<(), ReportError> + Send + 'static,
    {
        let (tx, rx) = channel();
        thread::spawn(move || {
            // Receiver is dropped if the session closed first
            let _ = tx.send(submit());
        });
        Self { receiver: rx }
    }

    /// Already settled, for synchronous sinks
    pub fn ready(result: Result<(), ReportError>) -> Self {
        let (tx, rx) = channel();
        let _ = tx.send(result);
        Self { receiver: rx }
    }

    pub fn from_receiver(receiver: Receiver<Result<(), ReportError>>) -> Self {
        Self { receiver }
    }

    pub fn try_take(&self) -> Option<Result<(), ReportError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ReportError::Disconnected)),
        }
    }
}

/// The report endpoint
pub trait ReportSink {
    fn submit(&self, report: BrokenStreamReport) -> PendingReport;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    Idle,
    Submitting,
    Succeeded { until: Instant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Succeeded,
    /// The state is already back to idle; the message is for the user
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportIcon {
    Attention,
    Spinner,
    Check,
}

pub struct ReportChannel {
    state: ReportState,
    pending: Option<PendingReport>,
}

impl Default for ReportChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportChannel {
    pub fn new() -> Self {
        Self {
            state: ReportState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> ReportState {
        self.state
    }

    /// The button is disabled while submitting and during the cool-down
    pub fn is_enabled(&self) -> bool {
        self.state == ReportState::Idle
    }

    /// Starts a submission. Returns false (and sends nothing) unless idle.
    pub fn submit(&mut self, channel: &Channel, sink: &dyn ReportSink) -> bool {
        if self.state != ReportState::Idle {
            return false;
        }
        self.state = ReportState::Submitting;
        self.pending = Some(sink.submit(BrokenStreamReport::for_channel(channel)));
        true
    }

    /// Settles a finished submission and expires the cool-down
    pub fn poll(&mut self, now: Instant) -> Option<ReportOutcome> {
        if let ReportState::Succeeded { until } = self.state {
            if now >= until {
                self.state = ReportState::Idle;
            }
            return None;
        }

        let result = self.pending.as_ref()?.try_take()?;
        self.pending = None;
        match result {
            Ok(()) => {
                info!("Broken stream report accepted");
                self.state = ReportState::Succeeded {
                    until: now + REPORT_COOLDOWN,
                };
                Some(ReportOutcome::Succeeded)
            }
            Err(e) => {
                warn!("Broken stream report failed: {}", e);
                self.state = ReportState::Idle;
                Some(ReportOutcome::Failed(
                    "Failed to submit report. Please try again later.".to_string(),
                ))
            }
        }
    }

    /// Drops any in-flight submission and the cool-down
    pub fn cancel(&mut self) {
        self.pending = None;
        self.state = ReportState::Idle;
    }

    pub fn label(&self, narrow: bool) -> &'static str {
        match (self.state, narrow) {
            (ReportState::Submitting, true) => "REPORTING",
            (ReportState::Submitting, false) => "REPORTING...",
            (ReportState::Succeeded { .. }, _) => "REPORTED",
            (ReportState::Idle, true) => "REPORT",
            (ReportState::Idle, false) => "REPORT NOT WORKING",
        }
    }

    pub fn icon(&self) -> ReportIcon {
        match self.state {
            ReportState::Idle => ReportIcon::Attention,
            ReportState::Submitting => ReportIcon::Spinner,
            ReportState::Succeeded { .. } => ReportIcon::Check,
        }
    }
}
