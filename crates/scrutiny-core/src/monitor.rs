//! Job lifecycle monitoring.
//!
//! One [`JobMonitor`] owns one analysis job from attach to terminal state.
//! Status flows in from two sources at once: the WebSocket progress
//! channel (smooth progress) and a fixed-period poll (authoritative
//! status, and the backstop when the channel dies). Both feed the same
//! reducer, which enforces the lifecycle invariants:
//!
//! - status only moves forward: pending → processing → completed | failed
//! - nothing leaves a terminal state
//! - progress never decreases
//!
//! Completion triggers exactly one results fetch + transform. Tearing the
//! monitor down (drop or [`JobMonitor::shutdown`]) aborts the driver task
//! unconditionally, so no event is ever delivered to a dead view.

use crate::backend::AnalysisBackend;
use crate::report::{self, AnalysisReport};
use scrutiny_client::error::Result;
use scrutiny_client::types::{JobStatus, ProgressFrame, StatusResponse};
use scrutiny_client::ProgressChannel;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Point-in-time view of the monitored job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub start_time: Option<String>,
}

/// Events delivered to the owning view.
#[derive(Debug)]
pub enum MonitorEvent {
    /// Status or progress moved forward.
    Status(JobSnapshot),
    /// The job completed and its results were fetched and transformed.
    Report(Box<AnalysisReport>),
    /// The job itself failed. Terminal.
    JobFailed { message: String },
    /// The job completed but the results fetch failed. Retryable via
    /// [`refresh_report`]; the job still counts as completed.
    ResultsError { message: String },
    /// The push channel is gone; monitoring continues on polling alone.
    ChannelLost,
}

/// What a reducer application amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    None,
    Updated,
    Completed,
    Failed,
}

/// The reducer. Pure state, no I/O.
#[derive(Debug, Clone)]
struct JobState {
    status: JobStatus,
    progress: u8,
    message: String,
    start_time: Option<String>,
}

impl JobState {
    fn new() -> Self {
        Self {
            status: JobStatus::Pending,
            progress: 0,
            message: String::new(),
            start_time: None,
        }
    }

    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            start_time: self.start_time.clone(),
        }
    }

    fn rank(status: JobStatus) -> u8 {
        match status {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Apply a full status snapshot (from the poll or the initial fetch).
    fn apply_snapshot(&mut self, status: JobStatus, progress: u8, message: &str) -> Transition {
        if self.status.is_terminal() {
            return Transition::None;
        }

        if Self::rank(status) < Self::rank(self.status) {
            // Stale read from the slower source; progress still ratchets.
            if progress > self.progress {
                self.progress = progress;
                return Transition::Updated;
            }
            return Transition::None;
        }

        let status_changed = status != self.status;
        let progress_changed = progress > self.progress;
        let message_changed = !message.is_empty() && message != self.message;

        self.status = status;
        if progress_changed {
            self.progress = progress;
        }
        if message_changed {
            self.message = message.to_string();
        }

        match status {
            JobStatus::Completed => Transition::Completed,
            JobStatus::Failed => Transition::Failed,
            _ if status_changed || progress_changed || message_changed => Transition::Updated,
            _ => Transition::None,
        }
    }

    /// Apply a pushed progress frame. Frames carry no status, so they can
    /// only ratchet progress and refresh the message.
    fn apply_progress(&mut self, progress: u8, message: Option<&str>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        let mut changed = false;
        if progress > self.progress {
            self.progress = progress;
            changed = true;
        }
        if let Some(message) = message
            && !message.is_empty()
            && message != self.message
        {
            self.message = message.to_string();
            changed = true;
        }
        changed
    }
}

/// Handle to a running monitor. Dropping it aborts the driver task.
pub struct JobMonitor {
    job_id: String,
    driver: JoinHandle<()>,
}

impl JobMonitor {
    /// Start monitoring `job_id`. Events arrive on the returned receiver
    /// until a terminal state is reached or the monitor is torn down.
    pub fn spawn(
        backend: Arc<dyn AnalysisBackend>,
        job_id: impl Into<String>,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let job_id = job_id.into();
        let (events, rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(run(backend, job_id.clone(), poll_interval, events));
        (Self { job_id, driver }, rx)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Tear the monitor down. Equivalent to dropping the handle: the
    /// driver and any channel read task are aborted immediately and no
    /// further event is delivered.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for JobMonitor {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Re-fetch and re-transform the results of a completed job. The caller
/// replaces its report wholesale; nothing is merged.
pub async fn refresh_report(backend: &dyn AnalysisBackend, job_id: &str) -> Result<AnalysisReport> {
    let raw = backend.analysis_results(job_id).await?;
    Ok(report::build_report(job_id, raw))
}

fn clamp_percent(progress: f64) -> u8 {
    progress.clamp(0.0, 100.0).round() as u8
}

enum Terminal {
    Completed,
    Failed,
}

/// Feed one polled snapshot through the reducer, emitting events for
/// anything that moved. Returns the terminal transition, if any.
fn ingest_snapshot(
    state: &mut JobState,
    snapshot: &StatusResponse,
    events: &mpsc::UnboundedSender<MonitorEvent>,
) -> Option<Terminal> {
    let Some(status) = JobStatus::from_wire(&snapshot.status) else {
        debug!("Ignoring snapshot with unrecognized status {:?}", snapshot.status);
        return None;
    };
    if state.start_time.is_none() {
        state.start_time = snapshot.start_time.clone();
    }

    match state.apply_snapshot(status, clamp_percent(snapshot.progress), &snapshot.message) {
        Transition::Completed => {
            let _ = events.send(MonitorEvent::Status(state.snapshot()));
            Some(Terminal::Completed)
        }
        Transition::Failed => {
            let _ = events.send(MonitorEvent::Status(state.snapshot()));
            let _ = events.send(MonitorEvent::JobFailed {
                message: state.message.clone(),
            });
            Some(Terminal::Failed)
        }
        Transition::Updated => {
            let _ = events.send(MonitorEvent::Status(state.snapshot()));
            None
        }
        Transition::None => None,
    }
}

/// Fetch and transform results for a job that just completed. A failure
/// here is a retryable results error, not a job failure.
async fn fetch_report(
    backend: &dyn AnalysisBackend,
    job_id: &str,
    events: &mpsc::UnboundedSender<MonitorEvent>,
) {
    match backend.analysis_results(job_id).await {
        Ok(raw) => {
            let report = report::build_report(job_id, raw);
            let _ = events.send(MonitorEvent::Report(Box::new(report)));
        }
        Err(err) => {
            warn!("Results fetch failed for completed job {job_id}: {err}");
            let _ = events.send(MonitorEvent::ResultsError {
                message: err.to_string(),
            });
        }
    }
}

async fn next_frame(channel: &mut Option<ProgressChannel>) -> Option<ProgressFrame> {
    match channel {
        Some(channel) => channel.recv().await,
        None => std::future::pending().await,
    }
}

async fn run(
    backend: Arc<dyn AnalysisBackend>,
    job_id: String,
    poll_interval: Duration,
    events: mpsc::UnboundedSender<MonitorEvent>,
) {
    let mut state = JobState::new();

    // One snapshot up front: the job may already be terminal when the
    // view (re)attaches.
    match backend.analysis_status(&job_id).await {
        Ok(snapshot) => {
            if let Some(terminal) = ingest_snapshot(&mut state, &snapshot, &events) {
                match terminal {
                    Terminal::Completed => fetch_report(&*backend, &job_id, &events).await,
                    Terminal::Failed => {}
                }
                return;
            }
        }
        Err(err) => debug!("Initial status fetch failed (poll will retry): {err}"),
    }

    // Push channel for live progress, poll as the redundant backstop.
    let mut channel = match backend.open_progress(&job_id).await {
        Ok(channel) => Some(channel),
        Err(err) => {
            debug!("Progress channel unavailable, relying on polling: {err}");
            let _ = events.send(MonitorEvent::ChannelLost);
            None
        }
    };

    let mut poll = tokio::time::interval(poll_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            frame = next_frame(&mut channel) => match frame {
                Some(ProgressFrame::Progress { progress, message }) => {
                    if state.apply_progress(clamp_percent(progress), message.as_deref()) {
                        let _ = events.send(MonitorEvent::Status(state.snapshot()));
                    }
                }
                None => {
                    if channel.take().is_some() {
                        debug!("Progress channel closed, polling continues");
                        let _ = events.send(MonitorEvent::ChannelLost);
                    }
                }
            },
            _ = poll.tick() => match backend.analysis_status(&job_id).await {
                Ok(snapshot) => {
                    if let Some(terminal) = ingest_snapshot(&mut state, &snapshot, &events) {
                        drop(channel);
                        if let Terminal::Completed = terminal {
                            fetch_report(&*backend, &job_id, &events).await;
                        }
                        return;
                    }
                }
                Err(err) => debug!("Status poll failed (will retry): {err}"),
            },
        }
    }
}
