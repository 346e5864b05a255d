//! Scripted backend for deterministic testing.

use crate::backend::AnalysisBackend;
use async_trait::async_trait;
use scrutiny_client::ProgressChannel;
use scrutiny_client::error::{ClientError, Result};
use scrutiny_client::types::{
    ChatReply, ChatStartResponse, ProgressFrame, ResultsResponse, StartAnalysisResponse,
    StatusResponse, UploadResponse, UploadedFile,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Backend that replays pre-scripted responses and counts calls.
///
/// Status snapshots are consumed in order; the last one repeats forever,
/// so a single `processing` entry scripts a job that never finishes.
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
struct MockState {
    statuses: Vec<StatusResponse>,
    cursor: usize,
    status_calls: usize,
    results: Option<ResultsResponse>,
    results_error: Option<String>,
    results_calls: usize,
    progress_frames: Option<Vec<ProgressFrame>>,
    chat_reply: Option<String>,
    chat_fails: bool,
}

impl MockBackend {
    /// Creates a mock that replays the given status snapshots.
    pub fn new(statuses: Vec<StatusResponse>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                statuses,
                cursor: 0,
                status_calls: 0,
                results: None,
                results_error: None,
                results_calls: 0,
                progress_frames: None,
                chat_reply: None,
                chat_fails: false,
            })),
        }
    }

    /// Script the results payload returned once the job completes.
    pub fn with_results(self, results: ResultsResponse) -> Self {
        self.state.lock().unwrap().results = Some(results);
        self
    }

    /// Make every results fetch fail with the given message.
    pub fn with_results_error(self, message: &str) -> Self {
        self.state.lock().unwrap().results_error = Some(message.to_string());
        self
    }

    /// Script frames for the progress channel. Without this, opening the
    /// channel fails, which exercises the polling fallback.
    pub fn with_progress(self, frames: Vec<ProgressFrame>) -> Self {
        self.state.lock().unwrap().progress_frames = Some(frames);
        self
    }

    pub fn with_chat_reply(self, content: &str) -> Self {
        self.state.lock().unwrap().chat_reply = Some(content.to_string());
        self
    }

    pub fn with_failing_chat(self) -> Self {
        self.state.lock().unwrap().chat_fails = true;
        self
    }

    /// Number of status snapshots served so far.
    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    /// Number of results fetches served so far.
    pub fn results_calls(&self) -> usize {
        self.state.lock().unwrap().results_calls
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    async fn upload_files(&self, paths: &[PathBuf]) -> Result<UploadResponse> {
        let files = paths
            .iter()
            .map(|p| UploadedFile {
                name: p
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: format!("/uploads/mock/{}", p.display()),
                size: 0,
                kind: "text/plain".to_string(),
            })
            .collect::<Vec<_>>();
        Ok(UploadResponse {
            total_files: files.len() as u64,
            files,
            upload_dir: "/uploads/mock".to_string(),
        })
    }

    async fn start_analysis(
        &self,
        job_id: &str,
        _file_paths: Vec<String>,
    ) -> Result<StartAnalysisResponse> {
        Ok(StartAnalysisResponse {
            job_id: job_id.to_string(),
            success: Some(true),
            results_count: None,
            status: Some("pending".to_string()),
            message: None,
        })
    }

    async fn analysis_status(&self, _job_id: &str) -> Result<StatusResponse> {
        let mut state = self.state.lock().unwrap();
        state.status_calls += 1;
        let snapshot = state
            .statuses
            .get(state.cursor)
            .or_else(|| state.statuses.last())
            .cloned()
            .ok_or_else(|| ClientError::StatusFetch("no scripted status".to_string()))?;
        if state.cursor < state.statuses.len() {
            state.cursor += 1;
        }
        Ok(snapshot)
    }

    async fn analysis_results(&self, _job_id: &str) -> Result<ResultsResponse> {
        let mut state = self.state.lock().unwrap();
        state.results_calls += 1;
        if let Some(message) = &state.results_error {
            return Err(ClientError::ResultsFetch(message.clone()));
        }
        Ok(state.results.clone().unwrap_or_default())
    }

    async fn start_chat(&self, _upload_dir: Option<String>) -> Result<ChatStartResponse> {
        if self.state.lock().unwrap().chat_fails {
            return Err(ClientError::ChatSession("scripted failure".to_string()));
        }
        Ok(ChatStartResponse {
            session_id: "mock-session".to_string(),
            codebase_info: None,
        })
    }

    async fn send_chat_message(&self, _session_id: &str, _text: &str) -> Result<ChatReply> {
        let state = self.state.lock().unwrap();
        if state.chat_fails {
            return Err(ClientError::ChatMessage("scripted failure".to_string()));
        }
        Ok(ChatReply {
            content: state.chat_reply.clone().unwrap_or_default(),
            ..ChatReply::default()
        })
    }

    async fn open_progress(&self, _job_id: &str) -> Result<ProgressChannel> {
        let frames = self
            .state
            .lock()
            .unwrap()
            .progress_frames
            .clone()
            .ok_or_else(|| ClientError::Transport("no scripted channel".to_string()))?;

        let (tx, rx) = mpsc::channel(frames.len().max(1));
        for frame in frames {
            // Capacity covers every scripted frame.
            let _ = tx.try_send(frame);
        }
        Ok(ProgressChannel::scripted(rx))
    }
}
