use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::progress::ProgressChannel;
use crate::types::*;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a new API client with configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { http, config })
    }

    /// Create API client from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload local files as one multipart request.
    ///
    /// The backend answers with the server-side paths to hand to
    /// [`ApiClient::start_analysis`].
    pub async fn upload_files(&self, paths: &[PathBuf]) -> Result<UploadResponse> {
        info!("Uploading {} file(s)", paths.len());

        let url = format!("{}/api/upload", self.config.base_url);

        let mut form = Form::new();
        for path in paths {
            let data = tokio::fs::read(path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let part = Part::bytes(data)
                .file_name(name)
                .mime_str(mime_for_path(&path.to_string_lossy()))
                .map_err(|e| ClientError::Upload(e.to_string()))?;
            form = form.part("files", part);
        }

        let response = self
            .http
            .post(&url)
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Upload(error_detail(response).await));
        }

        let upload: UploadResponse = response.json().await?;
        debug!(
            "Uploaded {} file(s) into {}",
            upload.files.len(),
            upload.upload_dir
        );

        Ok(upload)
    }

    /// Start an analysis job with a pre-generated identifier.
    ///
    /// Requests detailed plus retrieval-augmented analysis of the given
    /// server-side file paths.
    pub async fn start_analysis(
        &self,
        job_id: &str,
        file_paths: Vec<String>,
    ) -> Result<StartAnalysisResponse> {
        info!("Starting analysis job {job_id} over {} path(s)", file_paths.len());

        let url = format!("{}/api/analyze/{job_id}", self.config.base_url);

        let request = AnalyzeRequest {
            file_paths,
            detailed: true,
            rag: true,
        };

        let response = self
            .http
            .post(&url)
            .header("accept", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::AnalysisStart(error_detail(response).await));
        }

        let started: StartAnalysisResponse = response.json().await?;
        debug!("Analysis job {} accepted", started.job_id);

        Ok(started)
    }

    /// Point-in-time status snapshot for a job.
    pub async fn analysis_status(&self, job_id: &str) -> Result<StatusResponse> {
        debug!("Checking status for job {job_id}");

        let url = format!("{}/api/status/{job_id}", self.config.base_url);

        let response = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::StatusFetch(error_detail(response).await));
        }

        Ok(response.json().await?)
    }

    /// Fetch the raw per-file results for a completed job.
    ///
    /// Returns the backend-native shape; the display transform is applied
    /// by the caller at this boundary (`scrutiny_core::report`).
    pub async fn analysis_results(&self, job_id: &str) -> Result<ResultsResponse> {
        info!("Fetching results for job {job_id}");

        let url = format!("{}/api/results/{job_id}", self.config.base_url);

        let response = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::ResultsFetch(error_detail(response).await));
        }

        Ok(response.json().await?)
    }

    /// Open a conversational context, optionally scoped to an uploaded or
    /// cloned codebase.
    pub async fn start_chat(&self, upload_dir: Option<String>) -> Result<ChatStartResponse> {
        info!("Starting chat session (scoped: {})", upload_dir.is_some());

        let url = format!("{}/api/chat/start", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .header("accept", "application/json")
            .json(&ChatStartRequest { upload_dir })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::ChatSession(error_detail(response).await));
        }

        let session: ChatStartResponse = response.json().await?;
        debug!("Chat session {} opened", session.session_id);

        Ok(session)
    }

    /// Send one chat message and wait for the full reply.
    pub async fn send_chat_message(&self, session_id: &str, text: &str) -> Result<ChatReply> {
        debug!("Sending chat message on session {session_id}");

        let url = format!("{}/api/chat/message", self.config.base_url);

        let request = ChatMessageRequest {
            session_id: session_id.to_string(),
            message: text.to_string(),
        };

        let response = self
            .http
            .post(&url)
            .header("accept", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::ChatMessage(error_detail(response).await));
        }

        let reply: ChatMessageResponse = response.json().await?;
        Ok(reply.response)
    }

    /// Open the WebSocket progress channel for a job.
    ///
    /// Frames arrive on the returned channel; transport failure closes it,
    /// which the caller treats as a signal to rely on polling.
    pub async fn open_progress(&self, job_id: &str) -> Result<ProgressChannel> {
        let url = self.config.progress_url(job_id)?;
        ProgressChannel::connect(&url).await
    }
}

/// Guess a MIME type for an uploaded source file from its extension.
pub fn mime_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("py") => "text/x-python",
        Some("rs") => "text/x-rust",
        Some("js" | "mjs" | "cjs") => "text/javascript",
        Some("ts" | "tsx" | "jsx") => "text/x-typescript",
        Some("go") => "text/x-go",
        Some("java") => "text/x-java",
        Some("c" | "h") => "text/x-c",
        Some("cpp" | "cc" | "hpp") => "text/x-c++",
        Some("rb") => "text/x-ruby",
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("yaml" | "yml") => "application/yaml",
        Some("toml") => "application/toml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Pull the user-facing message out of an error response. The backend
/// sends JSON bodies with a `detail` string; anything else falls back to
/// the HTTP status plus raw body.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.detail)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.to_string()
            } else {
                format!("{status} - {body}")
            }
        })
}
