//! The seam between client logic and the network.
//!
//! Everything the monitor, chat, and views need from the backend goes
//! through [`AnalysisBackend`], so tests can substitute the scripted
//! backend in [`crate::testing`] for the real [`ApiClient`].

use async_trait::async_trait;
use scrutiny_client::error::Result;
use scrutiny_client::types::{
    ChatReply, ChatStartResponse, ResultsResponse, StartAnalysisResponse, StatusResponse,
    UploadResponse,
};
use scrutiny_client::{ApiClient, ProgressChannel};
use std::path::PathBuf;

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn upload_files(&self, paths: &[PathBuf]) -> Result<UploadResponse>;

    async fn start_analysis(
        &self,
        job_id: &str,
        file_paths: Vec<String>,
    ) -> Result<StartAnalysisResponse>;

    async fn analysis_status(&self, job_id: &str) -> Result<StatusResponse>;

    async fn analysis_results(&self, job_id: &str) -> Result<ResultsResponse>;

    async fn start_chat(&self, upload_dir: Option<String>) -> Result<ChatStartResponse>;

    async fn send_chat_message(&self, session_id: &str, text: &str) -> Result<ChatReply>;

    async fn open_progress(&self, job_id: &str) -> Result<ProgressChannel>;
}

#[async_trait]
impl AnalysisBackend for ApiClient {
    async fn upload_files(&self, paths: &[PathBuf]) -> Result<UploadResponse> {
        ApiClient::upload_files(self, paths).await
    }

    async fn start_analysis(
        &self,
        job_id: &str,
        file_paths: Vec<String>,
    ) -> Result<StartAnalysisResponse> {
        ApiClient::start_analysis(self, job_id, file_paths).await
    }

    async fn analysis_status(&self, job_id: &str) -> Result<StatusResponse> {
        ApiClient::analysis_status(self, job_id).await
    }

    async fn analysis_results(&self, job_id: &str) -> Result<ResultsResponse> {
        ApiClient::analysis_results(self, job_id).await
    }

    async fn start_chat(&self, upload_dir: Option<String>) -> Result<ChatStartResponse> {
        ApiClient::start_chat(self, upload_dir).await
    }

    async fn send_chat_message(&self, session_id: &str, text: &str) -> Result<ChatReply> {
        ApiClient::send_chat_message(self, session_id, text).await
    }

    async fn open_progress(&self, job_id: &str) -> Result<ProgressChannel> {
        ApiClient::open_progress(self, job_id).await
    }
}
