//! Client-side upload bookkeeping.
//!
//! One [`UploadedItem`] per queued file, created when the file is picked,
//! mutated as the upload resolves, and discarded when the user removes it
//! or the view goes away. The multipart request has no mid-flight
//! progress callbacks, so progress jumps from 0 to 100 when the backend
//! answers; the lifecycle states are what the views key off.

use scrutiny_client::mime_for_path;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Uploading,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedItem {
    pub id: u64,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub state: UploadState,
    pub progress_percent: u8,
    /// Server-side path, present once the upload completed.
    pub server_path: Option<String>,
    /// Backend-supplied message when the upload failed.
    pub error: Option<String>,
}

impl UploadedItem {
    /// Queue a local file for upload.
    pub fn queued(id: u64, path: &Path, size_bytes: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_for_path(&path.to_string_lossy()).to_string();
        Self {
            id,
            name,
            size_bytes,
            mime_type,
            state: UploadState::Uploading,
            progress_percent: 0,
            server_path: None,
            error: None,
        }
    }

    /// Mark the upload as landed on the server.
    pub fn complete(&mut self, server_path: String) {
        self.state = UploadState::Completed;
        self.progress_percent = 100;
        self.server_path = Some(server_path);
        self.error = None;
    }

    /// Mark the upload as failed with the backend's message.
    pub fn fail(&mut self, message: String) {
        self.state = UploadState::Error;
        self.server_path = None;
        self.error = Some(message);
    }
}
