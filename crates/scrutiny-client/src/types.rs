//! Wire types for the Scrutiny backend API.
//!
//! These mirror the backend's JSON shapes and stay deliberately permissive:
//! fields the backend has been observed to omit or rename across versions
//! are optional or defaulted, and normalization happens downstream in the
//! result transform, not here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One file record in the upload response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    /// Server-side path to hand back to `/api/analyze`.
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Response to `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
    pub upload_dir: String,
    #[serde(default)]
    pub total_files: u64,
}

/// Request body for `POST /api/analyze/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub file_paths: Vec<String>,
    pub detailed: bool,
    pub rag: bool,
}

/// Response to `POST /api/analyze/{job_id}`.
///
/// Older backends answer `{success, job_id, results_count}`, newer ones
/// `{job_id, status, message}`. Both parse into this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAnalysisResponse {
    pub job_id: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub results_count: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Lifecycle states a job can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Parses a wire status string. Returns `None` for values outside the
    /// contract so callers can skip the snapshot instead of inventing a
    /// transition.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Response to `GET /api/status/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub completion_time: Option<String>,
}

/// Per-agent timing/count record inside a file result.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentPerformance {
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub issues_found: u64,
    #[serde(default)]
    pub execution_time: Option<f64>,
}

/// One detailed issue as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawIssue {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub agent: String,
    /// Optional override of the owning file's path.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fix: Option<String>,
}

/// One per-file record in the results payload.
///
/// The backend gives subtotals for high/medium/low but not critical; the
/// critical count is recomputed from `detailed_issues` by the transform.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawFileResult {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub lines: u64,
    #[serde(default)]
    pub total_issues: u64,
    #[serde(default)]
    pub high_issues: u64,
    #[serde(default)]
    pub medium_issues: u64,
    #[serde(default)]
    pub low_issues: u64,
    #[serde(default)]
    pub agent_performance: Vec<AgentPerformance>,
    #[serde(default)]
    pub agent_breakdown: HashMap<String, u64>,
    #[serde(default)]
    pub detailed_issues: Vec<RawIssue>,
}

/// Response to `GET /api/results/{job_id}` — the raw backend shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResultsResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub results: Vec<RawFileResult>,
    #[serde(default)]
    pub total_analysis_time: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Request body for `POST /api/chat/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStartRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<String>,
}

/// Response to `POST /api/chat/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStartResponse {
    pub session_id: String,
    #[serde(default)]
    pub codebase_info: Option<serde_json::Value>,
}

/// Request body for `POST /api/chat/message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub session_id: String,
    pub message: String,
}

/// Envelope around a chat reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub response: ChatReply,
}

/// One full assistant reply. Delivery is a single payload; there is no
/// token-by-token streaming on this API.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatReply {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub follow_up_suggestions: Vec<String>,
    #[serde(default)]
    pub related_files: Vec<String>,
}

/// Frames pushed over `ws://…/api/progress/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressFrame {
    Progress {
        progress: f64,
        #[serde(default)]
        message: Option<String>,
    },
}

/// Error bodies are JSON with a `detail` string.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_parses() {
        let json = r#"{
            "files": [{"name": "main.py", "path": "/tmp/up/main.py", "size": 120, "type": "text/x-python"}],
            "upload_dir": "/tmp/up",
            "total_files": 1
        }"#;
        let parsed: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].kind, "text/x-python");
        assert_eq!(parsed.upload_dir, "/tmp/up");
    }

    #[test]
    fn test_start_analysis_parses_both_shapes() {
        let old: StartAnalysisResponse =
            serde_json::from_str(r#"{"success": true, "job_id": "j1", "results_count": 3}"#)
                .unwrap();
        assert_eq!(old.success, Some(true));
        assert_eq!(old.results_count, Some(3));

        let new: StartAnalysisResponse =
            serde_json::from_str(r#"{"job_id": "j1", "status": "pending", "message": "queued"}"#)
                .unwrap();
        assert_eq!(new.status.as_deref(), Some("pending"));
        assert_eq!(new.message.as_deref(), Some("queued"));
    }

    #[test]
    fn test_job_status_from_wire() {
        assert_eq!(JobStatus::from_wire("pending"), Some(JobStatus::Pending));
        assert_eq!(
            JobStatus::from_wire("processing"),
            Some(JobStatus::Processing)
        );
        assert_eq!(
            JobStatus::from_wire("completed"),
            Some(JobStatus::Completed)
        );
        assert_eq!(JobStatus::from_wire("failed"), Some(JobStatus::Failed));
        assert_eq!(JobStatus::from_wire("queued"), None);
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_status_response_defaults_missing_fields() {
        let parsed: StatusResponse =
            serde_json::from_str(r#"{"job_id": "j1", "status": "processing"}"#).unwrap();
        assert_eq!(parsed.progress, 0.0);
        assert_eq!(parsed.message, "");
        assert!(parsed.completion_time.is_none());
    }

    #[test]
    fn test_results_response_parses_sparse_records() {
        let json = r#"{
            "results": [{
                "file": "app.py",
                "total_issues": 2,
                "high_issues": 1,
                "agent_breakdown": {"Security": 1, "performance": 1},
                "detailed_issues": [
                    {"title": "SQL injection", "severity": "CRITICAL", "agent": "security", "line": 42, "description": "string-built query"}
                ]
            }]
        }"#;
        let parsed: ResultsResponse = serde_json::from_str(json).unwrap();
        let file = &parsed.results[0];
        assert_eq!(file.total_issues, 2);
        assert_eq!(file.low_issues, 0);
        assert_eq!(file.agent_breakdown["Security"], 1);
        assert_eq!(file.detailed_issues[0].severity, "CRITICAL");
        assert!(file.detailed_issues[0].fix.is_none());
    }

    #[test]
    fn test_progress_frame_parses_tagged() {
        let frame: ProgressFrame =
            serde_json::from_str(r#"{"type": "progress", "progress": 45.0, "message": "scanning"}"#)
                .unwrap();
        assert_eq!(
            frame,
            ProgressFrame::Progress {
                progress: 45.0,
                message: Some("scanning".to_string()),
            }
        );

        // Unknown frame types are a parse error, which the channel skips.
        assert!(serde_json::from_str::<ProgressFrame>(r#"{"type": "heartbeat"}"#).is_err());
    }

    #[test]
    fn test_chat_reply_defaults() {
        let parsed: ChatMessageResponse =
            serde_json::from_str(r#"{"response": {"content": "hello"}}"#).unwrap();
        assert_eq!(parsed.response.content, "hello");
        assert!(parsed.response.follow_up_suggestions.is_empty());
    }
}
