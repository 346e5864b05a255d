//! Deterministic test support.

mod mock_backend;

pub use mock_backend::MockBackend;

use scrutiny_client::types::StatusResponse;

/// Shorthand for building status snapshots in tests.
pub fn status(job_id: &str, status: &str, progress: f64, message: &str) -> StatusResponse {
    StatusResponse {
        job_id: job_id.to_string(),
        status: status.to_string(),
        progress,
        message: message.to_string(),
        start_time: None,
        completion_time: None,
    }
}
