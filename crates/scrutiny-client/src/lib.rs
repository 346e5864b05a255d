//! HTTP and WebSocket client for the Scrutiny code analysis service.
//!
//! This crate is the sole point of contact with the backend: file upload,
//! job creation, status polling, raw result retrieval, chat exchange, and
//! the WebSocket progress channel. It does no business logic and holds no
//! job state; the lifecycle machinery lives in `scrutiny-core`.
//!
//! # Examples
//!
//! ```no_run
//! use scrutiny_client::{ApiClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(ClientConfig::new(
//!         "http://localhost:8000".to_string(),
//!         None,
//!         None,
//!     ))?;
//!
//!     let upload = client
//!         .upload_files(&[std::path::PathBuf::from("src/main.py")])
//!         .await?;
//!     println!("uploaded into {}", upload.upload_dir);
//!
//!     let job_id = "4f1c2a7e-demo";
//!     let paths: Vec<String> = upload.files.into_iter().map(|f| f.path).collect();
//!     client.start_analysis(job_id, paths).await?;
//!
//!     let status = client.analysis_status(job_id).await?;
//!     println!("job is {} at {}%", status.status, status.progress);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod progress;
pub mod types;

// Re-export main types
pub use api::{ApiClient, mime_for_path};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use progress::ProgressChannel;
pub use types::{
    ChatReply, ChatStartResponse, JobStatus, ProgressFrame, ResultsResponse, StartAnalysisResponse,
    StatusResponse, UploadResponse,
};
