use crate::error::{ClientError, Result};
use std::env;
use url::Url;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `http://localhost:8000`.
    pub base_url: String,
    pub request_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
}

impl ClientConfig {
    /// Create a new configuration with explicit values.
    pub fn new(
        base_url: String,
        request_timeout_seconds: Option<u64>,
        poll_interval_seconds: Option<u64>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout_seconds: request_timeout_seconds.unwrap_or(60),
            poll_interval_seconds: poll_interval_seconds.unwrap_or(2),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Try to load .env file if it exists (ignore if it doesn't)
        let _ = dotenvy::dotenv();

        let base_url = env::var("SCRUTINY_SERVER_URL")
            .map_err(|_| ClientError::Config("SCRUTINY_SERVER_URL not set".to_string()))?;

        let request_timeout_seconds = env::var("SCRUTINY_REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok());

        let poll_interval_seconds = env::var("SCRUTINY_POLL_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok());

        Ok(Self::new(
            base_url,
            request_timeout_seconds,
            poll_interval_seconds,
        ))
    }

    /// Derive the WebSocket URL for a job's progress channel from the HTTP
    /// base URL (`http` becomes `ws`, `https` becomes `wss`).
    pub fn progress_url(&self, job_id: &str) -> Result<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL {}: {e}", self.base_url)))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(ClientError::Config(format!(
                    "unsupported URL scheme: {other}"
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|()| ClientError::Config("could not derive ws scheme".to_string()))?;

        Ok(format!(
            "{}/api/progress/{job_id}",
            url.as_str().trim_end_matches('/')
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_defaults_and_trims_slash() {
        let config = ClientConfig::new("http://localhost:8000/".to_string(), None, None);
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout_seconds, 60);
        assert_eq!(config.poll_interval_seconds, 2);
    }

    #[test]
    fn test_progress_url_http() {
        let config = ClientConfig::new("http://localhost:8000".to_string(), None, None);
        assert_eq!(
            config.progress_url("job-7").unwrap(),
            "ws://localhost:8000/api/progress/job-7"
        );
    }

    #[test]
    fn test_progress_url_https() {
        let config = ClientConfig::new("https://scrutiny.example.com".to_string(), None, None);
        assert_eq!(
            config.progress_url("j").unwrap(),
            "wss://scrutiny.example.com/api/progress/j"
        );
    }

    #[test]
    fn test_progress_url_rejects_odd_scheme() {
        let config = ClientConfig::new("ftp://example.com".to_string(), None, None);
        assert!(config.progress_url("j").is_err());
    }
}
