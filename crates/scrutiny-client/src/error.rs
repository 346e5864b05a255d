use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("could not start analysis: {0}")]
    AnalysisStart(String),

    #[error("status fetch failed: {0}")]
    StatusFetch(String),

    #[error("results fetch failed: {0}")]
    ResultsFetch(String),

    #[error("chat session failed: {0}")]
    ChatSession(String),

    #[error("chat message failed: {0}")]
    ChatMessage(String),

    #[error("progress channel error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
