//! Chat session and transcript model.
//!
//! One session per chat view mount, optionally scoped to an uploaded or
//! cloned codebase. The transcript is append-only; the only post-hoc
//! "mutation" a view may perform is the local typing reveal of the newest
//! assistant message, which is pure presentation state and lives in the
//! view, not here.

use crate::backend::AnalysisBackend;
use chrono::{DateTime, Utc};
use scrutiny_client::error::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// An open conversational context on the backend.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub session_id: String,
    pub codebase_info: Option<serde_json::Value>,
}

/// Append-only message sequence for one session.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> u64 {
        self.push(Role::User, content.into())
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> u64 {
        self.push(Role::Assistant, content.into())
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    fn push(&mut self, role: Role, content: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            role,
            content,
            created_at: Utc::now(),
        });
        id
    }
}

/// Open a session, scoped to `upload_dir` when the user analyzed an
/// upload this session.
pub async fn start_session(
    backend: &dyn AnalysisBackend,
    upload_dir: Option<String>,
) -> Result<ChatSession> {
    let response = backend.start_chat(upload_dir).await?;
    Ok(ChatSession {
        session_id: response.session_id,
        codebase_info: response.codebase_info,
    })
}

/// Send one message and return the assistant's reply text. A backend
/// failure degrades to a locally generated fallback so the user is never
/// left without an answer.
pub async fn request_reply(
    backend: &dyn AnalysisBackend,
    session_id: &str,
    text: &str,
) -> String {
    match backend.send_chat_message(session_id, text).await {
        Ok(reply) => reply.content,
        Err(err) => {
            warn!("Chat message failed, using fallback reply: {err}");
            fallback_reply()
        }
    }
}

/// Local reply used when the chat backend is unreachable or errors out.
pub fn fallback_reply() -> String {
    "I couldn't reach the analysis service just now, so I can't answer that \
     from the codebase. Your message is still in the transcript — try asking \
     again in a moment."
        .to_string()
}
