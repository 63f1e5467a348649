use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ContentType, Conversation, SourceCitation};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Session expired, please sign in again")]
    SessionExpired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Coarse classification shared by gateway and store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    SessionExpired,
    NotFound,
    Server,
    Network,
    InvalidResponse,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Unauthorized(_) => ErrorKind::Auth,
            GatewayError::SessionExpired => ErrorKind::SessionExpired,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::RequestFailed { .. } => ErrorKind::Server,
            GatewayError::NetworkError(_) => ErrorKind::Network,
            GatewayError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }
}

// --- Chat ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: i64,
    #[serde(default)]
    pub output_tokens: i64,
}

/// The assistant's answer to one sent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
    #[serde(default)]
    pub sources: Vec<SourceCitation>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationList {
    pub conversations: Vec<Conversation>,
}

// --- Admin ---

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_area_ids: Option<Vec<i64>>,
}

/// Partial update; `None` fields are left alone by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTextDocument {
    pub title: String,
    pub content: String,
    pub practice_area_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

#[derive(Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub data: Vec<u8>,
    pub title: String,
    pub practice_area_id: i64,
    pub content_type: ContentType,
    pub description: Option<String>,
    pub author: Option<String>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("data", &format!("[{} bytes]", self.data.len()))
            .field("title", &self.title)
            .field("practice_area_id", &self.practice_area_id)
            .field("content_type", &self.content_type)
            .field("description", &self.description)
            .field("author", &self.author)
            .finish()
    }
}
