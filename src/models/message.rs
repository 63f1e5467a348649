use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PENDING_PREFIX: &str = "temp-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// One entry of a transcript. Never edited in place; replacing a message
/// means building a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Ids of the documents the assistant drew on.
    #[serde(default)]
    pub citations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A user message shown before the server has acknowledged it.
    pub fn pending_user(content: impl Into<String>) -> Self {
        Self {
            id: format!("{}{}", PENDING_PREFIX, Uuid::new_v4()),
            role: Role::User,
            content: content.into(),
            citations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, citations: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            citations,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.id.starts_with(PENDING_PREFIX)
    }

    /// The acknowledged counterpart of a pending message: same text and
    /// timestamp, permanent id.
    pub fn finalized(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: self.role,
            content: self.content.clone(),
            citations: self.citations.clone(),
            created_at: self.created_at,
        }
    }
}
