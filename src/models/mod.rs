pub mod citation;
pub mod conversation;
pub mod document;
pub mod message;
pub mod user;

pub use citation::SourceCitation;
pub use conversation::Conversation;
pub use document::{
    AdminStats, ContentType, Document, DocumentPage, NewsItem, SearchResponse, SearchResult,
};
pub use message::{Message, Role};
pub use user::{AuthResponse, AuthTokens, PracticeArea, User};
