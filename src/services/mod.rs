pub mod chat;
pub mod conversation;
pub mod credentials;
pub mod database;
pub mod export;
pub mod session;
pub mod settings;

pub use chat::{ChatState, ChatStatus, ConversationStore, StoreError};
pub use database::Database;
pub use session::{SessionState, SessionStore};
pub use settings::{AppSettings, SettingsService};
