use async_trait::async_trait;

use super::types::{
    ChatReply, FileUpload, GatewayError, NewTextDocument, NewUser, UserUpdate,
};
use crate::models::{
    AdminStats, AuthResponse, Conversation, Document, DocumentPage, NewsItem, PracticeArea,
    SearchResponse, User,
};

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send `message`, continuing `conversation_id` or starting a new
    /// conversation when it is `None`.
    async fn send_message(
        &self,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply, GatewayError>;

    async fn list_conversations(&self, limit: u32) -> Result<Vec<Conversation>, GatewayError>;

    async fn get_conversation(&self, id: &str) -> Result<Conversation, GatewayError>;

    async fn create_conversation(&self, title: Option<&str>)
        -> Result<Conversation, GatewayError>;

    async fn delete_conversation(&self, id: &str) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn register(
        &self,
        email: &str,
        password: &str,
        company_name: Option<&str>,
    ) -> Result<AuthResponse, GatewayError>;

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, GatewayError>;

    async fn current_user(&self) -> Result<User, GatewayError>;

    async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait ResearchGateway: Send + Sync {
    async fn search(
        &self,
        query: &str,
        practice_area_ids: Option<&[i64]>,
        limit: u32,
    ) -> Result<SearchResponse, GatewayError>;

    async fn list_documents(
        &self,
        page: u32,
        page_size: u32,
        practice_area_id: Option<i64>,
    ) -> Result<DocumentPage, GatewayError>;

    async fn practice_areas(&self) -> Result<Vec<PracticeArea>, GatewayError>;

    async fn news(&self, limit: u32) -> Result<Vec<NewsItem>, GatewayError>;
}

#[async_trait]
pub trait AdminGateway: Send + Sync {
    async fn list_users(&self, skip: u32, limit: u32) -> Result<Vec<User>, GatewayError>;

    async fn create_user(&self, user: NewUser) -> Result<User, GatewayError>;

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<User, GatewayError>;

    async fn update_user_practice_areas(
        &self,
        user_id: &str,
        practice_area_ids: &[i64],
    ) -> Result<User, GatewayError>;

    async fn delete_user(&self, user_id: &str) -> Result<(), GatewayError>;

    async fn list_practice_areas(&self) -> Result<Vec<PracticeArea>, GatewayError>;

    async fn list_all_documents(
        &self,
        skip: u32,
        limit: u32,
        practice_area_id: Option<i64>,
    ) -> Result<Vec<Document>, GatewayError>;

    async fn upload_text_document(&self, doc: NewTextDocument) -> Result<Document, GatewayError>;

    async fn upload_file_document(&self, upload: FileUpload) -> Result<Document, GatewayError>;

    async fn delete_document(&self, document_id: &str) -> Result<(), GatewayError>;

    async fn stats(&self) -> Result<AdminStats, GatewayError>;
}
