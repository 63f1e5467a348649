use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use super::client::ApiClient;
use crate::gateway::traits::{AdminGateway, AuthGateway, ChatGateway, ResearchGateway};
use crate::gateway::types::*;
use crate::models::{
    AdminStats, AuthResponse, Conversation, Document, DocumentPage, NewsItem, PracticeArea,
    SearchResponse, User,
};
use crate::services::credentials::CredentialStore;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateConversationRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_name: Option<&'a str>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ChangePasswordRequest<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    practice_area_ids: Option<&'a [i64]>,
    limit: u32,
}

#[derive(Serialize)]
struct PracticeAreaAssignment<'a> {
    practice_area_ids: &'a [i64],
}

/// Gateway backed by the real REST service.
pub struct HttpGateway {
    api: ApiClient,
}

impl HttpGateway {
    pub fn new(api_base: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            api: ApiClient::new(api_base, credentials),
        }
    }

    fn optional_query(key: &'static str, value: Option<i64>) -> Vec<(&'static str, String)> {
        value.map(|v| vec![(key, v.to_string())]).unwrap_or_default()
    }
}

/// `collection/{id}` with `id` percent-encoded into a single segment.
/// Empty and dot ids would resolve to another resource, so they are refused.
fn resource_path(collection: &str, id: &str) -> Result<String, GatewayError> {
    if matches!(id, "" | "." | "..") {
        return Err(GatewayError::NotFound(format!("Invalid id {:?}", id)));
    }
    Ok(format!("{}/{}", collection, urlencoding::encode(id)))
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send_message(
        &self,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply, GatewayError> {
        tracing::debug!(conversation = ?conversation_id, "POST /chat/message");
        self.api
            .post(
                "/chat/message",
                &SendMessageRequest {
                    message,
                    conversation_id,
                },
            )
            .await
    }

    async fn list_conversations(&self, limit: u32) -> Result<Vec<Conversation>, GatewayError> {
        let list: ConversationList = self
            .api
            .get("/chat/conversations", &[("limit", limit.to_string())])
            .await?;
        Ok(list.conversations)
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, GatewayError> {
        self.api
            .get(&resource_path("/chat/conversations", id)?, &[])
            .await
    }

    async fn create_conversation(
        &self,
        title: Option<&str>,
    ) -> Result<Conversation, GatewayError> {
        self.api
            .post("/chat/conversations", &CreateConversationRequest { title })
            .await
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), GatewayError> {
        self.api
            .delete(&resource_path("/chat/conversations", id)?)
            .await
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn register(
        &self,
        email: &str,
        password: &str,
        company_name: Option<&str>,
    ) -> Result<AuthResponse, GatewayError> {
        self.api
            .post(
                "/auth/register",
                &RegisterRequest {
                    email,
                    password,
                    company_name,
                },
            )
            .await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, GatewayError> {
        self.api
            .post("/auth/login", &LoginRequest { email, password })
            .await
    }

    async fn current_user(&self) -> Result<User, GatewayError> {
        self.api.get("/auth/me", &[]).await
    }

    async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), GatewayError> {
        self.api
            .post_unit(
                "/auth/change-password",
                &ChangePasswordRequest {
                    current_password,
                    new_password,
                },
            )
            .await
    }
}

#[async_trait]
impl ResearchGateway for HttpGateway {
    async fn search(
        &self,
        query: &str,
        practice_area_ids: Option<&[i64]>,
        limit: u32,
    ) -> Result<SearchResponse, GatewayError> {
        self.api
            .post(
                "/search/",
                &SearchRequest {
                    query,
                    practice_area_ids,
                    limit,
                },
            )
            .await
    }

    async fn list_documents(
        &self,
        page: u32,
        page_size: u32,
        practice_area_id: Option<i64>,
    ) -> Result<DocumentPage, GatewayError> {
        let mut query = vec![("page", page.to_string()), ("page_size", page_size.to_string())];
        query.extend(Self::optional_query("practice_area_id", practice_area_id));
        self.api.get("/search/documents", &query).await
    }

    async fn practice_areas(&self) -> Result<Vec<PracticeArea>, GatewayError> {
        self.api.get("/search/practice-areas", &[]).await
    }

    async fn news(&self, limit: u32) -> Result<Vec<NewsItem>, GatewayError> {
        self.api
            .get("/news/ibm", &[("limit", limit.to_string())])
            .await
    }
}

#[async_trait]
impl AdminGateway for HttpGateway {
    async fn list_users(&self, skip: u32, limit: u32) -> Result<Vec<User>, GatewayError> {
        self.api
            .get(
                "/admin/users",
                &[("skip", skip.to_string()), ("limit", limit.to_string())],
            )
            .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, GatewayError> {
        self.api.post("/admin/users", &user).await
    }

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<User, GatewayError> {
        self.api
            .patch(&resource_path("/admin/users", user_id)?, &update)
            .await
    }

    async fn update_user_practice_areas(
        &self,
        user_id: &str,
        practice_area_ids: &[i64],
    ) -> Result<User, GatewayError> {
        self.api
            .put(
                &format!("{}/practice-areas", resource_path("/admin/users", user_id)?),
                &PracticeAreaAssignment { practice_area_ids },
            )
            .await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), GatewayError> {
        self.api
            .delete(&resource_path("/admin/users", user_id)?)
            .await
    }

    async fn list_practice_areas(&self) -> Result<Vec<PracticeArea>, GatewayError> {
        self.api.get("/admin/practice-areas", &[]).await
    }

    async fn list_all_documents(
        &self,
        skip: u32,
        limit: u32,
        practice_area_id: Option<i64>,
    ) -> Result<Vec<Document>, GatewayError> {
        let mut query = vec![("skip", skip.to_string()), ("limit", limit.to_string())];
        query.extend(Self::optional_query("practice_area_id", practice_area_id));
        self.api.get("/admin/documents", &query).await
    }

    async fn upload_text_document(&self, doc: NewTextDocument) -> Result<Document, GatewayError> {
        self.api.post("/admin/documents/text", &doc).await
    }

    async fn upload_file_document(&self, upload: FileUpload) -> Result<Document, GatewayError> {
        tracing::info!(file = %upload.file_name, bytes = upload.data.len(), "Uploading document");
        let build = || {
            let mut form = Form::new()
                .part(
                    "file",
                    Part::bytes(upload.data.clone()).file_name(upload.file_name.clone()),
                )
                .text("title", upload.title.clone())
                .text("practice_area_id", upload.practice_area_id.to_string())
                .text("content_type", upload.content_type.as_str());
            if let Some(description) = &upload.description {
                form = form.text("description", description.clone());
            }
            if let Some(author) = &upload.author {
                form = form.text("author", author.clone());
            }
            form
        };
        self.api.post_multipart("/admin/documents/file", build).await
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), GatewayError> {
        self.api
            .delete(&resource_path("/admin/documents", document_id)?)
            .await
    }

    async fn stats(&self) -> Result<AdminStats, GatewayError> {
        self.api.get("/admin/stats", &[]).await
    }
}
