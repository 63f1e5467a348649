use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::data;
use crate::config::FixtureLatency;
use crate::gateway::traits::{AdminGateway, AuthGateway, ChatGateway, ResearchGateway};
use crate::gateway::types::*;
use crate::models::citation::{cited_document_ids, clamp_similarity};
use crate::models::{
    AdminStats, AuthResponse, AuthTokens, ContentType, Conversation, Document, DocumentPage,
    Message, NewsItem, PracticeArea, Role, SearchResponse, SearchResult, User,
};
use crate::services::conversation::{prepend_unique, truncate_title};

/// Simulated server think time per kind of call.
#[derive(Debug, Clone, Copy)]
enum Delay {
    Lookup,
    Read,
    Search,
    Auth,
    Write,
    Answer,
}

impl Delay {
    fn realistic(self) -> Duration {
        let millis = match self {
            Delay::Lookup => 100,
            Delay::Read => 200,
            Delay::Search => 300,
            Delay::Auth | Delay::Write => 500,
            Delay::Answer => 1500,
        };
        Duration::from_millis(millis)
    }
}

/// Gateway that serves canned demo data, for running without a backend.
/// Conversations live in memory so listing, reading, sending and deleting
/// stay consistent with each other.
pub struct FixtureGateway {
    latency: FixtureLatency,
    conversations: Mutex<Vec<Conversation>>,
    signed_in: Mutex<Option<User>>,
}

impl FixtureGateway {
    pub fn new(latency: FixtureLatency) -> Self {
        Self {
            latency,
            conversations: Mutex::new(data::conversations()),
            signed_in: Mutex::new(None),
        }
    }

    async fn pause(&self, delay: Delay) {
        if self.latency == FixtureLatency::Realistic {
            tokio::time::sleep(delay.realistic()).await;
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Vec<Conversation>>, GatewayError> {
        self.conversations
            .lock()
            .map_err(|_| GatewayError::InvalidResponse("fixture state poisoned".to_string()))
    }

    /// Remember who signed in so `current_user` answers consistently.
    fn sign_in(&self, user: User) -> Result<AuthResponse, GatewayError> {
        *self
            .signed_in
            .lock()
            .map_err(|_| GatewayError::InvalidResponse("fixture state poisoned".to_string()))? =
            Some(user.clone());
        Ok(AuthResponse {
            user,
            tokens: Self::demo_tokens(),
        })
    }

    fn demo_tokens() -> AuthTokens {
        AuthTokens::new(
            format!("demo-access-{}", Uuid::new_v4()),
            format!("demo-refresh-{}", Uuid::new_v4()),
        )
    }

    /// Rough token count for the usage counters.
    fn estimate_tokens(text: &str) -> i64 {
        (text.split_whitespace().count() as i64 * 4 + 2) / 3
    }

    fn filter_documents(practice_area_id: Option<i64>) -> Vec<Document> {
        data::documents()
            .into_iter()
            .filter(|d| practice_area_id.map_or(true, |id| d.practice_area_id == id))
            .collect()
    }
}

#[async_trait]
impl ChatGateway for FixtureGateway {
    async fn send_message(
        &self,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply, GatewayError> {
        self.pause(Delay::Answer).await;

        let answer = data::answer_for(message);
        let now = Utc::now();
        let user_msg = Message {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: message.to_string(),
            citations: Vec::new(),
            created_at: now,
        };
        let assistant_msg = Message::assistant(answer.response, cited_document_ids(&answer.sources));

        let mut conversations = self.store()?;
        let conversation_id = match conversation_id {
            Some(id) => {
                let conv = conversations
                    .iter_mut()
                    .find(|c| c.id == id)
                    .ok_or_else(|| GatewayError::NotFound(format!("Conversation {}", id)))?;
                conv.messages.push(user_msg);
                conv.messages.push(assistant_msg);
                conv.updated_at = now;
                id.to_string()
            }
            None => {
                let mut conv = Conversation::new(
                    format!("demo-new-{}", Uuid::new_v4()),
                    Some(truncate_title(message)),
                );
                conv.messages.push(user_msg);
                conv.messages.push(assistant_msg);
                let id = conv.id.clone();
                prepend_unique(&mut conversations, conv);
                id
            }
        };

        Ok(ChatReply {
            response: answer.response.to_string(),
            conversation_id,
            usage: Usage {
                input_tokens: Self::estimate_tokens(message),
                output_tokens: Self::estimate_tokens(answer.response),
            },
            sources: answer.sources,
        })
    }

    async fn list_conversations(&self, limit: u32) -> Result<Vec<Conversation>, GatewayError> {
        self.pause(Delay::Read).await;
        Ok(self
            .store()?
            .iter()
            .take(limit as usize)
            .map(|c| Conversation {
                messages: Vec::new(),
                ..c.clone()
            })
            .collect())
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, GatewayError> {
        self.pause(Delay::Read).await;
        self.store()?
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("Conversation {}", id)))
    }

    async fn create_conversation(
        &self,
        title: Option<&str>,
    ) -> Result<Conversation, GatewayError> {
        self.pause(Delay::Write).await;
        let conv = Conversation::new(
            format!("demo-new-{}", Uuid::new_v4()),
            title.map(str::to_string),
        );
        let mut conversations = self.store()?;
        prepend_unique(&mut conversations, conv.clone());
        Ok(conv)
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), GatewayError> {
        self.pause(Delay::Read).await;
        let mut conversations = self.store()?;
        let before = conversations.len();
        conversations.retain(|c| c.id != id);
        if conversations.len() == before {
            return Err(GatewayError::NotFound(format!("Conversation {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for FixtureGateway {
    async fn register(
        &self,
        email: &str,
        _password: &str,
        company_name: Option<&str>,
    ) -> Result<AuthResponse, GatewayError> {
        self.pause(Delay::Auth).await;
        self.sign_in(data::demo_user(
            email,
            Some(company_name.unwrap_or(data::DEMO_COMPANY)),
        ))
    }

    async fn login(&self, email: &str, _password: &str) -> Result<AuthResponse, GatewayError> {
        self.pause(Delay::Auth).await;
        self.sign_in(data::demo_user(email, None))
    }

    async fn current_user(&self) -> Result<User, GatewayError> {
        self.pause(Delay::Lookup).await;
        let signed_in = self
            .signed_in
            .lock()
            .map_err(|_| GatewayError::InvalidResponse("fixture state poisoned".to_string()))?
            .clone();
        Ok(signed_in.unwrap_or_else(|| data::demo_user(data::DEMO_EMAIL, None)))
    }

    async fn change_password(
        &self,
        _current_password: &str,
        _new_password: &str,
    ) -> Result<(), GatewayError> {
        self.pause(Delay::Auth).await;
        Ok(())
    }
}

#[async_trait]
impl ResearchGateway for FixtureGateway {
    async fn search(
        &self,
        query: &str,
        practice_area_ids: Option<&[i64]>,
        limit: u32,
    ) -> Result<SearchResponse, GatewayError> {
        self.pause(Delay::Search).await;
        let documents: Vec<Document> = data::documents()
            .into_iter()
            .filter(|d| practice_area_ids.map_or(true, |ids| ids.contains(&d.practice_area_id)))
            .collect();
        let total_results = documents.len();
        let results = documents
            .into_iter()
            .take(limit as usize)
            .enumerate()
            .map(|(idx, doc)| SearchResult {
                practice_area: data::practice_area_name(doc.practice_area_id),
                content_type: doc.content_type.as_str().to_string(),
                content_preview: doc.description.clone().unwrap_or_default(),
                similarity: clamp_similarity(0.95 - idx as f64 * 0.05),
                published_at: doc.published_at,
                title: doc.title,
                document_id: doc.id,
            })
            .collect();
        Ok(SearchResponse {
            results,
            query: query.to_string(),
            total_results,
        })
    }

    async fn list_documents(
        &self,
        page: u32,
        page_size: u32,
        practice_area_id: Option<i64>,
    ) -> Result<DocumentPage, GatewayError> {
        self.pause(Delay::Read).await;
        let documents = Self::filter_documents(practice_area_id);
        Ok(DocumentPage {
            total: documents.len(),
            documents,
            page,
            page_size,
        })
    }

    async fn practice_areas(&self) -> Result<Vec<PracticeArea>, GatewayError> {
        self.pause(Delay::Lookup).await;
        Ok(data::practice_areas())
    }

    async fn news(&self, limit: u32) -> Result<Vec<NewsItem>, GatewayError> {
        self.pause(Delay::Read).await;
        Ok(data::news().into_iter().take(limit as usize).collect())
    }
}

#[async_trait]
impl AdminGateway for FixtureGateway {
    async fn list_users(&self, skip: u32, limit: u32) -> Result<Vec<User>, GatewayError> {
        self.pause(Delay::Read).await;
        Ok(data::users()
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, GatewayError> {
        self.pause(Delay::Write).await;
        Ok(User {
            id: format!("user-{}", Uuid::new_v4()),
            email: user.email,
            company_name: user.company_name,
            is_admin: user.is_admin.unwrap_or(false),
            is_active: true,
            created_at: Utc::now(),
            practice_areas: data::areas_by_id(&user.practice_area_ids.unwrap_or_default()),
        })
    }

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<User, GatewayError> {
        self.pause(Delay::Read).await;
        let mut user = data::users()
            .into_iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| GatewayError::NotFound("User not found".to_string()))?;
        if let Some(company) = update.company_name {
            user.company_name = Some(company);
        }
        if let Some(is_admin) = update.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }
        Ok(user)
    }

    async fn update_user_practice_areas(
        &self,
        user_id: &str,
        practice_area_ids: &[i64],
    ) -> Result<User, GatewayError> {
        self.pause(Delay::Read).await;
        let mut user = data::users()
            .into_iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| GatewayError::NotFound("User not found".to_string()))?;
        user.practice_areas = data::areas_by_id(practice_area_ids);
        Ok(user)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), GatewayError> {
        self.pause(Delay::Read).await;
        if data::users().iter().any(|u| u.id == user_id) {
            Ok(())
        } else {
            Err(GatewayError::NotFound("User not found".to_string()))
        }
    }

    async fn list_practice_areas(&self) -> Result<Vec<PracticeArea>, GatewayError> {
        self.pause(Delay::Lookup).await;
        Ok(data::practice_areas())
    }

    async fn list_all_documents(
        &self,
        skip: u32,
        limit: u32,
        practice_area_id: Option<i64>,
    ) -> Result<Vec<Document>, GatewayError> {
        self.pause(Delay::Read).await;
        Ok(Self::filter_documents(practice_area_id)
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn upload_text_document(&self, doc: NewTextDocument) -> Result<Document, GatewayError> {
        self.pause(Delay::Write).await;
        let now = Utc::now();
        Ok(Document {
            id: format!("doc-{}", Uuid::new_v4()),
            title: doc.title,
            description: doc.description,
            content_type: doc.content_type.unwrap_or(ContentType::Article),
            practice_area_id: doc.practice_area_id,
            file_name: None,
            file_size_bytes: None,
            source_url: doc.source_url,
            author: doc.author,
            published_at: Some(now),
            created_at: now,
            chunk_count: 1,
        })
    }

    async fn upload_file_document(&self, upload: FileUpload) -> Result<Document, GatewayError> {
        self.pause(Delay::Write).await;
        let now = Utc::now();
        Ok(Document {
            id: format!("doc-{}", Uuid::new_v4()),
            title: upload.title,
            description: upload.description,
            content_type: upload.content_type,
            practice_area_id: upload.practice_area_id,
            file_size_bytes: Some(upload.data.len() as i64),
            file_name: Some(upload.file_name),
            source_url: None,
            author: upload.author,
            published_at: Some(now),
            created_at: now,
            chunk_count: 1,
        })
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), GatewayError> {
        self.pause(Delay::Read).await;
        if data::documents().iter().any(|d| d.id == document_id) {
            Ok(())
        } else {
            Err(GatewayError::NotFound("Document not found".to_string()))
        }
    }

    async fn stats(&self) -> Result<AdminStats, GatewayError> {
        self.pause(Delay::Read).await;
        Ok(data::stats())
    }
}
