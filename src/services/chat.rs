use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::gateway::{ChatGateway, ChatReply, ErrorKind, GatewayError};
use crate::models::citation::cited_document_ids;
use crate::models::{Conversation, Message, SourceCitation};
use crate::services::conversation::{finalize_pending, prepend_unique, truncate_title};

/// Longest message the backend accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 10_000;

const DEFAULT_PAGE_SIZE: u32 = 20;
const LOCAL_ID_PREFIX: &str = "local-";

/// An error kept in the store until the view clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StoreError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    fn from_gateway(action: &str, err: &GatewayError) -> Self {
        Self {
            kind: err.kind(),
            message: format!("{}: {}", action, err),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStatus {
    Idle,
    Loading,
    Sending,
}

/// Snapshot of everything the chat view renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    /// Most recent first.
    pub conversations: Vec<Conversation>,
    pub current: Option<Conversation>,
    pub messages: Vec<Message>,
    /// Sources behind the latest assistant answer.
    pub sources: Vec<SourceCitation>,
    pub is_loading: bool,
    pub is_sending: bool,
    pub error: Option<StoreError>,
}

impl ChatState {
    pub fn status(&self) -> ChatStatus {
        if self.is_sending {
            ChatStatus::Sending
        } else if self.is_loading {
            ChatStatus::Loading
        } else {
            ChatStatus::Idle
        }
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.id.as_str())
    }
}

struct Snapshot {
    messages: Vec<Message>,
    sources: Vec<SourceCitation>,
}

enum SendStart {
    Busy,
    Rejected,
    Started {
        snapshot: Snapshot,
        target: Option<String>,
    },
}

/// The conversation session state machine. One instance per chat view,
/// shared through `Arc`; observers follow it with [`ConversationStore::subscribe`].
pub struct ConversationStore {
    gateway: Arc<dyn ChatGateway>,
    state: watch::Sender<ChatState>,
    page_size: u32,
    list_seq: AtomicU64,
    open_seq: AtomicU64,
    /// Id requested by the newest `load_conversation`.
    opening: Mutex<Option<String>>,
    loads_in_flight: AtomicUsize,
}

impl ConversationStore {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            gateway,
            state,
            page_size: DEFAULT_PAGE_SIZE,
            list_seq: AtomicU64::new(0),
            open_seq: AtomicU64::new(0),
            opening: Mutex::new(None),
            loads_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub async fn load_conversations(&self) {
        let issued = self.begin_load(&self.list_seq, None);
        tracing::debug!(limit = self.page_size, "Loading conversations");

        let result = self.gateway.list_conversations(self.page_size).await;
        if let Err(e) = &result {
            tracing::warn!("Failed to load conversations: {}", e);
        }

        let applied = self.finish_load(&self.list_seq, issued, |s| match result {
            Ok(conversations) => s.conversations = conversations,
            Err(e) => {
                s.error = Some(StoreError::from_gateway("Failed to load conversations", &e))
            }
        });
        if !applied {
            tracing::debug!("Discarding stale conversation list");
        }
    }

    /// Make `id` the current conversation and show its stored transcript.
    /// An unknown id leaves the current conversation in place and sets a
    /// `NotFound` error.
    pub async fn load_conversation(&self, id: &str) {
        let issued = self.begin_load(&self.open_seq, Some(id));
        tracing::debug!(conversation = id, "Loading conversation");

        let result = self.gateway.get_conversation(id).await;
        if let Err(e) = &result {
            tracing::warn!("Failed to load conversation {}: {}", id, e);
        }

        let applied = self.finish_load(&self.open_seq, issued, |s| match result {
            Ok(mut conversation) => {
                s.messages = std::mem::take(&mut conversation.messages);
                s.sources.clear();
                s.current = Some(conversation);
            }
            Err(e) => {
                s.error = Some(StoreError::from_gateway("Failed to load conversation", &e))
            }
        });
        if !applied {
            tracing::debug!(conversation = id, "Discarding stale conversation load");
        }
    }

    /// Send `text` to the current conversation, or start a new one.
    ///
    /// The user message shows up immediately. On failure the transcript and
    /// sources go back to exactly what they were before the call.
    pub async fn send_message(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let pending = Message::pending_user(text);
        let mut start = SendStart::Busy;
        self.state.send_if_modified(|s| {
            if s.is_sending {
                return false;
            }
            let length = text.chars().count();
            if length > MAX_MESSAGE_CHARS {
                s.error = Some(StoreError::validation(format!(
                    "Message is too long ({} characters, at most {})",
                    length, MAX_MESSAGE_CHARS
                )));
                start = SendStart::Rejected;
                return true;
            }

            start = SendStart::Started {
                snapshot: Snapshot {
                    messages: s.messages.clone(),
                    sources: std::mem::take(&mut s.sources),
                },
                target: s.current_id().map(str::to_string),
            };
            s.messages.push(pending.clone());
            s.is_sending = true;
            true
        });

        let (snapshot, target) = match start {
            SendStart::Busy => {
                tracing::debug!("A message is already in flight, ignoring send");
                return;
            }
            SendStart::Rejected => {
                tracing::warn!("Rejected message over {} characters", MAX_MESSAGE_CHARS);
                return;
            }
            SendStart::Started { snapshot, target } => (snapshot, target),
        };

        tracing::info!(
            conversation = target.as_deref().unwrap_or("new"),
            "Sending message"
        );

        match self.gateway.send_message(text, target.as_deref()).await {
            Ok(reply) => self.apply_reply(reply, text, &pending, target),
            Err(e) => self.roll_back(e, &pending, snapshot, target),
        }
    }

    fn apply_reply(&self, reply: ChatReply, text: &str, pending: &Message, target: Option<String>) {
        let ChatReply {
            response,
            conversation_id,
            sources,
            usage,
        } = reply;
        tracing::info!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            sources = sources.len(),
            "Reply received"
        );
        let citations = cited_document_ids(&sources);

        self.state.send_modify(|s| {
            s.is_sending = false;

            let applied = s.current_id() == target.as_deref()
                && finalize_pending(&mut s.messages, &pending.id);
            if applied {
                s.messages.push(Message::assistant(response, citations));
                s.sources = sources;
            } else {
                tracing::debug!("Conversation changed while sending, transcript left as is");
            }

            match target {
                Some(id) => {
                    let now = Utc::now();
                    if let Some(listed) = s.conversations.iter_mut().find(|c| c.id == id) {
                        listed.updated_at = now;
                    }
                    if let Some(current) = s.current.as_mut().filter(|c| c.id == id) {
                        current.updated_at = now;
                    }
                }
                None => {
                    let id = if conversation_id.trim().is_empty() {
                        format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4())
                    } else {
                        conversation_id
                    };
                    let conversation = Conversation::new(id, Some(truncate_title(text)));
                    prepend_unique(&mut s.conversations, conversation.clone());
                    // A list fetched before this point does not know the new conversation
                    self.invalidate(&self.list_seq);
                    if applied {
                        self.invalidate(&self.open_seq);
                        s.current = Some(conversation);
                    }
                }
            }
        });
    }

    fn roll_back(
        &self,
        err: GatewayError,
        pending: &Message,
        snapshot: Snapshot,
        target: Option<String>,
    ) {
        tracing::warn!("Failed to send message: {}", err);
        self.state.send_modify(|s| {
            s.is_sending = false;
            let untouched = s.current_id() == target.as_deref()
                && s.messages.iter().any(|m| m.id == pending.id);
            if untouched {
                s.messages = snapshot.messages;
                s.sources = snapshot.sources;
            }
            s.error = Some(StoreError::from_gateway("Failed to send message", &err));
        });
    }

    /// Leave the current conversation; the next send starts a new one.
    pub fn create_new_conversation(&self) {
        self.state.send_modify(|s| {
            self.invalidate(&self.open_seq);
            s.current = None;
            s.messages.clear();
            s.sources.clear();
        });
    }

    pub async fn delete_conversation(&self, id: &str) {
        match self.gateway.delete_conversation(id).await {
            Ok(()) => {
                tracing::info!(conversation = id, "Deleted conversation");
                self.state.send_modify(|s| {
                    self.invalidate(&self.list_seq);
                    if s.current_id() == Some(id) || self.is_opening(id) {
                        self.invalidate(&self.open_seq);
                    }
                    s.conversations.retain(|c| c.id != id);
                    if s.current_id() == Some(id) {
                        s.current = None;
                        s.messages.clear();
                        s.sources.clear();
                    }
                });
            }
            Err(e) => {
                tracing::warn!("Failed to delete conversation {}: {}", id, e);
                self.state.send_modify(|s| {
                    s.error = Some(StoreError::from_gateway("Failed to delete conversation", &e));
                });
            }
        }
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Make every load of this kind issued so far stale.
    fn invalidate(&self, seq: &AtomicU64) {
        seq.fetch_add(1, Ordering::SeqCst);
    }

    fn is_opening(&self, id: &str) -> bool {
        self.opening
            .lock()
            .map(|opening| opening.as_deref() == Some(id))
            .unwrap_or(true)
    }

    fn begin_load(&self, seq: &AtomicU64, opening: Option<&str>) -> u64 {
        let mut issued = 0;
        self.state.send_modify(|s| {
            issued = seq.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(id) = opening {
                if let Ok(mut slot) = self.opening.lock() {
                    *slot = Some(id.to_string());
                }
            }
            self.loads_in_flight.fetch_add(1, Ordering::SeqCst);
            s.is_loading = true;
        });
        issued
    }

    /// Settle a load. `apply` only runs when no newer load of the same kind
    /// was issued meanwhile.
    fn finish_load<F>(&self, seq: &AtomicU64, issued: u64, apply: F) -> bool
    where
        F: FnOnce(&mut ChatState),
    {
        let mut applied = false;
        self.state.send_modify(|s| {
            if seq.load(Ordering::SeqCst) == issued {
                apply(s);
                applied = true;
            }
            s.is_loading = self.loads_in_flight.fetch_sub(1, Ordering::SeqCst) > 1;
        });
        applied
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::config::FixtureLatency;
    use crate::gateway::fixture::FixtureGateway;
    use crate::gateway::types::Usage;
    use crate::models::Role;

    #[derive(Default)]
    struct MockChat {
        replies: Mutex<VecDeque<Result<ChatReply, GatewayError>>>,
        stored: Mutex<Vec<Conversation>>,
        send_gate: Option<Arc<Notify>>,
        list_gate: Option<Arc<Notify>>,
        slow_open: Option<(String, Arc<Notify>)>,
        fail_delete: bool,
        fail_list: Mutex<bool>,
        sent: Mutex<Vec<(String, Option<String>)>>,
    }

    impl MockChat {
        fn replying(replies: Vec<Result<ChatReply, GatewayError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        fn storing(conversations: Vec<Conversation>) -> Self {
            Self {
                stored: Mutex::new(conversations),
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<(String, Option<String>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatGateway for MockChat {
        async fn send_message(
            &self,
            message: &str,
            conversation_id: Option<&str>,
        ) -> Result<ChatReply, GatewayError> {
            self.sent
                .lock()
                .unwrap()
                .push((message.to_string(), conversation_id.map(str::to_string)));
            if let Some(gate) = &self.send_gate {
                gate.notified().await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::NetworkError("no scripted reply".into())))
        }

        async fn list_conversations(&self, limit: u32) -> Result<Vec<Conversation>, GatewayError> {
            if *self.fail_list.lock().unwrap() {
                return Err(GatewayError::NetworkError("connection refused".into()));
            }
            // Responses are read before the gate: the server answered, the
            // network is slow.
            let listed: Vec<Conversation> = self
                .stored
                .lock()
                .unwrap()
                .iter()
                .take(limit as usize)
                .map(|c| Conversation {
                    messages: Vec::new(),
                    ..c.clone()
                })
                .collect();
            if let Some(gate) = &self.list_gate {
                gate.notified().await;
            }
            Ok(listed)
        }

        async fn get_conversation(&self, id: &str) -> Result<Conversation, GatewayError> {
            let found = self
                .stored
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound("Conversation not found".into()));
            if let Some((slow_id, gate)) = &self.slow_open {
                if slow_id == id {
                    gate.notified().await;
                }
            }
            found
        }

        async fn create_conversation(
            &self,
            title: Option<&str>,
        ) -> Result<Conversation, GatewayError> {
            Ok(Conversation::new(
                Uuid::new_v4().to_string(),
                title.map(str::to_string),
            ))
        }

        async fn delete_conversation(&self, id: &str) -> Result<(), GatewayError> {
            if self.fail_delete {
                return Err(GatewayError::RequestFailed {
                    status: 500,
                    message: "Internal Server Error".into(),
                });
            }
            self.stored.lock().unwrap().retain(|c| c.id != id);
            Ok(())
        }
    }

    fn reply(conversation_id: &str, response: &str, document_ids: &[Option<&str>]) -> ChatReply {
        ChatReply {
            response: response.to_string(),
            conversation_id: conversation_id.to_string(),
            sources: document_ids
                .iter()
                .map(|id| {
                    SourceCitation::new(*id, "Report", "AI Platforms", "research_report", "...", 0.9)
                })
                .collect(),
            usage: Usage {
                input_tokens: 12,
                output_tokens: 80,
            },
        }
    }

    fn message(id: &str, role: Role, content: &str) -> Message {
        Message {
            id: id.to_string(),
            role,
            content: content.to_string(),
            citations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn stored_conversation(id: &str, messages: Vec<Message>) -> Conversation {
        let mut conversation = Conversation::new(id, Some(format!("Conversation {}", id)));
        conversation.created_at -= chrono::Duration::hours(1);
        conversation.updated_at = conversation.created_at;
        conversation.messages = messages;
        conversation
    }

    fn two_conversations() -> Vec<Conversation> {
        vec![
            stored_conversation(
                "c1",
                vec![
                    message("m1", Role::User, "How big is the AI platforms market?"),
                    message("m2", Role::Assistant, "$292B by 2030 in the base case."),
                ],
            ),
            stored_conversation("c2", Vec::new()),
        ]
    }

    #[tokio::test]
    async fn test_send_starts_new_conversation() {
        let mock = Arc::new(MockChat::replying(vec![Ok(reply(
            "conv-9",
            "Here is the TAM.",
            &[Some("doc-1"), None, Some("doc-2")],
        ))]));
        let store = ConversationStore::new(mock.clone());

        store.send_message("  What is the TAM?  ").await;

        let state = store.state();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role, Role::User);
        assert_eq!(state.messages[0].content, "What is the TAM?");
        assert!(!state.messages[0].is_pending());
        assert_eq!(state.messages[1].role, Role::Assistant);
        assert_eq!(state.messages[1].content, "Here is the TAM.");
        assert_eq!(state.messages[1].citations, vec!["doc-1", "doc-2"]);
        assert_eq!(state.sources.len(), 3);

        assert_eq!(state.current_id(), Some("conv-9"));
        assert_eq!(state.conversations.len(), 1);
        assert_eq!(state.conversations[0].id, "conv-9");
        assert_eq!(state.conversations[0].title.as_deref(), Some("What is the TAM?"));
        assert_eq!(state.status(), ChatStatus::Idle);
        assert!(state.error.is_none());
        assert_eq!(mock.sent(), vec![("What is the TAM?".to_string(), None)]);
    }

    #[tokio::test]
    async fn test_new_conversation_goes_to_head_of_list() {
        let mock = Arc::new(MockChat {
            replies: Mutex::new(vec![Ok(reply("conv-new", "Answer", &[]))].into()),
            ..MockChat::storing(two_conversations())
        });
        let store = ConversationStore::new(mock);
        store.load_conversations().await;

        store.send_message("Compare cloud security vendors").await;

        let state = store.state();
        let ids: Vec<_> = state.conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["conv-new", "c1", "c2"]);
        assert_eq!(state.current_id(), Some("conv-new"));
    }

    #[tokio::test]
    async fn test_empty_conversation_id_gets_local_id() {
        let mock = Arc::new(MockChat::replying(vec![Ok(reply("", "Answer", &[]))]));
        let store = ConversationStore::new(mock);

        store.send_message("hello").await;

        let state = store.state();
        let id = state.current_id().unwrap();
        assert!(id.starts_with("local-"));
        assert_eq!(state.conversations[0].id, id);
    }

    #[tokio::test]
    async fn test_long_title_is_truncated() {
        let mock = Arc::new(MockChat::replying(vec![Ok(reply("c", "Answer", &[]))]));
        let store = ConversationStore::new(mock);

        store.send_message(&"market ".repeat(20)).await;

        let title = store.state().conversations[0].title.clone().unwrap();
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
    }

    #[tokio::test]
    async fn test_send_to_current_conversation_bumps_timestamp() {
        let mock = Arc::new(MockChat {
            replies: Mutex::new(vec![Ok(reply("c2", "Follow-up answer", &[]))].into()),
            ..MockChat::storing(two_conversations())
        });
        let store = ConversationStore::new(mock.clone());
        store.load_conversations().await;
        store.load_conversation("c2").await;
        let before = store.state().conversations[1].updated_at;

        store.send_message("And the bear case?").await;

        let state = store.state();
        let ids: Vec<_> = state.conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert!(state.conversations[1].updated_at > before);
        assert_eq!(state.current.as_ref().unwrap().updated_at, state.conversations[1].updated_at);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(
            mock.sent(),
            vec![("And the bear case?".to_string(), Some("c2".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_failed_send_restores_transcript_and_sources() {
        let mock = Arc::new(MockChat::replying(vec![
            Ok(reply("c", "First answer", &[Some("doc-1")])),
            Err(GatewayError::NetworkError("connection reset".into())),
        ]));
        let store = ConversationStore::new(mock);
        store.send_message("first").await;
        let before = store.state();

        store.send_message("second").await;

        let state = store.state();
        assert_eq!(state.messages, before.messages);
        assert_eq!(state.sources, before.sources);
        assert!(!state.is_sending);
        let error = state.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Network);
        assert!(error.message.starts_with("Failed to send message"));
    }

    #[tokio::test]
    async fn test_failed_first_send_leaves_no_conversation() {
        let mock = Arc::new(MockChat::replying(vec![Err(GatewayError::RequestFailed {
            status: 500,
            message: "boom".into(),
        })]));
        let store = ConversationStore::new(mock);

        store.send_message("hello").await;

        let state = store.state();
        assert!(state.messages.is_empty());
        assert!(state.current.is_none());
        assert!(state.conversations.is_empty());
        assert_eq!(state.error.unwrap().kind, ErrorKind::Server);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let mock = Arc::new(MockChat::default());
        let store = ConversationStore::new(mock.clone());

        store.send_message("").await;
        store.send_message("   ").await;
        store.send_message("\n\t").await;

        assert_eq!(store.state(), ChatState::default());
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_overlong_message_is_rejected() {
        let mock = Arc::new(MockChat::default());
        let store = ConversationStore::new(mock.clone());

        store.send_message(&"x".repeat(MAX_MESSAGE_CHARS + 1)).await;

        let state = store.state();
        assert!(state.messages.is_empty());
        assert!(!state.is_sending);
        assert_eq!(state.error.unwrap().kind, ErrorKind::Validation);
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_second_send_while_in_flight_is_ignored() {
        let gate = Arc::new(Notify::new());
        let mock = Arc::new(MockChat {
            send_gate: Some(gate.clone()),
            ..MockChat::replying(vec![Ok(reply("c", "Answer", &[]))])
        });
        let store = Arc::new(ConversationStore::new(mock.clone()));
        let mut rx = store.subscribe();

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.send_message("first").await }
        });
        rx.wait_for(|s| s.is_sending).await.unwrap();

        store.send_message("second").await;
        let during = store.state();
        assert_eq!(during.messages.len(), 1);
        assert_eq!(during.messages[0].content, "first");
        assert!(during.is_sending);
        assert_eq!(during.status(), ChatStatus::Sending);

        gate.notify_one();
        first.await.unwrap();

        let state = store.state();
        assert_eq!(state.messages.len(), 2);
        assert!(!state.is_sending);
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_for_abandoned_conversation_only_updates_list() {
        let gate = Arc::new(Notify::new());
        let mock = Arc::new(MockChat {
            replies: Mutex::new(vec![Ok(reply("conv-new", "Answer", &[Some("doc-1")]))].into()),
            send_gate: Some(gate.clone()),
            ..MockChat::storing(two_conversations())
        });
        let store = Arc::new(ConversationStore::new(mock));
        let mut rx = store.subscribe();

        let send = tokio::spawn({
            let store = store.clone();
            async move { store.send_message("question").await }
        });
        rx.wait_for(|s| s.is_sending).await.unwrap();

        store.load_conversation("c1").await;
        gate.notify_one();
        send.await.unwrap();

        let state = store.state();
        assert_eq!(state.current_id(), Some("c1"));
        let ids: Vec<_> = state.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert!(state.sources.is_empty());
        assert_eq!(state.conversations[0].id, "conv-new");
    }

    #[tokio::test]
    async fn test_load_conversation_round_trip() {
        let conversations = two_conversations();
        let expected = conversations[0].messages.clone();
        let store = ConversationStore::new(Arc::new(MockChat::storing(conversations)));

        store.load_conversation("c1").await;

        let state = store.state();
        assert_eq!(state.current_id(), Some("c1"));
        assert_eq!(state.messages, expected);
        assert!(state.sources.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_load_unknown_conversation_keeps_current() {
        let store = ConversationStore::new(Arc::new(MockChat::storing(two_conversations())));
        store.load_conversation("c1").await;
        let before = store.state();

        store.load_conversation("missing").await;

        let state = store.state();
        assert_eq!(state.current, before.current);
        assert_eq!(state.messages, before.messages);
        assert!(!state.is_loading);
        assert_eq!(state.error.unwrap().kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded() {
        let gate = Arc::new(Notify::new());
        let mut conversations = two_conversations();
        conversations.push(stored_conversation(
            "slow",
            vec![message("s1", Role::User, "slow")],
        ));
        let mock = Arc::new(MockChat {
            slow_open: Some(("slow".to_string(), gate.clone())),
            ..MockChat::storing(conversations)
        });
        let store = Arc::new(ConversationStore::new(mock));
        let mut rx = store.subscribe();

        let slow = tokio::spawn({
            let store = store.clone();
            async move { store.load_conversation("slow").await }
        });
        rx.wait_for(|s| s.is_loading).await.unwrap();

        store.load_conversation("c1").await;
        assert_eq!(store.state().current_id(), Some("c1"));
        assert!(store.state().is_loading);

        gate.notify_one();
        slow.await.unwrap();

        let state = store.state();
        assert_eq!(state.current_id(), Some("c1"));
        assert_eq!(state.messages.len(), 2);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_list_fetched_before_send_keeps_new_conversation() {
        let gate = Arc::new(Notify::new());
        let mock = Arc::new(MockChat {
            replies: Mutex::new(vec![Ok(reply("conv-new", "Answer", &[]))].into()),
            list_gate: Some(gate.clone()),
            ..MockChat::storing(two_conversations())
        });
        let store = Arc::new(ConversationStore::new(mock));
        let mut rx = store.subscribe();

        let listing = tokio::spawn({
            let store = store.clone();
            async move { store.load_conversations().await }
        });
        rx.wait_for(|s| s.is_loading).await.unwrap();

        store.send_message("What is the TAM?").await;
        assert_eq!(store.state().current_id(), Some("conv-new"));

        gate.notify_one();
        listing.await.unwrap();

        let state = store.state();
        assert_eq!(state.conversations[0].id, "conv-new");
        assert_eq!(state.current_id(), Some("conv-new"));
        assert_eq!(state.messages.len(), 2);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_deleted_conversation_is_not_reopened_by_pending_load() {
        let gate = Arc::new(Notify::new());
        let mock = Arc::new(MockChat {
            slow_open: Some(("c1".to_string(), gate.clone())),
            ..MockChat::storing(two_conversations())
        });
        let store = Arc::new(ConversationStore::new(mock));
        store.load_conversations().await;
        let mut rx = store.subscribe();

        let opening = tokio::spawn({
            let store = store.clone();
            async move { store.load_conversation("c1").await }
        });
        rx.wait_for(|s| s.is_loading).await.unwrap();

        store.delete_conversation("c1").await;

        gate.notify_one();
        opening.await.unwrap();

        let state = store.state();
        assert!(state.current.is_none());
        assert!(state.messages.is_empty());
        assert!(state.conversations.iter().all(|c| c.id != "c1"));
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_deleting_other_conversation_keeps_pending_load() {
        let gate = Arc::new(Notify::new());
        let mock = Arc::new(MockChat {
            slow_open: Some(("c1".to_string(), gate.clone())),
            ..MockChat::storing(two_conversations())
        });
        let store = Arc::new(ConversationStore::new(mock));
        let mut rx = store.subscribe();

        let opening = tokio::spawn({
            let store = store.clone();
            async move { store.load_conversation("c1").await }
        });
        rx.wait_for(|s| s.is_loading).await.unwrap();

        store.delete_conversation("c2").await;

        gate.notify_one();
        opening.await.unwrap();

        let state = store.state();
        assert_eq!(state.current_id(), Some("c1"));
        assert_eq!(state.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_new_conversation_discards_pending_load() {
        let gate = Arc::new(Notify::new());
        let mock = Arc::new(MockChat {
            slow_open: Some(("c1".to_string(), gate.clone())),
            ..MockChat::storing(two_conversations())
        });
        let store = Arc::new(ConversationStore::new(mock));
        let mut rx = store.subscribe();

        let opening = tokio::spawn({
            let store = store.clone();
            async move { store.load_conversation("c1").await }
        });
        rx.wait_for(|s| s.is_loading).await.unwrap();

        store.create_new_conversation();

        gate.notify_one();
        opening.await.unwrap();

        let state = store.state();
        assert!(state.current.is_none());
        assert!(state.messages.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_load_conversations_failure_keeps_list() {
        let mock = Arc::new(MockChat::storing(two_conversations()));
        let store = ConversationStore::new(mock.clone());
        store.load_conversations().await;
        assert_eq!(store.state().conversations.len(), 2);

        *mock.fail_list.lock().unwrap() = true;
        store.load_conversations().await;

        let state = store.state();
        assert_eq!(state.conversations.len(), 2);
        assert!(!state.is_loading);
        assert_eq!(state.error.unwrap().kind, ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_page_size_is_passed_through() {
        let store = ConversationStore::new(Arc::new(MockChat::storing(two_conversations())))
            .with_page_size(1);
        store.load_conversations().await;
        assert_eq!(store.state().conversations.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_current_conversation_clears_transcript() {
        let store = ConversationStore::new(Arc::new(MockChat::storing(two_conversations())));
        store.load_conversations().await;
        store.load_conversation("c1").await;

        store.delete_conversation("c1").await;

        let state = store.state();
        assert!(state.current.is_none());
        assert!(state.messages.is_empty());
        assert!(state.sources.is_empty());
        assert!(state.conversations.iter().all(|c| c.id != "c1"));
    }

    #[tokio::test]
    async fn test_delete_other_conversation_keeps_transcript() {
        let store = ConversationStore::new(Arc::new(MockChat::storing(two_conversations())));
        store.load_conversations().await;
        store.load_conversation("c1").await;
        let before = store.state();

        store.delete_conversation("c2").await;

        let state = store.state();
        assert_eq!(state.current, before.current);
        assert_eq!(state.messages, before.messages);
        let ids: Vec<_> = state.conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1"]);
    }

    #[tokio::test]
    async fn test_failed_delete_changes_nothing() {
        let mock = Arc::new(MockChat {
            fail_delete: true,
            ..MockChat::storing(two_conversations())
        });
        let store = ConversationStore::new(mock);
        store.load_conversations().await;
        store.load_conversation("c1").await;
        let before = store.state();

        store.delete_conversation("c1").await;

        let state = store.state();
        assert_eq!(state.conversations, before.conversations);
        assert_eq!(state.current, before.current);
        assert_eq!(state.messages, before.messages);
        assert_eq!(state.error.unwrap().kind, ErrorKind::Server);
    }

    #[tokio::test]
    async fn test_create_new_conversation_resets_view() {
        let mock = Arc::new(MockChat {
            replies: Mutex::new(vec![Ok(reply("c1", "Answer", &[Some("doc-1")]))].into()),
            ..MockChat::storing(two_conversations())
        });
        let store = ConversationStore::new(mock);
        store.load_conversations().await;
        store.load_conversation("c1").await;
        store.send_message("one more").await;
        assert!(!store.state().sources.is_empty());

        store.create_new_conversation();

        let state = store.state();
        assert!(state.current.is_none());
        assert!(state.messages.is_empty());
        assert!(state.sources.is_empty());
        assert_eq!(state.conversations.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_error() {
        let store = ConversationStore::new(Arc::new(MockChat::default()));
        store.load_conversation("missing").await;
        assert!(store.state().error.is_some());

        store.clear_error();
        assert!(store.state().error.is_none());
    }

    #[test]
    fn test_sending_takes_precedence_in_status() {
        let state = ChatState {
            is_loading: true,
            is_sending: true,
            ..ChatState::default()
        };
        assert_eq!(state.status(), ChatStatus::Sending);

        let state = ChatState {
            is_loading: true,
            ..ChatState::default()
        };
        assert_eq!(state.status(), ChatStatus::Loading);
        assert_eq!(ChatState::default().status(), ChatStatus::Idle);
    }

    #[tokio::test]
    async fn test_tam_question_against_demo_data() {
        let store = ConversationStore::new(Arc::new(FixtureGateway::new(FixtureLatency::Instant)));
        store.load_conversations().await;
        let prior: Vec<String> = store
            .state()
            .conversations
            .iter()
            .map(|c| c.id.clone())
            .collect();

        store.send_message("What is the TAM?").await;

        let state = store.state();
        let current = state.current_id().unwrap().to_string();
        assert!(!prior.contains(&current));
        assert_eq!(state.conversations[0].id, current);
        let rest: Vec<String> = state.conversations[1..].iter().map(|c| c.id.clone()).collect();
        assert_eq!(rest, prior);

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role, Role::User);
        assert_eq!(state.messages[0].content, "What is the TAM?");
        assert_eq!(state.messages[1].role, Role::Assistant);
        assert_eq!(state.messages[1].citations.len(), 4);
        assert_eq!(state.sources.len(), 4);
    }
}
