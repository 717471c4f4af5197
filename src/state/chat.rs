use crate::api::ApiClient;
use crate::models::{ChatSession, Message, MessageStatus, ModelSettings, Sender};
use crate::store::{LocalStore, KEY_CHAT_SESSIONS, KEY_CURRENT_SESSION};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const SEND_FAILED_TEXT: &str = "Sorry, something went wrong. Please try again later.";

/// Tracks the session list (most-recent-first), the active session id and
/// the visible message buffer. Sessions and the active id survive restarts
/// through the local store; the buffer is derived state and is not
/// persisted.
pub struct ChatManager {
    api: Arc<ApiClient>,
    store: Arc<LocalStore>,
    sessions: Mutex<Vec<ChatSession>>,
    current: Mutex<Option<String>>,
    buffer: Mutex<Vec<Message>>,
    cancel: CancellationToken,
}

impl ChatManager {
    pub fn new(api: Arc<ApiClient>, store: Arc<LocalStore>) -> Self {
        let sessions: Vec<ChatSession> = store.get(KEY_CHAT_SESSIONS).unwrap_or_default();
        let current: Option<String> = store.get(KEY_CURRENT_SESSION);
        Self {
            api,
            store,
            sessions: Mutex::new(sessions),
            current: Mutex::new(current),
            buffer: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn sessions(&self) -> Vec<ChatSession> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn current_session(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.buffer.lock().unwrap().clone()
    }

    fn persist(&self) {
        let sessions = self.sessions.lock().unwrap().clone();
        self.store.set(KEY_CHAT_SESSIONS, &sessions);
        match self.current.lock().unwrap().as_ref() {
            Some(id) => self.store.set(KEY_CURRENT_SESSION, id),
            None => self.store.remove(KEY_CURRENT_SESSION),
        }
    }

    /// Start a new session bound to the given knowledge base, insert it at
    /// the head of the list and make it active. Session ids derive from the
    /// creation timestamp; a collision under rapid creation bumps the value
    /// until it is unique.
    pub fn create_session(&self, knowledge_base_id: &str) -> ChatSession {
        let now = Utc::now();
        let session = {
            let mut sessions = self.sessions.lock().unwrap();
            let mut id = now.timestamp_millis();
            while sessions.iter().any(|s| s.id == id.to_string()) {
                id += 1;
            }
            let session = ChatSession {
                id: id.to_string(),
                title: format!("New chat {}", sessions.len() + 1),
                messages: Vec::new(),
                created_at: now,
                updated_at: now,
                knowledge_base_id: knowledge_base_id.to_string(),
            };
            sessions.insert(0, session.clone());
            session
        };
        *self.current.lock().unwrap() = Some(session.id.clone());
        self.buffer.lock().unwrap().clear();
        self.persist();
        session
    }

    /// Activate a stored session and replace the visible buffer with its
    /// messages. Silently does nothing for an unknown id.
    pub fn load_session(&self, id: &str) {
        let messages = {
            let sessions = self.sessions.lock().unwrap();
            match sessions.iter().find(|s| s.id == id) {
                Some(session) => session.messages.clone(),
                None => return,
            }
        };
        *self.current.lock().unwrap() = Some(id.to_string());
        *self.buffer.lock().unwrap() = messages;
        self.persist();
    }

    /// Remove a session. Deleting the active one clears the active id and
    /// the visible buffer.
    pub fn delete_session(&self, id: &str) {
        self.sessions.lock().unwrap().retain(|s| s.id != id);
        {
            let mut current = self.current.lock().unwrap();
            if current.as_deref() == Some(id) {
                *current = None;
                self.buffer.lock().unwrap().clear();
            }
        }
        self.persist();
    }

    /// Optimistically append the user message, query the backend, then
    /// append the answer. Any failure (transport or non-OK status) marks
    /// the user message `Failed` and appends a generic failure notice to
    /// the visible buffer only, never to the stored session.
    pub async fn send_message(
        &self,
        text: &str,
        knowledge_base_id: &str,
        settings: &ModelSettings,
    ) {
        let session_id = self.current.lock().unwrap().clone();
        let buffer_index = {
            let mut buffer = self.buffer.lock().unwrap();
            buffer.push(Message::user(text));
            buffer.len() - 1
        };
        let session_index = session_id
            .as_deref()
            .and_then(|id| self.append_to_session(id, Message::user(text)));
        self.persist();

        match self.api.query(text, knowledge_base_id, settings).await {
            Ok(resp) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.set_message_status(
                    buffer_index,
                    session_id.as_deref().zip(session_index),
                    MessageStatus::Sent,
                );
                let chunks = (!resp.relevant_chunks.is_empty()).then_some(resp.relevant_chunks);
                let reply = Message::system(resp.answer, chunks);
                self.buffer.lock().unwrap().push(reply.clone());
                if let Some(id) = session_id.as_deref() {
                    self.append_to_session(id, reply);
                }
                self.persist();
            }
            Err(e) => {
                tracing::warn!(error = %e, "query failed");
                if self.cancel.is_cancelled() {
                    return;
                }
                self.set_message_status(
                    buffer_index,
                    session_id.as_deref().zip(session_index),
                    MessageStatus::Failed,
                );
                self.buffer
                    .lock()
                    .unwrap()
                    .push(Message::system(SEND_FAILED_TEXT, None));
                self.persist();
            }
        }
    }

    fn append_to_session(&self, id: &str, message: Message) -> Option<usize> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.iter_mut().find(|s| s.id == id)?;
        session.messages.push(message);
        session.updated_at = Utc::now();
        Some(session.messages.len() - 1)
    }

    /// Resolve the optimistic user message in the buffer (and in the stored
    /// session, if any) to its final status. Guarded so a stale index never
    /// touches anything but a pending user message.
    fn set_message_status(
        &self,
        buffer_index: usize,
        session: Option<(&str, usize)>,
        status: MessageStatus,
    ) {
        {
            let mut buffer = self.buffer.lock().unwrap();
            if let Some(m) = buffer.get_mut(buffer_index) {
                if m.sender == Sender::User && m.status == MessageStatus::Pending {
                    m.status = status;
                }
            }
        }
        if let Some((session_id, index)) = session {
            let mut sessions = self.sessions.lock().unwrap();
            if let Some(s) = sessions.iter_mut().find(|s| s.id == session_id) {
                if let Some(m) = s.messages.get_mut(index) {
                    if m.sender == Sender::User && m.status == MessageStatus::Pending {
                        m.status = status;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_KNOWLEDGE_BASE;
    use serde_json::json;

    fn manager_with(store: Arc<LocalStore>, url: String) -> ChatManager {
        ChatManager::new(Arc::new(ApiClient::new(url)), store)
    }

    fn offline_manager() -> ChatManager {
        manager_with(
            Arc::new(LocalStore::in_memory().unwrap()),
            "http://127.0.0.1:9".to_string(),
        )
    }

    #[test]
    fn test_create_sessions_are_head_inserted_with_unique_ids() {
        let manager = offline_manager();
        let first = manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        let second = manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        let third = manager.create_session("kb1");

        let sessions = manager.sessions();
        assert_eq!(sessions.len(), 3);
        assert_eq!(sessions[0].id, third.id);
        assert_eq!(sessions[1].id, second.id);
        assert_eq!(sessions[2].id, first.id);
        assert_ne!(first.id, second.id);
        assert_ne!(second.id, third.id);
        assert_eq!(manager.current_session(), Some(third.id.clone()));
        assert_eq!(sessions[0].knowledge_base_id, "kb1");
    }

    #[test]
    fn test_load_unknown_session_is_a_no_op() {
        let manager = offline_manager();
        let session = manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        manager.load_session("no-such-id");
        assert_eq!(manager.current_session(), Some(session.id));
    }

    #[test]
    fn test_load_session_replaces_buffer() {
        let manager = offline_manager();
        let first = manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        manager.append_to_session(&first.id, Message::system("stored reply", None));
        manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        assert!(manager.messages().is_empty());

        manager.load_session(&first.id);
        assert_eq!(manager.current_session(), Some(first.id));
        let messages = manager.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "stored reply");
    }

    #[test]
    fn test_delete_active_session_clears_selection_and_buffer() {
        let manager = offline_manager();
        let session = manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        manager.buffer.lock().unwrap().push(Message::system("hi", None));

        manager.delete_session(&session.id);
        assert_eq!(manager.current_session(), None);
        assert!(manager.messages().is_empty());
        assert!(manager.sessions().is_empty());
    }

    #[test]
    fn test_delete_other_session_keeps_selection() {
        let manager = offline_manager();
        let first = manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        let second = manager.create_session(DEFAULT_KNOWLEDGE_BASE);

        manager.delete_session(&first.id);
        assert_eq!(manager.current_session(), Some(second.id));
        assert_eq!(manager.sessions().len(), 1);
    }

    #[test]
    fn test_sessions_and_selection_survive_restart() {
        let store = Arc::new(LocalStore::in_memory().unwrap());
        let url = "http://127.0.0.1:9".to_string();
        let session_id = {
            let manager = manager_with(store.clone(), url.clone());
            manager.create_session(DEFAULT_KNOWLEDGE_BASE);
            manager.create_session("kb1").id
        };

        let manager = manager_with(store, url);
        assert_eq!(manager.sessions().len(), 2);
        assert_eq!(manager.current_session(), Some(session_id));
    }

    #[test]
    fn test_cleared_selection_is_removed_from_store() {
        let store = Arc::new(LocalStore::in_memory().unwrap());
        let url = "http://127.0.0.1:9".to_string();
        {
            let manager = manager_with(store.clone(), url.clone());
            let session = manager.create_session(DEFAULT_KNOWLEDGE_BASE);
            manager.delete_session(&session.id);
        }
        let manager = manager_with(store, url);
        assert_eq!(manager.current_session(), None);
    }

    #[tokio::test]
    async fn test_send_message_appends_answer_to_buffer_and_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/query")
            .with_body(
                json!({
                    "answer": "Clause 4 covers termination.",
                    "relevant_chunks": ["..."]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let manager = manager_with(
            Arc::new(LocalStore::in_memory().unwrap()),
            server.url(),
        );
        let session = manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        manager
            .send_message(
                "What is clause 4?",
                DEFAULT_KNOWLEDGE_BASE,
                &ModelSettings::default(),
            )
            .await;

        let messages = manager.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].status, MessageStatus::Sent);
        assert_eq!(messages[1].text, "Clause 4 covers termination.");
        assert_eq!(messages[1].chunks.as_deref(), Some(&["...".to_string()][..]));

        let stored = manager.sessions();
        let stored = stored.iter().find(|s| s.id == session.id).unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[1].text, "Clause 4 covers termination.");
    }

    #[tokio::test]
    async fn test_send_message_failure_marks_user_message_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/query")
            .with_status(500)
            .create_async()
            .await;

        let manager = manager_with(
            Arc::new(LocalStore::in_memory().unwrap()),
            server.url(),
        );
        let session = manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        manager
            .send_message("hello?", DEFAULT_KNOWLEDGE_BASE, &ModelSettings::default())
            .await;

        let messages = manager.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].status, MessageStatus::Failed);
        assert_eq!(messages[1].sender, Sender::System);
        assert_eq!(messages[1].text, SEND_FAILED_TEXT);

        // The failure notice stays out of the stored session.
        let stored = manager.sessions();
        let stored = stored.iter().find(|s| s.id == session.id).unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.messages[0].status, MessageStatus::Failed);
    }

    #[tokio::test]
    async fn test_send_message_without_active_session_only_updates_buffer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/query")
            .with_body(json!({"answer": "hi", "relevant_chunks": []}).to_string())
            .create_async()
            .await;

        let manager = manager_with(
            Arc::new(LocalStore::in_memory().unwrap()),
            server.url(),
        );
        manager
            .send_message("hello", DEFAULT_KNOWLEDGE_BASE, &ModelSettings::default())
            .await;

        assert_eq!(manager.messages().len(), 2);
        assert!(manager.sessions().is_empty());
        assert!(manager.messages()[1].chunks.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_discards_query_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/query")
            .with_body(json!({"answer": "hi", "relevant_chunks": []}).to_string())
            .create_async()
            .await;

        let manager = manager_with(
            Arc::new(LocalStore::in_memory().unwrap()),
            server.url(),
        );
        manager.create_session(DEFAULT_KNOWLEDGE_BASE);
        manager.shutdown();
        manager
            .send_message("hello", DEFAULT_KNOWLEDGE_BASE, &ModelSettings::default())
            .await;

        // The optimistic user message is there, but the response was dropped.
        let messages = manager.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status, MessageStatus::Pending);
    }
}
