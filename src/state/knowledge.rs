use crate::api::ApiClient;
use crate::models::{KnowledgeBase, DEFAULT_KNOWLEDGE_BASE};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Tracks the backend-owned knowledge-base list and the active selection.
/// Every mutation is fire-and-refetch: the list is never edited locally,
/// only replaced wholesale from the backend, so it converges on the server
/// state at the cost of one extra round trip per action. Failures are
/// logged and leave the previous list in place.
pub struct KnowledgeBaseManager {
    api: Arc<ApiClient>,
    list: Mutex<Vec<KnowledgeBase>>,
    current: Mutex<String>,
    cancel: CancellationToken,
}

impl KnowledgeBaseManager {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            list: Mutex::new(Vec::new()),
            current: Mutex::new(DEFAULT_KNOWLEDGE_BASE.to_string()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn knowledge_bases(&self) -> Vec<KnowledgeBase> {
        self.list.lock().unwrap().clone()
    }

    pub fn current(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    /// Pure local state change, no backend call.
    pub fn set_current(&self, id: impl Into<String>) {
        *self.current.lock().unwrap() = id.into();
    }

    /// Replace the in-memory list with the backend's. On failure the prior
    /// list stays as-is.
    pub async fn refresh(&self) {
        match self.api.list_knowledge_bases().await {
            Ok(list) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                *self.list.lock().unwrap() = list;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch knowledge bases");
            }
        }
    }

    /// Create on the backend, then refetch. No optimistic insert.
    pub async fn create(&self, name: &str, description: &str) {
        match self.api.create_knowledge_base(name, description).await {
            Ok(()) => self.refresh().await,
            Err(e) => {
                tracing::warn!(error = %e, name, "failed to create knowledge base");
            }
        }
    }

    /// Delete on the backend; if the deleted id was the active selection it
    /// falls back to the default knowledge base before the refetch.
    pub async fn delete(&self, id: &str) {
        match self.api.delete_knowledge_base(id).await {
            Ok(()) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                {
                    let mut current = self.current.lock().unwrap();
                    if *current == id {
                        *current = DEFAULT_KNOWLEDGE_BASE.to_string();
                    }
                }
                self.refresh().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, id, "failed to delete knowledge base");
            }
        }
    }

    /// Clear the knowledge base's embedded content server-side, then refetch.
    pub async fn reset(&self, id: &str) {
        match self.api.reset_knowledge_base(id).await {
            Ok(()) => self.refresh().await,
            Err(e) => {
                tracing::warn!(error = %e, id, "failed to reset knowledge base");
            }
        }
    }

    /// Stop applying responses from any still-in-flight request.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
