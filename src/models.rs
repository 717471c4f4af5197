use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a chat message.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    System,
}

/// Delivery state of an optimistically appended message. Stored sessions
/// written by older clients carry no status field and deserialize as `Sent`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    #[default]
    Sent,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<String>>,
    #[serde(default)]
    pub status: MessageStatus,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            chunks: None,
            status: MessageStatus::Pending,
        }
    }

    pub fn system(text: impl Into<String>, chunks: Option<Vec<String>>) -> Self {
        Self {
            sender: Sender::System,
            text: text.into(),
            chunks,
            status: MessageStatus::Sent,
        }
    }
}

/// A chat session bound to one knowledge base for its whole life.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub knowledge_base_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// The backend-managed knowledge base that always exists and cannot be
/// deleted or left unselected.
pub const DEFAULT_KNOWLEDGE_BASE: &str = "default";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Completed,
    Failed,
}

/// A translated-file record, either created by a local upload or discovered
/// via the backend's `/api/translations` listing.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedFile {
    pub id: String,
    pub name: String,
    pub original_content: String,
    pub translated_content: String,
    pub status: FileStatus,
    #[serde(default)]
    pub is_embedded: bool,
    /// 0-100, or `None` when indeterminate (embedding failed mid-flight).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base_id: Option<String>,
}

/// Generation and retrieval parameters, held in memory only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub seed: i64,
    /// Placeholder carried for settings-panel compatibility; not sent anywhere.
    #[serde(rename = "topK_model")]
    pub top_k_model: f64,
    #[serde(rename = "topK_RAG")]
    pub top_k_rag: u32,
    pub similarity_threshold: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "llama3.1-ffm-70b-32k-chat".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            top_p: 0.3,
            frequency_penalty: 1.0,
            seed: 42,
            top_k_model: 0.3,
            top_k_rag: 3,
            similarity_threshold: 0.7,
        }
    }
}

impl ModelSettings {
    /// Normalize every field into its documented range.
    pub fn clamped(mut self) -> Self {
        self.temperature = self.temperature.clamp(0.0, 1.0);
        self.max_tokens = self.max_tokens.clamp(100, 4000);
        self.top_p = self.top_p.clamp(0.0, 1.0);
        self.frequency_penalty = self.frequency_penalty.clamp(-2.0, 2.0);
        self.seed = self.seed.max(0);
        self.top_k_rag = self.top_k_rag.clamp(1, 10);
        self.similarity_threshold = self.similarity_threshold.clamp(0.0, 1.0);
        self
    }
}

/// A remote filesystem entry. Held transiently per directory navigation,
/// never persisted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub created_at: String,
    #[serde(rename = "isDirectory")]
    pub is_directory: bool,
}

/// A file already embedded into a knowledge base, as reported by
/// `/api/knowledge_base/{id}/files`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseFile {
    pub id: String,
    pub filename: String,
    pub added_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_out_of_range_settings() {
        let settings = ModelSettings {
            temperature: 1.8,
            max_tokens: 50,
            top_p: -0.2,
            frequency_penalty: 5.0,
            seed: -1,
            top_k_rag: 0,
            similarity_threshold: 2.0,
            ..ModelSettings::default()
        }
        .clamped();
        assert_eq!(settings.temperature, 1.0);
        assert_eq!(settings.max_tokens, 100);
        assert_eq!(settings.top_p, 0.0);
        assert_eq!(settings.frequency_penalty, 2.0);
        assert_eq!(settings.seed, 0);
        assert_eq!(settings.top_k_rag, 1);
        assert_eq!(settings.similarity_threshold, 1.0);
    }

    #[test]
    fn test_clamp_keeps_in_range_settings() {
        let settings = ModelSettings::default();
        assert_eq!(settings.clone().clamped(), settings);
    }

    #[test]
    fn test_message_status_defaults_to_sent() {
        let msg: Message =
            serde_json::from_str(r#"{"sender":"user","text":"hi"}"#).unwrap();
        assert_eq!(msg.status, MessageStatus::Sent);
        assert!(msg.chunks.is_none());
    }

    #[test]
    fn test_session_round_trips_camel_case() {
        let session = ChatSession {
            id: "1700000000000".into(),
            title: "New chat 1".into(),
            messages: vec![Message::user("hello")],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            knowledge_base_id: DEFAULT_KNOWLEDGE_BASE.into(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("knowledgeBaseId").is_some());
        assert!(json.get("createdAt").is_some());
        let back: ChatSession = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, session.id);
    }
}
