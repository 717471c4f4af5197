use crate::models::{ChatSession, Message, ModelSettings};
use crate::state::chat::ChatManager;
use tauri::State;

#[tauri::command]
pub fn create_chat_session(
    chat: State<'_, ChatManager>,
    knowledge_base_id: String,
) -> ChatSession {
    chat.create_session(&knowledge_base_id)
}

#[tauri::command]
pub fn list_chat_sessions(chat: State<'_, ChatManager>) -> Vec<ChatSession> {
    chat.sessions()
}

#[tauri::command]
pub fn current_chat_session(chat: State<'_, ChatManager>) -> Option<String> {
    chat.current_session()
}

#[tauri::command]
pub fn chat_messages(chat: State<'_, ChatManager>) -> Vec<Message> {
    chat.messages()
}

#[tauri::command]
pub fn load_chat_session(chat: State<'_, ChatManager>, id: String) {
    chat.load_session(&id);
}

#[tauri::command]
pub fn delete_chat_session(chat: State<'_, ChatManager>, id: String) {
    chat.delete_session(&id);
}

/// Send a message and return the updated visible buffer. Failures show up
/// in the buffer as a failure notice, never as a command error.
#[tauri::command]
pub async fn send_chat_message(
    chat: State<'_, ChatManager>,
    text: String,
    knowledge_base_id: String,
    settings: ModelSettings,
) -> Result<Vec<Message>, String> {
    chat.send_message(&text, &knowledge_base_id, &settings.clamped())
        .await;
    Ok(chat.messages())
}
