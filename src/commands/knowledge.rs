use crate::commands::Backend;
use crate::models::{KnowledgeBase, KnowledgeBaseFile, DEFAULT_KNOWLEDGE_BASE};
use crate::state::knowledge::KnowledgeBaseManager;
use tauri::{AppHandle, State};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons};

/// Ask the user to confirm a destructive action without blocking the
/// async runtime.
async fn confirm(app: &AppHandle, title: &str, message: &str) -> bool {
    let (tx, rx) = tokio::sync::oneshot::channel();
    app.dialog()
        .message(message)
        .title(title)
        .buttons(MessageDialogButtons::OkCancel)
        .show(move |confirmed| {
            let _ = tx.send(confirmed);
        });
    rx.await.unwrap_or(false)
}

#[tauri::command]
pub fn knowledge_bases(kb: State<'_, KnowledgeBaseManager>) -> Vec<KnowledgeBase> {
    kb.knowledge_bases()
}

#[tauri::command]
pub fn current_knowledge_base(kb: State<'_, KnowledgeBaseManager>) -> String {
    kb.current()
}

#[tauri::command]
pub fn set_current_knowledge_base(kb: State<'_, KnowledgeBaseManager>, id: String) {
    kb.set_current(id);
}

#[tauri::command]
pub async fn refresh_knowledge_bases(
    kb: State<'_, KnowledgeBaseManager>,
) -> Result<Vec<KnowledgeBase>, String> {
    kb.refresh().await;
    Ok(kb.knowledge_bases())
}

#[tauri::command]
pub async fn create_knowledge_base(
    kb: State<'_, KnowledgeBaseManager>,
    name: String,
    description: String,
) -> Result<Vec<KnowledgeBase>, String> {
    kb.create(&name, &description).await;
    Ok(kb.knowledge_bases())
}

#[tauri::command]
pub async fn delete_knowledge_base(
    app: AppHandle,
    kb: State<'_, KnowledgeBaseManager>,
    id: String,
) -> Result<Vec<KnowledgeBase>, String> {
    if id == DEFAULT_KNOWLEDGE_BASE {
        return Err("The default knowledge base cannot be deleted".to_string());
    }
    if confirm(
        &app,
        "Delete knowledge base",
        "Delete this knowledge base? This cannot be undone.",
    )
    .await
    {
        kb.delete(&id).await;
    }
    Ok(kb.knowledge_bases())
}

#[tauri::command]
pub async fn reset_knowledge_base(
    app: AppHandle,
    kb: State<'_, KnowledgeBaseManager>,
    id: String,
) -> Result<Vec<KnowledgeBase>, String> {
    if confirm(
        &app,
        "Reset knowledge base",
        "Reset this knowledge base? All embedded files will be removed.",
    )
    .await
    {
        kb.reset(&id).await;
    }
    Ok(kb.knowledge_bases())
}

#[tauri::command]
pub async fn knowledge_base_files(
    backend: State<'_, Backend>,
    id: String,
) -> Result<Vec<KnowledgeBaseFile>, String> {
    backend
        .0
        .list_knowledge_base_files(&id)
        .await
        .map_err(|e| e.to_string())
}
