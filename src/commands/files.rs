use crate::commands::Backend;
use crate::models::{FileInfo, TranslatedFile};
use crate::state::files::{FileProcessingManager, UploadItem};
use crate::state::DEFAULT_BATCH_LIMIT;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tauri::{AppHandle, Emitter, State};

#[derive(Deserialize)]
pub struct UploadRequest {
    pub path: String,
    pub translate: bool,
}

#[derive(Deserialize)]
pub struct DownloadRequest {
    pub path: String,
    pub save_to: String,
}

#[derive(Clone, Serialize)]
struct EmbedProgressEvent {
    progress: u8,
}

// ── Translated-file records ──

#[tauri::command]
pub fn translated_files(files: State<'_, FileProcessingManager>) -> Vec<TranslatedFile> {
    files.translated_files()
}

#[tauri::command]
pub async fn sync_translations(
    files: State<'_, FileProcessingManager>,
) -> Result<Vec<TranslatedFile>, String> {
    files.sync_with_backend().await;
    Ok(files.translated_files())
}

#[tauri::command]
pub async fn delete_translated_file(
    files: State<'_, FileProcessingManager>,
    id: String,
) -> Result<Vec<TranslatedFile>, String> {
    files.delete(&id).await;
    Ok(files.translated_files())
}

/// Read the given local files and push them through the upload pool. A file
/// that cannot be read is skipped and reported; the rest still go through.
#[tauri::command]
pub async fn upload_documents(
    files: State<'_, FileProcessingManager>,
    requests: Vec<UploadRequest>,
) -> Result<Vec<TranslatedFile>, String> {
    let mut items = Vec::new();
    let mut unreadable = 0usize;
    for request in requests {
        let path = Path::new(&request.path);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        match std::fs::read(path) {
            Ok(data) => items.push(UploadItem {
                name,
                data,
                translate: request.translate,
            }),
            Err(e) => {
                tracing::warn!(path = %request.path, error = %e, "failed to read file");
                unreadable += 1;
            }
        }
    }
    files.upload(items).await;
    if unreadable > 0 {
        return Err(format!("{unreadable} file(s) could not be read"));
    }
    Ok(files.translated_files())
}

/// Embed the selected records into a knowledge base, emitting per-file
/// progress events to the webview.
#[tauri::command]
pub async fn batch_embed_files(
    app: AppHandle,
    files: State<'_, FileProcessingManager>,
    file_ids: Vec<String>,
    knowledge_base_id: String,
) -> Result<Vec<TranslatedFile>, String> {
    files
        .batch_embed(file_ids, &knowledge_base_id, |progress| {
            let _ = app.emit("embed-progress", EmbedProgressEvent { progress });
        })
        .await;
    Ok(files.translated_files())
}

// ── Remote file browser ──

#[tauri::command]
pub async fn list_directory(
    backend: State<'_, Backend>,
    path: String,
    search: String,
) -> Result<Vec<FileInfo>, String> {
    backend
        .0
        .list_files(&path, &search)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn list_directory_recursive(
    backend: State<'_, Backend>,
    path: String,
) -> Result<Vec<FileInfo>, String> {
    backend
        .0
        .list_files_recursive(&path)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn file_content(backend: State<'_, Backend>, path: String) -> Result<String, String> {
    backend.0.file_content(&path).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn translated_file_content(
    backend: State<'_, Backend>,
    path: String,
) -> Result<String, String> {
    backend
        .0
        .translated_content(&path)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn create_remote_folder(
    backend: State<'_, Backend>,
    path: String,
) -> Result<(), String> {
    backend.0.create_folder(&path).await.map_err(|e| e.to_string())
}

/// Read local files and upload them into a remote directory in one request.
#[tauri::command]
pub async fn upload_to_folder(
    backend: State<'_, Backend>,
    path: String,
    file_paths: Vec<String>,
) -> Result<(), String> {
    let mut files = Vec::new();
    for file_path in &file_paths {
        let p = Path::new(file_path);
        let name = p
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let data = std::fs::read(p).map_err(|e| e.to_string())?;
        files.push((name, data));
    }
    backend
        .0
        .upload_files(&path, files)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_remote_file(
    backend: State<'_, Backend>,
    id: String,
    current_path: String,
) -> Result<(), String> {
    backend
        .0
        .delete_file(&id, &current_path)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_remote_folder(
    backend: State<'_, Backend>,
    path: String,
) -> Result<(), String> {
    backend.0.delete_folder(&path).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn download_file(
    backend: State<'_, Backend>,
    path: String,
    save_to: String,
) -> Result<(), String> {
    let bytes = backend.0.download(&path).await.map_err(|e| e.to_string())?;
    std::fs::write(&save_to, bytes).map_err(|e| e.to_string())
}

/// Delete many files through the shared bounded pool. The aggregate result
/// is reported only after every request has settled.
#[tauri::command]
pub async fn batch_delete_files(
    backend: State<'_, Backend>,
    ids: Vec<String>,
    current_path: String,
) -> Result<(), String> {
    let total = ids.len();
    let results: Vec<bool> = stream::iter(ids)
        .map(|id| {
            let api = backend.0.clone();
            let current = current_path.clone();
            async move {
                match api.delete_file(&id, &current).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, id = %id, "batch delete failed");
                        false
                    }
                }
            }
        })
        .buffer_unordered(DEFAULT_BATCH_LIMIT)
        .collect()
        .await;
    let failed = results.iter().filter(|ok| !**ok).count();
    if failed > 0 {
        Err(format!("{failed} of {total} files failed to delete"))
    } else {
        Ok(())
    }
}

/// Download many files through the shared bounded pool.
#[tauri::command]
pub async fn batch_download_files(
    backend: State<'_, Backend>,
    items: Vec<DownloadRequest>,
) -> Result<(), String> {
    let total = items.len();
    let results: Vec<bool> = stream::iter(items)
        .map(|item| {
            let api = backend.0.clone();
            async move {
                let saved = match api.download(&item.path).await {
                    Ok(bytes) => std::fs::write(&item.save_to, bytes).is_ok(),
                    Err(_) => false,
                };
                if !saved {
                    tracing::warn!(path = %item.path, "batch download failed");
                }
                saved
            }
        })
        .buffer_unordered(DEFAULT_BATCH_LIMIT)
        .collect()
        .await;
    let failed = results.iter().filter(|ok| !**ok).count();
    if failed > 0 {
        Err(format!("{failed} of {total} files failed to download"))
    } else {
        Ok(())
    }
}
