use crate::api::ApiClient;
use crate::models::{FileStatus, TranslatedFile};
use crate::store::{LocalStore, KEY_TRANSLATED_FILES};
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// One file handed to `upload`, already read off disk by the caller.
pub struct UploadItem {
    pub name: String,
    pub data: Vec<u8>,
    pub translate: bool,
}

/// Tracks per-file translation and embedding state. Records are hydrated
/// from the local store at construction, reconciled against the backend's
/// authoritative `/api/translations` listing, and mirrored back to the
/// store on every mutation.
pub struct FileProcessingManager {
    api: Arc<ApiClient>,
    store: Arc<LocalStore>,
    files: Mutex<Vec<TranslatedFile>>,
    batch_limit: usize,
    cancel: CancellationToken,
}

/// Merge policy: a backend record replaces the local record with the same
/// id, unknown backend ids are appended, local-only records survive. The
/// resulting id set is the union of both inputs.
fn merge_records(local: &mut Vec<TranslatedFile>, backend: Vec<TranslatedFile>) {
    for record in backend {
        if let Some(existing) = local.iter_mut().find(|f| f.id == record.id) {
            *existing = record;
        } else {
            local.push(record);
        }
    }
}

impl FileProcessingManager {
    pub fn new(api: Arc<ApiClient>, store: Arc<LocalStore>, batch_limit: usize) -> Self {
        let files: Vec<TranslatedFile> = store.get(KEY_TRANSLATED_FILES).unwrap_or_default();
        Self {
            api,
            store,
            files: Mutex::new(files),
            batch_limit: batch_limit.max(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn translated_files(&self) -> Vec<TranslatedFile> {
        self.files.lock().unwrap().clone()
    }

    fn persist(&self) {
        let files = self.files.lock().unwrap().clone();
        self.store.set(KEY_TRANSLATED_FILES, &files);
    }

    /// Reconcile local records with the backend's listing. Failure leaves
    /// the local records untouched.
    pub async fn sync_with_backend(&self) {
        match self.api.list_translations().await {
            Ok(records) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                merge_records(&mut self.files.lock().unwrap(), records);
                self.persist();
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch translation records");
            }
        }
    }

    /// Upload files through a bounded worker pool. Each file is independent:
    /// a failure produces a `Failed` record with empty content and never
    /// aborts the rest of the batch.
    pub async fn upload(&self, items: Vec<UploadItem>) {
        stream::iter(items)
            .for_each_concurrent(self.batch_limit, |item| self.upload_one(item))
            .await;
    }

    async fn upload_one(&self, item: UploadItem) {
        let record = match self.api.upload(&item.name, item.data, item.translate).await {
            Ok(resp) => {
                let translated = if item.translate {
                    resp.translated_content.unwrap_or_default()
                } else {
                    resp.content.clone()
                };
                TranslatedFile {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: item.name,
                    original_content: resp.content,
                    translated_content: translated,
                    status: FileStatus::Completed,
                    is_embedded: false,
                    embedding_progress: Some(0),
                    knowledge_base_id: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, file = %item.name, "file upload failed");
                TranslatedFile {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: item.name,
                    original_content: String::new(),
                    translated_content: String::new(),
                    status: FileStatus::Failed,
                    is_embedded: false,
                    embedding_progress: Some(0),
                    knowledge_base_id: None,
                }
            }
        };
        if self.cancel.is_cancelled() {
            return;
        }
        self.files.lock().unwrap().push(record);
        self.persist();
    }

    /// Embed the given records into a knowledge base through the same
    /// bounded pool. A failed file ends up with an indeterminate progress
    /// (`None`) and the batch carries on; successes are never rolled back.
    pub async fn batch_embed(
        &self,
        file_ids: Vec<String>,
        knowledge_base_id: &str,
        on_progress: impl Fn(u8) + Send + Sync,
    ) {
        let on_progress = &on_progress;
        stream::iter(file_ids)
            .for_each_concurrent(self.batch_limit, |id| {
                self.embed_one(id, knowledge_base_id, on_progress)
            })
            .await;
    }

    async fn embed_one(
        &self,
        id: String,
        knowledge_base_id: &str,
        on_progress: &(impl Fn(u8) + Send + Sync),
    ) {
        let file = self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned();
        let Some(file) = file else { return };

        self.set_progress(&id, Some(0));

        // Translated content preferred, original as the fallback.
        let content = if file.translated_content.is_empty() {
            &file.original_content
        } else {
            &file.translated_content
        };

        match self.api.embed(content, &file.name, knowledge_base_id).await {
            Ok(()) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                {
                    let mut files = self.files.lock().unwrap();
                    if let Some(f) = files.iter_mut().find(|f| f.id == id) {
                        f.is_embedded = true;
                        f.knowledge_base_id = Some(knowledge_base_id.to_string());
                        f.embedding_progress = Some(100);
                    }
                }
                self.persist();
                on_progress(100);
            }
            Err(e) => {
                tracing::warn!(error = %e, file = %file.name, "embedding failed");
                if self.cancel.is_cancelled() {
                    return;
                }
                self.set_progress(&id, None);
            }
        }
    }

    fn set_progress(&self, id: &str, value: Option<u8>) {
        {
            let mut files = self.files.lock().unwrap();
            if let Some(f) = files.iter_mut().find(|f| f.id == id) {
                f.embedding_progress = value;
            }
        }
        self.persist();
    }

    /// Delete the record on the backend, then locally. 2xx and 404 both
    /// count as deleted; any other failure keeps the local record.
    pub async fn delete(&self, id: &str) {
        match self.api.delete_translation(id).await {
            Ok(()) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.files.lock().unwrap().retain(|f| f.id != id);
                self.persist();
            }
            Err(e) => {
                tracing::warn!(error = %e, id, "failed to delete translation record");
            }
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
