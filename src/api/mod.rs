use crate::models::{FileInfo, KnowledgeBase, KnowledgeBaseFile, ModelSettings, TranslatedFile};
use reqwest::multipart;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Failure taxonomy for backend calls: transport errors thrown by the HTTP
/// stack, and non-OK statuses with whatever body the backend attached.
/// Every request is attempted exactly once; there is no retry policy.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },
}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub translated_content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub relevant_chunks: Vec<String>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    knowledge_base_id: &'a str,
    model_settings: WireModelSettings<'a>,
}

#[derive(Serialize)]
struct WireModelSettings<'a> {
    model_name: &'a str,
    parameters: WireParameters,
}

/// Flattened generation/retrieval parameters in the shape the backend
/// expects. `top_k_model` is deliberately not part of the wire format.
#[derive(Serialize)]
struct WireParameters {
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    seed: i64,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "similarityThreshold")]
    similarity_threshold: f64,
}

impl<'a> From<&'a ModelSettings> for WireModelSettings<'a> {
    fn from(settings: &'a ModelSettings) -> Self {
        Self {
            model_name: &settings.model,
            parameters: WireParameters {
                temperature: settings.temperature,
                max_tokens: settings.max_tokens,
                top_p: settings.top_p,
                frequency_penalty: settings.frequency_penalty,
                seed: settings.seed,
                top_k: settings.top_k_rag,
                similarity_threshold: settings.similarity_threshold,
            },
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    content: &'a str,
    filename: &'a str,
    knowledge_base_id: &'a str,
}

#[derive(Serialize)]
struct CreateKnowledgeBaseRequest<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct CreateFolderRequest<'a> {
    path: &'a str,
}

/// Typed wrappers over the backend's HTTP JSON contract. The base URL is
/// injected at construction so tests can point the client at a fake server.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Non-2xx becomes `ApiError::Status` carrying the response body.
    async fn check(resp: Response) -> Result<Response, ApiError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(ApiError::Status { status, message })
    }

    /// Delete policy, applied uniformly: 2xx and 404 both count as a
    /// successful delete (the record is gone either way), everything else
    /// is an error.
    async fn check_delete(resp: Response) -> Result<(), ApiError> {
        if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(ApiError::Status { status, message })
    }

    // ── Uploads, embedding, query ──

    /// Upload one file, optionally translating it server-side.
    pub async fn upload(
        &self,
        name: &str,
        data: Vec<u8>,
        translate: bool,
    ) -> Result<UploadResponse, ApiError> {
        let path = if translate {
            "/api/upload_and_translate"
        } else {
            "/api/upload"
        };
        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(data).file_name(name.to_string()));
        let resp = self.client.post(self.url(path)).multipart(form).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Embed text content into a knowledge base's retrieval index.
    pub async fn embed(
        &self,
        content: &str,
        filename: &str,
        knowledge_base_id: &str,
    ) -> Result<(), ApiError> {
        let body = EmbedRequest {
            content,
            filename,
            knowledge_base_id,
        };
        let resp = self
            .client
            .post(self.url("/api/embed"))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Retrieval-augmented query against a knowledge base.
    pub async fn query(
        &self,
        query: &str,
        knowledge_base_id: &str,
        settings: &ModelSettings,
    ) -> Result<QueryResponse, ApiError> {
        let body = QueryRequest {
            query,
            knowledge_base_id,
            model_settings: settings.into(),
        };
        let resp = self
            .client
            .post(self.url("/api/query"))
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    // ── Knowledge bases ──

    pub async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>, ApiError> {
        let resp = self
            .client
            .get(self.url("/api/knowledge_bases"))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<(), ApiError> {
        let body = CreateKnowledgeBaseRequest { name, description };
        let resp = self
            .client
            .post(self.url("/api/knowledge_base"))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn delete_knowledge_base(&self, id: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/knowledge_base/{}", urlencoding::encode(id))))
            .send()
            .await?;
        Self::check_delete(resp).await
    }

    pub async fn reset_knowledge_base(&self, id: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.url(&format!(
                "/api/knowledge_base/reset/{}",
                urlencoding::encode(id)
            )))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn list_knowledge_base_files(
        &self,
        id: &str,
    ) -> Result<Vec<KnowledgeBaseFile>, ApiError> {
        let resp = self
            .client
            .get(self.url(&format!(
                "/api/knowledge_base/{}/files",
                urlencoding::encode(id)
            )))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    // ── Remote file browser ──

    pub async fn list_files(
        &self,
        path: &str,
        search: &str,
    ) -> Result<Vec<FileInfo>, ApiError> {
        let resp = self
            .client
            .get(self.url("/api/files"))
            .query(&[("path", path), ("search", search)])
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Every file under a path, recursively.
    pub async fn list_files_recursive(&self, path: &str) -> Result<Vec<FileInfo>, ApiError> {
        let resp = self
            .client
            .get(self.url("/api/files/recursive"))
            .query(&[("path", path)])
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn file_content(&self, path: &str) -> Result<String, ApiError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/files/content/{}", urlencoding::encode(path))))
            .send()
            .await?;
        Ok(Self::check(resp).await?.text().await?)
    }

    pub async fn translated_content(&self, path: &str) -> Result<String, ApiError> {
        let resp = self
            .client
            .get(self.url(&format!(
                "/api/files/translated_content/{}",
                urlencoding::encode(path)
            )))
            .send()
            .await?;
        Ok(Self::check(resp).await?.text().await?)
    }

    pub async fn create_folder(&self, path: &str) -> Result<(), ApiError> {
        let body = CreateFolderRequest { path };
        let resp = self
            .client
            .post(self.url("/api/files/create_folder"))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Multi-file upload into a target directory.
    pub async fn upload_files(
        &self,
        path: &str,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<(), ApiError> {
        let mut form = multipart::Form::new().text("path", path.to_string());
        for (name, data) in files {
            form = form.part("files", multipart::Part::bytes(data).file_name(name));
        }
        let resp = self
            .client
            .post(self.url("/api/files/upload"))
            .multipart(form)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Delete a file by id. The backend 404s for files living inside a
    /// folder, so a 404 on the first attempt retries with the full path
    /// before the idempotent-delete rule applies.
    pub async fn delete_file(&self, id: &str, current_path: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/files/{}", urlencoding::encode(id))))
            .send()
            .await?;
        if resp.status().is_success() {
            return Ok(());
        }
        if resp.status() != StatusCode::NOT_FOUND {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, message });
        }

        let folder = if current_path == "/" { "" } else { current_path };
        let full_path = format!("{}/{}", folder, id)
            .trim_start_matches('/')
            .to_string();
        let resp = self
            .client
            .delete(self.url(&format!("/api/files/{}", urlencoding::encode(&full_path))))
            .send()
            .await?;
        Self::check_delete(resp).await
    }

    pub async fn delete_folder(&self, path: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/files/folder/{}", urlencoding::encode(path))))
            .send()
            .await?;
        Self::check_delete(resp).await
    }

    /// Raw bytes of a remote file.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/files/download/{}", urlencoding::encode(path))))
            .send()
            .await?;
        Ok(Self::check(resp).await?.bytes().await?.to_vec())
    }

    // ── Translated-file records ──

    pub async fn list_translations(&self) -> Result<Vec<TranslatedFile>, ApiError> {
        let resp = self
            .client
            .get(self.url("/api/translations"))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn delete_translation(&self, id: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/translations/{}", urlencoding::encode(id))))
            .send()
            .await?;
        Self::check_delete(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_query_flattens_settings_into_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/query")
            .match_body(Matcher::Json(json!({
                "query": "What is clause 4?",
                "knowledge_base_id": "default",
                "model_settings": {
                    "model_name": "llama3.1-ffm-70b-32k-chat",
                    "parameters": {
                        "temperature": 0.3,
                        "max_tokens": 2000,
                        "top_p": 0.3,
                        "frequency_penalty": 1.0,
                        "seed": 42,
                        "topK": 3,
                        "similarityThreshold": 0.7
                    }
                }
            })))
            .with_body(
                json!({
                    "answer": "Clause 4 covers termination.",
                    "relevant_chunks": ["..."]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let resp = client
            .query("What is clause 4?", "default", &ModelSettings::default())
            .await
            .unwrap();
        assert_eq!(resp.answer, "Clause 4 covers termination.");
        assert_eq!(resp.relevant_chunks, vec!["...".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_non_ok_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/query")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let err = client
            .query("q", "default", &ModelSettings::default())
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_create_knowledge_base_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/knowledge_base")
            .match_body(Matcher::Json(json!({
                "name": "Legal Docs",
                "description": "contracts"
            })))
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        client
            .create_knowledge_base("Legal Docs", "contracts")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_translation_treats_404_as_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/translations/f1")
            .with_status(404)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        assert!(client.delete_translation("f1").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_translation_surfaces_500() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/translations/f1")
            .with_status(500)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        assert!(client.delete_translation("f1").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_file_retries_with_full_path_on_404() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/files/report.txt")
            .with_status(404)
            .create_async()
            .await;
        let retry = server
            .mock("DELETE", "/api/files/docs%2Freport.txt")
            .with_status(200)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        client.delete_file("report.txt", "docs").await.unwrap();
        retry.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_body_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embed")
            .match_body(Matcher::Json(json!({
                "content": "hello",
                "filename": "a.txt",
                "knowledge_base_id": "kb1"
            })))
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        client.embed("hello", "a.txt", "kb1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_files_query_params() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("path".into(), "/docs".into()),
                Matcher::UrlEncoded("search".into(), "".into()),
            ]))
            .with_body("[]")
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let files = client.list_files("/docs", "").await.unwrap();
        assert!(files.is_empty());
    }
}
