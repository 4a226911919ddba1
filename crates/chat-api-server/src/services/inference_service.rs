use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::InferenceConfig;
use crate::models::chat::{ChatTurn, ProductId};
use crate::services::conversation::manager::InferenceProvider;

const EMPTY_BODY_PLACEHOLDER: &str = "<empty body>";

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Inference service returned an empty response")]
    EmptyResponse,

    #[error("Inference service rejected the request: {0}")]
    RequestRejected(String),

    #[error("Inference service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AskRequest<'a> {
    product_id: ProductId,
    question: &'a str,
    history: &'a [ChatTurn],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexDocumentRequest<'a> {
    product_id: ProductId,
    file_url: &'a str,
}

/// Reply of the `/upload` indexing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    #[serde(default)]
    pub pdf_id: Option<ProductId>,
    #[serde(default)]
    pub store_path: Option<String>,
}

/// HTTP client for the remote question-answering service
#[derive(Clone)]
pub struct InferenceService {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl InferenceService {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        Self::with_timeout(&config.base_url, timeout)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Ask one question. `history` is sent whole on every call, the remote
    /// service keeps no state between calls.
    pub async fn ask(
        &self,
        product_id: ProductId,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<String, InferenceError> {
        debug!(product_id, turns = history.len(), "Asking inference service");

        let request = AskRequest {
            product_id,
            question,
            history,
        };
        let body = self.post("/chat", &request).await?;

        let answer = decode_answer(body);
        if answer.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(answer)
    }

    /// Ask the service to index a product manual stored at `file_url`
    pub async fn index_document(
        &self,
        product_id: ProductId,
        file_url: &str,
    ) -> Result<IndexResponse, InferenceError> {
        debug!(product_id, file_url, "Requesting document indexing");

        let request = IndexDocumentRequest { product_id, file_url };
        let body = self.post("/upload", &request).await?;

        if body.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        serde_json::from_str(&body).map_err(|e| {
            InferenceError::Unavailable(format!("Failed to parse indexing response: {}", e))
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<String, InferenceError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        classify(status, body)
    }

    fn transport_error(&self, err: reqwest::Error) -> InferenceError {
        if err.is_timeout() {
            InferenceError::Unavailable(format!(
                "No response within {}s",
                self.timeout.as_secs_f32()
            ))
        } else {
            InferenceError::Unavailable(format!("Failed to call inference service: {}", err))
        }
    }
}

/// Map an upstream status and body onto success or a failure kind
fn classify(status: StatusCode, body: String) -> Result<String, InferenceError> {
    if status.is_success() {
        if body.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        return Ok(body);
    }

    let detail = if body.trim().is_empty() {
        EMPTY_BODY_PLACEHOLDER.to_string()
    } else {
        body
    };

    if status.is_client_error() {
        Err(InferenceError::RequestRejected(format!("{} - {}", status, detail)))
    } else {
        Err(InferenceError::Unavailable(format!("{} - {}", status, detail)))
    }
}

/// The service answers with a JSON string; fall back to the raw text
fn decode_answer(body: String) -> String {
    serde_json::from_str::<String>(&body).unwrap_or(body)
}

#[async_trait]
impl InferenceProvider for InferenceService {
    async fn ask(
        &self,
        product_id: ProductId,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<String, InferenceError> {
        InferenceService::ask(self, product_id, question, history).await
    }

    async fn index_document(
        &self,
        product_id: ProductId,
        file_url: &str,
    ) -> Result<IndexResponse, InferenceError> {
        InferenceService::index_document(self, product_id, file_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_for(server: &MockServer) -> InferenceService {
        InferenceService::with_timeout(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_ask_sends_question_and_full_history() {
        let server = MockServer::start().await;
        let history = vec![ChatTurn::user("How do I reset this?")];

        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(json!({
                "productId": 42,
                "question": "How do I reset this?",
                "history": [{"role": "user", "content": "How do I reset this?"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"Hold the button.\""))
            .expect(1)
            .mount(&server)
            .await;

        let answer = service_for(&server)
            .await
            .ask(42, "How do I reset this?", &history)
            .await
            .unwrap();

        assert_eq!(answer, "Hold the button.");
    }

    #[tokio::test]
    async fn test_plain_text_answer_is_kept_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Unplug it first."))
            .mount(&server)
            .await;

        let answer = service_for(&server).await.ask(1, "q", &[]).await.unwrap();
        assert_eq!(answer, "Unplug it first.");
    }

    #[tokio::test]
    async fn test_empty_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = service_for(&server).await.ask(1, "q", &[]).await.unwrap_err();
        assert!(matches!(err, InferenceError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_empty_json_string_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"\""))
            .mount(&server)
            .await;

        let err = service_for(&server).await.ask(1, "q", &[]).await.unwrap_err();
        assert!(matches!(err, InferenceError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_client_error_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(422).set_body_string("productId missing"))
            .mount(&server)
            .await;

        let err = service_for(&server).await.ask(1, "q", &[]).await.unwrap_err();
        match err {
            InferenceError::RequestRejected(detail) => assert!(detail.contains("productId missing")),
            other => panic!("expected RequestRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_without_body_uses_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = service_for(&server).await.ask(1, "q", &[]).await.unwrap_err();
        match err {
            InferenceError::Unavailable(detail) => assert!(detail.contains(EMPTY_BODY_PLACEHOLDER)),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let service = InferenceService::with_timeout(&server.uri(), Duration::from_millis(100)).unwrap();
        let err = service.ask(1, "q", &[]).await.unwrap_err();
        assert!(matches!(err, InferenceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Nothing listens on port 9 (discard) in the test environment
        let service =
            InferenceService::with_timeout("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = service.ask(1, "q", &[]).await.unwrap_err();
        assert!(matches!(err, InferenceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_index_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(body_json(json!({
                "productId": 42,
                "fileUrl": "https://files.example.com/manual.pdf"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "PDF uploaded successfully",
                "pdf_id": 42,
                "store_path": "/stores/42"
            })))
            .mount(&server)
            .await;

        let response = service_for(&server)
            .await
            .index_document(42, "https://files.example.com/manual.pdf")
            .await
            .unwrap();

        assert_eq!(response.pdf_id, Some(42));
        assert_eq!(response.store_path.as_deref(), Some("/stores/42"));
    }

    #[tokio::test]
    async fn test_index_document_shares_failure_classification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad url"))
            .mount(&server)
            .await;

        let err = service_for(&server)
            .await
            .index_document(42, "not-a-url")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::RequestRejected(_)));
    }
}
