//! OpenAI providers for chat completions and embeddings
//!
//! Primary backend. Used with either the caller's own key or the service default key.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

use crate::config::OpenAiConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::llm::LlmProvider;
use crate::types::{Role, Turn};

/// Authenticated HTTP client shared by the chat and embedding handles
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    /// Build a client for `api_key`
    ///
    /// Fails with `Error::BackendInit` when the key is blank or not a valid
    /// header value, or when the HTTP client cannot be built.
    pub fn new(config: &OpenAiConfig, api_key: &SecretString) -> Result<Self> {
        let key = api_key.expose_secret().trim();
        if key.is_empty() {
            return Err(Error::backend_init("OpenAI API key is empty"));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|e| Error::backend_init(format!("Invalid OpenAI API key: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::backend_init(format!("Failed to build OpenAI client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[derive(serde::Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(serde::Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(serde::Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(serde::Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(serde::Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

/// Chat completion handle (gpt-4o by default)
pub struct OpenAiChat {
    client: Arc<OpenAiClient>,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(client: Arc<OpenAiClient>, config: &OpenAiConfig) -> Self {
        Self {
            client,
            model: config.chat_model.clone(),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        history: &[Turn],
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: PromptBuilder::system_instruction().to_string(),
        });
        for turn in history {
            messages.push(ChatMessage {
                role: match turn.role {
                    Role::Human => "user",
                    Role::Ai => "assistant",
                },
                content: turn.message.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: PromptBuilder::build_rag_prompt(question, context),
        });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        };

        tracing::debug!("OpenAI chat request (model: {}, history: {})", self.model, history.len());

        let response = self
            .client
            .client
            .post(self.client.url("chat/completions"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!(
                "OpenAI generation failed ({}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse OpenAI response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::llm("No text in OpenAI response"))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Embedding handle (text-embedding-ada-002 by default)
pub struct OpenAiEmbedder {
    client: Arc<OpenAiClient>,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(client: Arc<OpenAiClient>, config: &OpenAiConfig) -> Self {
        Self {
            client,
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("No embedding in OpenAI response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        // The embeddings endpoint accepts up to 2048 inputs per request
        for chunk in texts.chunks(2048) {
            let request = EmbedRequest {
                model: &self.model,
                input: chunk,
            };

            let response = self
                .client
                .client
                .post(self.client.url("embeddings"))
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::embedding(format!("OpenAI embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::embedding(format!(
                    "OpenAI embedding failed ({}): {}",
                    status, body
                )));
            }

            let mut embed_response: EmbedResponse = response.json().await.map_err(|e| {
                Error::embedding(format!("Failed to parse OpenAI embedding response: {}", e))
            })?;

            if embed_response.data.len() != chunk.len() {
                return Err(Error::embedding(format!(
                    "OpenAI returned {} embeddings for {} inputs",
                    embed_response.data.len(),
                    chunk.len()
                )));
            }

            embed_response.data.sort_by_key(|d| d.index);
            all_embeddings.extend(embed_response.data.into_iter().map(|d| d.embedding));
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> OpenAiConfig {
        OpenAiConfig {
            base_url: base_url.to_string(),
            ..OpenAiConfig::default()
        }
    }

    fn test_client(base_url: &str) -> Arc<OpenAiClient> {
        Arc::new(OpenAiClient::new(&test_config(base_url), &SecretString::from("sk-test")).unwrap())
    }

    #[test]
    fn test_blank_key_is_backend_init_error() {
        let result = OpenAiClient::new(&OpenAiConfig::default(), &SecretString::from("   "));
        assert!(matches!(result, Err(Error::BackendInit(_))));
    }

    #[test]
    fn test_malformed_key_is_backend_init_error() {
        let result = OpenAiClient::new(&OpenAiConfig::default(), &SecretString::from("sk-\nbad"));
        assert!(matches!(result, Err(Error::BackendInit(_))));
    }

    #[tokio::test]
    async fn test_chat_sends_history_and_returns_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4o" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "It is 42." } }]
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let chat = OpenAiChat::new(test_client(&server.uri()), &config);
        let history = vec![Turn::human("What is this?"), Turn::ai("A guide.")];

        let answer = chat
            .generate_answer("What is the answer?", "[1]\nThe answer is 42.", &history)
            .await
            .unwrap();
        assert_eq!(answer, "It is 42.");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_chat_error_status_is_llm_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let chat = OpenAiChat::new(test_client(&server.uri()), &config);
        let result = chat.generate_answer("q", "", &[]).await;

        assert!(matches!(result, Err(Error::Llm(msg)) if msg.contains("429")));
    }

    #[tokio::test]
    async fn test_embed_batch_orders_by_index() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let embedder = OpenAiEmbedder::new(test_client(&server.uri()), &config);
        let vectors = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(embedder.dimensions(), 1536);
    }
}
