//! Gemini providers via the Google Generative Language API
//!
//! Alternate backend. Always runs on the service's own Gemini credential.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::llm::LlmProvider;
use crate::types::{Role, Turn};

/// Authenticated HTTP client shared by the chat and embedding handles
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    /// Build a client for the service credential
    pub fn new(config: &GeminiConfig, api_key: &SecretString) -> Result<Self> {
        let key = api_key.expose_secret().trim();
        if key.is_empty() {
            return Err(Error::backend_init("Gemini API key is empty"));
        }

        let mut key_header = HeaderValue::from_str(key)
            .map_err(|e| Error::backend_init(format!("Invalid Gemini API key: {}", e)))?;
        key_header.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", key_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::backend_init(format!("Failed to build Gemini client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the API endpoint URL for a model method
    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }
}

#[derive(serde::Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(serde::Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(serde::Serialize)]
struct Part {
    text: String,
}

#[derive(serde::Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(serde::Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(serde::Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(serde::Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(serde::Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(serde::Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(serde::Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(serde::Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

fn text_content(role: Option<&'static str>, text: String) -> Content {
    Content {
        role,
        parts: vec![Part { text }],
    }
}

/// Gemini generation handle (gemini-1.5-pro by default)
pub struct GeminiChat {
    client: Arc<GeminiClient>,
    model: String,
    max_output_tokens: u32,
}

impl GeminiChat {
    pub fn new(client: Arc<GeminiClient>, config: &GeminiConfig) -> Self {
        Self {
            client,
            model: config.chat_model.clone(),
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiChat {
    async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        history: &[Turn],
    ) -> Result<String> {
        // Multi-turn conversation: prior turns first, then the grounded question
        let mut contents = Vec::with_capacity(history.len() + 1);
        for turn in history {
            let role = match turn.role {
                Role::Human => "user",
                Role::Ai => "model",
            };
            contents.push(text_content(Some(role), turn.message.clone()));
        }
        contents.push(text_content(
            Some("user"),
            PromptBuilder::build_rag_prompt(question, context),
        ));

        let request = GenerateRequest {
            system_instruction: text_content(None, PromptBuilder::system_instruction().to_string()),
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
            },
            safety_settings: vec![SafetySetting {
                category: "HARM_CATEGORY_HARASSMENT",
                threshold: "BLOCK_LOW_AND_ABOVE",
            }],
        };

        tracing::debug!("Gemini generate request (model: {}, history: {})", self.model, history.len());

        let response = self
            .client
            .client
            .post(self.client.endpoint(&self.model, "generateContent"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!(
                "Gemini generation failed ({}): {}",
                status, body
            )));
        }

        let gen_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse Gemini response: {}", e)))?;

        // A blocked candidate comes back without content
        let text: String = gen_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::llm("No text in Gemini response"));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Gemini embedding handle (embedding-001 by default)
pub struct GeminiEmbedder {
    client: Arc<GeminiClient>,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(client: Arc<GeminiClient>, config: &GeminiConfig) -> Self {
        Self {
            client,
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("No embedding in Gemini response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model_ref = format!("models/{}", self.model);
        let mut all_embeddings = Vec::with_capacity(texts.len());

        // batchEmbedContents accepts up to 100 requests per call
        for chunk in texts.chunks(100) {
            let request = BatchEmbedRequest {
                requests: chunk
                    .iter()
                    .map(|t| EmbedRequest {
                        model: model_ref.clone(),
                        content: text_content(None, t.clone()),
                    })
                    .collect(),
            };

            let response = self
                .client
                .client
                .post(self.client.endpoint(&self.model, "batchEmbedContents"))
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Gemini embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::embedding(format!(
                    "Gemini embedding failed ({}): {}",
                    status, body
                )));
            }

            let embed_response: BatchEmbedResponse = response.json().await.map_err(|e| {
                Error::embedding(format!("Failed to parse Gemini embedding response: {}", e))
            })?;

            all_embeddings.extend(embed_response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
