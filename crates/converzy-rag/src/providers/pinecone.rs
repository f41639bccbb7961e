//! Pinecone vector store
//!
//! One namespace per document. Passage text travels as metadata so the
//! orchestrator can build prompts straight from query results.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::time::Duration;

use crate::chat::classifier::parse_dimension_mismatch;
use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::providers::vector_store::{VectorMatch, VectorRecord, VectorStoreProvider};

/// Upsert requests are limited to 2MB; 100 vectors keeps well under it
const UPSERT_BATCH_SIZE: usize = 100;

/// Pinecone index client
pub struct PineconeStore {
    client: reqwest::Client,
    host: String,
}

impl PineconeStore {
    /// Create a client for the configured index host
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(Error::Config(
                "vector_db.host is not set (PINECONE_INDEX_HOST)".to_string(),
            ));
        }
        let api_key = config
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::Config("vector_db.api_key is not set (PINECONE_API_KEY)".to_string())
            })?;

        let mut key_header = HeaderValue::from_str(&api_key)
            .map_err(|e| Error::Config(format!("Invalid Pinecone API key: {}", e)))?;
        key_header.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("Api-Key", key_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build Pinecone client: {}", e)))?;

        let host = config.host.trim().trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self { client, host })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path)
    }

    /// Turn a non-success response into an error, recognising dimension mismatches
    async fn error_from_response(operation: &str, response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Some((actual, expected)) = parse_dimension_mismatch(&body) {
            return Error::DimensionMismatch { actual, expected };
        }
        Error::vector_db(format!("Pinecone {} failed ({}): {}", operation, status, body))
    }
}

#[derive(serde::Serialize)]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(serde::Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(serde::Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Metadata {
    #[serde(default)]
    text: String,
    #[serde(default)]
    chunk_index: usize,
}

#[derive(serde::Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(serde::Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Metadata,
}

#[derive(serde::Deserialize)]
struct UpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    upserted_count: usize,
}

#[derive(serde::Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(serde::Deserialize)]
struct NamespaceStats {
    #[serde(rename = "vectorCount", default)]
    vector_count: u64,
}

#[async_trait]
impl VectorStoreProvider for PineconeStore {
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let request = QueryRequest {
            namespace,
            vector,
            top_k,
            include_metadata: true,
        };

        let response = self
            .client
            .post(self.url("query"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone query request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("query", response).await);
        }

        let query_response: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse Pinecone query response: {}", e)))?;

        Ok(query_response
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                text: m.metadata.map(|md| md.text).unwrap_or_default(),
            })
            .collect())
    }

    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        let mut upserted = 0;

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|r| UpsertVector {
                        id: &r.id,
                        values: &r.values,
                        metadata: Metadata {
                            text: r.text.clone(),
                            chunk_index: r.chunk_index,
                        },
                    })
                    .collect(),
                namespace,
            };

            let response = self
                .client
                .post(self.url("vectors/upsert"))
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::vector_db(format!("Pinecone upsert request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Self::error_from_response("upsert", response).await);
            }

            let upsert_response: UpsertResponse = response.json().await.map_err(|e| {
                Error::vector_db(format!("Failed to parse Pinecone upsert response: {}", e))
            })?;
            upserted += upsert_response.upserted_count;
        }

        tracing::debug!("Upserted {} vectors into namespace {}", upserted, namespace);
        Ok(upserted)
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        let response = self
            .client
            .post(self.url("describe_index_stats"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone stats request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("describe_index_stats", response).await);
        }

        let stats: IndexStats = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse Pinecone stats: {}", e)))?;

        Ok(stats
            .namespaces
            .get(namespace)
            .map(|ns| ns.vector_count > 0)
            .unwrap_or(false))
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_store(host: &str) -> PineconeStore {
        PineconeStore::new(&VectorDbConfig {
            host: host.to_string(),
            timeout_secs: 5,
            api_key: Some(SecretString::from("pc-test")),
        })
        .unwrap()
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let result = PineconeStore::new(&VectorDbConfig {
            host: "https://idx.svc.pinecone.io".to_string(),
            timeout_secs: 5,
            api_key: None,
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_query_reads_text_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/query"))
            .and(header("Api-Key", "pc-test"))
            .and(body_partial_json(serde_json::json!({ "namespace": "doc-1", "topK": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "matches": [
                    { "id": "v1", "score": 0.92, "metadata": { "text": "Refunds take 5 days.", "chunk_index": 3 } },
                    { "id": "v2", "score": 0.81 }
                ],
                "namespace": "doc-1"
            })))
            .mount(&server)
            .await;

        let matches = test_store(&server.uri()).query("doc-1", &[0.1, 0.2], 2).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, "Refunds take 5 days.");
        assert_eq!(matches[1].text, "");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_typed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 3,
                "message": "Vector dimension 768 does not match the dimension of the index 1536",
                "details": []
            })))
            .mount(&server)
            .await;

        let result = test_store(&server.uri()).query("doc-1", &[0.0; 768], 4).await;
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch { actual: 768, expected: 1536 })
        ));
    }

    #[tokio::test]
    async fn test_other_errors_are_vector_db() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let result = test_store(&server.uri()).query("doc-1", &[0.0], 4).await;
        assert!(matches!(result, Err(Error::VectorDb(_))));
    }

    #[tokio::test]
    async fn test_namespace_exists() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "namespaces": { "doc-1": { "vectorCount": 12 }, "doc-2": { "vectorCount": 0 } },
                "dimension": 1536,
                "totalVectorCount": 12
            })))
            .mount(&server)
            .await;

        let store = test_store(&server.uri());
        assert!(store.namespace_exists("doc-1").await.unwrap());
        assert!(!store.namespace_exists("doc-2").await.unwrap());
        assert!(!store.namespace_exists("doc-3").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_batches() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "upsertedCount": 100
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "upsertedCount": 20
            })))
            .mount(&server)
            .await;

        let records: Vec<VectorRecord> = (0..120)
            .map(|i| VectorRecord {
                id: format!("v{}", i),
                values: vec![0.5, 0.5],
                text: format!("passage {}", i),
                chunk_index: i,
            })
            .collect();

        let upserted = test_store(&server.uri()).upsert("doc-1", &records).await.unwrap();
        assert_eq!(upserted, 120);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
