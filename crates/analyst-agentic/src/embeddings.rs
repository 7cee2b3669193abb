//! Embeddings provider
//!
//! HTTP implementation of the resolver's [`EmbeddingProvider`] seam, for
//! deployments that enable the semantic match strategy.

use async_trait::async_trait;
use serde::Deserialize;

use analyst_resolver::matcher::MatchError;
use analyst_resolver::semantic::EmbeddingProvider;

const API_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Embeddings-endpoint client.
#[derive(Clone)]
pub struct OpenAiEmbeddings {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            client,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let response = self
            .client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": &self.model,
                "input": texts,
            }))
            .send()
            .await
            .map_err(|e| MatchError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MatchError::Embedding(format!(
                "embeddings API error {}: {}",
                status, body
            )));
        }

        #[derive(Deserialize)]
        struct Item {
            index: usize,
            embedding: Vec<f32>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            data: Vec<Item>,
        }

        let mut api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| MatchError::Embedding(e.to_string()))?;

        // Restore input order from the index field.
        api_response.data.sort_by_key(|item| item.index);
        Ok(api_response
            .data
            .into_iter()
            .map(|item| item.embedding)
            .collect())
    }
}
