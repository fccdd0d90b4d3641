
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::config::{EmbedderProvider, MemoryConfig};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const VOYAGE_API_URL: &str = "https://api.voyageai.com/v1";
const GOOGLE_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const AZURE_API_VERSION: &str = "2024-02-01";


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Missing setting for {provider} embeddings: {setting}")]
    MissingSetting { provider: &'static str, setting: &'static str },

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),
}


#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    input: &'a str,
}

#[derive(Serialize)]
struct VoyageEmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

// OpenAI, Azure and Voyage share this response shape.
#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GoogleEmbeddingRequest<'a> {
    content: GoogleContent<'a>,
}

#[derive(Serialize)]
struct GoogleContent<'a> {
    parts: [GooglePart<'a>; 1],
}

#[derive(Serialize)]
struct GooglePart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GoogleEmbeddingResponse {
    embedding: GoogleEmbeddingValues,
}

#[derive(Deserialize)]
struct GoogleEmbeddingValues {
    values: Vec<f32>,
}


pub struct EmbeddingGenerator {
    provider: EmbedderProvider,
    model: String,
    api_key: Option<String>,
    base_url: Option<String>,
    expected_dimension: Option<u32>,
    client: Client,
}

impl EmbeddingGenerator {

    pub fn new(
        provider: EmbedderProvider,
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        let model = model.into();
        info!(
            "EmbeddingGenerator initialized: provider={}, model={}",
            provider.as_str(),
            model
        );

        Self {
            provider,
            model,
            api_key,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            expected_dimension: None,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }


    pub fn from_config(config: &MemoryConfig) -> Result<Self, EmbeddingError> {
        let provider = config
            .embedder()
            .ok_or_else(|| EmbeddingError::NotImplemented(config.embedder_provider.clone()))?;

        let (api_key, base_url) = match provider {
            EmbedderProvider::Openai => (config.openai_api_key.clone(), config.openai_base_url.clone()),
            EmbedderProvider::Voyage => (config.voyage_api_key.clone(), None),
            EmbedderProvider::AzureOpenai => (
                config.azure_openai_api_key.clone(),
                config.azure_openai_base_url.clone(),
            ),
            EmbedderProvider::Google => (config.google_api_key.clone(), None),
            EmbedderProvider::Ollama => (None, Some(config.ollama_base_url.clone())),
        };

        let mut generator = Self::new(
            provider,
            config.embedding_model(),
            api_key,
            base_url,
            config.timeout,
        );
        generator.expected_dimension = config.embedding_dimension();
        Ok(generator)
    }


    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }


    pub async fn generate(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        debug!(
            "Embedding {} chars via {}: {}...",
            text.chars().count(),
            self.provider.as_str(),
            crate::safe_truncate(text, 50)
        );

        let embedding = match self.provider {
            EmbedderProvider::Openai => self.generate_openai(text).await?,
            EmbedderProvider::AzureOpenai => self.generate_azure(text).await?,
            EmbedderProvider::Voyage => self.generate_voyage(text).await?,
            EmbedderProvider::Google => self.generate_google(text).await?,
            EmbedderProvider::Ollama => self.generate_ollama(text).await?,
        };

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding vector".to_string()));
        }
        if let Some(expected) = self.expected_dimension {
            if embedding.len() != expected as usize {
                warn!(
                    "Embedding dimension mismatch: expected {}, got {} (model={})",
                    expected,
                    embedding.len(),
                    self.model
                );
            }
        }

        Ok(embedding)
    }

    fn require_key(&self) -> Result<&str, EmbeddingError> {
        self.api_key.as_deref().ok_or(EmbeddingError::MissingSetting {
            provider: self.provider.as_str(),
            setting: "api key",
        })
    }

    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let base_url = self
            .base_url
            .as_deref()
            .unwrap_or(crate::core::config::DEFAULT_OLLAMA_URL);
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self.require_key()?;
        let api_url = self.base_url.as_deref().unwrap_or(OPENAI_API_URL);

        let request = OpenAIEmbeddingRequest {
            model: Some(&self.model),
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", api_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        first_embedding(response)
    }

    async fn generate_azure(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self.require_key()?;
        let base_url = self.base_url.as_deref().ok_or(EmbeddingError::MissingSetting {
            provider: self.provider.as_str(),
            setting: "AZURE_OPENAI_BASE_URL",
        })?;

        // The deployment name selects the model; the body carries only the input.
        let request = OpenAIEmbeddingRequest { model: None, input: text };

        let response = self
            .client
            .post(format!("{}/openai/deployments/{}/embeddings", base_url, self.model))
            .query(&[("api-version", AZURE_API_VERSION)])
            .header("api-key", api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        first_embedding(response)
    }

    async fn generate_voyage(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self.require_key()?;
        let api_url = self.base_url.as_deref().unwrap_or(VOYAGE_API_URL);

        let request = VoyageEmbeddingRequest {
            model: &self.model,
            input: [text],
        };

        let response = self
            .client
            .post(format!("{}/embeddings", api_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        first_embedding(response)
    }

    async fn generate_google(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self.require_key()?;
        let api_url = self.base_url.as_deref().unwrap_or(GOOGLE_API_URL);

        let request = GoogleEmbeddingRequest {
            content: GoogleContent {
                parts: [GooglePart { text }],
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}:embedContent", api_url, self.model))
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<GoogleEmbeddingResponse>()
            .await?;

        Ok(response.embedding.values)
    }


    pub fn model(&self) -> &str {
        &self.model
    }


    pub fn provider(&self) -> EmbedderProvider {
        self.provider
    }
}

fn first_embedding(response: OpenAIEmbeddingResponse) -> Result<Vec<f32>, EmbeddingError> {
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
}
