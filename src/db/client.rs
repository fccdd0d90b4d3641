

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use helix_rs::{HelixDB, HelixDBClient, HelixError};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::MemoryConfig;


const MAX_RETRIES: u32 = 3;

const INITIAL_RETRY_DELAY_MS: u64 = 100;

const MAX_RETRY_DELAY_MS: u64 = 10000;


#[derive(Debug, Error)]
pub enum HelixClientError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Helix error: {0}")]
    Helix(#[from] HelixError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Client not connected")]
    NotConnected,
    #[error("Retry exhausted after {0} attempts: {1}")]
    RetryExhausted(u32, String),
}

/// Graph namespace that every episode query is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphHandle {
    name: String,
}

impl GraphHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}


pub struct HelixClient {

    inner: HelixDB,

    is_connected: AtomicBool,

    base_url: String,

    graph: Option<GraphHandle>,
}

impl HelixClient {

    pub fn new(host: &str, port: u16, api_key: Option<&str>) -> Result<Self, HelixClientError> {
        if host.trim().is_empty() {
            return Err(HelixClientError::Connection("host must not be empty".to_string()));
        }

        let endpoint = format!("http://{}", host);
        let base_url = format!("http://{}:{}", host, port);

        let inner = <HelixDB as HelixDBClient>::new(Some(&endpoint), Some(port), api_key);

        debug!("HelixClient created for {} (auth={})", base_url, api_key.is_some());

        Ok(Self {
            inner,
            is_connected: AtomicBool::new(false),
            base_url,
            graph: None,
        })
    }


    pub fn from_config(config: &MemoryConfig) -> Result<Self, HelixClientError> {
        Self::new(&config.host, config.port, config.api_key.as_deref())
    }

    /// Opens the connection and selects `database`. Fails if the server is unreachable.
    pub async fn connect(&mut self, database: &str) -> Result<GraphHandle, HelixClientError> {
        let graph = self.select_graph(database)?;

        if !self.is_connected.load(Ordering::Relaxed) {
            self.health_check().await?;
            self.is_connected.store(true, Ordering::Relaxed);
            info!("HelixClient connected to {} (graph={})", self.base_url, graph.name());
        }

        Ok(graph)
    }


    pub fn select_graph(&mut self, name: &str) -> Result<GraphHandle, HelixClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HelixClientError::Connection("graph name must not be empty".to_string()));
        }
        let handle = GraphHandle::new(name);
        self.graph = Some(handle.clone());
        Ok(handle)
    }


    pub fn graph(&self) -> Option<&GraphHandle> {
        self.graph.as_ref()
    }


    pub async fn execute_query<T, P>(&self, query_name: &str, params: &P) -> Result<T, HelixClientError>
    where
        T: DeserializeOwned,
        P: Serialize + Sync,
    {
        if !self.is_connected.load(Ordering::Relaxed) {
            return Err(HelixClientError::NotConnected);
        }

        let mut last_error = None;
        let mut delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);

        for attempt in 1..=MAX_RETRIES {
            debug!("Executing query: {} (attempt {})", query_name, attempt);

            match self.inner.query::<P, T>(query_name, params).await {
                Ok(result) => {
                    debug!("Query {} succeeded", query_name);
                    return Ok(result);
                }
                Err(e) => {
                    let err_str = e.to_string();

                    if err_str.contains("not found") || err_str.contains("No value") {
                        debug!("Query {} returned not found", query_name);
                        return Err(HelixClientError::Query(err_str));
                    }

                    debug!("Query {} failed (attempt {}/{}): {}", query_name, attempt, MAX_RETRIES, e);
                    last_error = Some(err_str);

                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(Duration::from_millis(MAX_RETRY_DELAY_MS));
                    }
                }
            }
        }

        Err(HelixClientError::RetryExhausted(
            MAX_RETRIES,
            last_error.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }


    pub async fn health_check(&self) -> Result<(), HelixClientError> {
        match self
            .inner
            .query::<serde_json::Value, serde_json::Value>("health", &serde_json::json!({}))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let err_str = e.to_string();
                let lowered = err_str.to_lowercase();
                // A server without a `health` query still answered.
                if lowered.contains("404")
                    || lowered.contains("not found")
                    || lowered.contains("couldn't find")
                {
                    info!("Health check passed (server alive, no health query)");
                    Ok(())
                } else {
                    Err(HelixClientError::Connection(err_str))
                }
            }
        }
    }


    pub fn disconnect(&mut self) {
        if self.is_connected.swap(false, Ordering::Relaxed) {
            info!("HelixClient disconnected from {}", self.base_url);
        }
        self.graph = None;
    }


    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Relaxed)
    }


    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
