

use thiserror::Error;

use crate::db::HelixClientError;
use crate::llm::embeddings::EmbeddingError;


#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HelixDB connection error: {0}")]
    Connection(String),

    #[error("Query execution error: {0}")]
    Query(String),

    #[error("Embedding generation error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Memory session is not initialized")]
    NotInitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<HelixClientError> for MemoryError {
    fn from(e: HelixClientError) -> Self {
        match e {
            HelixClientError::Connection(msg) => MemoryError::Connection(msg),
            HelixClientError::NotConnected => {
                MemoryError::Connection("client not connected".to_string())
            }
            other => MemoryError::Query(other.to_string()),
        }
    }
}


pub type Result<T> = std::result::Result<T, MemoryError>;
