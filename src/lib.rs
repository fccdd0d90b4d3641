

pub mod cli;
pub mod core;
pub mod db;
pub mod llm;
pub mod memory;
pub mod utils;

pub use utils::{safe_truncate, safe_truncate_ellipsis};


pub use core::config::MemoryConfig;
pub use core::env::Environment;
pub use core::error::{MemoryError, Result};
pub use core::status::MemoryStatus;
pub use db::{HelixClient, HelixClientError};
pub use llm::embeddings::EmbeddingGenerator;
pub use memory::{GraphMemory, MemoryKind, MemoryRecord, MemorySession};


pub const DEFAULT_HELIX_PORT: u16 = 6969;

/// Characters of content echoed back after an injection.
pub const CONTENT_PREVIEW_CHARS: usize = 80;
