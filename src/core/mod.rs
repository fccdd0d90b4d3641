

pub mod config;
pub mod env;
pub mod error;
pub mod status;

pub use config::{EmbedderProvider, LlmProvider, MemoryConfig};
pub use env::Environment;
pub use error::{MemoryError, Result};
pub use status::MemoryStatus;
