
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::config::MemoryConfig;
use crate::core::error::Result;

pub const STATE_FILE: &str = ".memory_state.json";

const MAX_ERROR_LOG: usize = 10;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: String,
    pub error: String,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryState {
    pub initialized: bool,
    pub database: Option<String>,
    pub created_at: Option<String>,
    pub last_session: Option<u32>,
    pub episode_count: u64,
    pub error_log: Vec<ErrorEntry>,
    pub llm_provider: Option<String>,
    pub embedder_provider: Option<String>,
    pub provider_signature: Option<String>,
}

impl MemoryState {

    pub fn path(spec_dir: &Path) -> PathBuf {
        spec_dir.join(STATE_FILE)
    }

    /// Missing and unreadable state files both yield `None`.
    pub fn load(spec_dir: &Path) -> Option<Self> {
        let path = Self::path(spec_dir);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No memory state at {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring corrupt memory state {}: {}", path.display(), e);
                None
            }
        }
    }


    pub fn save(&self, spec_dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(spec_dir), json)?;
        Ok(())
    }


    pub fn record_error(&mut self, error: impl Into<String>) {
        self.error_log.push(ErrorEntry {
            timestamp: Utc::now().to_rfc3339(),
            error: error.into(),
        });
        if self.error_log.len() > MAX_ERROR_LOG {
            let excess = self.error_log.len() - MAX_ERROR_LOG;
            self.error_log.drain(..excess);
        }
    }


    pub fn provider_changed(&self, config: &MemoryConfig) -> bool {
        self.provider_signature
            .as_deref()
            .is_some_and(|stored| stored != config.provider_signature())
    }


    pub fn mark_initialized(&mut self, config: &MemoryConfig) {
        if !self.initialized {
            self.initialized = true;
            self.created_at = Some(Utc::now().to_rfc3339());
        }
        self.database = Some(config.database.clone());
        self.llm_provider = Some(config.llm_provider.clone());
        self.embedder_provider = Some(config.embedder_provider.clone());
        self.provider_signature = Some(config.provider_signature());
    }
}
