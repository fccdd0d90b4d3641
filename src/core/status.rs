

use serde::Serialize;

use super::config::MemoryConfig;


#[derive(Debug, Clone, Serialize)]
pub struct MemoryStatus {
    pub enabled: bool,
    pub available: bool,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub llm_provider: String,
    pub embedder_provider: String,
    pub reason: String,
    pub errors: Vec<String>,
}

impl MemoryStatus {

    pub fn from_config(config: &MemoryConfig) -> Self {
        let mut status = Self {
            enabled: config.enabled,
            available: false,
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
            llm_provider: config.llm_provider.clone(),
            embedder_provider: config.embedder_provider.clone(),
            reason: String::new(),
            errors: Vec::new(),
        };

        if !config.enabled {
            status.reason = "MEMORY_ENABLED not set to true".to_string();
            return status;
        }

        let errors = config.validation_errors();
        if let Some(first) = errors.first() {
            status.reason = first.clone();
            status.errors = errors;
            return status;
        }

        status.available = true;
        status.reason = "N/A".to_string();
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::env::Environment;

    #[test]
    fn test_disabled_status() {
        let status = MemoryStatus::from_config(&MemoryConfig::default());
        assert!(!status.available);
        assert!(!status.enabled);
        assert_eq!(status.reason, "MEMORY_ENABLED not set to true");
        assert!(status.errors.is_empty());
    }

    #[test]
    fn test_invalid_status_reports_first_error() {
        let config = MemoryConfig::from_env(&Environment::from_pairs([("MEMORY_ENABLED", "true")]));
        let status = MemoryStatus::from_config(&config);
        assert!(!status.available);
        assert_eq!(status.reason, "OpenAI LLM provider requires OPENAI_API_KEY");
        assert_eq!(status.errors.len(), 2);
    }

    #[test]
    fn test_available_status() {
        let config = MemoryConfig::from_env(&Environment::from_pairs([
            ("MEMORY_ENABLED", "true"),
            ("OPENAI_API_KEY", "sk-test"),
        ]));
        let status = MemoryStatus::from_config(&config);
        assert!(status.available);
        assert_eq!(status.reason, "N/A");

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["database"], "agent_memory");
    }
}
