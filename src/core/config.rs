

use std::str::FromStr;
use strum::{EnumString, IntoStaticStr};
use url::Url;

use super::env::Environment;

pub const DEFAULT_DATABASE: &str = "agent_memory";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LlmProvider {
    Openai,
    Anthropic,
    AzureOpenai,
    Ollama,
    Google,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EmbedderProvider {
    Openai,
    Voyage,
    AzureOpenai,
    Ollama,
    Google,
}

impl EmbedderProvider {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Environment variable holding the API key this provider needs, if any.
    pub fn credential_var(&self) -> Option<&'static str> {
        match self {
            EmbedderProvider::Openai => Some("OPENAI_API_KEY"),
            EmbedderProvider::Voyage => Some("VOYAGE_API_KEY"),
            EmbedderProvider::AzureOpenai => Some("AZURE_OPENAI_API_KEY"),
            EmbedderProvider::Google => Some("GOOGLE_API_KEY"),
            EmbedderProvider::Ollama => None,
        }
    }
}


#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub llm_provider: String,
    pub embedder_provider: String,

    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub database: String,
    pub timeout: u64,

    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_embedding_model: String,
    pub openai_base_url: Option<String>,

    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,

    pub azure_openai_api_key: Option<String>,
    pub azure_openai_base_url: Option<String>,
    pub azure_openai_llm_deployment: Option<String>,
    pub azure_openai_embedding_deployment: Option<String>,

    pub voyage_api_key: Option<String>,
    pub voyage_embedding_model: String,

    pub google_api_key: Option<String>,
    pub google_llm_model: String,
    pub google_embedding_model: String,

    pub ollama_base_url: String,
    pub ollama_llm_model: Option<String>,
    pub ollama_embedding_model: Option<String>,
    pub ollama_embedding_dim: Option<String>,

    // Values that were present but could not be parsed.
    parse_errors: Vec<String>,
}

impl MemoryConfig {

    pub fn new(host: &str, port: u16) -> Self {
        Self {
            enabled: false,
            llm_provider: "openai".to_string(),
            embedder_provider: "openai".to_string(),

            host: host.to_string(),
            port,
            api_key: None,
            database: DEFAULT_DATABASE.to_string(),
            timeout: 30,

            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_embedding_model: "text-embedding-3-small".to_string(),
            openai_base_url: None,

            anthropic_api_key: None,
            anthropic_model: "claude-sonnet-4-5".to_string(),

            azure_openai_api_key: None,
            azure_openai_base_url: None,
            azure_openai_llm_deployment: None,
            azure_openai_embedding_deployment: None,

            voyage_api_key: None,
            voyage_embedding_model: "voyage-3".to_string(),

            google_api_key: None,
            google_llm_model: "gemini-2.0-flash".to_string(),
            google_embedding_model: "text-embedding-004".to_string(),

            ollama_base_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_llm_model: None,
            ollama_embedding_model: None,
            ollama_embedding_dim: None,

            parse_errors: Vec::new(),
        }
    }


    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }


    pub fn from_env(env: &Environment) -> Self {
        let mut parse_errors = Vec::new();

        let port = match env.get("HELIX_PORT") {
            None => crate::DEFAULT_HELIX_PORT,
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    parse_errors.push(format!(
                        "HELIX_PORT must be a valid port number (got '{}')",
                        raw
                    ));
                    crate::DEFAULT_HELIX_PORT
                }
            },
        };

        let mut config = Self::new(&env.get_or("HELIX_HOST", "localhost"), port);
        config.enabled = env.flag("MEMORY_ENABLED");

        if let Some(provider) = env.non_empty("MEMORY_LLM_PROVIDER") {
            config.llm_provider = provider.to_lowercase();
        }
        if let Some(provider) = env.non_empty("MEMORY_EMBEDDER_PROVIDER") {
            config.embedder_provider = provider.to_lowercase();
        }
        config.api_key = env.non_empty("HELIX_API_KEY");
        if let Some(database) = env.get("HELIX_DATABASE") {
            config.database = database.to_string();
        }
        if let Some(raw) = env.get("HELIX_TIMEOUT") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = secs,
                _ => parse_errors.push(format!(
                    "HELIX_TIMEOUT must be a positive number of seconds (got '{}')",
                    raw
                )),
            }
        }

        config.openai_api_key = env.non_empty("OPENAI_API_KEY");
        if let Some(model) = env.non_empty("OPENAI_MODEL") {
            config.openai_model = model;
        }
        if let Some(model) = env.non_empty("OPENAI_EMBEDDING_MODEL") {
            config.openai_embedding_model = model;
        }
        config.openai_base_url = env.non_empty("OPENAI_BASE_URL");

        config.anthropic_api_key = env.non_empty("ANTHROPIC_API_KEY");
        if let Some(model) = env.non_empty("ANTHROPIC_MODEL") {
            config.anthropic_model = model;
        }

        config.azure_openai_api_key = env.non_empty("AZURE_OPENAI_API_KEY");
        config.azure_openai_base_url = env.non_empty("AZURE_OPENAI_BASE_URL");
        config.azure_openai_llm_deployment = env.non_empty("AZURE_OPENAI_LLM_DEPLOYMENT");
        config.azure_openai_embedding_deployment =
            env.non_empty("AZURE_OPENAI_EMBEDDING_DEPLOYMENT");

        config.voyage_api_key = env.non_empty("VOYAGE_API_KEY");
        if let Some(model) = env.non_empty("VOYAGE_EMBEDDING_MODEL") {
            config.voyage_embedding_model = model;
        }

        config.google_api_key = env.non_empty("GOOGLE_API_KEY");
        if let Some(model) = env.non_empty("GOOGLE_LLM_MODEL") {
            config.google_llm_model = model;
        }
        if let Some(model) = env.non_empty("GOOGLE_EMBEDDING_MODEL") {
            config.google_embedding_model = model;
        }

        if let Some(url) = env.non_empty("OLLAMA_BASE_URL") {
            config.ollama_base_url = url;
        }
        config.ollama_llm_model = env.non_empty("OLLAMA_LLM_MODEL");
        config.ollama_embedding_model = env.non_empty("OLLAMA_EMBEDDING_MODEL");
        config.ollama_embedding_dim = env.non_empty("OLLAMA_EMBEDDING_DIM");

        config.parse_errors = parse_errors;
        config
    }


    pub fn llm(&self) -> Option<LlmProvider> {
        LlmProvider::from_str(&self.llm_provider).ok()
    }


    pub fn embedder(&self) -> Option<EmbedderProvider> {
        EmbedderProvider::from_str(&self.embedder_provider).ok()
    }


    pub fn embedder_credential_var(&self) -> Option<&'static str> {
        self.embedder().and_then(|p| p.credential_var())
    }

    /// Every reason this configuration cannot be used, in a stable order.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = self.parse_errors.clone();

        if !self.enabled {
            errors.push("MEMORY_ENABLED must be set to true".to_string());
        }
        if self.host.trim().is_empty() {
            errors.push("HELIX_HOST must not be empty".to_string());
        }
        if self.database.trim().is_empty() {
            errors.push("HELIX_DATABASE must not be empty".to_string());
        }

        match self.llm() {
            Some(LlmProvider::Openai) => {
                require(&mut errors, &self.openai_api_key, "OpenAI LLM provider requires OPENAI_API_KEY");
            }
            Some(LlmProvider::Anthropic) => {
                require(&mut errors, &self.anthropic_api_key, "Anthropic LLM provider requires ANTHROPIC_API_KEY");
            }
            Some(LlmProvider::AzureOpenai) => {
                require(&mut errors, &self.azure_openai_api_key, "Azure OpenAI LLM provider requires AZURE_OPENAI_API_KEY");
                require(&mut errors, &self.azure_openai_base_url, "Azure OpenAI LLM provider requires AZURE_OPENAI_BASE_URL");
                require(&mut errors, &self.azure_openai_llm_deployment, "Azure OpenAI LLM provider requires AZURE_OPENAI_LLM_DEPLOYMENT");
            }
            Some(LlmProvider::Ollama) => {
                require(&mut errors, &self.ollama_llm_model, "Ollama LLM provider requires OLLAMA_LLM_MODEL");
            }
            Some(LlmProvider::Google) => {
                require(&mut errors, &self.google_api_key, "Google LLM provider requires GOOGLE_API_KEY");
            }
            None => errors.push(format!("Unknown LLM provider: {}", self.llm_provider)),
        }

        match self.embedder() {
            Some(EmbedderProvider::Openai) => {
                require(&mut errors, &self.openai_api_key, "OpenAI embedder provider requires OPENAI_API_KEY");
            }
            Some(EmbedderProvider::Voyage) => {
                require(&mut errors, &self.voyage_api_key, "Voyage embedder provider requires VOYAGE_API_KEY");
            }
            Some(EmbedderProvider::AzureOpenai) => {
                require(&mut errors, &self.azure_openai_api_key, "Azure OpenAI embedder provider requires AZURE_OPENAI_API_KEY");
                require(&mut errors, &self.azure_openai_base_url, "Azure OpenAI embedder provider requires AZURE_OPENAI_BASE_URL");
                require(&mut errors, &self.azure_openai_embedding_deployment, "Azure OpenAI embedder provider requires AZURE_OPENAI_EMBEDDING_DEPLOYMENT");
            }
            Some(EmbedderProvider::Ollama) => {
                require(&mut errors, &self.ollama_embedding_model, "Ollama embedder provider requires OLLAMA_EMBEDDING_MODEL");
                match &self.ollama_embedding_dim {
                    None => errors.push("Ollama embedder provider requires OLLAMA_EMBEDDING_DIM".to_string()),
                    Some(raw) if self.ollama_dimension().is_none() => errors.push(format!(
                        "OLLAMA_EMBEDDING_DIM must be a positive integer (got '{}')",
                        raw
                    )),
                    Some(_) => {}
                }
            }
            Some(EmbedderProvider::Google) => {
                require(&mut errors, &self.google_api_key, "Google embedder provider requires GOOGLE_API_KEY");
            }
            None => errors.push(format!("Unknown embedder provider: {}", self.embedder_provider)),
        }

        let uses_ollama = self.llm() == Some(LlmProvider::Ollama)
            || self.embedder() == Some(EmbedderProvider::Ollama);
        if uses_ollama {
            check_url(&mut errors, "OLLAMA_BASE_URL", Some(&self.ollama_base_url));
        }
        check_url(&mut errors, "AZURE_OPENAI_BASE_URL", self.azure_openai_base_url.as_ref());
        check_url(&mut errors, "OPENAI_BASE_URL", self.openai_base_url.as_ref());

        errors
    }


    pub fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }


    pub fn embedding_model(&self) -> String {
        match self.embedder() {
            Some(EmbedderProvider::Openai) | None => self.openai_embedding_model.clone(),
            Some(EmbedderProvider::Voyage) => self.voyage_embedding_model.clone(),
            Some(EmbedderProvider::AzureOpenai) => self
                .azure_openai_embedding_deployment
                .clone()
                .unwrap_or_default(),
            Some(EmbedderProvider::Ollama) => self.ollama_embedding_model.clone().unwrap_or_default(),
            Some(EmbedderProvider::Google) => self.google_embedding_model.clone(),
        }
    }


    pub fn embedding_dimension(&self) -> Option<u32> {
        match self.embedder()? {
            EmbedderProvider::Openai => match self.openai_embedding_model.as_str() {
                "text-embedding-3-large" => Some(3072),
                _ => Some(1536),
            },
            EmbedderProvider::Voyage => match self.voyage_embedding_model.as_str() {
                "voyage-3-lite" => Some(512),
                _ => Some(1024),
            },
            EmbedderProvider::AzureOpenai => Some(1536),
            EmbedderProvider::Google => Some(768),
            EmbedderProvider::Ollama => self.ollama_dimension(),
        }
    }

    /// Identifies the embedding space; vectors from different signatures don't mix.
    pub fn provider_signature(&self) -> String {
        format!(
            "{}_{}_{}",
            self.embedder_provider,
            self.embedding_model(),
            self.embedding_dimension().unwrap_or(0)
        )
    }

    fn ollama_dimension(&self) -> Option<u32> {
        self.ollama_embedding_dim
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|dim| *dim > 0)
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new("localhost", crate::DEFAULT_HELIX_PORT)
    }
}

fn require(errors: &mut Vec<String>, value: &Option<String>, message: &str) {
    if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
        errors.push(message.to_string());
    }
}

fn check_url(errors: &mut Vec<String>, var: &str, value: Option<&String>) {
    if let Some(raw) = value {
        if Url::parse(raw).is_err() {
            errors.push(format!("{} is not a valid URL: {}", var, raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_env<'a>(extra: &[(&'a str, &'a str)]) -> Environment {
        let mut pairs = vec![("MEMORY_ENABLED", "true"), ("OPENAI_API_KEY", "sk-test")];
        pairs.extend_from_slice(extra);
        Environment::from_pairs(pairs)
    }

    #[test]
    fn test_defaults() {
        let config = MemoryConfig::from_env(&Environment::default());
        assert!(!config.enabled);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6969);
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert_eq!(config.llm_provider, "openai");
        assert_eq!(config.embedder_provider, "openai");
        assert_eq!(config.base_url(), "http://localhost:6969");
    }

    #[test]
    fn test_openai_setup_is_valid() {
        let config = MemoryConfig::from_env(&openai_env(&[
            ("HELIX_HOST", "graph.local"),
            ("HELIX_PORT", "7000"),
            ("HELIX_DATABASE", "team_memory"),
        ]));
        assert!(config.is_valid(), "{:?}", config.validation_errors());
        assert_eq!(config.host, "graph.local");
        assert_eq!(config.port, 7000);
        assert_eq!(config.database, "team_memory");
    }

    #[test]
    fn test_disabled_config_lists_every_error() {
        let config = MemoryConfig::from_env(&Environment::default());
        let errors = config.validation_errors();
        assert_eq!(
            errors,
            vec![
                "MEMORY_ENABLED must be set to true".to_string(),
                "OpenAI LLM provider requires OPENAI_API_KEY".to_string(),
                "OpenAI embedder provider requires OPENAI_API_KEY".to_string(),
            ]
        );
        assert!(!config.is_valid());
    }

    #[test]
    fn test_bad_port_is_reported_not_defaulted_silently() {
        let config = MemoryConfig::from_env(&openai_env(&[("HELIX_PORT", "not-a-port")]));
        assert_eq!(config.port, 6969);
        assert!(config
            .validation_errors()
            .contains(&"HELIX_PORT must be a valid port number (got 'not-a-port')".to_string()));
    }

    #[test]
    fn test_empty_connection_parameters() {
        let config = MemoryConfig::from_env(&openai_env(&[("HELIX_HOST", ""), ("HELIX_DATABASE", " ")]));
        let errors = config.validation_errors();
        assert!(errors.contains(&"HELIX_HOST must not be empty".to_string()));
        assert!(errors.contains(&"HELIX_DATABASE must not be empty".to_string()));
    }

    #[test]
    fn test_azure_requires_all_settings() {
        let config = MemoryConfig::from_env(&Environment::from_pairs([
            ("MEMORY_ENABLED", "1"),
            ("MEMORY_LLM_PROVIDER", "azure_openai"),
            ("MEMORY_EMBEDDER_PROVIDER", "AZURE_OPENAI"),
            ("AZURE_OPENAI_API_KEY", "key"),
        ]));
        let errors = config.validation_errors();
        assert_eq!(
            errors,
            vec![
                "Azure OpenAI LLM provider requires AZURE_OPENAI_BASE_URL".to_string(),
                "Azure OpenAI LLM provider requires AZURE_OPENAI_LLM_DEPLOYMENT".to_string(),
                "Azure OpenAI embedder provider requires AZURE_OPENAI_BASE_URL".to_string(),
                "Azure OpenAI embedder provider requires AZURE_OPENAI_EMBEDDING_DEPLOYMENT".to_string(),
            ]
        );
    }

    #[test]
    fn test_ollama_requires_model_and_dimension() {
        let config = MemoryConfig::from_env(&Environment::from_pairs([
            ("MEMORY_ENABLED", "true"),
            ("MEMORY_LLM_PROVIDER", "ollama"),
            ("MEMORY_EMBEDDER_PROVIDER", "ollama"),
            ("OLLAMA_LLM_MODEL", "llama3.2"),
            ("OLLAMA_EMBEDDING_DIM", "zero"),
        ]));
        let errors = config.validation_errors();
        assert_eq!(
            errors,
            vec![
                "Ollama embedder provider requires OLLAMA_EMBEDDING_MODEL".to_string(),
                "OLLAMA_EMBEDDING_DIM must be a positive integer (got 'zero')".to_string(),
            ]
        );
        assert_eq!(config.embedder_credential_var(), None);
    }

    #[test]
    fn test_ollama_fully_configured() {
        let config = MemoryConfig::from_env(&Environment::from_pairs([
            ("MEMORY_ENABLED", "true"),
            ("MEMORY_LLM_PROVIDER", "ollama"),
            ("MEMORY_EMBEDDER_PROVIDER", "ollama"),
            ("OLLAMA_LLM_MODEL", "llama3.2"),
            ("OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
            ("OLLAMA_EMBEDDING_DIM", "768"),
        ]));
        assert!(config.is_valid(), "{:?}", config.validation_errors());
        assert_eq!(config.embedding_dimension(), Some(768));
        assert_eq!(config.provider_signature(), "ollama_nomic-embed-text_768");
    }

    #[test]
    fn test_unknown_providers() {
        let config = MemoryConfig::from_env(&Environment::from_pairs([
            ("MEMORY_ENABLED", "true"),
            ("MEMORY_LLM_PROVIDER", "mystery"),
            ("MEMORY_EMBEDDER_PROVIDER", "nowhere"),
        ]));
        let errors = config.validation_errors();
        assert!(errors.contains(&"Unknown LLM provider: mystery".to_string()));
        assert!(errors.contains(&"Unknown embedder provider: nowhere".to_string()));
        assert_eq!(config.embedder_credential_var(), None);
    }

    #[test]
    fn test_invalid_base_url() {
        let config = MemoryConfig::from_env(&openai_env(&[("OPENAI_BASE_URL", "not a url")]));
        assert_eq!(
            config.validation_errors(),
            vec!["OPENAI_BASE_URL is not a valid URL: not a url".to_string()]
        );
    }

    #[test]
    fn test_embedding_dimensions() {
        let mut config = MemoryConfig::default();
        assert_eq!(config.embedding_dimension(), Some(1536));
        config.openai_embedding_model = "text-embedding-3-large".to_string();
        assert_eq!(config.embedding_dimension(), Some(3072));

        config.embedder_provider = "voyage".to_string();
        assert_eq!(config.embedding_dimension(), Some(1024));
        config.voyage_embedding_model = "voyage-3-lite".to_string();
        assert_eq!(config.embedding_dimension(), Some(512));
        assert_eq!(config.embedder_credential_var(), Some("VOYAGE_API_KEY"));

        config.embedder_provider = "google".to_string();
        assert_eq!(config.embedding_dimension(), Some(768));
        assert_eq!(config.provider_signature(), "google_text-embedding-004_768");
    }
}
