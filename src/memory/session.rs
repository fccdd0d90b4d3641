
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::MemoryState;
use super::{EpisodeType, GroupIdMode, SessionInsights};
use crate::core::config::MemoryConfig;
use crate::core::error::{MemoryError, Result};
use crate::db::{GraphHandle, HelixClient, HelixClientError};
use crate::llm::embeddings::EmbeddingGenerator;

/// A connection-scoped handle on the memory store.
///
/// Writes return `Ok(true)` when stored, `Ok(false)` when the session refused
/// the write (not initialized), and `Err` for store or embedding failures.
#[async_trait]
pub trait MemorySession: Send {
    fn group_id(&self) -> String;

    fn config(&self) -> &MemoryConfig;

    async fn initialize(&mut self) -> bool;

    /// Why the last `initialize` returned `false`, if known.
    fn initialization_error(&self) -> Option<String> {
        None
    }

    async fn save_session_insights(
        &mut self,
        session_num: u32,
        insights: &SessionInsights,
    ) -> Result<bool>;

    async fn save_pattern(&mut self, pattern: &str) -> Result<bool>;

    async fn save_gotcha(&mut self, gotcha: &str) -> Result<bool>;

    async fn save_codebase_discoveries(
        &mut self,
        discoveries: &BTreeMap<String, String>,
    ) -> Result<bool>;

    async fn close(&mut self);
}


pub fn group_id_for(mode: GroupIdMode, spec_dir: &Path, project_dir: &Path) -> String {
    match mode {
        GroupIdMode::Spec => dir_name(spec_dir),
        GroupIdMode::Project => {
            let absolute = std::path::absolute(project_dir).unwrap_or_else(|_| project_dir.to_path_buf());
            let digest = Sha256::digest(absolute.to_string_lossy().as_bytes());
            let hash = format!("{:x}", digest);
            format!("project_{}_{}", dir_name(project_dir), &hash[..8])
        }
    }
}

fn dir_name(path: &Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().into_owned();
    }
    // `.` and friends have no file name until resolved.
    std::path::absolute(path)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}


#[derive(Serialize)]
struct AddEpisodeInput {
    episode_id: String,
    graph: String,
    group_id: String,
    name: String,
    episode_type: String,
    content: String,
    source_description: String,
    reference_time: String,
    created_at: String,
}

#[derive(Deserialize)]
struct AddEpisodeOutput {
    episode: EpisodeNode,
}

#[derive(Deserialize)]
struct EpisodeNode {
    id: String,
}

#[derive(Serialize)]
struct DeleteEpisodeInput {
    episode_id: String,
}

#[derive(Serialize)]
struct AddEpisodeEmbeddingInput {
    episode_id: String,
    vector_data: Vec<f32>,
    embedding_model: String,
    created_at: String,
}


pub struct GraphMemory {
    config: MemoryConfig,
    spec_dir: PathBuf,
    project_dir: PathBuf,
    group_id_mode: GroupIdMode,
    client: Option<HelixClient>,
    graph: Option<GraphHandle>,
    embedder: Option<EmbeddingGenerator>,
    state: MemoryState,
    init_error: Option<String>,
}

impl GraphMemory {
    pub fn new(
        spec_dir: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
        group_id_mode: GroupIdMode,
        config: MemoryConfig,
    ) -> Self {
        Self {
            config,
            spec_dir: spec_dir.into(),
            project_dir: project_dir.into(),
            group_id_mode,
            client: None,
            graph: None,
            embedder: None,
            state: MemoryState::default(),
            init_error: None,
        }
    }


    pub fn spec_name(&self) -> String {
        dir_name(&self.spec_dir)
    }


    pub fn is_initialized(&self) -> bool {
        self.client.is_some() && self.graph.is_some() && self.embedder.is_some()
    }


    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    async fn connect(&mut self) -> Result<()> {
        self.state = MemoryState::load(&self.spec_dir).unwrap_or_default();

        let mut client = HelixClient::from_config(&self.config)?;
        let graph = client.connect(&self.config.database).await?;
        let embedder = EmbeddingGenerator::from_config(&self.config)?;

        if self.state.provider_changed(&self.config) {
            warn!(
                "Embedding provider changed ({} -> {}); episodes embedded before the change will not match new ones",
                self.state.provider_signature.as_deref().unwrap_or_default(),
                self.config.provider_signature()
            );
        }
        self.state.mark_initialized(&self.config);
        self.persist_state();

        info!(
            "Memory session ready: graph={}, group_id={}, embedder={}",
            graph.name(),
            self.group_id(),
            embedder.model()
        );

        self.client = Some(client);
        self.graph = Some(graph);
        self.embedder = Some(embedder);
        Ok(())
    }

    async fn add_episode(
        &self,
        episode_type: EpisodeType,
        name: String,
        body: serde_json::Value,
        source_description: String,
    ) -> Result<String> {
        let (Some(client), Some(graph), Some(embedder)) = (&self.client, &self.graph, &self.embedder) else {
            return Err(MemoryError::NotInitialized);
        };

        let episode_id = format!("ep_{}", Uuid::new_v4().to_string().chars().take(12).collect::<String>());
        let now = Utc::now().to_rfc3339();
        let content = serde_json::to_string(&body)?;

        let vector = embedder.generate(&content).await?;

        let input = AddEpisodeInput {
            episode_id: episode_id.clone(),
            graph: graph.name().to_string(),
            group_id: self.group_id(),
            name,
            episode_type: episode_type.as_str().to_string(),
            content,
            source_description,
            reference_time: now.clone(),
            created_at: now.clone(),
        };

        let result: AddEpisodeOutput = client.execute_query("addEpisode", &input).await?;
        let internal_id = result.episode.id;
        if internal_id.is_empty() {
            return Err(MemoryError::Query(
                "addEpisode returned no internal id".to_string(),
            ));
        }

        debug!("Episode created: {} (internal: {})", episode_id, internal_id);

        let embed_input = AddEpisodeEmbeddingInput {
            episode_id: internal_id,
            vector_data: vector,
            embedding_model: embedder.model().to_string(),
            created_at: now,
        };
        let stored = client
            .execute_query::<serde_json::Value, _>("addEpisodeEmbedding", &embed_input)
            .await;
        if let Err(e) = stored {
            return Err(discard_episode(client, &episode_id, embed_input.episode_id, e).await);
        }

        Ok(episode_id)
    }

    async fn write_episode(
        &mut self,
        episode_type: EpisodeType,
        name: String,
        body: serde_json::Value,
        source_description: String,
    ) -> Result<bool> {
        if !self.is_initialized() {
            warn!("Skipping {} write: memory session not initialized", episode_type.as_str());
            return Ok(false);
        }

        match self.add_episode(episode_type, name, body, source_description).await {
            Ok(episode_id) => {
                self.state.episode_count += 1;
                self.persist_state();
                info!("Saved {} episode {}", episode_type.as_str(), episode_id);
                Ok(true)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    fn record_failure(&mut self, error: &MemoryError) {
        self.state.record_error(error.to_string());
        self.persist_state();
    }

    fn persist_state(&self) {
        if let Err(e) = self.state.save(&self.spec_dir) {
            warn!("Failed to save memory state in {}: {}", self.spec_dir.display(), e);
        }
    }
}

/// Removes an episode whose vector could not be stored, so no episode is left
/// without an embedding. Returns the error to report for the failed write.
async fn discard_episode(
    client: &HelixClient,
    episode_id: &str,
    internal_id: String,
    cause: HelixClientError,
) -> MemoryError {
    let input = DeleteEpisodeInput { episode_id: internal_id };
    match client
        .execute_query::<serde_json::Value, _>("deleteEpisode", &input)
        .await
    {
        Ok(_) => {
            warn!("Rolled back episode {} after its embedding write failed", episode_id);
            cause.into()
        }
        Err(cleanup) => {
            warn!("Episode {} left without a vector: {}", episode_id, cleanup);
            MemoryError::Query(format!(
                "episode {} (internal {}) stored without a vector: {}; rollback failed: {}",
                episode_id, input.episode_id, cause, cleanup
            ))
        }
    }
}

#[async_trait]
impl MemorySession for GraphMemory {
    fn group_id(&self) -> String {
        group_id_for(self.group_id_mode, &self.spec_dir, &self.project_dir)
    }

    fn config(&self) -> &MemoryConfig {
        &self.config
    }

    async fn initialize(&mut self) -> bool {
        if self.is_initialized() {
            return true;
        }

        self.init_error = None;

        let errors = self.config.validation_errors();
        if !errors.is_empty() {
            let e = MemoryError::Config(errors.join("; "));
            warn!("Memory configuration invalid: {}", e);
            self.init_error = Some(e.to_string());
            return false;
        }

        match self.connect().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to initialize memory session: {}", e);
                self.record_failure(&e);
                self.init_error = Some(e.to_string());
                false
            }
        }
    }

    fn initialization_error(&self) -> Option<String> {
        self.init_error.clone()
    }

    async fn save_session_insights(
        &mut self,
        session_num: u32,
        insights: &SessionInsights,
    ) -> Result<bool> {
        let spec = self.spec_name();
        let mut body = json!({
            "type": EpisodeType::SessionInsight.as_str(),
            "spec_id": spec,
            "session_number": session_num,
        });
        if let (Some(fields), serde_json::Value::Object(insight_fields)) =
            (body.as_object_mut(), serde_json::to_value(insights)?)
        {
            fields.extend(insight_fields);
        }

        let saved = self
            .write_episode(
                EpisodeType::SessionInsight,
                format!("session_{:03}_{}", session_num, spec),
                body,
                format!("Session {} insight for {}", session_num, spec),
            )
            .await?;
        if saved {
            self.state.last_session = Some(session_num);
            self.persist_state();
        }
        Ok(saved)
    }

    async fn save_pattern(&mut self, pattern: &str) -> Result<bool> {
        let spec = self.spec_name();
        let body = json!({
            "type": EpisodeType::Pattern.as_str(),
            "spec_id": spec,
            "pattern": pattern,
        });
        self.write_episode(
            EpisodeType::Pattern,
            format!("pattern_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            body,
            format!("Code pattern from {}", spec),
        )
        .await
    }

    async fn save_gotcha(&mut self, gotcha: &str) -> Result<bool> {
        let spec = self.spec_name();
        let body = json!({
            "type": EpisodeType::Gotcha.as_str(),
            "spec_id": spec,
            "gotcha": gotcha,
        });
        self.write_episode(
            EpisodeType::Gotcha,
            format!("gotcha_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            body,
            format!("Gotcha from {}", spec),
        )
        .await
    }

    async fn save_codebase_discoveries(
        &mut self,
        discoveries: &BTreeMap<String, String>,
    ) -> Result<bool> {
        if discoveries.is_empty() {
            return Ok(true);
        }

        let spec = self.spec_name();
        let body = json!({
            "type": EpisodeType::CodebaseDiscovery.as_str(),
            "spec_id": spec,
            "discovered_files": discoveries,
        });
        self.write_episode(
            EpisodeType::CodebaseDiscovery,
            format!("codebase_discovery_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            body,
            format!("Codebase discoveries from {} ({} files)", spec, discoveries.len()),
        )
        .await
    }

    async fn close(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.disconnect();
        }
        self.graph = None;
        self.embedder = None;
        debug!("Memory session closed for {}", self.spec_dir.display());
    }
}
