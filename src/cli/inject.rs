
use std::error::Error as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use super::console::Console;
use crate::core::error::MemoryError;
use crate::memory::{MemoryKind, MemoryRecord, MemorySession};


#[derive(Debug, Error)]
pub enum InjectError {
    #[error("--spec-dir is required (unless using --test)")]
    MissingSpecDir,

    #[error("--content is required")]
    MissingContent,

    #[error("Spec directory {} does not exist", given.display())]
    SpecDirNotFound { given: PathBuf, resolved: PathBuf },

    #[error("{0} is not set and continuing without it was declined")]
    CredentialDeclined(String),

    #[error("Failed to initialize the memory session at {base_url}")]
    InitializationFailed {
        base_url: String,
        credential_var: Option<&'static str>,
        cause: Option<String>,
    },

    #[error("The memory store did not accept the {0}")]
    Rejected(MemoryKind),

    #[error("Error injecting memory: {0}")]
    Store(#[from] MemoryError),
}


#[derive(Debug, Clone, PartialEq)]
pub struct InjectRequest {
    pub spec_dir: PathBuf,
    pub content: String,
    pub kind: MemoryKind,
    pub file_path: Option<String>,
}

impl InjectRequest {
    pub fn record(&self) -> MemoryRecord {
        MemoryRecord::from_input(self.kind, &self.content, self.file_path.as_deref())
    }
}


pub fn resolve_spec_dir(spec_dir: &Path) -> Result<(), InjectError> {
    if spec_dir.exists() {
        return Ok(());
    }
    let resolved = std::path::absolute(spec_dir).unwrap_or_else(|_| spec_dir.to_path_buf());
    Err(InjectError::SpecDirNotFound {
        given: spec_dir.to_path_buf(),
        resolved,
    })
}

/// Sends `record` to exactly one write operation on the session.
pub async fn dispatch<S>(session: &mut S, record: &MemoryRecord) -> Result<(), InjectError>
where
    S: MemorySession + ?Sized,
{
    let stored = match record {
        MemoryRecord::Insight { session_num, insights } => {
            session.save_session_insights(*session_num, insights).await?
        }
        MemoryRecord::Pattern(pattern) => session.save_pattern(pattern).await?,
        MemoryRecord::Gotcha(gotcha) => session.save_gotcha(gotcha).await?,
        MemoryRecord::Discovery(files) => session.save_codebase_discoveries(files).await?,
    };

    if stored {
        Ok(())
    } else {
        Err(InjectError::Rejected(record.kind()))
    }
}

/// Initializes the session, writes one record, and always closes the session.
pub async fn inject<S, W>(
    session: &mut S,
    request: &InjectRequest,
    console: &mut Console<W>,
) -> Result<(), InjectError>
where
    S: MemorySession + ?Sized,
    W: Write,
{
    let outcome = initialize_and_dispatch(session, request, console).await;
    session.close().await;
    outcome
}

async fn initialize_and_dispatch<S, W>(
    session: &mut S,
    request: &InjectRequest,
    console: &mut Console<W>,
) -> Result<(), InjectError>
where
    S: MemorySession + ?Sized,
    W: Write,
{
    let config = session.config();
    let base_url = config.base_url();
    let credential_var = config.embedder_credential_var();

    console.line("Connecting to memory store...");
    console.line(format!("  - HelixDB: {}:{}", config.host, config.port));
    console.line(format!("  - Database: {}", config.database));
    console.line(format!("  - Group ID: {}", session.group_id()));
    console.blank();

    if !session.initialize().await {
        return Err(InjectError::InitializationFailed {
            base_url,
            credential_var,
            cause: session.initialization_error(),
        });
    }

    let record = request.record();
    console.line(match record.kind() {
        MemoryKind::Insight => "Adding session insight...",
        MemoryKind::Pattern => "Adding code pattern...",
        MemoryKind::Gotcha => "Adding gotcha...",
        MemoryKind::Discovery => "Adding codebase discovery...",
    });

    dispatch(session, &record).await?;
    info!("Injected {} memory into group {}", record.kind(), session.group_id());
    Ok(())
}


pub fn report_success<W: Write>(console: &mut Console<W>, request: &InjectRequest) {
    let spec_name = request
        .spec_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| request.spec_dir.display().to_string());

    console.blank();
    console.banner("✓ MEMORY INJECTED SUCCESSFULLY!");
    console.blank();
    console.line("Next steps:");
    console.line("  1. Open the memory UI");
    console.line("  2. Navigate to: Context > Memories tab");
    console.line("  3. You should see your injected memory in the 'Recent Memories' list");
    console.blank();
    console.line("Memory details:");
    console.line(format!("  - Type: {}", request.kind));
    console.line(format!("  - Content: {}", crate::utils::content_preview(&request.content)));
    console.line(format!("  - Spec: {}", spec_name));
    console.blank();
}


pub fn report_failure<W: Write>(console: &mut Console<W>, error: &InjectError) {
    match error {
        InjectError::MissingSpecDir => {
            console.line(format!("Error: {}", error));
            console.blank();
            console.line("Usage:");
            console.line("  memory-inject --test");
            console.line("  memory-inject --spec-dir .auto-claude/specs/001-task --content 'Memory content'");
            console.blank();
            console.line("Run 'memory-inject --help' for more examples");
        }
        InjectError::MissingContent => {
            console.line(format!("Error: {}", error));
            console.blank();
            console.line("Example:");
            console.line("  memory-inject --spec-dir .auto-claude/specs/001-task \\");
            console.line("      --content 'Successfully implemented authentication'");
        }
        InjectError::SpecDirNotFound { resolved, .. } => {
            console.line(format!("Error: {}.", error));
            console.line(format!("Tried: {}", resolved.display()));
        }
        InjectError::CredentialDeclined(_) => {
            console.line(format!("Aborted: {}.", error));
        }
        InjectError::InitializationFailed {
            base_url,
            credential_var,
            cause,
        } => {
            console.line("✗ Failed to initialize the memory session.");
            if let Some(cause) = cause {
                console.line(format!("  Cause: {}", cause));
            }
            console.blank();
            console.line("Troubleshooting:");
            console.line("  1. Check if HelixDB is running:");
            console.line(format!("     curl {}", base_url));
            match credential_var {
                Some(var) => {
                    console.line(format!("  2. Check if {} is set:", var));
                    console.line(format!("     echo ${}", var));
                }
                None => {
                    console.line("  2. Check that the embedding provider is reachable");
                }
            }
            console.line("  3. Check configuration:");
            console.line("     memory-inject --test");
        }
        InjectError::Rejected(_) => {
            console.blank();
            console.line("✗ Failed to inject memory.");
            console.line("Check the logs above for details.");
        }
        InjectError::Store(e) => {
            console.blank();
            console.line(format!("✗ Error injecting memory: {}", e));
            console.blank();
            console.line("Error chain:");
            console.line(format!("  {:?}", e));
            let mut source = e.source();
            while let Some(cause) = source {
                console.line(format!("  caused by: {}", cause));
                source = cause.source();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MemoryConfig;
    use crate::memory::{SessionInsights, DEFAULT_DISCOVERY_PATH};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Outcome {
        Stored,
        Refused,
        Fails,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Insight(u32, SessionInsights),
        Pattern(String),
        Gotcha(String),
        Discovery(BTreeMap<String, String>),
    }

    struct RecordingSession {
        config: MemoryConfig,
        initializes: bool,
        init_error: Option<String>,
        outcome: Outcome,
        calls: Vec<Call>,
        close_count: usize,
    }

    impl RecordingSession {
        fn new(outcome: Outcome) -> Self {
            Self {
                config: MemoryConfig::default(),
                initializes: true,
                init_error: None,
                outcome,
                calls: Vec::new(),
                close_count: 0,
            }
        }

        fn result(&self) -> crate::core::error::Result<bool> {
            match self.outcome {
                Outcome::Stored => Ok(true),
                Outcome::Refused => Ok(false),
                Outcome::Fails => Err(MemoryError::Query("addEpisode timed out".to_string())),
            }
        }
    }

    #[async_trait]
    impl MemorySession for RecordingSession {
        fn group_id(&self) -> String {
            "001-auth".to_string()
        }

        fn config(&self) -> &MemoryConfig {
            &self.config
        }

        async fn initialize(&mut self) -> bool {
            self.initializes
        }

        fn initialization_error(&self) -> Option<String> {
            self.init_error.clone()
        }

        async fn save_session_insights(
            &mut self,
            session_num: u32,
            insights: &SessionInsights,
        ) -> crate::core::error::Result<bool> {
            self.calls.push(Call::Insight(session_num, insights.clone()));
            self.result()
        }

        async fn save_pattern(&mut self, pattern: &str) -> crate::core::error::Result<bool> {
            self.calls.push(Call::Pattern(pattern.to_string()));
            self.result()
        }

        async fn save_gotcha(&mut self, gotcha: &str) -> crate::core::error::Result<bool> {
            self.calls.push(Call::Gotcha(gotcha.to_string()));
            self.result()
        }

        async fn save_codebase_discoveries(
            &mut self,
            discoveries: &BTreeMap<String, String>,
        ) -> crate::core::error::Result<bool> {
            self.calls.push(Call::Discovery(discoveries.clone()));
            self.result()
        }

        async fn close(&mut self) {
            self.close_count += 1;
        }
    }

    fn request(kind: MemoryKind, content: &str, file_path: Option<&str>) -> InjectRequest {
        InjectRequest {
            spec_dir: PathBuf::from(".auto-claude/specs/001-auth"),
            content: content.to_string(),
            kind,
            file_path: file_path.map(str::to_string),
        }
    }

    fn output(console: Console<Vec<u8>>) -> String {
        String::from_utf8(console.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn test_each_kind_hits_exactly_one_write() {
        for kind in [MemoryKind::Insight, MemoryKind::Pattern, MemoryKind::Gotcha, MemoryKind::Discovery] {
            let mut session = RecordingSession::new(Outcome::Stored);
            let mut console = Console::new(Vec::new());

            inject(&mut session, &request(kind, "content", None), &mut console)
                .await
                .unwrap();

            assert_eq!(session.calls.len(), 1, "{kind}");
            let matches = matches!(
                (kind, &session.calls[0]),
                (MemoryKind::Insight, Call::Insight(999, _))
                    | (MemoryKind::Pattern, Call::Pattern(_))
                    | (MemoryKind::Gotcha, Call::Gotcha(_))
                    | (MemoryKind::Discovery, Call::Discovery(_))
            );
            assert!(matches, "{kind} dispatched to {:?}", session.calls[0]);
        }
    }

    #[tokio::test]
    async fn test_discovery_payloads() {
        let mut session = RecordingSession::new(Outcome::Stored);
        let mut console = Console::new(Vec::new());
        inject(&mut session, &request(MemoryKind::Discovery, "X", Some("src/auth.py")), &mut console)
            .await
            .unwrap();
        inject(&mut session, &request(MemoryKind::Discovery, "Y", None), &mut console)
            .await
            .unwrap();

        assert_eq!(
            session.calls,
            vec![
                Call::Discovery(BTreeMap::from([("src/auth.py".to_string(), "X".to_string())])),
                Call::Discovery(BTreeMap::from([(DEFAULT_DISCOVERY_PATH.to_string(), "Y".to_string())])),
            ]
        );
    }

    #[tokio::test]
    async fn test_close_called_once_whatever_the_outcome() {
        for outcome in [Outcome::Stored, Outcome::Refused, Outcome::Fails] {
            let mut session = RecordingSession::new(outcome);
            let mut console = Console::new(Vec::new());
            let result = inject(&mut session, &request(MemoryKind::Pattern, "p", None), &mut console).await;

            assert_eq!(session.close_count, 1, "{outcome:?}");
            match outcome {
                Outcome::Stored => assert!(result.is_ok()),
                Outcome::Refused => assert!(matches!(result, Err(InjectError::Rejected(MemoryKind::Pattern)))),
                Outcome::Fails => assert!(matches!(result, Err(InjectError::Store(_)))),
            }
        }
    }

    #[tokio::test]
    async fn test_initialization_failure_skips_writes_and_closes() {
        let mut session = RecordingSession::new(Outcome::Stored);
        session.initializes = false;
        let mut console = Console::new(Vec::new());

        let result = inject(&mut session, &request(MemoryKind::Gotcha, "g", None), &mut console).await;
        assert!(matches!(
            result,
            Err(InjectError::InitializationFailed { credential_var: Some("OPENAI_API_KEY"), .. })
        ));
        assert!(session.calls.is_empty());
        assert_eq!(session.close_count, 1);

        let text = output(console);
        assert!(text.contains("  - Group ID: 001-auth"));
    }

    #[tokio::test]
    async fn test_initialization_cause_is_reported() {
        let mut session = RecordingSession::new(Outcome::Stored);
        session.initializes = false;
        session.init_error = Some("HelixDB connection error: connection refused".to_string());
        let mut console = Console::new(Vec::new());

        let err = inject(&mut session, &request(MemoryKind::Pattern, "p", None), &mut console)
            .await
            .unwrap_err();
        report_failure(&mut console, &err);

        let text = output(console);
        assert!(text.contains("✗ Failed to initialize the memory session.\n  Cause: HelixDB connection error: connection refused\n"));
        assert!(text.contains("Troubleshooting:"));
    }

    #[test]
    fn test_success_report() {
        let long = "x".repeat(100);
        let mut console = Console::new(Vec::new());
        report_success(&mut console, &request(MemoryKind::Gotcha, &long, None));
        let text = output(console);

        assert!(text.contains("MEMORY INJECTED SUCCESSFULLY"));
        assert!(text.contains("  - Type: gotcha"));
        assert!(text.contains(&format!("  - Content: {}...\n", "x".repeat(80))));
        assert!(text.contains("  - Spec: 001-auth"));
    }

    #[test]
    fn test_success_report_short_content_has_no_ellipsis() {
        let mut console = Console::new(Vec::new());
        report_success(&mut console, &request(MemoryKind::Pattern, "hash passwords", None));
        assert!(output(console).contains("  - Content: hash passwords\n"));
    }

    #[test]
    fn test_missing_spec_dir_shows_absolute_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("specs").join("404-nowhere");
        let err = resolve_spec_dir(&missing).unwrap_err();

        let mut console = Console::new(Vec::new());
        report_failure(&mut console, &err);
        let text = output(console);
        assert!(text.contains(&missing.display().to_string()));
        assert!(text.contains("Tried: "));

        assert!(resolve_spec_dir(dir.path()).is_ok());
    }

    #[test]
    fn test_relative_missing_spec_dir_is_resolved() {
        let err = resolve_spec_dir(Path::new("no/such/spec-dir")).unwrap_err();
        let InjectError::SpecDirNotFound { resolved, .. } = err else {
            panic!("expected missing path");
        };
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("no/such/spec-dir"));
    }

    #[test]
    fn test_store_failure_report_includes_chain() {
        let err = InjectError::Store(MemoryError::Io(std::io::Error::other("disk full")));
        let mut console = Console::new(Vec::new());
        report_failure(&mut console, &err);
        let text = output(console);
        assert!(text.contains("✗ Error injecting memory: IO error: disk full"));
        assert!(text.contains("Error chain:"));
    }
}
