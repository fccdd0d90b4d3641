//! Command-line front end for injecting memories.
//!
//! `run` is the whole program minus process setup: it takes parsed arguments,
//! the loaded environment and an operator console, and returns whether the
//! run succeeded.

pub mod console;
pub mod inject;
pub mod probe;
pub mod prompt;

use clap::Parser;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::core::config::MemoryConfig;
use crate::core::env::Environment;
use crate::memory::{GraphMemory, GroupIdMode, MemoryKind};
use console::Console;
use inject::{InjectError, InjectRequest};
use probe::HelixConnector;

const AFTER_HELP: &str = "\
Examples:
  # Test the connection
  memory-inject --test

  # Inject a session insight
  memory-inject --spec-dir .auto-claude/specs/001-auth --content 'JWT auth implemented'

  # Inject a code pattern
  memory-inject --spec-dir .auto-claude/specs/001-auth --type pattern \\
      --content 'Always validate tokens before decoding claims'

  # Inject a gotcha
  memory-inject --spec-dir .auto-claude/specs/001-auth --type gotcha \\
      --content 'Redis connections must be closed in the worker shutdown hook'

  # Inject a codebase discovery
  memory-inject --spec-dir .auto-claude/specs/001-auth --type discovery \\
      --file-path src/auth/tokens.rs --content 'Issues and verifies JWTs'";


#[derive(Debug, Parser)]
#[command(
    name = "memory-inject",
    version,
    about = "Inject a memory record into the graph memory store",
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Check configuration and connectivity, then exit
    #[arg(long)]
    pub test: bool,

    /// Spec directory the memory belongs to
    #[arg(long, value_name = "PATH")]
    pub spec_dir: Option<PathBuf>,

    /// Memory content to inject
    #[arg(long)]
    pub content: Option<String>,

    /// Kind of memory to inject
    #[arg(long = "type", value_enum, default_value_t = MemoryKind::Insight)]
    pub kind: MemoryKind,

    /// File the discovery is about (discovery only)
    #[arg(long, value_name = "PATH")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Probe,
    Inject(InjectRequest),
}

impl Cli {
    pub fn into_command(self) -> Result<Command, InjectError> {
        if self.test {
            return Ok(Command::Probe);
        }

        let spec_dir = self.spec_dir.ok_or(InjectError::MissingSpecDir)?;
        let content = self
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(InjectError::MissingContent)?;

        Ok(Command::Inject(InjectRequest {
            spec_dir,
            content,
            kind: self.kind,
            file_path: self.file_path,
        }))
    }
}


pub async fn run<R, W>(
    cli: Cli,
    env: &Environment,
    project_dir: &Path,
    input: &mut R,
    console: &mut Console<W>,
) -> bool
where
    R: BufRead,
    W: Write,
{
    let config = MemoryConfig::from_env(env);

    let request = match cli.into_command() {
        Ok(Command::Probe) => return probe::run_probe(&config, &HelixConnector, console).await,
        Ok(Command::Inject(request)) => request,
        Err(e) => {
            inject::report_failure(console, &e);
            return false;
        }
    };

    match run_injection(request.clone(), config, env, project_dir, input, console).await {
        Ok(()) => {
            inject::report_success(console, &request);
            true
        }
        Err(e) => {
            inject::report_failure(console, &e);
            false
        }
    }
}

async fn run_injection<R, W>(
    request: InjectRequest,
    config: MemoryConfig,
    env: &Environment,
    project_dir: &Path,
    input: &mut R,
    console: &mut Console<W>,
) -> Result<(), InjectError>
where
    R: BufRead,
    W: Write,
{
    inject::resolve_spec_dir(&request.spec_dir)?;
    prompt::confirm_embedder_credential(env, &config, input, console)?;

    let mut memory = GraphMemory::new(&request.spec_dir, project_dir, GroupIdMode::Spec, config);

    console.line("Initializing memory...");
    console.line(format!("  - Spec: {}", memory.spec_name()));
    console.line(format!("  - Project: {}", project_name(project_dir)));
    console.blank();

    inject::inject(&mut memory, &request, console).await
}

fn project_name(project_dir: &Path) -> String {
    project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| project_dir.display().to_string())
}
