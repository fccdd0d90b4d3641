

use clap::Parser;
use memory_inject::cli::{self, console::Console, Cli};
use memory_inject::Environment;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    let env = Environment::load();
    let mut console = Console::stdout();
    if let Some(path) = env.loaded_from() {
        console.line(format!("✓ Loaded environment from {}", path.display()));
        console.blank();
    }

    let project_dir = std::env::current_dir()?;
    let mut input = std::io::stdin().lock();

    if cli::run(cli, &env, &project_dir, &mut input, &mut console).await {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
