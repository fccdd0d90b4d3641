
use std::io::{BufRead, Write};
use tracing::warn;

use super::console::Console;
use super::inject::InjectError;
use crate::core::config::MemoryConfig;
use crate::core::env::Environment;


pub fn parse_yes_no_response(response: &str, default_yes: bool) -> bool {
    match response.trim().to_lowercase().as_str() {
        "" => default_yes,
        "y" | "yes" => true,
        _ => false,
    }
}


pub fn prompt_yes_no<R: BufRead, W: Write>(
    prompt: &str,
    default_yes: bool,
    input: &mut R,
    console: &mut Console<W>,
) -> bool {
    console.prompt(prompt);
    let mut buffer = String::new();
    match input.read_line(&mut buffer) {
        Ok(_) => parse_yes_no_response(&buffer, default_yes),
        Err(e) => {
            warn!("Failed to read prompt response: {}", e);
            false
        }
    }
}

/// Asks before continuing without the embedder's API key. Declining aborts.
pub fn confirm_embedder_credential<R: BufRead, W: Write>(
    env: &Environment,
    config: &MemoryConfig,
    input: &mut R,
    console: &mut Console<W>,
) -> Result<(), InjectError> {
    let Some(var) = config.embedder_credential_var() else {
        return Ok(());
    };
    if env.non_empty(var).is_some() {
        return Ok(());
    }

    console.line(format!("Warning: {} not found in environment.", var));
    console.line(format!(
        "The {} embedder requires an API key to embed memories.",
        config.embedder_provider
    ));
    console.blank();
    console.line("Set it with:");
    console.line(format!("  export {}=...", var));
    console.blank();

    if !prompt_yes_no("Continue anyway? (y/N): ", false, input, console) {
        return Err(InjectError::CredentialDeclined(var.to_string()));
    }
    console.blank();
    Ok(())
}
