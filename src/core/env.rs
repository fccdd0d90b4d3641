//! Process configuration source.
//!
//! Values from a `.env` file are layered under the inherited process
//! environment and frozen into an [`Environment`] at startup. Nothing here
//! writes back into `std::env`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_ENV_FILE: &str = ".env";


#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    loaded_from: Option<PathBuf>,
}

impl Environment {

    pub fn load() -> Self {
        Self::load_from(Path::new(DEFAULT_ENV_FILE))
    }


    pub fn load_from(path: &Path) -> Self {
        let (file_vars, loaded_from) = if path.is_file() {
            (read_env_file(path), Some(path.to_path_buf()))
        } else {
            debug!("No env file at {}", path.display());
            (Vec::new(), None)
        };

        let process_vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));

        let mut env = Self::layered(file_vars, process_vars);
        env.loaded_from = loaded_from;
        env
    }

    /// Later layers win, so the process environment overrides file entries.
    pub fn layered<F, P>(file_vars: F, process_vars: P) -> Self
    where
        F: IntoIterator<Item = (String, String)>,
        P: IntoIterator<Item = (String, String)>,
    {
        let mut vars: HashMap<String, String> = file_vars.into_iter().collect();
        vars.extend(process_vars);
        Self { vars, loaded_from: None }
    }


    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::layered(
            pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())),
            std::iter::empty(),
        )
    }


    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Blank values count as unset.
    pub fn non_empty(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }


    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }


    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }


    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}

fn read_env_file(path: &Path) -> Vec<(String, String)> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            warn!("Failed to open {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    iter.filter_map(|item| match item {
        Ok(pair) => Some(pair),
        Err(e) => {
            warn!("Skipping malformed line in {}: {}", path.display(), e);
            None
        }
    })
    .collect()
}
