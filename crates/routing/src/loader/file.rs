//! YAML file loader.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ConfigLoader;
use crate::error::{ConfigError, Result};
use crate::schema::{join_dir, Config};

/// Parse a config document strictly. The text is kept as the config's
/// original form.
pub fn load_str(s: &str) -> Result<Config> {
    // An empty document carries no route.
    if s.trim().is_empty() {
        return Err(ConfigError::validation("no route provided in config"));
    }
    let mut config: Config = serde_yaml::from_str(s)?;
    let root = config
        .route
        .as_ref()
        .ok_or_else(|| ConfigError::validation("no route provided in config"))?;
    if root.continue_matching {
        return Err(ConfigError::validation("cannot have continue in root route"));
    }
    config.set_original_text(s.to_string());
    Ok(config)
}

/// Read and parse `path`, resolving relative file references against its directory.
pub fn load_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let mut config = load_str(&content)?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    resolve_filepaths(dir, &mut config);
    Ok(config)
}

fn resolve_filepaths(dir: &Path, config: &mut Config) {
    for template in &mut config.templates {
        join_dir(dir, template);
    }
    if let Some(global) = &mut config.global {
        if let Some(http) = &mut global.http_config {
            http.set_directory(dir);
        }
        join_dir(dir, &mut global.slack_api_url_file);
        join_dir(dir, &mut global.opsgenie_api_key_file);
    }
    for receiver in &mut config.receivers {
        receiver.set_directory(dir);
    }
}

/// Loads the whole config from a YAML file on every call.
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigLoader for FileLoader {
    fn load(&self, config: &mut Config) -> Result<()> {
        debug!(path = %self.path.display(), "loading config file");
        *config = load_file(&self.path)?;
        Ok(())
    }
}
