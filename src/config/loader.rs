//! Description file loader
//!
//! Resolves names to files, checks versions, follows `parent_config`
//! inheritance and expands `count` blocks.

use anyhow::{anyhow, bail, Context, Result};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{flatten, unwrap_document, PARENT_KEY};

pub struct ConfigLoader {
    config_dir: String,
}

impl ConfigLoader {
    pub fn new(config_dir: impl Into<String>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Create loader from SCENE_DESCRIPTION_DIR env var or default to "configs"
    pub fn from_env() -> Self {
        let dir = std::env::var("SCENE_DESCRIPTION_DIR").unwrap_or_else(|_| "configs".to_string());
        Self::new(dir)
    }

    pub fn config_dir(&self) -> &str {
        &self.config_dir
    }

    /// A file path as given, else `<config_dir>/<name>.yaml`
    pub fn resolve_path(&self, name: &str) -> Result<PathBuf> {
        let direct = Path::new(name);
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }
        let named = Path::new(&self.config_dir).join(format!("{name}.yaml"));
        if named.is_file() {
            return Ok(named);
        }
        Err(anyhow!("invalid description file path: {name}"))
    }

    /// Like [`resolve_path`](Self::resolve_path), but a folder yields all its `.yaml` files
    pub fn resolve_paths(&self, name: &str) -> Result<Vec<PathBuf>> {
        if let Ok(path) = self.resolve_path(name) {
            return Ok(vec![path]);
        }
        let dir = Path::new(name);
        if !dir.is_dir() {
            bail!("invalid description file/folder path: {name}");
        }
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Read one document and return its version-checked body
    pub fn read_document(&self, path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document: Value = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let body = unwrap_document(&document).with_context(|| format!("Invalid document {}", path.display()))?;
        Ok(body.clone())
    }

    /// Load `name` with its whole `parent_config` chain merged in, then flattened
    pub fn load(&self, name: &str) -> Result<Value> {
        let path = self.resolve_path(name)?;
        info!("Loading description from {}", path.display());

        let mut visited = HashSet::from([path.clone()]);
        let mut config = self.read_document(&path)?;

        loop {
            let parent_name = match config.as_mapping_mut().and_then(|map| map.remove(PARENT_KEY)) {
                Some(Value::String(parent)) => parent,
                Some(other) => bail!("{PARENT_KEY} must be a string, got {other:?}"),
                None => break,
            };
            let parent_path = self.resolve_path(&parent_name)?;
            if !visited.insert(parent_path.clone()) {
                bail!("{PARENT_KEY} cycle through {}", parent_path.display());
            }
            info!("Inheriting from {}", parent_path.display());

            let mut parent = self.read_document(&parent_path)?;
            if let (Some(parent_map), Some(child_map)) = (parent.as_mapping_mut(), config.as_mapping()) {
                for (key, value) in child_map {
                    parent_map.insert(key.clone(), value.clone());
                }
            }
            config = parent;
        }

        let flattened = flatten(&config).with_context(|| format!("Failed to expand {}", path.display()))?;
        info!(
            "Loaded description with {} top-level keys",
            flattened.as_mapping().map_or(0, |m| m.len())
        );
        Ok(flattened)
    }
}
