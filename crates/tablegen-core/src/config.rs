//! Generator configuration
//!
//! Defaults follow the conventional project layout. An optional
//! `tablegen.yaml` in the base directory overrides them, and the CLI
//! applies its own flags on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::template::DEFAULT_TEMPLATE_SUFFIXES;

/// Locations and options for one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// The YAML data document
    pub data: PathBuf,

    /// Root of the template tree
    pub templates: PathBuf,

    /// Root the generated tree is written under
    pub output: PathBuf,

    /// File extensions recognised as templates
    pub suffixes: Vec<String>,

    /// Fail on undefined variables instead of rendering them empty
    pub strict: bool,

    /// Keep rendering after a template fails
    pub keep_going: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("src/main/resources/data.yml"),
            templates: PathBuf::from("src/main/jinja2"),
            output: PathBuf::from("target/generated-sources/jinja2"),
            suffixes: DEFAULT_TEMPLATE_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            strict: false,
            keep_going: false,
        }
    }
}

impl GeneratorConfig {
    /// Config file looked up in the base directory
    pub const FILE_NAME: &'static str = "tablegen.yaml";

    /// Load `tablegen.yaml` from `base_dir`, or the defaults when absent
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(Self::FILE_NAME);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate(path)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.suffixes.iter().all(|s| s.trim_start_matches('.').is_empty()) {
            return Err(CoreError::InvalidConfig {
                path: path.to_path_buf(),
                message: "at least one template suffix is required".to_string(),
            });
        }
        Ok(())
    }

    /// Make relative locations absolute against `base_dir`
    pub fn resolve(mut self, base_dir: &Path) -> Self {
        self.data = base_dir.join(&self.data);
        self.templates = base_dir.join(&self.templates);
        self.output = base_dir.join(&self.output);
        self
    }
}
