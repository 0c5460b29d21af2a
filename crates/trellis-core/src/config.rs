//! Deployment configuration consumed from outside the core

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CoreError, Result};
use crate::model::ModuleLanguage;

/// Per-language instantiation policy, owned by deployment configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LanguagePolicy {
    /// Hard line limit before a module must be split.
    pub max_file_size: usize,
    /// Domain keywords this language has affinity for (e.g. "ai", "data").
    pub preferred_domains: Vec<String>,
}

impl Default for LanguagePolicy {
    fn default() -> Self {
        LanguagePolicy {
            max_file_size: 500,
            preferred_domains: Vec::new(),
        }
    }
}

/// Static deployment configuration: group membership, language policies,
/// and operational bounds. Parsed from `trellis.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Group name -> member module names.
    pub groups: HashMap<String, Vec<String>>,
    /// Language tag -> policy.
    pub languages: HashMap<ModuleLanguage, LanguagePolicy>,
    /// Timeout for a single adapter load, in seconds.
    pub load_timeout_secs: u64,
    /// Timeout for a single lifecycle hook, in seconds.
    pub init_timeout_secs: u64,
    /// Most-recent entries kept per location in adapter histories.
    pub history_limit: usize,
    /// Group size for adapter batch loading.
    pub max_concurrent_loads: usize,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        CoordinationConfig {
            groups: HashMap::new(),
            languages: HashMap::new(),
            load_timeout_secs: 30,
            init_timeout_secs: 30,
            history_limit: 20,
            max_concurrent_loads: 4,
        }
    }
}

impl CoordinationConfig {
    /// Read and parse a TOML config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_str(&raw).map_err(|e| match e {
            CoreError::Config { message, .. } => CoreError::Config {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse config from a TOML string.
    pub fn from_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| CoreError::Config {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    /// Policy for a language, falling back to the default policy when the
    /// deployment config has no entry.
    pub fn policy(&self, language: ModuleLanguage) -> LanguagePolicy {
        self.languages.get(&language).cloned().unwrap_or_default()
    }

    /// Member modules of a configured group.
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(|v| v.as_slice())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    /// Sanity-check the config. Problems are warnings, never fatal.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (name, members) in &self.groups {
            if members.is_empty() {
                warnings.push(format!("group '{name}' has no members"));
            }
        }
        for (language, policy) in &self.languages {
            if policy.max_file_size == 0 {
                warnings.push(format!("language '{language}' has a zero max_file_size"));
            }
        }
        warnings
    }
}
