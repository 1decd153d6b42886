//! Workspace configuration for the FAQ knowledge base.
//!
//! Stored as a machine-readable TOML file at `<workspace>/config/config.toml`,
//! where the workspace root resolves to `FAQBASE_HOME` when set and the
//! OS-specific data directory otherwise. The config carries the publish
//! workflow policy and the duplicate-matching knobs the admin console exposes.

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration persisted per installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Publish workflow policy toggles.
    #[serde(default)]
    pub workflow: WorkflowSettings,
    /// Duplicate/similarity matcher tuning.
    #[serde(default)]
    pub matching: MatchingSettings,
}

/// Publish workflow policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Whether Draft -> SIT publishes require an admin approval, or are
    /// applied immediately when requested.
    #[serde(default = "default_sit_requires_approval")]
    pub sit_requires_approval: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            sit_requires_approval: default_sit_requires_approval(),
        }
    }
}

const fn default_sit_requires_approval() -> bool {
    false
}

/// Scoring-method selection for the duplicate matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Token overlap blended with an edit-distance term.
    #[default]
    Hybrid,
    /// Token overlap only; the edit-distance term is suppressed.
    Lexical,
}

/// Duplicate/similarity matcher tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingSettings {
    /// Scores at or above this threshold classify a bulk row as a duplicate.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
    /// Maximum number of candidates returned per duplicate check.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub policy: MatchPolicy,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            duplicate_threshold: default_duplicate_threshold(),
            top_k: default_top_k(),
            policy: MatchPolicy::default(),
        }
    }
}

const fn default_duplicate_threshold() -> f64 {
    0.85
}

const fn default_top_k() -> usize {
    5
}

/// Standard relative path to the config file (under `config/`).
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the root directory where the knowledge base stores data.
///
/// Order of precedence:
/// 1. `FAQBASE_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var("FAQBASE_HOME") {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("FaqBase"))
}

fn config_file_path(root: &Path) -> PathBuf {
    root.join("config").join(CONFIG_FILE_NAME)
}

/// Loads the configuration from disk or returns defaults.
pub fn load_or_default(root: &Path) -> Result<AppConfig> {
    let path = config_file_path(root);
    if path.exists() {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

/// Persists the configuration to disk.
pub fn save(root: &Path, config: &AppConfig) -> Result<()> {
    let path = config_file_path(root);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let data = toml::to_string_pretty(config)?;
    fs::write(&path, data)?;
    Ok(())
}

/// Ensures the workspace structure exists and returns its important paths.
pub fn ensure_workspace_structure(root: &Path) -> Result<WorkspacePaths> {
    let faqs_dir = root.join("faqs");
    let config_dir = root.join("config");
    fs::create_dir_all(&faqs_dir)?;
    fs::create_dir_all(&config_dir)?;
    Ok(WorkspacePaths {
        root: root.to_path_buf(),
        faqs_dir,
    })
}

/// Convenience struct exposing important workspace paths.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub faqs_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn faq_record(&self, qaid: &str) -> PathBuf {
        self.faqs_dir.join(format!("{qaid}.json"))
    }

    pub fn brands_file(&self) -> PathBuf {
        self.root.join("brands.json")
    }

    pub fn users_file(&self) -> PathBuf {
        self.root.join("users.json")
    }

    pub fn qaid_sequence_file(&self) -> PathBuf {
        self.root.join("qaid_sequence.json")
    }

    pub fn publish_requests_file(&self) -> PathBuf {
        self.root.join("publish_requests.jsonl")
    }

    pub fn audit_events_file(&self) -> PathBuf {
        self.root.join("audit_events.jsonl")
    }

    pub fn analytics_file(&self) -> PathBuf {
        self.root.join("analytics.jsonl")
    }
}
