use crate::language::{DetectorConfig, Language};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `[analysis]` table of `repomap.toml`. Every field is optional so a
/// partial file only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AnalysisSection {
    pub workers: Option<usize>,
    pub max_file_bytes: Option<u64>,
    pub deadline_secs: Option<u64>,
    pub parse_timeout_ms: Option<u64>,
    pub languages: Option<Vec<Language>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RepomapConfig {
    pub repo: Option<String>,
    pub path: Option<String>,
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

/// Resolved engine settings.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Repository name used in symbol URIs; defaults to the root's directory name
    pub repo: Option<String>,
    /// Size of the extraction pool
    pub workers: usize,
    pub max_file_bytes: u64,
    /// Wall-clock budget for the extraction pass
    pub deadline: Option<Duration>,
    /// Per-file tree-sitter budget
    pub parse_timeout: Option<Duration>,
    pub languages: Vec<Language>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let detector = DetectorConfig::default();
        Self {
            repo: None,
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            max_file_bytes: detector.max_file_bytes,
            deadline: None,
            parse_timeout: None,
            languages: detector.languages,
        }
    }
}

impl AnalyzerConfig {
    /// Apply the values a config file sets
    pub fn with_file(mut self, file: &RepomapConfig) -> Self {
        if file.repo.is_some() {
            self.repo = file.repo.clone();
        }
        let analysis = &file.analysis;
        if let Some(workers) = analysis.workers {
            self.workers = workers;
        }
        if let Some(bytes) = analysis.max_file_bytes {
            self.max_file_bytes = bytes;
        }
        if let Some(secs) = analysis.deadline_secs {
            self.deadline = Some(Duration::from_secs(secs));
        }
        if let Some(ms) = analysis.parse_timeout_ms {
            self.parse_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(languages) = &analysis.languages {
            self.languages = languages.clone();
        }
        self
    }

    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            max_file_bytes: self.max_file_bytes,
            languages: self.languages.clone(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("repomap.toml")
}

/// Config written by `repomap init`
pub fn starter_config(repo: Option<String>, path: Option<String>) -> RepomapConfig {
    let defaults = AnalyzerConfig::default();
    RepomapConfig {
        repo,
        path,
        output: Some("repomap.json".to_string()),
        exclude: Vec::new(),
        analysis: AnalysisSection {
            workers: None,
            max_file_bytes: Some(defaults.max_file_bytes),
            deadline_secs: None,
            parse_timeout_ms: Some(5_000),
            languages: Some(defaults.languages),
        },
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<RepomapConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: RepomapConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &RepomapConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
