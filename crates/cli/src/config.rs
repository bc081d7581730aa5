use anyhow::{Context as AnyhowContext, Result};
use rojo_check_analyzer::{AnalyzerConfig, UnknownPolicy};
use rojo_check_filter::DEFAULT_IGNORE_FILE;
use rojo_check_project::{ConfiguredPaths, RuntimeContext, DEFAULT_GROUPABLE_ROOTS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "rojo-check.toml";
pub const DEFAULT_PROJECT_FILE: &str = "default.project.json";

/// Contents of `rojo-check.toml`. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub project: PathBuf,
    /// Identifiers per context key (`client`, `server`, `shared`, `testing`).
    pub paths: BTreeMap<String, Vec<String>>,
    pub ignore: Vec<String>,
    pub ignore_files: Vec<String>,
    pub groupable_roots: Vec<String>,
    pub unknown: UnknownPolicy,
    pub problems_file: Option<PathBuf>,
    pub analyzer: AnalyzerConfig,
    pub watch: WatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: PathBuf::from(DEFAULT_PROJECT_FILE),
            paths: BTreeMap::new(),
            ignore: Vec::new(),
            ignore_files: vec![DEFAULT_IGNORE_FILE.to_string()],
            groupable_roots: DEFAULT_GROUPABLE_ROOTS
                .iter()
                .map(|root| root.to_string())
                .collect(),
            unknown: UnknownPolicy::default(),
            problems_file: None,
            analyzer: AnalyzerConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Load `explicit`, or `rojo-check.toml` under `root` when present.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE);
                if !candidate.exists() {
                    log::debug!("No {CONFIG_FILE} in {}, using defaults", root.display());
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.warn_unknown_keys();
        Ok(config)
    }

    fn warn_unknown_keys(&self) {
        for key in self.paths.keys() {
            if RuntimeContext::from_config_key(key).is_none() {
                log::warn!("Ignoring [paths] key `{key}`: not a runtime context");
            }
        }
        for key in self.analyzer.context.keys() {
            if !RuntimeContext::ALL.iter().any(|ctx| ctx.as_str() == key) {
                log::warn!("Ignoring [analyzer.context.{key}]: not a runtime context");
            }
        }
    }

    pub fn configured_paths(&self) -> ConfiguredPaths {
        let mut configured = ConfiguredPaths::default();
        for (key, identifiers) in &self.paths {
            if let Some(ctx) = RuntimeContext::from_config_key(key) {
                configured
                    .get_mut(ctx)
                    .extend(identifiers.iter().map(|id| id.trim().to_string()));
            }
        }
        configured
    }

    pub fn project_path(&self, root: &Path) -> PathBuf {
        root.join(&self.project)
    }

    pub fn problems_path(&self, root: &Path) -> Option<PathBuf> {
        self.problems_file.as_ref().map(|path| root.join(path))
    }
}
