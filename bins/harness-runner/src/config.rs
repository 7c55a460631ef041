// Runner configuration: JSON file with command-line overrides
use anyhow::{bail, Context, Result};
use harness_common::config::{DEFAULT_ENTRY_POINT, DEFAULT_MANIFEST_FILE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How to obtain and run the candidate program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Program invoked once per test case
    pub program: PathBuf,
    /// Arguments placed before the test case inputs
    pub args: Vec<String>,
    /// Source file that must exist for the candidate to count as loaded
    pub module: Option<PathBuf>,
    /// Command run once before any test case; empty means no compile step
    pub compile: Vec<String>,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("./student_code"),
            args: Vec::new(),
            module: None,
            compile: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub manifest: PathBuf,
    pub entry_point: String,
    pub candidate: CandidateConfig,
    /// Directory the candidate runs in; relative paths resolve against it
    pub working_dir: Option<PathBuf>,
    /// Per-test wall-clock limit. Unset means no limit.
    pub timeout_ms: Option<u64>,
    /// Maximum number of test cases run at once (process candidates only)
    pub jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(DEFAULT_MANIFEST_FILE),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            candidate: CandidateConfig::default(),
            working_dir: None,
            timeout_ms: None,
            jobs: 1,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a JSON file; missing keys take their defaults
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Runner config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: RunnerConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, else from config/harness.json when present,
    /// else use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new("config/harness.json");
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        if self.entry_point.trim().is_empty() {
            bail!("entry_point cannot be empty");
        }
        if self.timeout_ms == Some(0) {
            bail!("timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Manifest location, resolved against the working directory when relative
    pub fn manifest_path(&self) -> PathBuf {
        match &self.working_dir {
            Some(dir) if self.manifest.is_relative() => dir.join(&self.manifest),
            _ => self.manifest.clone(),
        }
    }
}
