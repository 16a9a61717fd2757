//! Engine settings. Loaded from an optional JSON file, then overridden by
//! command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Parent directory of the per-request workspaces.
    pub workspace_root: PathBuf,
    /// Leave each request's `main.cpp` / `main` on disk after the run.
    pub keep_workspaces: bool,
    pub toolchain: ToolchainConfig,
    pub limits: Limits,
    pub stderr_policy: StderrPolicy,
    /// Upper bound on concurrent build + execute sections.
    pub max_concurrent_runs: usize,
    /// Working directory of the generated program; the caller's when unset.
    pub run_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("dsl2cpp"),
            keep_workspaces: false,
            toolchain: ToolchainConfig::default(),
            limits: Limits::default(),
            stderr_policy: StderrPolicy::Fail,
            max_concurrent_runs: 4,
            run_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub compiler: String,
    /// Passed before the source path.
    pub flags: Vec<String>,
    /// Passed after `-o <binary>`; typically the helper library to link.
    pub link_args: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: "g++".to_string(),
            flags: vec!["-std=c++17".to_string()],
            link_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub build_timeout_secs: u64,
    pub run_timeout_secs: u64,
    /// Address-space ceiling of the generated program (Unix only).
    pub memory_limit_mb: Option<u64>,
    /// CPU-time ceiling of the generated program (Unix only).
    pub cpu_time_limit_secs: Option<u64>,
    /// Captured stdout / stderr are cut at this many bytes each.
    pub max_output_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            build_timeout_secs: 120,
            run_timeout_secs: 30,
            memory_limit_mb: Some(1024),
            cpu_time_limit_secs: Some(30),
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl Limits {
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// What a zero exit status with text on stderr means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StderrPolicy {
    /// Report the run as a `RuntimeDiagnosticError`.
    #[default]
    Fail,
    /// Report success and hand the stderr text back as warnings.
    Warn,
}

impl EngineConfig {
    /// Defaults, or the contents of `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Parsing config {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
