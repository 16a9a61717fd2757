//! Per-request staging directory for the generated source and the binary.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::model::GeneratedProgram;

pub const SOURCE_FILE: &str = "main.cpp";

#[cfg(windows)]
pub const BINARY_FILE: &str = "main.exe";
#[cfg(not(windows))]
pub const BINARY_FILE: &str = "main";

/// `<root>/<request id>/`, removed on drop unless kept.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    keep: bool,
}

impl Workspace {
    pub fn create(root: &Path, request_id: &str, keep: bool) -> Result<Self, PipelineError> {
        let dir = root.join(request_id);
        fs::create_dir_all(&dir)
            .map_err(|e| PipelineError::workspace(format!("creating {}", dir.display()), e))?;
        let dir = fs::canonicalize(&dir)
            .map_err(|e| PipelineError::workspace(format!("resolving {}", dir.display()), e))?;

        debug!(dir = %dir.display(), "workspace created");
        Ok(Self { dir, keep })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.join(SOURCE_FILE)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.dir.join(BINARY_FILE)
    }

    pub fn write_source(&self, program: &GeneratedProgram) -> Result<PathBuf, PipelineError> {
        let path = self.source_path();
        fs::write(&path, &program.source)
            .map_err(|e| PipelineError::workspace(format!("writing {}", path.display()), e))?;
        Ok(path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            debug!(dir = %self.dir.display(), "keeping workspace");
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "failed to remove workspace");
        }
    }
}
