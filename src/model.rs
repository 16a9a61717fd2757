use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// C++ text for one validated command, in script order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStatement {
    /// Script line the statement came from.
    pub line: usize,
    pub text: String,
}

/// Complete program text, ready to be written and compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProgram {
    pub source: String,
    pub statement_count: usize,
}

/// Compiled executable inside a request workspace.
///
/// Only valid while the owning [`crate::writer::workspace::Workspace`] is alive.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    pub binary: PathBuf,
}

/// Captured streams of one finished process.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Result of a run that reached the end of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    /// Diagnostic text tolerated by the `warn` stderr policy.
    pub warnings: Option<String>,
}

/// The payload handed back to callers, one per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub warnings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,
}

impl OperationOutcome {
    pub fn succeeded(run: RunOutput) -> Self {
        Self {
            success: true,
            output: Some(run.stdout),
            warnings: run.warnings,
            error: None,
            code: None,
        }
    }

    pub fn failed(err: &PipelineError) -> Self {
        Self {
            success: false,
            output: None,
            warnings: None,
            error: Some(err.to_string()),
            code: Some(err.code().to_string()),
        }
    }

    /// Failure that never entered the pipeline, e.g. an empty request.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            warnings: None,
            error: Some(message.into()),
            code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_payload_shape() {
        let ok = OperationOutcome::succeeded(RunOutput {
            stdout: "42\n".into(),
            warnings: None,
        });
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({ "success": true, "output": "42\n" })
        );

        let err = PipelineError::CompileError {
            diagnostics: "main.cpp:1: error".into(),
        };
        let failed = OperationOutcome::failed(&err);
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({
                "success": false,
                "error": "Compilation error: main.cpp:1: error",
                "code": "compile_error",
            })
        );
    }
}
