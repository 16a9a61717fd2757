use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::processor::catalog::Arity;

/// Pipeline stage a request is in, or failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parsing,
    Validating,
    Assembling,
    Building,
    Executing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parsing => "parsing",
            Stage::Validating => "validating",
            Stage::Assembling => "assembling",
            Stage::Building => "building",
            Stage::Executing => "executing",
        };
        f.write_str(name)
    }
}

/// Every way a request can fail. The first failing stage ends the request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Error parsing line {line} \"{text}\": invalid syntax: {reason}")]
    InvalidSyntax {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("Error parsing line {line} \"{text}\": unknown function: {name}")]
    UnknownFunction {
        line: usize,
        text: String,
        name: String,
    },

    #[error("Error parsing line {line} \"{text}\": {name} expects {expected}, got {got}")]
    ArityError {
        line: usize,
        text: String,
        name: String,
        expected: Arity,
        got: usize,
    },

    #[error(
        "Error parsing line {line} \"{text}\": {name} argument {position} ({param}): {reason}"
    )]
    InvalidArgument {
        line: usize,
        text: String,
        name: String,
        position: usize,
        param: &'static str,
        reason: String,
    },

    #[error("Compilation error: {diagnostics}")]
    CompileError { diagnostics: String },

    #[error("Execution error ({}): {diagnostics}", exit_label(.code, .signal))]
    ExecutionError {
        code: Option<i32>,
        signal: Option<i32>,
        diagnostics: String,
    },

    #[error("Runtime stderr: {diagnostics}")]
    RuntimeDiagnosticError { diagnostics: String },

    #[error("{stage} timed out after {}s", .limit.as_secs())]
    Timeout { stage: Stage, limit: Duration },

    #[error("workspace error: {context}: {source}")]
    Workspace {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn exit_label(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (*code, *signal) {
        (Some(code), _) => format!("exit status {code}"),
        (None, Some(signal)) => format!("terminated by signal {signal}"),
        (None, None) => "terminated abnormally".to_string(),
    }
}

impl PipelineError {
    pub fn workspace(context: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Workspace {
            context: context.into(),
            source,
        }
    }

    /// Machine-readable error kind, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidSyntax { .. } => "invalid_syntax",
            PipelineError::UnknownFunction { .. } => "unknown_function",
            PipelineError::ArityError { .. } => "arity_error",
            PipelineError::InvalidArgument { .. } => "invalid_argument",
            PipelineError::CompileError { .. } => "compile_error",
            PipelineError::ExecutionError { .. } => "execution_error",
            PipelineError::RuntimeDiagnosticError { .. } => "runtime_diagnostic",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::Workspace { .. } => "workspace_error",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::InvalidSyntax { .. } => Stage::Parsing,
            PipelineError::UnknownFunction { .. }
            | PipelineError::ArityError { .. }
            | PipelineError::InvalidArgument { .. } => Stage::Validating,
            PipelineError::CompileError { .. } | PipelineError::Workspace { .. } => {
                Stage::Building
            }
            PipelineError::ExecutionError { .. } | PipelineError::RuntimeDiagnosticError { .. } => {
                Stage::Executing
            }
            PipelineError::Timeout { stage, .. } => *stage,
        }
    }
}
