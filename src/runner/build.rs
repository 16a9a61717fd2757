//! Build orchestrator: write the program and run the compiler on it.

use tokio::process::Command;
use tracing::{debug, info};

use super::run_captured;
use crate::config::EngineConfig;
use crate::error::{PipelineError, Stage};
use crate::model::{BuildArtifact, ExecutionResult, GeneratedProgram};
use crate::writer::workspace::Workspace;

/// `<compiler> <flags…> <source> -o <binary> <link args…>`
pub async fn compile(
    config: &EngineConfig,
    workspace: &Workspace,
    program: &GeneratedProgram,
) -> Result<BuildArtifact, PipelineError> {
    let source = workspace.write_source(program)?;
    let binary = workspace.binary_path();
    let toolchain = &config.toolchain;

    let mut cmd = Command::new(&toolchain.compiler);
    cmd.args(&toolchain.flags)
        .arg(&source)
        .arg("-o")
        .arg(&binary)
        .args(&toolchain.link_args);
    debug!(command = ?cmd.as_std(), "invoking compiler");

    let limit = config.limits.build_timeout();
    let result = run_captured(cmd, limit, config.limits.max_output_bytes)
        .await
        .map_err(|e| PipelineError::CompileError {
            diagnostics: format!("failed to run {}: {e}", toolchain.compiler),
        })?
        .ok_or(PipelineError::Timeout {
            stage: Stage::Building,
            limit,
        })?;

    check_build(&result)?;
    if !binary.exists() {
        return Err(PipelineError::CompileError {
            diagnostics: format!("compiler produced no binary at {}", binary.display()),
        });
    }

    info!(binary = %binary.display(), "build succeeded");
    Ok(BuildArtifact { binary })
}

/// Any non-zero exit, and any diagnostic output at all, fails the build.
fn check_build(result: &ExecutionResult) -> Result<(), PipelineError> {
    if result.success() && result.stderr.is_empty() {
        return Ok(());
    }

    let diagnostics = if !result.stderr.is_empty() {
        result.stderr.clone()
    } else if !result.stdout.is_empty() {
        result.stdout.clone()
    } else {
        match (result.code, result.signal) {
            (Some(code), _) => format!("compiler exited with status {code}"),
            (None, Some(signal)) => format!("compiler terminated by signal {signal}"),
            (None, None) => "compiler terminated abnormally".to_string(),
        }
    };
    Err(PipelineError::CompileError { diagnostics })
}
