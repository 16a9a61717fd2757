//! Execution sandbox: run the compiled program under a deadline and
//! resource ceilings, then classify what happened.

use tokio::process::Command;
use tracing::{debug, info};

use super::run_captured;
use crate::config::{EngineConfig, StderrPolicy};
use crate::error::{PipelineError, Stage};
use crate::model::{BuildArtifact, ExecutionResult, RunOutput};

pub async fn execute(
    config: &EngineConfig,
    artifact: &BuildArtifact,
) -> Result<RunOutput, PipelineError> {
    let mut cmd = Command::new(&artifact.binary);
    if let Some(dir) = &config.run_dir {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    apply_rlimits(&mut cmd, &config.limits);
    debug!(binary = %artifact.binary.display(), "running program");

    let limit = config.limits.run_timeout();
    let result = run_captured(cmd, limit, config.limits.max_output_bytes)
        .await
        .map_err(|e| PipelineError::ExecutionError {
            code: None,
            signal: None,
            diagnostics: format!("failed to start {}: {e}", artifact.binary.display()),
        })?
        .ok_or(PipelineError::Timeout {
            stage: Stage::Executing,
            limit,
        })?;

    info!(code = ?result.code, stdout_len = result.stdout.len(), "program finished");
    classify(result, config.stderr_policy)
}

/// Map a finished run onto success or failure.
///
/// A non-zero exit is always an error. Stderr text on a zero exit is an
/// error under [`StderrPolicy::Fail`] and a warning under
/// [`StderrPolicy::Warn`].
pub fn classify(result: ExecutionResult, policy: StderrPolicy) -> Result<RunOutput, PipelineError> {
    if !result.success() {
        return Err(PipelineError::ExecutionError {
            code: result.code,
            signal: result.signal,
            diagnostics: result.stderr,
        });
    }

    if result.stderr.is_empty() {
        return Ok(RunOutput {
            stdout: result.stdout,
            warnings: None,
        });
    }

    match policy {
        StderrPolicy::Fail => Err(PipelineError::RuntimeDiagnosticError {
            diagnostics: result.stderr,
        }),
        StderrPolicy::Warn => Ok(RunOutput {
            stdout: result.stdout,
            warnings: Some(result.stderr),
        }),
    }
}

#[cfg(unix)]
fn apply_rlimits(cmd: &mut Command, limits: &crate::config::Limits) {
    let memory = limits
        .memory_limit_mb
        .map(|mb| mb.saturating_mul(1024 * 1024));
    let cpu = limits.cpu_time_limit_secs;
    if memory.is_none() && cpu.is_none() {
        return;
    }

    // SAFETY: the hook runs between fork and exec and only calls setrlimit,
    // which is async-signal-safe.
    unsafe {
        cmd.pre_exec(move || {
            if let Some(bytes) = memory {
                let lim = libc::rlimit {
                    rlim_cur: bytes as libc::rlim_t,
                    rlim_max: bytes as libc::rlim_t,
                };
                if libc::setrlimit(libc::RLIMIT_AS, &lim) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
            }
            if let Some(secs) = cpu {
                let lim = libc::rlimit {
                    rlim_cur: secs as libc::rlim_t,
                    rlim_max: secs.saturating_add(1) as libc::rlim_t,
                };
                if libc::setrlimit(libc::RLIMIT_CPU, &lim) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
            }
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(code: Option<i32>, stdout: &str, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.into(),
            stderr: stderr.into(),
            code,
            signal: None,
        }
    }

    #[test]
    fn test_clean_exit_returns_stdout_verbatim() {
        let out = classify(result(Some(0), "  Mean: 4.5\n", ""), StderrPolicy::Fail).unwrap();
        assert_eq!(out.stdout, "  Mean: 4.5\n");
        assert_eq!(out.warnings, None);
    }

    #[test]
    fn test_non_zero_exit_is_execution_error() {
        for policy in [StderrPolicy::Fail, StderrPolicy::Warn] {
            match classify(result(Some(2), "partial", "bad column\n"), policy) {
                Err(PipelineError::ExecutionError {
                    code, diagnostics, ..
                }) => {
                    assert_eq!(code, Some(2));
                    assert_eq!(diagnostics, "bad column\n");
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_killed_by_signal_is_execution_error() {
        let killed = ExecutionResult {
            signal: Some(24),
            ..result(None, "", "")
        };
        assert!(matches!(
            classify(killed, StderrPolicy::Warn),
            Err(PipelineError::ExecutionError {
                signal: Some(24),
                ..
            })
        ));
    }

    #[test]
    fn test_stderr_on_zero_exit_follows_policy() {
        let noisy = result(Some(0), "done\n", "deprecated option\n");

        match classify(noisy.clone(), StderrPolicy::Fail) {
            Err(PipelineError::RuntimeDiagnosticError { diagnostics }) => {
                assert_eq!(diagnostics, "deprecated option\n")
            }
            other => panic!("unexpected {other:?}"),
        }

        let out = classify(noisy, StderrPolicy::Warn).unwrap();
        assert_eq!(out.stdout, "done\n");
        assert_eq!(out.warnings.as_deref(), Some("deprecated option\n"));
    }

    /// A shell script standing in for the compiled program. A child `sh`
    /// writes it, so this process never holds it open for writing.
    #[cfg(unix)]
    fn script_artifact(dir: &std::path::Path, body: &str) -> BuildArtifact {
        let binary = dir.join("main");
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg("printf '#!/bin/sh\\n%s\\n' \"$1\" > \"$0\" && chmod +x \"$0\"")
            .arg(&binary)
            .arg(body)
            .status()
            .unwrap();
        assert!(status.success());
        BuildArtifact { binary }
    }

    #[cfg(unix)]
    fn limited(cpu: Option<u64>, memory_mb: Option<u64>, max_output_bytes: usize) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.limits.run_timeout_secs = 20;
        config.limits.cpu_time_limit_secs = cpu;
        config.limits.memory_limit_mb = memory_mb;
        config.limits.max_output_bytes = max_output_bytes;
        config
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cpu_ceiling_kills_busy_loop() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = script_artifact(dir.path(), "while :; do :; done");
        let config = limited(Some(1), None, 1024);

        let started = std::time::Instant::now();
        let result = execute(&config, &artifact).await;
        assert!(
            matches!(
                result,
                Err(PipelineError::ExecutionError {
                    code: None,
                    signal: Some(_),
                    ..
                })
            ),
            "got {result:?}"
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_memory_ceiling_stops_the_program() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = script_artifact(dir.path(), "echo hi");

        let roomy = execute(&limited(None, Some(1024), 1024), &artifact).await.unwrap();
        assert_eq!(roomy.stdout, "hi\n");

        // one megabyte of address space cannot even map the shell
        let result = execute(&limited(None, Some(1), 1024), &artifact).await;
        assert!(
            matches!(result, Err(PipelineError::ExecutionError { .. })),
            "got {result:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = script_artifact(dir.path(), "head -c 5000000 /dev/zero | tr '\\0' x");

        let out = execute(&limited(None, None, 8), &artifact).await.unwrap();
        assert_eq!(out.stdout, "xxxxxxxx\n[output truncated]");
    }
}
