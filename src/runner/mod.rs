//! External processes: the C++ toolchain and the compiled program.
pub mod build;
pub mod sandbox;

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::model::ExecutionResult;

const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Spawn `cmd` with piped output and wait for it under `limit`.
///
/// Each stream keeps at most `max_output_bytes`; the rest is read and
/// discarded so the child never blocks on a full pipe. `Ok(None)` means the
/// deadline passed and the child's whole process group has been killed.
pub(crate) async fn run_captured(
    mut cmd: Command,
    limit: Duration,
    max_output_bytes: usize,
) -> io::Result<Option<ExecutionResult>> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // compiler drivers fork cc1plus/ld; a group lets a timeout reach them too
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn()?;
    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let collect = async {
        tokio::try_join!(
            read_capped(stdout, max_output_bytes),
            read_capped(stderr, max_output_bytes),
            child.wait(),
        )
    };

    let (stdout, stderr, status) = match tokio::time::timeout(limit, collect).await {
        Ok(collected) => collected?,
        Err(_elapsed) => {
            kill_group(pid);
            return Ok(None);
        }
    };

    Ok(Some(ExecutionResult {
        stdout,
        stderr,
        code: status.code(),
        signal: signal_of(&status),
    }))
}

/// Read `reader` to the end, keeping the first `max` bytes.
async fn read_capped<R: AsyncRead + Unpin>(reader: Option<R>, max: usize) -> io::Result<String> {
    let Some(mut reader) = reader else {
        return Ok(String::new());
    };

    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = max.saturating_sub(kept.len());
        if n <= room {
            kept.extend_from_slice(&chunk[..n]);
        } else {
            kept.extend_from_slice(&chunk[..room]);
            truncated = true;
        }
    }

    let mut text = String::from_utf8_lossy(&kept).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    Ok(text)
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|p| libc::pid_t::try_from(p).ok()) else {
        return;
    };
    // SAFETY: plain kill(2) on the group created for this child.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[cfg(unix)]
fn signal_of(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_capped() {
        let test_cases: Vec<(&[u8], usize, String)> = vec![
            (&b"hello"[..], 10, "hello".to_string()),
            (&b"hello"[..], 5, "hello".to_string()),
            (&b"hello world"[..], 5, format!("hello{TRUNCATION_MARKER}")),
            (&b""[..], 5, String::new()),
        ];

        for (input, max, expected) in test_cases {
            assert_eq!(read_capped(Some(input), max).await.unwrap(), expected);
        }
        assert_eq!(read_capped(None::<&[u8]>, 5).await.unwrap(), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captured_collects_streams() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err >&2; exit 3");

        let result = run_captured(cmd, Duration::from_secs(10), 1024)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.code, Some(3));
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captured_caps_a_flooding_child() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("head -c 20000000 /dev/zero; echo tail >&2");

        let result = run_captured(cmd, Duration::from_secs(30), 16)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.stdout, format!("{}{TRUNCATION_MARKER}", "\0".repeat(16)));
        assert_eq!(result.stderr, "tail\n");
        assert_eq!(result.code, Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captured_times_out() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 30");

        let result = run_captured(cmd, Duration::from_millis(200), 1024)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("grandchild.pid");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("sleep 30 & echo $! > \"$0\"; wait")
            .arg(&pid_file);

        let result = run_captured(cmd, Duration::from_millis(500), 1024)
            .await
            .unwrap();
        assert!(result.is_none());

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let stat = format!("/proc/{}/stat", pid.trim());
        let mut gone = false;
        for _ in 0..50 {
            // reaped, or a zombie waiting for an init that never reaps
            gone = match std::fs::read_to_string(&stat) {
                Err(_) => true,
                Ok(s) => s
                    .rsplit(')')
                    .next()
                    .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            };
            if gone {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(gone, "grandchild {} survived the timeout", pid.trim());
    }
}
