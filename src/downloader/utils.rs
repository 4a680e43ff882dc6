// Helper functions for engine implementations

use std::path::Path;
use std::process::{Command as StdCommand, ExitStatus, Stdio};

use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};

/// Runs a program to completion and returns its stdout.
///
/// A failed run yields the summarized stderr, a timeout kills the child.
pub async fn run_captured(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<Vec<u8>, String> {
    let child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", program, e))?;

    let output = timeout(TokioDuration::from_secs(timeout_secs), child.wait_with_output())
        .await
        .map_err(|_| format!("{} timed out after {}s", program, timeout_secs))?
        .map_err(|e| format!("Failed to wait for {}: {}", program, e))?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(error_summary(&stderr, output.status))
    }
}

/// Find an executable in common install locations, then PATH
pub fn find_binary(binary_name: &str) -> Option<String> {
    let common_paths = [
        format!("/opt/homebrew/bin/{}", binary_name), // Homebrew on Apple Silicon
        format!("/usr/local/bin/{}", binary_name),    // Homebrew on Intel Mac
        format!("/usr/bin/{}", binary_name),          // System installation
    ];

    for path in common_paths {
        if Path::new(&path).exists() {
            return Some(path);
        }
    }

    if let Ok(output) = StdCommand::new("which").arg(binary_name).output() {
        if output.status.success() {
            let trimmed = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
    }

    None
}

/// Last `ERROR:` line of yt-dlp stderr, else the whole text, else the exit status
pub fn error_summary(stderr: &str, status: ExitStatus) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        return format!("process exited with {}", status);
    }
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .unwrap_or(stderr)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_error_summary_prefers_error_line() {
        use std::os::unix::process::ExitStatusExt;

        let failed = ExitStatus::from_raw(1 << 8);
        let stderr = "WARNING: something odd\nERROR: [youtube] abc: Private video\n";
        assert_eq!(error_summary(stderr, failed), "ERROR: [youtube] abc: Private video");
        assert_eq!(error_summary("  plain failure \n", failed), "plain failure");
        assert!(error_summary("", failed).starts_with("process exited with"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captured_collects_stdout() {
        let out = run_captured("sh", &["-c".into(), "echo hi".into()], 5)
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "hi");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captured_reports_error_line() {
        let script = "echo 'ERROR: Unsupported URL: x' >&2; exit 1".to_string();
        let err = run_captured("sh", &["-c".into(), script], 5)
            .await
            .unwrap_err();
        assert_eq!(err, "ERROR: Unsupported URL: x");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captured_times_out() {
        let err = run_captured("sh", &["-c".into(), "sleep 5".into()], 1)
            .await
            .unwrap_err();
        assert!(err.contains("timed out"));
    }
}
