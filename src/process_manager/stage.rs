// External stage invocation.
//
// Every computation step (segmentation, mesh generation, slice rendering) is
// an opaque Python program. This module spawns one, streams its stdout, and
// classifies the exit: code 0 hands the captured stdout back to the caller,
// anything else becomes an Invocation error carrying a diagnostic tail.

use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::error::AnalysisError;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Lines of stderr kept for the failure message.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct StageOutput {
    pub stdout: String,
    pub exit_code: i32,
}

pub fn get_python_path() -> String {
    #[cfg(target_os = "windows")]
    let candidates = ["python", "python3", "py"];

    #[cfg(not(target_os = "windows"))]
    let candidates = ["python3", "python"];

    for candidate in candidates {
        let mut cmd = std::process::Command::new(candidate);
        cmd.arg("--version");

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        if cmd.output().is_ok() {
            return candidate.to_string();
        }
    }

    "python".to_string()
}

/// Locate the inference_pipeline directory holding the stage scripts.
/// Honors the NEUROSCAN_SCRIPTS_DIR override, then looks next to the
/// executable, then up a few parents for dev checkouts, then falls back to
/// the current directory.
pub fn get_stage_scripts_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NEUROSCAN_SCRIPTS_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let scripts_dir = exe_dir.join("inference_pipeline");
            if scripts_dir.exists() {
                return scripts_dir;
            }

            let mut current = exe_dir;
            for _ in 0..3 {
                if let Some(parent) = current.parent() {
                    let dev_scripts_dir = parent.join("inference_pipeline");
                    if dev_scripts_dir.exists() {
                        debug!("Found inference_pipeline at: {:?}", dev_scripts_dir);
                        return dev_scripts_dir;
                    }
                    current = parent;
                }
            }
        }
    }

    std::env::current_dir()
        .unwrap_or_default()
        .join("inference_pipeline")
}

/// Run an external program to completion, capturing stdout and stderr.
/// The invoker holds no state of its own; any filesystem effect belongs to
/// the program and the working directory it was given.
pub async fn run_stage(
    program: &str,
    args: &[String],
    cwd: &Path,
) -> Result<StageOutput, AnalysisError> {
    debug!("Running stage: {} {:?} (cwd {:?})", program, args, cwd);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let mut child = cmd
        .spawn()
        .map_err(|e| AnalysisError::invocation(program, format!("failed to spawn: {}", e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AnalysisError::invocation(program, "failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AnalysisError::invocation(program, "failed to capture stderr"))?;

    // Drain both pipes before waiting so a chatty stage cannot deadlock on a
    // full pipe buffer.
    let stdout_task = async {
        let mut lines = BufReader::new(stdout).lines();
        let mut captured = String::new();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("[stage {}] {}", program, line);
            captured.push_str(&line);
            captured.push('\n');
        }
        captured
    };

    let stderr_task = async {
        let mut lines = BufReader::new(stderr).lines();
        let mut captured: Vec<String> = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            warn!("[stage {} stderr] {}", program, line);
            captured.push(line);
        }
        captured
    };

    let (captured_stdout, captured_stderr) = tokio::join!(stdout_task, stderr_task);

    let status = child
        .wait()
        .await
        .map_err(|e| AnalysisError::invocation(program, format!("failed to wait: {}", e)))?;

    let exit_code = status.code().unwrap_or(-1);
    debug!("Stage {} exited with code {}", program, exit_code);

    if exit_code != 0 {
        let tail_start = captured_stderr.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
        let mut detail = captured_stderr[tail_start..].join("\n");
        if detail.is_empty() {
            detail = format!("exited with code {}", exit_code);
        } else {
            detail = format!("exited with code {}: {}", exit_code, detail);
        }
        return Err(AnalysisError::invocation(program, detail));
    }

    Ok(StageOutput {
        stdout: captured_stdout,
        exit_code,
    })
}

/// Run one of the bundled Python stage scripts with the given working
/// directory.
pub async fn run_python_stage(
    script: &str,
    args: &[String],
    cwd: &Path,
) -> Result<StageOutput, AnalysisError> {
    let script_path = get_stage_scripts_dir().join(script);

    if !script_path.exists() {
        return Err(AnalysisError::invocation(
            script,
            format!("stage script not found: {:?}", script_path),
        ));
    }

    let python = get_python_path();
    let mut full_args = vec![script_path.to_string_lossy().to_string()];
    full_args.extend_from_slice(args);

    run_stage(&python, &full_args, cwd).await.map_err(|e| {
        // Re-key the error on the script name rather than the interpreter.
        match e {
            AnalysisError::Invocation { detail, .. } => AnalysisError::invocation(script, detail),
            other => other,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_successful_stage_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_stage("sh", &args(&["-c", "echo hello"]), dir.path())
            .await
            .unwrap();

        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_invocation_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_stage("sh", &args(&["-c", "echo boom >&2; exit 3"]), dir.path())
            .await
            .unwrap_err();

        match err {
            AnalysisError::Invocation { program, detail } => {
                assert_eq!(program, "sh");
                assert!(detail.contains("code 3"));
                assert!(detail.contains("boom"));
            }
            other => panic!("expected Invocation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_stderr_reports_code() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_stage("sh", &args(&["-c", "exit 7"]), dir.path())
            .await
            .unwrap_err();

        match err {
            AnalysisError::Invocation { detail, .. } => {
                assert!(detail.contains("exited with code 7"));
            }
            other => panic!("expected Invocation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stage_runs_in_given_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        run_stage("sh", &args(&["-c", "touch marker.txt"]), dir.path())
            .await
            .unwrap();

        assert!(dir.path().join("marker.txt").exists());
    }
}
