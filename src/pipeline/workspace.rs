// Per-job stage workspaces.
//
// Every run gets its own working directory, so the fixed-name files the
// external scripts write can never interleave across concurrently running
// jobs. Relocation afterwards is a rename within the same tree.

use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::models::ArtifactKind;
use crate::utils::{get_job_workspace_dir, get_workspaces_dir};

const WORKSPACE_RETENTION_DAYS: u64 = 7;

/// Create (or reuse) the workspace for a job and clear any fixed-name
/// outputs left over from a previous run, so a failed stage cannot get a
/// stale file relocated as if it were fresh.
pub fn prepare_job_workspace(job_id: &str) -> io::Result<PathBuf> {
    let workspace = get_job_workspace_dir(job_id);
    fs::create_dir_all(&workspace)?;
    clear_stage_outputs(&workspace)?;
    Ok(workspace)
}

pub fn clear_stage_outputs(workspace: &Path) -> io::Result<()> {
    for kind in ArtifactKind::ALL {
        let leftover = workspace.join(kind.shared_name());
        if leftover.exists() {
            fs::remove_file(&leftover)?;
        }
    }
    Ok(())
}

/// Remove workspaces untouched for longer than the retention window.
/// Artifacts are never swept; only the scratch directories are.
pub fn cleanup_stale_workspaces() {
    let retention = Duration::from_secs(WORKSPACE_RETENTION_DAYS * 24 * 60 * 60);
    sweep_stale(&get_workspaces_dir(), retention);
}

pub fn sweep_stale(root: &Path, retention: Duration) {
    if !root.exists() {
        return;
    }

    let now = SystemTime::now();

    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let age = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            if let Some(age) = age {
                if age > retention {
                    match fs::remove_dir_all(&path) {
                        Ok(()) => info!("Swept stale workspace: {:?}", path.file_name()),
                        Err(e) => warn!("Failed to sweep workspace {:?}: {}", path, e),
                    }
                }
            }
        }
    }
}
