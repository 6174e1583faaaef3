// Artifact relocation.
//
// Stage scripts write fixed-name outputs into the job workspace. After a run
// those files move into the job-qualified artifacts directory under their
// target names. Each kind relocates independently: an absent source is
// skipped silently (mesh stages are optional and may have failed), an
// existing target is overwritten.

use log::debug;
use std::fs;
use std::io;
use std::path::Path;

use crate::models::ArtifactKind;
use crate::utils::get_job_artifacts_dir;

/// Move every artifact kind present in `workspace` into `artifacts_dir`.
/// Returns the kinds that were actually relocated.
pub fn relocate_into(workspace: &Path, artifacts_dir: &Path) -> io::Result<Vec<ArtifactKind>> {
    fs::create_dir_all(artifacts_dir)?;

    let mut relocated = Vec::new();
    for kind in ArtifactKind::ALL {
        let source = workspace.join(kind.shared_name());
        if !source.exists() {
            debug!("Artifact {:?} not produced, skipping", kind);
            continue;
        }

        let target = artifacts_dir.join(kind.target_name());
        if target.exists() {
            fs::remove_file(&target)?;
        }
        fs::rename(&source, &target)?;
        relocated.push(kind);
    }

    Ok(relocated)
}

pub fn relocate_artifacts(job_id: &str, workspace: &Path) -> io::Result<Vec<ArtifactKind>> {
    relocate_into(workspace, &get_job_artifacts_dir(job_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_partial_relocation_only_moves_present_kinds() {
        let workspace = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        let artifacts_dir = artifacts.path().join("job-1");

        // Only the mask exists; mesh stages never ran.
        touch(&workspace.path().join("tumor_mask.npy"), "mask-bytes");

        let relocated = relocate_into(workspace.path(), &artifacts_dir).unwrap();
        assert_eq!(relocated, vec![ArtifactKind::Mask]);
        assert!(artifacts_dir.join("mask.npy").exists());
        assert!(!artifacts_dir.join("tumor.glb").exists());
        assert!(!workspace.path().join("tumor_mask.npy").exists());
    }

    #[test]
    fn test_second_pass_without_sources_leaves_targets_alone() {
        let workspace = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        let artifacts_dir = artifacts.path().join("job-1");

        touch(&workspace.path().join("tumor_mask.npy"), "first-run");
        relocate_into(workspace.path(), &artifacts_dir).unwrap();

        // Workspace is now empty of sources; relocating again must not
        // delete or alter the already-relocated file.
        let relocated = relocate_into(workspace.path(), &artifacts_dir).unwrap();
        assert!(relocated.is_empty());
        assert_eq!(
            fs::read_to_string(artifacts_dir.join("mask.npy")).unwrap(),
            "first-run"
        );
    }

    #[test]
    fn test_rerun_overwrites_previous_target() {
        let workspace = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        let artifacts_dir = artifacts.path().join("job-1");

        touch(&workspace.path().join("tumor.glb"), "old-mesh");
        relocate_into(workspace.path(), &artifacts_dir).unwrap();

        touch(&workspace.path().join("tumor.glb"), "new-mesh");
        relocate_into(workspace.path(), &artifacts_dir).unwrap();

        assert_eq!(
            fs::read_to_string(artifacts_dir.join("tumor.glb")).unwrap(),
            "new-mesh"
        );
    }

    #[test]
    fn test_combined_mesh_relocates_under_merge_stage_output_name() {
        let workspace = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        let artifacts_dir = artifacts.path().join("job-1");

        // The merge stage exports tumor_with_brain.glb.
        touch(&workspace.path().join("tumor_with_brain.glb"), "combined");
        let relocated = relocate_into(workspace.path(), &artifacts_dir).unwrap();

        assert_eq!(relocated, vec![ArtifactKind::CombinedMesh]);
        assert!(artifacts_dir
            .join(ArtifactKind::CombinedMesh.target_name())
            .exists());
    }

    #[test]
    fn test_creates_artifacts_dir_on_first_use() {
        let workspace = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        let artifacts_dir = artifacts.path().join("deep").join("job-9");

        touch(&workspace.path().join("probability_map.npy"), "probs");
        let relocated = relocate_into(workspace.path(), &artifacts_dir).unwrap();

        assert_eq!(relocated, vec![ArtifactKind::ProbabilityMap]);
        assert!(artifacts_dir.join("probability_map.npy").exists());
    }
}
