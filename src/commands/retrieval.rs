// Retrieval operations - slices and 3D models, consumed by the HTTP layer.
//
// Slices are rendered on demand by the external renderer and returned as
// base64 PNG for inline transport. Models are served from the job's
// artifact directory with shared/template fallbacks. Both pre-check that
// the resolved file exists: an absent artifact is a typed "not ready"/"not
// found" response, never a renderer crash.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use std::fs;
use std::path::PathBuf;

use crate::error::AnalysisError;
use crate::models::{AnalysisJob, ArtifactKind, Modality, SliceKind, SlicePlane};
use crate::pipeline::inputs::{resolve_source_volume, volume_file_type};
use crate::pipeline::SLICE_SCRIPT;
use crate::process_manager::{get_stage_scripts_dir, run_python_stage};
use crate::utils::{
    get_job_artifacts_dir, get_shared_assets_dir, get_template_assets_dir,
};

use super::analysis::get_analysis_job;

const COMBINED_MODEL: ArtifactKind = ArtifactKind::CombinedMesh;

fn resolve_slice_volume(
    job: &AnalysisJob,
    kind: SliceKind,
    modality: Option<Modality>,
) -> Result<PathBuf, AnalysisError> {
    let artifacts_dir = get_job_artifacts_dir(&job.id);

    let path = match kind {
        SliceKind::Source => {
            let patient = crate::file_manager::store::find_patient(&job.patient_id)
                .map_err(AnalysisError::Store)?;
            resolve_source_volume(job, patient.as_ref(), modality)
        }
        SliceKind::Mask => artifacts_dir.join(ArtifactKind::Mask.target_name()),
        SliceKind::Heatmap => artifacts_dir.join(ArtifactKind::ProbabilityMap.target_name()),
    };

    Ok(path)
}

/// Render one slice of the requested volume and return it as a base64 PNG
/// string. Fails with `NotReady` before touching the renderer when the
/// resolved file is not on storage yet.
pub async fn get_slice(
    job_id: &str,
    index: u32,
    kind: SliceKind,
    plane: SlicePlane,
    modality: Option<Modality>,
) -> Result<String, AnalysisError> {
    let job = get_analysis_job(job_id)?;
    let volume = resolve_slice_volume(&job, kind, modality)?;

    if !volume.exists() {
        return Err(AnalysisError::NotReady(format!(
            "{} volume for job {} is not on storage yet",
            kind.as_str(),
            job_id
        )));
    }

    let args = vec![
        volume.to_string_lossy().to_string(),
        volume_file_type(&volume).to_string(),
        index.to_string(),
        kind.as_str().to_string(),
        plane.as_str().to_string(),
    ];

    let output = run_python_stage(SLICE_SCRIPT, &args, &get_stage_scripts_dir()).await?;
    let encoded = output.stdout.trim().to_string();

    // The renderer prints exactly one base64 PNG; anything else means it
    // broke in a way its exit code did not report.
    BASE64.decode(&encoded).map_err(|_| {
        AnalysisError::invocation(SLICE_SCRIPT, "renderer did not produce base64 image data")
    })?;

    debug!(
        "Rendered {} slice {} ({}) for job {}",
        kind.as_str(),
        index,
        plane.as_str(),
        job_id
    );
    Ok(encoded)
}

fn sanitize_model_name(name: &str) -> Result<String, AnalysisError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid model name: {}",
            name
        )));
    }
    if name.ends_with(".glb") {
        Ok(name.to_string())
    } else {
        Ok(format!("{}.glb", name))
    }
}

/// Fetch mesh bytes for a job. A named model resolves through the job's
/// artifact directory, then the shared AR assets, then the templates; the
/// unnamed form serves only the job's combined model.
pub fn get_model(job_id: &str, model_name: Option<&str>) -> Result<Vec<u8>, AnalysisError> {
    let job = get_analysis_job(job_id)?;
    let artifacts_dir = get_job_artifacts_dir(&job.id);

    match model_name {
        Some(name) => {
            let file_name = sanitize_model_name(name)?;
            let candidates = [
                artifacts_dir.join(&file_name),
                get_shared_assets_dir().join(&file_name),
                get_template_assets_dir().join(&file_name),
            ];

            for candidate in &candidates {
                if candidate.exists() {
                    debug!("Serving model {:?} for job {}", candidate, job_id);
                    return Ok(fs::read(candidate)?);
                }
            }

            Err(AnalysisError::NotFound(format!(
                "No model named {} for job {}",
                file_name, job_id
            )))
        }
        None => {
            let combined = artifacts_dir.join(COMBINED_MODEL.target_name());
            if !combined.exists() {
                return Err(AnalysisError::NotReady(format!(
                    "Combined model for job {} is not on storage yet",
                    job_id
                )));
            }
            Ok(fs::read(combined)?)
        }
    }
}

/// Mesh bytes encoded for inline transport.
pub fn get_model_base64(job_id: &str, model_name: Option<&str>) -> Result<String, AnalysisError> {
    let bytes = get_model(job_id, model_name)?;
    Ok(BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_appends_extension() {
        assert_eq!(sanitize_model_name("tumor").unwrap(), "tumor.glb");
        assert_eq!(sanitize_model_name("brain.glb").unwrap(), "brain.glb");
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert!(sanitize_model_name("../secrets").is_err());
        assert!(sanitize_model_name("a/b").is_err());
        assert!(sanitize_model_name("a\\b").is_err());
        assert!(sanitize_model_name("").is_err());
    }
}
