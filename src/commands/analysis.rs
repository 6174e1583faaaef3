// Analysis job operations - consumed by the HTTP layer.

use log::{debug, info};
use std::fs;
use std::path::Path;

use crate::error::AnalysisError;
use crate::file_manager::store;
use crate::models::{AnalysisJob, Modality, ModalityPaths};
use crate::pipeline;
use crate::utils::{get_job_artifacts_dir, get_job_workspace_dir};

pub fn list_analysis_jobs() -> Result<Vec<AnalysisJob>, AnalysisError> {
    store::load_jobs().map_err(AnalysisError::Store)
}

pub fn list_patient_analyses(patient_id: &str) -> Result<Vec<AnalysisJob>, AnalysisError> {
    let jobs = store::load_jobs().map_err(AnalysisError::Store)?;
    Ok(jobs
        .into_iter()
        .filter(|j| j.patient_id == patient_id)
        .collect())
}

pub fn get_analysis_job(job_id: &str) -> Result<AnalysisJob, AnalysisError> {
    store::find_job(job_id)
        .map_err(AnalysisError::Store)?
        .ok_or_else(|| AnalysisError::InvalidInput(format!("Analysis job not found: {}", job_id)))
}

/// Create a job in `pending`. Modality references are optional (resolution
/// falls back to the patient record, then the bundled sample), but any
/// reference that is provided must point at an existing file.
pub fn submit_analysis_job(
    patient_id: String,
    mri_files: ModalityPaths,
) -> Result<serde_json::Value, AnalysisError> {
    if store::find_patient(&patient_id)
        .map_err(AnalysisError::Store)?
        .is_none()
    {
        return Err(AnalysisError::InvalidInput(format!(
            "Patient not found: {}",
            patient_id
        )));
    }

    for modality in Modality::ALL {
        if let Some(path) = mri_files.get(modality) {
            if !Path::new(path).exists() {
                return Err(AnalysisError::InvalidInput(format!(
                    "Input file not found for {}: {}",
                    modality.as_str(),
                    path
                )));
            }
        }
    }

    let job_id = uuid::Uuid::new_v4().to_string();
    let job = AnalysisJob::new(job_id.clone(), patient_id, mri_files);

    store::insert_job(job).map_err(AnalysisError::Store)?;

    debug!("Submitted analysis job: {}", job_id);
    Ok(serde_json::json!({ "job_id": job_id }))
}

/// Run (or re-run) the full pipeline for a job. The call blocks for the
/// duration of the stage chain and returns the terminal job record.
pub async fn run_analysis_job(job_id: &str) -> Result<AnalysisJob, AnalysisError> {
    pipeline::run_analysis_job(job_id).await
}

/// Remove a job record, optionally together with its relocated artifacts
/// and scratch workspace.
pub fn delete_analysis_job(job_id: &str, delete_artifacts: bool) -> Result<(), AnalysisError> {
    let removed = store::remove_job(job_id).map_err(AnalysisError::Store)?;

    if delete_artifacts {
        for dir in [get_job_artifacts_dir(&removed.id), get_job_workspace_dir(&removed.id)] {
            if dir.exists() {
                if let Err(e) = fs::remove_dir_all(&dir) {
                    debug!("Warning: failed to delete {:?}: {}", dir, e);
                }
            }
        }
    }

    info!("Deleted analysis job: {}", job_id);
    Ok(())
}
