// Analysis pipeline orchestration.
//
// One run is a sequential stage chain inside the caller's request:
// segmentation (fatal on failure), then mesh generation (logged on
// failure), then artifact relocation and metrics merge. The job store's
// status field is written only here.

pub mod artifacts;
pub mod inputs;
pub mod metrics;
pub mod workspace;

use log::{info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::error::AnalysisError;
use crate::file_manager::store;
use crate::models::{AnalysisJob, AnalysisStatus, MriMetrics, PatientRecord};
use crate::process_manager::run_python_stage;

pub const SEGMENTATION_SCRIPT: &str = "infer_segmentation.py";
pub const SLICE_SCRIPT: &str = "extract_slice.py";

/// Mesh stages run in order; each failure is logged and skipped.
pub const MESH_SCRIPTS: [&str; 2] = ["mask_to_mesh.py", "merge_ar_scene.py"];

lazy_static::lazy_static! {
    // One async mutex per job id so racing run calls for the same job
    // serialize instead of sharing a workspace.
    static ref RUN_LOCKS: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>> =
        Mutex::new(HashMap::new());
}

fn run_lock_for(job_id: &str) -> Arc<tokio::sync::Mutex<()>> {
    RUN_LOCKS
        .lock()
        .entry(job_id.to_string())
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone()
}

/// Set the terminal success state and merge the (optional) metrics
/// snapshot into the result payload.
pub fn mark_completed(job: &mut AnalysisJob, metrics: Option<&MriMetrics>, elapsed_ms: u64) {
    job.status = AnalysisStatus::Completed;
    job.processing_time_ms = Some(elapsed_ms);
    job.completed_at = Some(chrono::Utc::now().to_rfc3339());
    job.error = None;

    // A re-run replaces the result wholesale: a missing metrics block means
    // the enrichment fields are absent, not inherited from the prior run.
    match metrics {
        Some(metrics) => {
            job.data = serde_json::to_value(metrics).unwrap_or_else(|_| serde_json::json!({}));
            job.confidence = metrics.segmentation_confidence;
        }
        None => {
            job.data = serde_json::json!({});
            job.confidence = None;
        }
    }
}

/// Set the terminal failure state, storing the message verbatim. The prior
/// result payload is left untouched.
pub fn mark_failed(job: &mut AnalysisJob, error: String) {
    job.status = AnalysisStatus::Failed;
    job.error = Some(error);
}

struct RunOutcome {
    metrics: Option<MriMetrics>,
    elapsed_ms: u64,
}

async fn execute_stages(
    job: &AnalysisJob,
    patient: Option<&PatientRecord>,
) -> Result<RunOutcome, AnalysisError> {
    let started = Instant::now();
    let workspace = workspace::prepare_job_workspace(&job.id)?;

    let args = inputs::build_segmentation_args(job, patient);
    let output = run_python_stage(SEGMENTATION_SCRIPT, &args, &workspace).await?;

    let metrics = metrics::extract_metrics(&output.stdout);
    if metrics.is_none() {
        warn!("Job {}: no metrics block in segmentation output", job.id);
    }

    for script in MESH_SCRIPTS {
        if let Err(e) = run_python_stage(script, &[], &workspace).await {
            // Degraded, not fatal: the job completes with fewer meshes.
            warn!("Job {}: mesh stage degraded: {}", job.id, e);
        }
    }

    match artifacts::relocate_artifacts(&job.id, &workspace) {
        Ok(relocated) => info!("Job {}: relocated {} artifact(s)", job.id, relocated.len()),
        Err(e) => warn!("Job {}: artifact relocation degraded: {}", job.id, e),
    }

    Ok(RunOutcome {
        metrics,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

/// Execute the full pipeline for a job. Always leaves the job in a terminal
/// state: `Completed` when the segmentation stage exits zero (whatever the
/// mesh stages did), `Failed` otherwise.
pub async fn run_analysis_job(job_id: &str) -> Result<AnalysisJob, AnalysisError> {
    let lock = run_lock_for(job_id);
    let _guard = lock.lock().await;

    // Any persisted status is runnable: racing in-process callers are
    // serialized by the lock above, and a job orphaned in `processing` by a
    // dead host is recovered by exactly this call.
    let job = store::find_job(job_id)
        .map_err(AnalysisError::Store)?
        .ok_or_else(|| AnalysisError::InvalidInput(format!("Analysis job not found: {}", job_id)))?;

    let patient = store::find_patient(&job.patient_id).map_err(AnalysisError::Store)?;

    let job = store::update_job(job_id, |j| {
        j.status = AnalysisStatus::Processing;
        j.error = None;
    })
    .map_err(AnalysisError::Store)?;

    info!("Job {}: processing started", job_id);

    match execute_stages(&job, patient.as_ref()).await {
        Ok(outcome) => {
            let updated = store::update_job(job_id, |j| {
                mark_completed(j, outcome.metrics.as_ref(), outcome.elapsed_ms);
            })
            .map_err(AnalysisError::Store)?;

            info!("Job {}: completed in {} ms", job_id, outcome.elapsed_ms);
            Ok(updated)
        }
        Err(e) => {
            let message = e.to_string();
            store::update_job(job_id, |j| mark_failed(j, message.clone()))
                .map_err(AnalysisError::Store)?;

            warn!("Job {}: failed: {}", job_id, message);
            Err(e)
        }
    }
}
