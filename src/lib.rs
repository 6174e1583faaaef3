// NeuroScan - imaging-analysis job orchestrator.
//
// Drives a segmentation run from a submitted job record through the
// external stage chain, isolates each run's artifacts per job, and serves
// derived slices and meshes on demand. The hosting HTTP layer calls the
// functions in `commands`; logger installation also belongs to the host.

pub mod commands;
pub mod error;
pub mod file_manager;
pub mod models;
pub mod pipeline;
pub mod process_manager;
pub mod utils;

pub use commands::analysis::{
    delete_analysis_job, get_analysis_job, list_analysis_jobs, list_patient_analyses,
    run_analysis_job, submit_analysis_job,
};
pub use commands::patients::{get_patient, register_mri_upload, register_patient};
pub use commands::retrieval::{get_model, get_model_base64, get_slice};
pub use error::AnalysisError;

use file_manager::initialize_json_file;
use utils::{get_analysis_jobs_json_path, get_patients_json_path, initialize_data_directories};

/// Create the data layout and seed the stores. Idempotent; hosts call this
/// once at startup, before serving requests.
pub fn initialize_app_data() -> Result<(), String> {
    initialize_data_directories()?;

    let empty_vec: Vec<serde_json::Value> = vec![];
    initialize_json_file(&get_analysis_jobs_json_path(), &empty_vec)?;
    initialize_json_file(&get_patients_json_path(), &empty_vec)?;

    pipeline::workspace::cleanup_stale_workspaces();

    Ok(())
}
