use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

static APP_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Root of all persisted state. Hosts and tests can redirect it with the
/// NEUROSCAN_DATA_DIR environment variable before first use.
pub fn get_app_data_dir() -> PathBuf {
    APP_DATA_DIR
        .get_or_init(|| {
            if let Ok(dir) = std::env::var("NEUROSCAN_DATA_DIR") {
                return PathBuf::from(dir);
            }
            let base_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."));
            base_dir.join("NeuroScan")
        })
        .clone()
}

pub fn get_data_dir() -> PathBuf {
    get_app_data_dir().join("data")
}

pub fn get_uploads_dir() -> PathBuf {
    get_app_data_dir().join("uploads")
}

pub fn get_mri_uploads_dir() -> PathBuf {
    get_uploads_dir().join("mri")
}

/// Scratch directories the external stages run in, one per job id.
pub fn get_workspaces_dir() -> PathBuf {
    get_app_data_dir().join("workspaces")
}

pub fn get_job_workspace_dir(job_id: &str) -> PathBuf {
    get_workspaces_dir().join(job_id)
}

/// Relocated per-job outputs (mask, probability map, meshes).
pub fn get_artifacts_dir() -> PathBuf {
    get_app_data_dir().join("artifacts")
}

pub fn get_job_artifacts_dir(job_id: &str) -> PathBuf {
    get_artifacts_dir().join(job_id)
}

pub fn get_assets_dir() -> PathBuf {
    get_app_data_dir().join("assets")
}

/// Shared AR meshes (e.g. the reference brain) usable by any job.
pub fn get_shared_assets_dir() -> PathBuf {
    get_assets_dir().join("ar")
}

/// Generic template meshes, the last stop of model resolution.
pub fn get_template_assets_dir() -> PathBuf {
    get_assets_dir().join("templates")
}

/// Bundled sample volume substituted when a job has no input at all.
pub fn get_default_sample_path() -> PathBuf {
    get_assets_dir().join("sample_mri.nii.gz")
}

pub fn get_analysis_jobs_json_path() -> PathBuf {
    get_data_dir().join("analysis_jobs.json")
}

pub fn get_patients_json_path() -> PathBuf {
    get_data_dir().join("patients.json")
}

pub fn initialize_data_directories() -> Result<(), String> {
    let directories = [
        get_data_dir(),
        get_mri_uploads_dir(),
        get_workspaces_dir(),
        get_artifacts_dir(),
        get_shared_assets_dir(),
        get_template_assets_dir(),
    ];

    for dir in &directories {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                format!("Failed to create directory {:?}: {}", dir, e)
            })?;
            log::info!("Created directory: {:?}", dir);
        }
    }

    Ok(())
}
