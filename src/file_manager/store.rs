// Job and patient collection stores.
//
// Thin read-modify-write layer over the JSON files. The json_ops lock only
// covers single reads/writes, so updates here take their own lock to keep a
// concurrent submit from losing a concurrent status change.

use parking_lot::Mutex;
use std::path::Path;

use crate::file_manager::{read_json_file, write_json_file};
use crate::models::{AnalysisJob, PatientRecord};
use crate::utils::{get_analysis_jobs_json_path, get_patients_json_path};

lazy_static::lazy_static! {
    static ref STORE_LOCK: Mutex<()> = Mutex::new(());
}

fn load_collection<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, String> {
    if !path.exists() {
        return Ok(vec![]);
    }
    read_json_file(path)
}

pub fn load_jobs() -> Result<Vec<AnalysisJob>, String> {
    load_collection(&get_analysis_jobs_json_path())
}

pub fn find_job(job_id: &str) -> Result<Option<AnalysisJob>, String> {
    Ok(load_jobs()?.into_iter().find(|j| j.id == job_id))
}

pub fn insert_job(job: AnalysisJob) -> Result<(), String> {
    let _lock = STORE_LOCK.lock();
    let path = get_analysis_jobs_json_path();
    let mut jobs: Vec<AnalysisJob> = load_collection(&path)?;
    jobs.push(job);
    write_json_file(&path, &jobs)
}

/// Apply `update_fn` to the stored job and persist the result. Returns the
/// updated record, or an error if the id is unknown.
pub fn update_job<F>(job_id: &str, update_fn: F) -> Result<AnalysisJob, String>
where
    F: FnOnce(&mut AnalysisJob),
{
    let _lock = STORE_LOCK.lock();
    let path = get_analysis_jobs_json_path();
    let mut jobs: Vec<AnalysisJob> = load_collection(&path)?;

    let job = jobs
        .iter_mut()
        .find(|j| j.id == job_id)
        .ok_or_else(|| format!("Analysis job not found: {}", job_id))?;

    update_fn(job);
    let updated = job.clone();

    write_json_file(&path, &jobs)?;
    Ok(updated)
}

pub fn remove_job(job_id: &str) -> Result<AnalysisJob, String> {
    let _lock = STORE_LOCK.lock();
    let path = get_analysis_jobs_json_path();
    let mut jobs: Vec<AnalysisJob> = load_collection(&path)?;

    let index = jobs
        .iter()
        .position(|j| j.id == job_id)
        .ok_or_else(|| format!("Analysis job not found: {}", job_id))?;

    let removed = jobs.remove(index);
    write_json_file(&path, &jobs)?;
    Ok(removed)
}

pub fn load_patients() -> Result<Vec<PatientRecord>, String> {
    load_collection(&get_patients_json_path())
}

pub fn find_patient(patient_id: &str) -> Result<Option<PatientRecord>, String> {
    Ok(load_patients()?.into_iter().find(|p| p.id == patient_id))
}

/// Insert or replace-by-id.
pub fn upsert_patient(patient: PatientRecord) -> Result<(), String> {
    let _lock = STORE_LOCK.lock();
    let path = get_patients_json_path();
    let mut patients: Vec<PatientRecord> = load_collection(&path)?;

    match patients.iter_mut().find(|p| p.id == patient.id) {
        Some(existing) => *existing = patient,
        None => patients.push(patient),
    }

    write_json_file(&path, &patients)
}

pub fn update_patient<F>(patient_id: &str, update_fn: F) -> Result<PatientRecord, String>
where
    F: FnOnce(&mut PatientRecord),
{
    let _lock = STORE_LOCK.lock();
    let path = get_patients_json_path();
    let mut patients: Vec<PatientRecord> = load_collection(&path)?;

    let patient = patients
        .iter_mut()
        .find(|p| p.id == patient_id)
        .ok_or_else(|| format!("Patient not found: {}", patient_id))?;

    update_fn(patient);
    let updated = patient.clone();

    write_json_file(&path, &patients)?;
    Ok(updated)
}
