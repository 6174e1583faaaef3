// Patient record surface the pipeline depends on.
//
// Full patient CRUD belongs to the record-storage collaborator; these
// operations exist so modality uploads can be registered as fallback inputs
// for later analysis runs.

use log::debug;

use crate::error::AnalysisError;
use crate::file_manager::store;
use crate::models::{Modality, ModalityPaths, PatientRecord};

pub fn register_patient(mrn: String) -> Result<PatientRecord, AnalysisError> {
    let patient = PatientRecord::new(uuid::Uuid::new_v4().to_string(), mrn);
    store::upsert_patient(patient.clone()).map_err(AnalysisError::Store)?;
    Ok(patient)
}

pub fn get_patient(patient_id: &str) -> Result<PatientRecord, AnalysisError> {
    store::find_patient(patient_id)
        .map_err(AnalysisError::Store)?
        .ok_or_else(|| AnalysisError::InvalidInput(format!("Patient not found: {}", patient_id)))
}

/// Record stored modality paths on the patient after an MRI upload. Only
/// the modalities present in `files` are touched; separators are normalized
/// so stored paths are portable.
pub fn register_mri_upload(
    patient_id: &str,
    files: ModalityPaths,
) -> Result<PatientRecord, AnalysisError> {
    let updated = store::update_patient(patient_id, |patient| {
        for modality in Modality::ALL {
            if let Some(path) = files.get(modality) {
                patient
                    .mri_files
                    .set(modality, path.replace('\\', "/"));
            }
        }
    })
    .map_err(AnalysisError::Store)?;

    debug!("Registered MRI upload for patient {}", patient_id);
    Ok(updated)
}
