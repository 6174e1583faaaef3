// Patient record surface consumed by the orchestrator.
//
// The record-storage layer owns the full patient schema; the pipeline only
// needs the identity and the per-modality fallback paths recorded by earlier
// MRI uploads.
use serde::{Deserialize, Serialize};

use super::ModalityPaths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub mrn: String,
    #[serde(default)]
    pub mri_files: ModalityPaths,
}

impl PatientRecord {
    pub fn new(id: String, mrn: String) -> Self {
        Self {
            id,
            mrn,
            mri_files: ModalityPaths::default(),
        }
    }
}
