// Modality input resolution.
//
// A job may carry its own per-run input paths; anything it lacks falls back
// to the owning patient record's stored uploads. A job with no resolvable
// input at all runs against the bundled sample volume - a permissive
// fallback, not an error.

use std::path::{Path, PathBuf};

use crate::models::{AnalysisJob, Modality, PatientRecord};
use crate::utils::get_default_sample_path;

/// Job-level reference first, then the patient record's upload for the same
/// modality. Empty strings count as absent.
pub fn resolve_modality_path(
    job: &AnalysisJob,
    patient: Option<&PatientRecord>,
    modality: Modality,
) -> Option<String> {
    if let Some(path) = job.mri_files.get(modality) {
        return Some(path.to_string());
    }
    patient
        .and_then(|p| p.mri_files.get(modality))
        .map(|p| p.to_string())
}

/// Pick the volume a source-slice request should render: the explicitly
/// requested modality when it resolves, otherwise the first hit along the
/// fixed priority chain, otherwise the bundled sample.
pub fn resolve_source_volume(
    job: &AnalysisJob,
    patient: Option<&PatientRecord>,
    requested: Option<Modality>,
) -> PathBuf {
    if let Some(modality) = requested {
        if let Some(path) = resolve_modality_path(job, patient, modality) {
            return PathBuf::from(path);
        }
    }

    for modality in Modality::PRIORITY {
        if let Some(path) = resolve_modality_path(job, patient, modality) {
            return PathBuf::from(path);
        }
    }

    get_default_sample_path()
}

/// Build the segmentation stage argument list. Each resolved modality
/// contributes a `--<modality> <path>` pair; a job with nothing resolvable
/// gets the sample volume under the primary-contrast flag.
pub fn build_segmentation_args(job: &AnalysisJob, patient: Option<&PatientRecord>) -> Vec<String> {
    let mut args = Vec::new();

    for modality in Modality::ALL {
        if let Some(path) = resolve_modality_path(job, patient, modality) {
            args.push(modality.cli_flag());
            args.push(path);
        }
    }

    if args.is_empty() {
        args.push(Modality::T1.cli_flag());
        args.push(get_default_sample_path().to_string_lossy().to_string());
    }

    args
}

/// File-type tag the slice renderer expects for a given volume path.
pub fn volume_file_type(path: &Path) -> &'static str {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".npy") {
        "npy"
    } else {
        "nii"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModalityPaths;

    fn job_with(files: ModalityPaths) -> AnalysisJob {
        AnalysisJob::new("job-1".into(), "patient-1".into(), files)
    }

    fn patient_with(files: ModalityPaths) -> PatientRecord {
        let mut patient = PatientRecord::new("patient-1".into(), "MRN-001".into());
        patient.mri_files = files;
        patient
    }

    #[test]
    fn test_job_reference_beats_patient_and_chain() {
        let job = job_with(ModalityPaths {
            flair: Some("/scans/job_flair.nii.gz".into()),
            ..Default::default()
        });
        let patient = patient_with(ModalityPaths {
            t1ce: Some("/scans/patient_t1ce.nii.gz".into()),
            ..Default::default()
        });

        let resolved = resolve_source_volume(&job, Some(&patient), None);
        assert_eq!(resolved, PathBuf::from("/scans/job_flair.nii.gz"));
    }

    #[test]
    fn test_explicit_modality_request_wins() {
        let job = job_with(ModalityPaths {
            t2: Some("/scans/t2.nii.gz".into()),
            flair: Some("/scans/flair.nii.gz".into()),
            ..Default::default()
        });

        let resolved = resolve_source_volume(&job, None, Some(Modality::T2));
        assert_eq!(resolved, PathBuf::from("/scans/t2.nii.gz"));
    }

    #[test]
    fn test_unresolvable_explicit_request_falls_back_to_chain() {
        let job = job_with(ModalityPaths {
            t1: Some("/scans/t1.nii.gz".into()),
            ..Default::default()
        });

        let resolved = resolve_source_volume(&job, None, Some(Modality::Flair));
        assert_eq!(resolved, PathBuf::from("/scans/t1.nii.gz"));
    }

    #[test]
    fn test_patient_fallback_fills_missing_modality() {
        let job = job_with(ModalityPaths::default());
        let patient = patient_with(ModalityPaths {
            t1ce: Some("/scans/patient_t1ce.nii.gz".into()),
            ..Default::default()
        });

        assert_eq!(
            resolve_modality_path(&job, Some(&patient), Modality::T1ce),
            Some("/scans/patient_t1ce.nii.gz".into())
        );
    }

    #[test]
    fn test_empty_string_reference_counts_as_absent() {
        let job = job_with(ModalityPaths {
            t1: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(resolve_modality_path(&job, None, Modality::T1), None);
    }

    #[test]
    fn test_no_inputs_anywhere_uses_bundled_sample() {
        let job = job_with(ModalityPaths::default());
        let resolved = resolve_source_volume(&job, None, None);
        assert_eq!(resolved, get_default_sample_path());
    }

    #[test]
    fn test_args_only_include_resolved_modalities() {
        let job = job_with(ModalityPaths {
            t1: Some("/scans/t1.nii.gz".into()),
            flair: Some("/scans/flair.nii.gz".into()),
            ..Default::default()
        });

        let args = build_segmentation_args(&job, None);
        assert_eq!(
            args,
            vec!["--t1", "/scans/t1.nii.gz", "--flair", "/scans/flair.nii.gz"]
        );
    }

    #[test]
    fn test_args_fall_back_to_sample_when_empty() {
        let job = job_with(ModalityPaths::default());
        let args = build_segmentation_args(&job, None);

        assert_eq!(args[0], "--t1");
        assert!(args[1].ends_with("sample_mri.nii.gz"));
    }

    #[test]
    fn test_volume_file_type_tags() {
        assert_eq!(volume_file_type(Path::new("/a/mask.npy")), "npy");
        assert_eq!(volume_file_type(Path::new("/a/scan.nii.gz")), "nii");
        assert_eq!(volume_file_type(Path::new("/a/scan.nii")), "nii");
    }
}
