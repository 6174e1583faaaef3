// Metrics extraction from segmentation stage output.
//
// The segmentation script logs freely to stdout and embeds one JSON block
// between two sentinel lines. Missing or malformed blocks degrade to "no
// metrics" rather than failing the job.

use log::debug;

use crate::models::{DerivedVolumes, MriMetrics};

pub const RESULTS_BLOCK_START: &str = "===ANALYSIS_RESULTS_START===";
pub const RESULTS_BLOCK_END: &str = "===ANALYSIS_RESULTS_END===";

// Fixed-proportion stand-ins for a real sub-segmentation; see DerivedVolumes.
const NECROSIS_FRACTION: f64 = 0.05;
const ENHANCING_FRACTION: f64 = 0.80;

pub fn derive_volumes(tumor_volume: f64) -> DerivedVolumes {
    DerivedVolumes {
        necrosis_volume: tumor_volume * NECROSIS_FRACTION,
        enhancing_volume: tumor_volume * ENHANCING_FRACTION,
    }
}

/// Scan captured stdout for the sentinel-delimited block and parse it.
/// Returns None when the block is absent or unparseable.
pub fn extract_metrics(stdout: &str) -> Option<MriMetrics> {
    let start = stdout.find(RESULTS_BLOCK_START)? + RESULTS_BLOCK_START.len();
    let end = stdout[start..].find(RESULTS_BLOCK_END)?;
    let block = stdout[start..start + end].trim();

    match serde_json::from_str::<MriMetrics>(block) {
        Ok(mut metrics) => {
            metrics.derived = Some(derive_volumes(metrics.tumor_volume));
            Some(metrics)
        }
        Err(e) => {
            debug!("Metrics block present but unparseable: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stdout_with_block(block: &str) -> String {
        format!(
            "Using device: cpu\nModel loaded\n{}\n{}\n{}\ntumor_mask.npy saved\n",
            RESULTS_BLOCK_START, block, RESULTS_BLOCK_END
        )
    }

    #[test]
    fn test_extracts_block_and_derives_volumes() {
        let stdout = stdout_with_block(
            r#"{
                "tumorVolume": 40.0,
                "edemaVolume": 12.5,
                "tumorLocation": "Frontal Lobe",
                "segmentationConfidence": 91.2,
                "intensityStats": {"mean": 0.4, "std": 0.1, "min": 0.0, "max": 1.0},
                "textureFeatures": {"contrast": 55.0, "correlation": 0.8, "energy": 0.3, "homogeneity": 0.7}
            }"#,
        );

        let metrics = extract_metrics(&stdout).unwrap();
        assert_eq!(metrics.tumor_volume, 40.0);
        assert_eq!(metrics.edema_volume, 12.5);
        assert_eq!(metrics.tumor_location, "Frontal Lobe");
        assert_eq!(metrics.segmentation_confidence, Some(91.2));

        let derived = metrics.derived.unwrap();
        assert!((derived.necrosis_volume - 2.0).abs() < 1e-9);
        assert!((derived.enhancing_volume - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_minimal_block_tolerates_missing_optional_fields() {
        let stdout = stdout_with_block(r#"{"tumorVolume": 10.0, "edemaVolume": 3.0}"#);

        let metrics = extract_metrics(&stdout).unwrap();
        assert_eq!(metrics.tumor_location, "");
        assert!(metrics.intensity_stats.is_none());
        assert!(metrics.derived.is_some());
    }

    #[test]
    fn test_missing_markers_is_absent_not_error() {
        assert!(extract_metrics("Model loaded\ntumor_mask.npy saved\n").is_none());
    }

    #[test]
    fn test_start_without_end_is_absent() {
        let stdout = format!("{}\n{{\"tumorVolume\": 1.0}}", RESULTS_BLOCK_START);
        assert!(extract_metrics(&stdout).is_none());
    }

    #[test]
    fn test_malformed_json_is_absent_not_error() {
        let stdout = stdout_with_block("{tumorVolume: oops");
        assert!(extract_metrics(&stdout).is_none());
    }

    #[test]
    fn test_block_missing_required_volume_is_absent() {
        let stdout = stdout_with_block(r#"{"edemaVolume": 3.0}"#);
        assert!(extract_metrics(&stdout).is_none());
    }
}
