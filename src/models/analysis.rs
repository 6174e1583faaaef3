// Analysis job data models
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// The four MRI modalities the segmentation stage understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    T1,
    T1ce,
    T2,
    Flair,
}

impl Modality {
    /// Argument-building order for the segmentation stage CLI.
    pub const ALL: [Modality; 4] = [Modality::T1, Modality::T1ce, Modality::T2, Modality::Flair];

    /// Fallback order when a slice request names no modality: FLAIR shows
    /// edema best, then contrast-enhanced, then the plain sequences.
    pub const PRIORITY: [Modality; 4] =
        [Modality::Flair, Modality::T1ce, Modality::T1, Modality::T2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::T1 => "t1",
            Modality::T1ce => "t1ce",
            Modality::T2 => "t2",
            Modality::Flair => "flair",
        }
    }

    pub fn cli_flag(&self) -> String {
        format!("--{}", self.as_str())
    }

    pub fn parse(s: &str) -> Option<Modality> {
        match s {
            "t1" => Some(Modality::T1),
            "t1ce" => Some(Modality::T1ce),
            "t2" => Some(Modality::T2),
            "flair" => Some(Modality::Flair),
            _ => None,
        }
    }
}

/// Per-modality storage paths. Present on jobs (per-run inputs) and on
/// patient records (fallbacks from earlier uploads).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModalityPaths {
    pub t1: Option<String>,
    pub t1ce: Option<String>,
    pub t2: Option<String>,
    pub flair: Option<String>,
}

impl ModalityPaths {
    pub fn get(&self, modality: Modality) -> Option<&str> {
        let path = match modality {
            Modality::T1 => &self.t1,
            Modality::T1ce => &self.t1ce,
            Modality::T2 => &self.t2,
            Modality::Flair => &self.flair,
        };
        path.as_deref().filter(|p| !p.is_empty())
    }

    pub fn set(&mut self, modality: Modality, path: String) {
        let slot = match modality {
            Modality::T1 => &mut self.t1,
            Modality::T1ce => &mut self.t1ce,
            Modality::T2 => &mut self.t2,
            Modality::Flair => &mut self.flair,
        };
        *slot = Some(path);
    }

    pub fn is_empty(&self) -> bool {
        Modality::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

/// The fixed set of files a run can leave behind, keyed by what the external
/// scripts name them (shared names) and what we store them as per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Mask,
    ProbabilityMap,
    TumorMesh,
    EdemaMesh,
    BrainMesh,
    CombinedMesh,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Mask,
        ArtifactKind::ProbabilityMap,
        ArtifactKind::TumorMesh,
        ArtifactKind::EdemaMesh,
        ArtifactKind::BrainMesh,
        ArtifactKind::CombinedMesh,
    ];

    /// File name the stage scripts write into the job workspace.
    pub fn shared_name(&self) -> &'static str {
        match self {
            ArtifactKind::Mask => "tumor_mask.npy",
            ArtifactKind::ProbabilityMap => "probability_map.npy",
            ArtifactKind::TumorMesh => "tumor.glb",
            ArtifactKind::EdemaMesh => "edema.glb",
            ArtifactKind::BrainMesh => "brain.glb",
            ArtifactKind::CombinedMesh => "tumor_with_brain.glb",
        }
    }

    /// File name under the job-qualified artifacts directory.
    pub fn target_name(&self) -> &'static str {
        match self {
            ArtifactKind::Mask => "mask.npy",
            ArtifactKind::ProbabilityMap => "probability_map.npy",
            ArtifactKind::TumorMesh => "tumor.glb",
            ArtifactKind::EdemaMesh => "edema.glb",
            ArtifactKind::BrainMesh => "brain.glb",
            ArtifactKind::CombinedMesh => "tumor_brain.glb",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SliceKind {
    Source,
    Mask,
    Heatmap,
}

impl SliceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SliceKind::Source => "source",
            SliceKind::Mask => "mask",
            SliceKind::Heatmap => "heatmap",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlicePlane {
    #[default]
    Axial,
    Sagittal,
    Coronal,
}

impl SlicePlane {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlicePlane::Axial => "axial",
            SlicePlane::Sagittal => "sagittal",
            SlicePlane::Coronal => "coronal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntensityStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextureFeatures {
    pub contrast: f64,
    pub correlation: f64,
    pub energy: f64,
    pub homogeneity: f64,
}

/// Sub-volumes synthesized from the tumor volume with fixed proportions.
/// These are declared heuristics standing in for a real sub-segmentation,
/// not measurements; treat them as placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedVolumes {
    pub necrosis_volume: f64,
    pub enhancing_volume: f64,
}

/// The structured block the segmentation stage embeds in its stdout.
/// Volumes are required; the remaining fields tolerate older stage builds
/// that omit them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MriMetrics {
    pub tumor_volume: f64,
    pub edema_volume: f64,
    #[serde(default)]
    pub tumor_location: String,
    #[serde(default)]
    pub segmentation_confidence: Option<f64>,
    #[serde(default)]
    pub intensity_stats: Option<IntensityStats>,
    #[serde(default)]
    pub texture_features: Option<TextureFeatures>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedVolumes>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: String,
    pub patient_id: String,
    pub status: AnalysisStatus,
    pub mri_files: ModalityPaths,
    /// Free-form result payload; the merged metrics snapshot lands here.
    pub data: serde_json::Value,
    pub confidence: Option<f64>,
    pub processing_time_ms: Option<u64>,
    pub error: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl AnalysisJob {
    pub fn new(id: String, patient_id: String, mri_files: ModalityPaths) -> Self {
        Self {
            id,
            patient_id,
            status: AnalysisStatus::Pending,
            mri_files,
            data: serde_json::json!({}),
            confidence: None,
            processing_time_ms: None,
            error: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }
}
