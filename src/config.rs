use std::path::PathBuf;

use crate::constants::{admission, split};
use crate::errors::IngestError;

/// Tuning knobs shared by every split the orchestrator creates.
#[derive(Clone, Debug)]
pub struct SplitConfig {
    /// Absolute tolerance on the per-class deviation from the target fraction.
    pub tolerance: f64,
    /// Seed for the per-synapse fallback shuffle.
    pub fallback_seed: u64,
    /// Classes with fewer synapses than this are dropped before any split.
    pub min_synapses_per_class: usize,
    /// Classes spanning fewer distinct skeletons than this are dropped too.
    pub min_skeletons_per_class: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            tolerance: split::DEFAULT_TOLERANCE,
            fallback_seed: split::FALLBACK_SHUFFLE_SEED,
            min_synapses_per_class: admission::MIN_SYNAPSES_PER_CLASS,
            min_skeletons_per_class: admission::MIN_SKELETONS_PER_CLASS,
        }
    }
}

impl SplitConfig {
    /// Validate that the tolerance is a usable fraction deviation bound.
    pub fn normalized(self) -> Result<Self, IngestError> {
        if !(0.0..=1.0).contains(&self.tolerance) {
            return Err(IngestError::Configuration(
                "split tolerance must lie in [0, 1]".to_string(),
            ));
        }
        Ok(self)
    }
}

/// One named dataset: which consolidated files to load and how to split them.
#[derive(Clone, Debug)]
pub struct DatasetSpec {
    /// Dataset name used on the command line.
    pub name: &'static str,
    /// Consolidated record files, relative to the data directory.
    pub files: Vec<PathBuf>,
    /// Files whose synapse ids form the holdout set (excluded from splits).
    pub holdout_files: Vec<PathBuf>,
    /// Voxel size in `(z, y, x)` order, used for derived synapse ids.
    pub voxel_size_zyx: [i64; 3],
    /// Name of the output database.
    pub db_name: &'static str,
    /// Fraction of the whole dataset to use for testing.
    pub test_fraction: f64,
    /// Fraction of the remaining data to use for validation.
    pub validation_fraction: f64,
}

/// Built-in dataset presets matching the consolidated data layouts.
pub fn builtin_datasets() -> Vec<DatasetSpec> {
    vec![
        DatasetSpec {
            name: "fafb",
            files: vec![
                PathBuf::from("fafb/consolidated/connectors_by_hemi_lineage_v4.json"),
                PathBuf::from(
                    "fafb/consolidated/verified_predicted_synapses_by_transmitter_v4.json",
                ),
            ],
            holdout_files: vec![PathBuf::from(
                "fafb/consolidated/connectors_by_hemi_lineage_confident_v4.json",
            )],
            voxel_size_zyx: [40, 4, 4],
            db_name: "synsplit_fafb_v4",
            test_fraction: 0.2,
            validation_fraction: 0.2,
        },
        DatasetSpec {
            name: "fafb_confident",
            files: vec![PathBuf::from(
                "fafb/consolidated/connectors_by_hemi_lineage_confident_v4.json",
            )],
            holdout_files: Vec::new(),
            voxel_size_zyx: [40, 4, 4],
            db_name: "synsplit_fafb_v4_confident",
            test_fraction: 0.0,
            validation_fraction: 1.0,
        },
        DatasetSpec {
            name: "hemi",
            files: vec![PathBuf::from(
                "hemi/consolidated/hemibrain_connectors_by_hemi_lineage.json",
            )],
            holdout_files: Vec::new(),
            voxel_size_zyx: [8, 8, 8],
            db_name: "synsplit_hemi_v1",
            test_fraction: 0.2,
            validation_fraction: 0.2,
        },
        DatasetSpec {
            name: "malevnc",
            files: vec![PathBuf::from("malevnc/consolidated/synapses.json")],
            holdout_files: Vec::new(),
            voxel_size_zyx: [8, 8, 8],
            db_name: "synsplit_malevnc_v0",
            test_fraction: 0.2,
            validation_fraction: 0.2,
        },
    ]
}

/// Look up a built-in dataset preset by name.
pub fn dataset_by_name(name: &str) -> Result<DatasetSpec, IngestError> {
    builtin_datasets()
        .into_iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| IngestError::UnknownDataset(name.to_string()))
}
