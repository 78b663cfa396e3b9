//! End-to-end ingestion: load, gate, deduplicate, derive, persist, split.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use tracing::{info, warn};

use crate::audit::{AdmissionReport, apply_admission};
use crate::config::{DatasetSpec, SplitConfig};
use crate::data::{RawSynapse, SplitAttribute, Synapse};
use crate::db::SynapseDatabase;
use crate::dedup::{DedupReport, deduplicate};
use crate::derive::derive_entities;
use crate::errors::IngestError;
use crate::ids::{resolve_skeleton_id, resolve_synapse_id};
use crate::orchestrator::SplitOrchestrator;
use crate::types::SynapseId;

/// Audit summary of one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    /// Synapses read from the input files before any filtering.
    pub total_synapses: usize,
    /// Outcome of the class admission gate.
    pub admission: AdmissionReport,
    /// Outcome of id deduplication.
    pub dedup: DedupReport,
    /// Synapses excluded because they belong to the holdout set.
    pub excluded_holdout: usize,
    /// Names of the splits that were created.
    pub splits_written: Vec<String>,
}

/// Bring one raw record into canonical form.
fn normalize(raw: RawSynapse, voxel_size_zyx: [i64; 3]) -> Synapse {
    let synapse_id = resolve_synapse_id(&raw, voxel_size_zyx);
    let skeleton_id = resolve_skeleton_id(&raw);
    Synapse {
        synapse_id,
        x: raw.x as i64,
        y: raw.y as i64,
        z: raw.z as i64,
        skeleton_id,
        brain_region: raw.region,
        hemilineage: raw.hemilineage,
        lineage: raw.lineage,
        compartment: raw.compartment,
        neurotransmitter: raw.neurotransmitter,
    }
}

/// Load normalized synapse records from consolidated JSON files.
///
/// Single malformed records are logged and skipped (data-quality policy); an
/// unreadable or non-array file fails the whole run.
pub fn read_synapses(
    files: &[PathBuf],
    data_dir: &Path,
    voxel_size_zyx: [i64; 3],
) -> Result<Vec<Synapse>, IngestError> {
    let mut synapses = Vec::new();
    for file in files {
        let path = data_dir.join(file);
        info!(path = %path.display(), "reading synapses");
        let bytes = fs::read(&path)?;
        let values: Vec<serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|source| IngestError::Json {
                path: path.display().to_string(),
                source,
            })?;
        let mut skipped = 0usize;
        for value in values {
            let raw: RawSynapse = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping malformed synapse record");
                    skipped += 1;
                    continue;
                }
            };
            if !(raw.x.is_finite() && raw.y.is_finite() && raw.z.is_finite()) {
                warn!(
                    path = %path.display(),
                    "skipping synapse record with non-finite coordinates"
                );
                skipped += 1;
                continue;
            }
            synapses.push(normalize(raw, voxel_size_zyx));
        }
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "skipped malformed records");
        }
    }
    Ok(synapses)
}

/// Run the full ingestion for one dataset: read, gate, deduplicate, derive,
/// persist, then create the named splits.
pub fn run_pipeline<D: SynapseDatabase>(
    spec: &DatasetSpec,
    data_dir: &Path,
    db: &mut D,
    config: &SplitConfig,
    overwrite: bool,
) -> Result<PipelineReport, IngestError> {
    let config = config.clone().normalized()?;
    let synapses = read_synapses(&spec.files, data_dir, spec.voxel_size_zyx)?;
    let total_synapses = synapses.len();

    // Admission gate runs once, before any split stage.
    let (synapses, admission) = apply_admission(synapses, &config);
    let (synapses, dedup) = deduplicate(synapses);
    let derived = derive_entities(&synapses);

    db.create(overwrite)?;
    db.write(&synapses, &derived.skeletons, &derived.hemi_lineages)?;

    let holdout_ids: IndexSet<SynapseId> = if spec.holdout_files.is_empty() {
        IndexSet::new()
    } else {
        read_synapses(&spec.holdout_files, data_dir, spec.voxel_size_zyx)?
            .iter()
            .map(|synapse| synapse.synapse_id)
            .collect()
    };
    let holdout_set: HashSet<SynapseId> = holdout_ids.iter().copied().collect();
    let (synapses, excluded_holdout) = SplitOrchestrator::exclude_holdout(synapses, &holdout_set);

    db.init_splits()?;
    let orchestrator = SplitOrchestrator::new(config);
    let mut splits_written = Vec::new();

    if let Some(outcome) = orchestrator.create_split(
        &synapses,
        SplitAttribute::SkeletonId,
        spec.test_fraction,
        spec.validation_fraction,
    ) {
        db.make_split("skeleton", &outcome.train, &outcome.test, &outcome.validation)?;
        splits_written.push("skeleton".to_string());
    }

    let no_test = orchestrator.create_split(
        &synapses,
        SplitAttribute::SkeletonId,
        0.0,
        spec.validation_fraction,
    );
    if let Some(outcome) = &no_test {
        db.make_split(
            "skeleton_no_test",
            &outcome.train,
            &outcome.test,
            &outcome.validation,
        )?;
        splits_written.push("skeleton_no_test".to_string());
    }
    if !holdout_ids.is_empty() {
        if let Some(outcome) = no_test {
            // holdout synapses rejoin training verbatim, in file order
            let mut train = outcome.train.clone();
            train.extend(holdout_ids.iter().copied());
            db.make_split(
                "skeleton_no_test_including_holdout",
                &train,
                &outcome.test,
                &outcome.validation,
            )?;
            splits_written.push("skeleton_no_test_including_holdout".to_string());
        }
    }

    if let Some(outcome) = orchestrator.create_split(
        &synapses,
        SplitAttribute::BrainRegion,
        spec.test_fraction,
        spec.validation_fraction,
    ) {
        db.make_split(
            "brain_region",
            &outcome.train,
            &outcome.test,
            &outcome.validation,
        )?;
        splits_written.push("brain_region".to_string());
    }

    Ok(PipelineReport {
        total_synapses,
        admission,
        dedup,
        excluded_holdout,
        splits_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_ids_and_rounds_coordinates() {
        let raw: RawSynapse = serde_json::from_str(
            r#"{"skid": 12, "connector_id": 99, "x": 10.7, "y": 20.2, "z": 30.9,
                "region": "AL_R", "neurotransmitter": "gaba"}"#,
        )
        .unwrap();
        let synapse = normalize(raw, [8, 8, 8]);
        assert_eq!(synapse.synapse_id, 99);
        assert_eq!(synapse.skeleton_id, Some(12));
        assert_eq!((synapse.x, synapse.y, synapse.z), (10, 20, 30));
        assert_eq!(synapse.brain_region.as_deref(), Some("AL_R"));
    }

    #[test]
    fn read_synapses_skips_malformed_records() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("synapses.json"),
            r#"[
                {"connector_id": 1, "x": 1.0, "y": 2.0, "z": 3.0, "neurotransmitter": "gaba"},
                {"connector_id": 2, "x": "broken", "y": 2.0, "z": 3.0},
                {"connector_id": 3, "x": 1.0, "y": 2.0}
            ]"#,
        )
        .unwrap();
        let synapses =
            read_synapses(&[PathBuf::from("synapses.json")], dir.path(), [8, 8, 8]).unwrap();
        assert_eq!(synapses.len(), 1);
        assert_eq!(synapses[0].synapse_id, 1);
    }

    #[test]
    fn read_synapses_fails_on_a_non_array_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("synapses.json"), "{}").unwrap();
        let err =
            read_synapses(&[PathBuf::from("synapses.json")], dir.path(), [8, 8, 8]).unwrap_err();
        assert!(matches!(err, IngestError::Json { .. }));
    }
}
