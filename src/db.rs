//! Persistence boundary for canonical records and named splits.
//!
//! The core depends only on the [`SynapseDatabase`] trait; backends are
//! opaque and idempotent on overwrite. The bundled [`JsonFileDatabase`]
//! persists plain JSON files, [`MemoryDatabase`] backs tests.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::db::{
    HEMI_LINEAGES_FILENAME, SKELETONS_FILENAME, SPLITS_FILENAME, SYNAPSES_FILENAME,
};
use crate::data::{HemiLineage, Skeleton, Synapse};
use crate::errors::IngestError;
use crate::types::SynapseId;

/// One named split's partition assignment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRecord {
    /// Training partition.
    pub train: Vec<SynapseId>,
    /// Test partition.
    pub test: Vec<SynapseId>,
    /// Validation partition.
    pub validation: Vec<SynapseId>,
}

/// Storage backend for one ingested dataset.
pub trait SynapseDatabase {
    /// Create (or, with `overwrite`, recreate) the database.
    fn create(&mut self, overwrite: bool) -> Result<(), IngestError>;
    /// Persist the canonical records and derived entity tables.
    fn write(
        &mut self,
        synapses: &[Synapse],
        skeletons: &[Skeleton],
        hemi_lineages: &[HemiLineage],
    ) -> Result<(), IngestError>;
    /// Prepare empty split storage.
    fn init_splits(&mut self) -> Result<(), IngestError>;
    /// Persist one named split; immutable once written except by overwrite.
    fn make_split(
        &mut self,
        name: &str,
        train: &[SynapseId],
        test: &[SynapseId],
        validation: &[SynapseId],
    ) -> Result<(), IngestError>;
}

/// JSON-file backend: one directory per database, one file per table.
#[derive(Clone, Debug)]
pub struct JsonFileDatabase {
    root: PathBuf,
}

impl JsonFileDatabase {
    /// Use (without creating yet) the database directory at `root`.
    pub fn open<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding this database's files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<(), IngestError> {
        let path = self.root.join(filename);
        let file = fs::File::create(&path)?;
        serde_json::to_writer(file, value).map_err(|err| {
            IngestError::Database(format!("failed to write '{}': {err}", path.display()))
        })
    }

    fn read_splits(&self) -> Result<IndexMap<String, SplitRecord>, IngestError> {
        let path = self.root.join(SPLITS_FILENAME);
        let bytes = fs::read(&path)?;
        serde_json::from_slice(&bytes).map_err(|err| {
            IngestError::Database(format!("corrupt splits file '{}': {err}", path.display()))
        })
    }
}

impl SynapseDatabase for JsonFileDatabase {
    fn create(&mut self, overwrite: bool) -> Result<(), IngestError> {
        if self.root.exists() {
            if !overwrite {
                return Err(IngestError::Database(format!(
                    "database '{}' already exists",
                    self.root.display()
                )));
            }
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn write(
        &mut self,
        synapses: &[Synapse],
        skeletons: &[Skeleton],
        hemi_lineages: &[HemiLineage],
    ) -> Result<(), IngestError> {
        self.write_json(SYNAPSES_FILENAME, &synapses)?;
        self.write_json(SKELETONS_FILENAME, &skeletons)?;
        self.write_json(HEMI_LINEAGES_FILENAME, &hemi_lineages)?;
        info!(
            synapses = synapses.len(),
            skeletons = skeletons.len(),
            hemi_lineages = hemi_lineages.len(),
            root = %self.root.display(),
            "wrote dataset tables"
        );
        Ok(())
    }

    fn init_splits(&mut self) -> Result<(), IngestError> {
        self.write_json(SPLITS_FILENAME, &IndexMap::<String, SplitRecord>::new())
    }

    fn make_split(
        &mut self,
        name: &str,
        train: &[SynapseId],
        test: &[SynapseId],
        validation: &[SynapseId],
    ) -> Result<(), IngestError> {
        let mut splits = self.read_splits()?;
        splits.insert(
            name.to_string(),
            SplitRecord {
                train: train.to_vec(),
                test: test.to_vec(),
                validation: validation.to_vec(),
            },
        );
        self.write_json(SPLITS_FILENAME, &splits)?;
        info!(
            split = name,
            train = train.len(),
            test = test.len(),
            validation = validation.len(),
            "stored split"
        );
        Ok(())
    }
}

/// In-memory backend used by tests and dry runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryDatabase {
    /// Persisted synapse table.
    pub synapses: Vec<Synapse>,
    /// Persisted skeleton table.
    pub skeletons: Vec<Skeleton>,
    /// Persisted hemilineage table.
    pub hemi_lineages: Vec<HemiLineage>,
    /// Named splits in insertion order.
    pub splits: IndexMap<String, SplitRecord>,
    created: bool,
    splits_initialized: bool,
}

impl SynapseDatabase for MemoryDatabase {
    fn create(&mut self, overwrite: bool) -> Result<(), IngestError> {
        if self.created && !overwrite {
            return Err(IngestError::Database("database already exists".to_string()));
        }
        *self = Self { created: true, ..Self::default() };
        Ok(())
    }

    fn write(
        &mut self,
        synapses: &[Synapse],
        skeletons: &[Skeleton],
        hemi_lineages: &[HemiLineage],
    ) -> Result<(), IngestError> {
        self.synapses = synapses.to_vec();
        self.skeletons = skeletons.to_vec();
        self.hemi_lineages = hemi_lineages.to_vec();
        Ok(())
    }

    fn init_splits(&mut self) -> Result<(), IngestError> {
        self.splits.clear();
        self.splits_initialized = true;
        Ok(())
    }

    fn make_split(
        &mut self,
        name: &str,
        train: &[SynapseId],
        test: &[SynapseId],
        validation: &[SynapseId],
    ) -> Result<(), IngestError> {
        if !self.splits_initialized {
            return Err(IngestError::Database("splits not initialized".to_string()));
        }
        self.splits.insert(
            name.to_string(),
            SplitRecord {
                train: train.to_vec(),
                test: test.to_vec(),
                validation: validation.to_vec(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_synapse() -> Synapse {
        Synapse {
            synapse_id: 7,
            x: 1,
            y: 2,
            z: 3,
            skeleton_id: Some(9),
            brain_region: Some("AL_R".to_string()),
            hemilineage: Some("ALad1".to_string()),
            lineage: None,
            compartment: None,
            neurotransmitter: Some("gaba".to_string()),
        }
    }

    #[test]
    fn json_database_round_trips_tables_and_splits() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("db");
        let mut db = JsonFileDatabase::open(&root);
        db.create(true).unwrap();
        db.write(
            &[sample_synapse()],
            &[Skeleton { skeleton_id: 9, hemi_lineage_id: Some(0), nt_known: vec!["gaba".into()] }],
            &[HemiLineage { hemi_lineage_id: 0, hemi_lineage_name: "ALad1".into() }],
        )
        .unwrap();
        db.init_splits().unwrap();
        db.make_split("skeleton", &[7], &[], &[]).unwrap();
        db.make_split("brain_region", &[], &[7], &[]).unwrap();

        let synapses: Vec<Synapse> =
            serde_json::from_slice(&fs::read(root.join(SYNAPSES_FILENAME)).unwrap()).unwrap();
        assert_eq!(synapses, vec![sample_synapse()]);
        let splits = db.read_splits().unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits["skeleton"].train, vec![7]);
        assert_eq!(splits["brain_region"].test, vec![7]);
    }

    #[test]
    fn create_without_overwrite_refuses_existing_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("db");
        let mut db = JsonFileDatabase::open(&root);
        db.create(false).unwrap();
        assert!(matches!(db.create(false), Err(IngestError::Database(_))));
        // overwrite recreates from scratch
        db.create(true).unwrap();
        assert!(root.exists());
    }

    #[test]
    fn overwrite_discards_previous_splits() {
        let dir = tempdir().unwrap();
        let mut db = JsonFileDatabase::open(dir.path().join("db"));
        db.create(true).unwrap();
        db.init_splits().unwrap();
        db.make_split("skeleton", &[1], &[2], &[3]).unwrap();
        db.create(true).unwrap();
        db.init_splits().unwrap();
        assert!(db.read_splits().unwrap().is_empty());
    }

    #[test]
    fn memory_database_requires_split_initialization() {
        let mut db = MemoryDatabase::default();
        db.create(false).unwrap();
        assert!(db.make_split("skeleton", &[], &[], &[]).is_err());
        db.init_splits().unwrap();
        db.make_split("skeleton", &[1], &[], &[]).unwrap();
        assert_eq!(db.splits["skeleton"].train, vec![1]);
    }
}
