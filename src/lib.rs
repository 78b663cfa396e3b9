#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Per-class admission gate and count auditing.
pub mod audit;
/// Split tuning knobs and built-in dataset presets.
pub mod config;
/// Centralized constants used across admission, splitting, and persistence.
pub mod constants;
/// Synapse records and derived entity types.
pub mod data;
/// Persistence trait and bundled backends.
pub mod db;
/// Duplicate synapse-id resolution.
pub mod dedup;
/// Skeleton and hemilineage table derivation.
pub mod derive;
/// Deterministic id derivation from coordinates.
pub mod ids;
/// End-to-end ingestion pipeline.
pub mod ingest;
/// Two-stage split orchestration with per-class fallback.
pub mod orchestrator;
/// Group-atomic, class-balanced partition search.
pub mod partition;
/// Shared identifier and label aliases.
pub mod types;

mod errors;

pub use audit::{AdmissionReport, ClassStats};
pub use config::{DatasetSpec, SplitConfig, builtin_datasets, dataset_by_name};
pub use data::{GroupKey, HemiLineage, RawSynapse, Skeleton, SplitAttribute, Synapse};
pub use db::{JsonFileDatabase, MemoryDatabase, SplitRecord, SynapseDatabase};
pub use dedup::{DedupReport, deduplicate};
pub use derive::{DerivedEntities, derive_entities};
pub use errors::{IngestError, SplitError};
pub use ingest::{PipelineReport, read_synapses, run_pipeline};
pub use orchestrator::{SplitOrchestrator, SplitOutcome};
pub use partition::{PartitionOutcome, partition_groups};
pub use types::{HemiLineageId, Neurotransmitter, RegionName, SkeletonId, SynapseId};
