//! Resolution of colliding synapse ids produced during consolidation.

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::data::Synapse;
use crate::types::SynapseId;

/// Audit report of what deduplication removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DedupReport {
    /// Ids whose repeats were field-identical; one occurrence was kept.
    pub deduplicated_ids: Vec<SynapseId>,
    /// Ids whose repeats disagreed in some field; all occurrences dropped.
    pub conflicting_ids_removed: Vec<SynapseId>,
}

/// Collapse repeated synapse ids.
///
/// Field-identical repeats keep the first occurrence (a boundary record
/// captured by two source files is a benign duplication). Repeats that differ
/// in any field cannot be attributed to an authoritative source, so every
/// occurrence of that id is dropped. Idempotent: the output contains each id
/// at most once, so a second pass finds nothing.
pub fn deduplicate(synapses: Vec<Synapse>) -> (Vec<Synapse>, DedupReport) {
    let mut occurrences: IndexMap<SynapseId, Vec<usize>> = IndexMap::new();
    for (idx, synapse) in synapses.iter().enumerate() {
        occurrences.entry(synapse.synapse_id).or_default().push(idx);
    }

    let mut report = DedupReport::default();
    let mut removed_identical = 0usize;
    let mut removed_conflicting = 0usize;
    let mut keep = vec![true; synapses.len()];
    for (id, indices) in &occurrences {
        if indices.len() < 2 {
            continue;
        }
        let reference = &synapses[indices[0]];
        let identical = indices[1..].iter().all(|&idx| synapses[idx] == *reference);
        if identical {
            for &idx in &indices[1..] {
                keep[idx] = false;
            }
            removed_identical += indices.len() - 1;
            report.deduplicated_ids.push(*id);
        } else {
            for &idx in indices {
                keep[idx] = false;
            }
            removed_conflicting += indices.len();
            report.conflicting_ids_removed.push(*id);
            warn!(synapse_id = %id, occurrences = indices.len(), "dropping conflicting duplicate id");
        }
    }

    if !report.deduplicated_ids.is_empty() || !report.conflicting_ids_removed.is_empty() {
        info!(
            duplicate_ids = report.deduplicated_ids.len() + report.conflicting_ids_removed.len(),
            identical_ids = report.deduplicated_ids.len(),
            conflicting_ids = report.conflicting_ids_removed.len(),
            removed_identical,
            removed_conflicting,
            "deduplicated synapse ids"
        );
    }

    let deduplicated = synapses
        .into_iter()
        .zip(keep)
        .filter_map(|(synapse, kept)| kept.then_some(synapse))
        .collect();
    (deduplicated, report)
}
