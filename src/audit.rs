//! Per-class data-quality gate applied once, before any split.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::config::SplitConfig;
use crate::data::Synapse;
use crate::types::{Neurotransmitter, SkeletonId};

/// Synapse and distinct-skeleton counts for one neurotransmitter class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassStats {
    /// Total synapses carrying this label.
    pub synapses: usize,
    /// Distinct skeletons carrying this label.
    pub skeletons: usize,
}

/// Outcome of the admission gate, kept for audit reporting.
#[derive(Clone, Debug)]
pub struct AdmissionReport {
    /// Per-class counts in encounter order.
    pub stats: IndexMap<Neurotransmitter, ClassStats>,
    /// Classes that passed both thresholds.
    pub admitted: Vec<Neurotransmitter>,
    /// Synapses dropped because their class missed a threshold.
    pub dropped_synapses: usize,
    /// Synapses dropped because they carry no neurotransmitter label.
    pub unlabeled_synapses: usize,
}

/// Count synapses and distinct skeletons per class, in encounter order.
pub fn class_stats(synapses: &[Synapse]) -> IndexMap<Neurotransmitter, ClassStats> {
    let mut stats: IndexMap<Neurotransmitter, ClassStats> = IndexMap::new();
    let mut skeletons: IndexMap<Neurotransmitter, HashSet<Option<SkeletonId>>> = IndexMap::new();
    for synapse in synapses {
        let Some(nt) = &synapse.neurotransmitter else {
            continue;
        };
        stats.entry(nt.clone()).or_default().synapses += 1;
        skeletons
            .entry(nt.clone())
            .or_default()
            .insert(synapse.skeleton_id);
    }
    for (nt, seen) in skeletons {
        stats[&nt].skeletons = seen.len();
    }
    stats
}

/// Drop synapses whose class falls below the admission thresholds.
///
/// This is a data-quality gate, not part of the balancing search; it runs
/// exactly once, before the first split stage.
pub fn apply_admission(
    synapses: Vec<Synapse>,
    config: &SplitConfig,
) -> (Vec<Synapse>, AdmissionReport) {
    let stats = class_stats(&synapses);
    info!(classes = stats.len(), "neurotransmitter counts");
    for (nt, counts) in &stats {
        info!(
            class = nt.as_str(),
            synapses = counts.synapses,
            skeletons = counts.skeletons,
            "class counts"
        );
    }

    let admitted: Vec<Neurotransmitter> = stats
        .iter()
        .filter(|(_, counts)| {
            counts.synapses >= config.min_synapses_per_class
                && counts.skeletons >= config.min_skeletons_per_class
        })
        .map(|(nt, _)| nt.clone())
        .collect();
    for nt in stats.keys() {
        if !admitted.contains(nt) {
            warn!(class = nt.as_str(), "excluding underrepresented class");
        }
    }

    let mut dropped_synapses = 0;
    let mut unlabeled_synapses = 0;
    let kept: Vec<Synapse> = synapses
        .into_iter()
        .filter(|synapse| match &synapse.neurotransmitter {
            Some(nt) if admitted.contains(nt) => true,
            Some(_) => {
                dropped_synapses += 1;
                false
            }
            None => {
                unlabeled_synapses += 1;
                false
            }
        })
        .collect();
    if dropped_synapses + unlabeled_synapses > 0 {
        info!(
            dropped = dropped_synapses,
            unlabeled = unlabeled_synapses,
            "skipped synapses with filtered or missing neurotransmitter"
        );
    }

    (
        kept,
        AdmissionReport {
            stats,
            admitted,
            dropped_synapses,
            unlabeled_synapses,
        },
    )
}
