//! Derivation of skeleton and hemilineage tables from the synapse stream.

use indexmap::IndexMap;
use tracing::debug;

use crate::data::{HemiLineage, Skeleton, Synapse};
use crate::types::{HemiLineageId, SkeletonId};

/// Entity tables derived from one pass over the deduplicated synapses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DerivedEntities {
    /// One skeleton per distinct `skeleton_id`, in encounter order.
    pub skeletons: Vec<Skeleton>,
    /// One hemilineage per distinct name, with dense encounter-order ids.
    pub hemi_lineages: Vec<HemiLineage>,
}

/// Walk the synapse stream once and build both entity tables.
///
/// Hemilineage ids are dense integers assigned in first-seen order; this
/// ordering is part of the observable output, so the input order matters.
/// A skeleton takes its hemilineage from its first synapse and aggregates the
/// set of neurotransmitter labels across all of its synapses. Synapses
/// without a skeleton id contribute no skeleton; synapses without a
/// hemilineage leave the skeleton's lineage unset.
pub fn derive_entities(synapses: &[Synapse]) -> DerivedEntities {
    let mut lineage_ids: IndexMap<String, HemiLineageId> = IndexMap::new();
    let mut skeletons: IndexMap<SkeletonId, Skeleton> = IndexMap::new();

    for synapse in synapses {
        let hemi_lineage_id = synapse.hemilineage.as_ref().map(|name| {
            let next = lineage_ids.len() as HemiLineageId;
            *lineage_ids.entry(name.clone()).or_insert(next)
        });

        let Some(skeleton_id) = synapse.skeleton_id else {
            continue;
        };
        let skeleton = skeletons.entry(skeleton_id).or_insert_with(|| Skeleton {
            skeleton_id,
            hemi_lineage_id,
            nt_known: Vec::new(),
        });
        if let Some(nt) = &synapse.neurotransmitter {
            if !skeleton.nt_known.contains(nt) {
                skeleton.nt_known.push(nt.clone());
            }
        }
    }

    debug!(
        skeletons = skeletons.len(),
        hemi_lineages = lineage_ids.len(),
        "derived entity tables"
    );

    DerivedEntities {
        skeletons: skeletons.into_values().collect(),
        hemi_lineages: lineage_ids
            .into_iter()
            .map(|(hemi_lineage_name, hemi_lineage_id)| HemiLineage {
                hemi_lineage_id,
                hemi_lineage_name,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synapse(id: u128, skeleton: Option<i64>, lineage: Option<&str>, nt: &str) -> Synapse {
        Synapse {
            synapse_id: id,
            x: 0,
            y: 0,
            z: 0,
            skeleton_id: skeleton,
            brain_region: None,
            hemilineage: lineage.map(|l| l.to_string()),
            lineage: None,
            compartment: None,
            neurotransmitter: Some(nt.to_string()),
        }
    }

    #[test]
    fn hemilineage_ids_are_dense_and_follow_encounter_order() {
        let synapses = vec![
            synapse(1, Some(10), Some("ALad1"), "gaba"),
            synapse(2, Some(11), Some("BAla1"), "gaba"),
            synapse(3, Some(12), Some("ALad1"), "gaba"),
        ];
        let derived = derive_entities(&synapses);
        assert_eq!(
            derived.hemi_lineages,
            vec![
                HemiLineage { hemi_lineage_id: 0, hemi_lineage_name: "ALad1".to_string() },
                HemiLineage { hemi_lineage_id: 1, hemi_lineage_name: "BAla1".to_string() },
            ]
        );
    }

    #[test]
    fn skeletons_aggregate_known_neurotransmitters() {
        let synapses = vec![
            synapse(1, Some(10), Some("ALad1"), "gaba"),
            synapse(2, Some(10), Some("ALad1"), "acetylcholine"),
            synapse(3, Some(10), Some("ALad1"), "gaba"),
        ];
        let derived = derive_entities(&synapses);
        assert_eq!(derived.skeletons.len(), 1);
        assert_eq!(
            derived.skeletons[0].nt_known,
            vec!["gaba".to_string(), "acetylcholine".to_string()]
        );
        assert_eq!(derived.skeletons[0].hemi_lineage_id, Some(0));
    }

    #[test]
    fn missing_keys_map_to_absent_entities() {
        let synapses = vec![
            synapse(1, None, Some("ALad1"), "gaba"),
            synapse(2, Some(10), None, "gaba"),
        ];
        let derived = derive_entities(&synapses);
        // the skeleton-less synapse still registers its hemilineage
        assert_eq!(derived.hemi_lineages.len(), 1);
        assert_eq!(derived.skeletons.len(), 1);
        assert_eq!(derived.skeletons[0].hemi_lineage_id, None);
    }

    #[test]
    fn rerunning_on_the_same_order_reproduces_ids() {
        let synapses = vec![
            synapse(1, Some(10), Some("B"), "gaba"),
            synapse(2, Some(11), Some("A"), "gaba"),
        ];
        assert_eq!(derive_entities(&synapses), derive_entities(&synapses));
        assert_eq!(derive_entities(&synapses).hemi_lineages[0].hemi_lineage_name, "B");
    }
}
