//! Two-stage split orchestration with per-class fallback.
//!
//! Composes train/validation/test assignments from repeated partitioner
//! calls: first test vs. the rest, then validation vs. train on the
//! remainder. Classes the partitioner cannot balance at the group level fall
//! back to a seeded per-synapse split, so every run terminates with a
//! complete assignment.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::config::SplitConfig;
use crate::data::{GroupKey, SplitAttribute, Synapse};
use crate::errors::SplitError;
use crate::partition::partition_groups;
use crate::types::{Neurotransmitter, SynapseId};

/// Complete three-way assignment produced by one orchestrated split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Synapse ids assigned to the training partition.
    pub train: Vec<SynapseId>,
    /// Synapse ids assigned to the validation partition.
    pub validation: Vec<SynapseId>,
    /// Synapse ids assigned to the test partition.
    pub test: Vec<SynapseId>,
    /// Classes that required the per-synapse fallback in some stage.
    pub fallback_classes: Vec<Neurotransmitter>,
    /// Synapses skipped because the split attribute was absent.
    pub skipped_missing_attribute: usize,
    /// Synapses skipped because the neurotransmitter label was absent.
    pub skipped_missing_class: usize,
}

/// Drives the partitioner across the split hierarchy for one attribute.
#[derive(Clone, Debug)]
pub struct SplitOrchestrator {
    config: SplitConfig,
}

impl SplitOrchestrator {
    /// Create an orchestrator with the given tuning knobs.
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Remove synapses whose id is in the holdout set, returning the survivors
    /// and the exclusion count. Holdout synapses are reported, never split.
    pub fn exclude_holdout(
        synapses: Vec<Synapse>,
        holdout_ids: &HashSet<SynapseId>,
    ) -> (Vec<Synapse>, usize) {
        let original = synapses.len();
        let kept: Vec<Synapse> = synapses
            .into_iter()
            .filter(|synapse| !holdout_ids.contains(&synapse.synapse_id))
            .collect();
        let excluded = original - kept.len();
        if excluded > 0 {
            info!(excluded, total = original, "excluded holdout synapses");
        }
        (kept, excluded)
    }

    /// Create a train/validation/test split over `attribute`.
    ///
    /// Returns `None` when no synapse carries both the split attribute and a
    /// class label; the caller skips the split rather than failing the run.
    pub fn create_split(
        &self,
        synapses: &[Synapse],
        attribute: SplitAttribute,
        test_fraction: f64,
        validation_fraction: f64,
    ) -> Option<SplitOutcome> {
        info!(
            attribute = attribute.as_str(),
            test_fraction, validation_fraction, "creating split"
        );

        let mut class_by_id: IndexMap<SynapseId, Neurotransmitter> = IndexMap::new();
        let mut group_by_id: IndexMap<SynapseId, GroupKey> = IndexMap::new();
        let mut skipped_missing_attribute = 0;
        let mut skipped_missing_class = 0;
        for synapse in synapses {
            let Some(group) = attribute.group_key(synapse) else {
                skipped_missing_attribute += 1;
                continue;
            };
            let Some(nt) = &synapse.neurotransmitter else {
                skipped_missing_class += 1;
                continue;
            };
            class_by_id.insert(synapse.synapse_id, nt.clone());
            group_by_id.insert(synapse.synapse_id, group);
        }

        let groups: IndexSet<&GroupKey> = group_by_id.values().collect();
        let mut classes: Vec<Neurotransmitter> = class_by_id
            .values()
            .cloned()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        // sorted so the class set is reproducible regardless of input order
        classes.sort();
        info!(
            attribute = attribute.as_str(),
            groups = groups.len(),
            classes = classes.len(),
            skipped_missing_attribute,
            skipped_missing_class,
            total = synapses.len(),
            "split eligibility"
        );

        if class_by_id.is_empty() {
            info!(
                attribute = attribute.as_str(),
                "no synapses left with the required attributes, skipping split"
            );
            return None;
        }

        let ids: Vec<SynapseId> = class_by_id.keys().copied().collect();
        let mut active = classes;
        let mut fallback = Vec::new();

        let (train_validation, test) = self.split_stage(
            &ids,
            &class_by_id,
            &group_by_id,
            &mut active,
            &mut fallback,
            test_fraction,
            "(train + validation)",
            "test",
        );
        let (train, validation) = self.split_stage(
            &train_validation,
            &class_by_id,
            &group_by_id,
            &mut active,
            &mut fallback,
            validation_fraction,
            "train",
            "validation",
        );

        Some(SplitOutcome {
            train,
            validation,
            test,
            fallback_classes: fallback,
            skipped_missing_attribute,
            skipped_missing_class,
        })
    }

    /// One two-way stage: group-level partition with a retry loop that demotes
    /// infeasible classes to the per-synapse fallback, then the fallback
    /// itself. Always terminates with a complete assignment of `ids` whose
    /// class is still active or marked for fallback.
    #[allow(clippy::too_many_arguments)]
    fn split_stage(
        &self,
        ids: &[SynapseId],
        class_by_id: &IndexMap<SynapseId, Neurotransmitter>,
        group_by_id: &IndexMap<SynapseId, GroupKey>,
        active: &mut Vec<Neurotransmitter>,
        fallback: &mut Vec<Neurotransmitter>,
        fraction_b: f64,
        side_a_name: &str,
        side_b_name: &str,
    ) -> (Vec<SynapseId>, Vec<SynapseId>) {
        let mut side_a: Vec<SynapseId>;
        let mut side_b: Vec<SynapseId>;
        loop {
            info!(
                side_a = side_a_name,
                side_b = side_b_name,
                objective_a = 1.0 - fraction_b,
                objective_b = fraction_b,
                "creating split stage"
            );
            let filtered: Vec<SynapseId> = ids
                .iter()
                .filter(|id| active.contains(&class_by_id[*id]))
                .copied()
                .collect();

            // Trivial fractions need no search at all.
            if fraction_b <= 0.0 {
                info!(side = side_b_name, "fraction is 0, no need to split");
                side_a = filtered;
                side_b = Vec::new();
                break;
            }
            if fraction_b >= 1.0 {
                info!(side = side_b_name, "fraction is 1, no need to split");
                side_a = Vec::new();
                side_b = filtered;
                break;
            }

            let items: Vec<(GroupKey, Neurotransmitter)> = filtered
                .iter()
                .map(|id| (group_by_id[id].clone(), class_by_id[id].clone()))
                .collect();
            match partition_groups(&items, active, fraction_b, self.config.tolerance) {
                Ok(outcome) => {
                    let b_groups: HashSet<&GroupKey> = outcome.side_b.iter().collect();
                    side_a = Vec::new();
                    side_b = Vec::new();
                    for id in &filtered {
                        if b_groups.contains(&group_by_id[id]) {
                            side_b.push(*id);
                        } else {
                            side_a.push(*id);
                        }
                    }
                    break;
                }
                Err(SplitError::Infeasible { class, achieved, target, .. }) => {
                    warn!(
                        class = class.as_str(),
                        achieved,
                        target,
                        "failed to create optimal split, falling back to per-synapse split for this class"
                    );
                    active.retain(|c| c != &class);
                    fallback.push(class);
                }
            }
        }

        // Per-synapse fallback: group atomicity is deliberately given up for
        // classes that could not be balanced, in exchange for an exact cut.
        for class in fallback.iter() {
            let mut class_ids: Vec<SynapseId> = ids
                .iter()
                .filter(|id| &class_by_id[*id] == class)
                .copied()
                .collect();
            let mut rng = StdRng::seed_from_u64(self.config.fallback_seed);
            class_ids.shuffle(&mut rng);
            let cut = ((1.0 - fraction_b) * class_ids.len() as f64) as usize;
            info!(
                class = class.as_str(),
                side_a = cut,
                total = class_ids.len(),
                "split class randomly per synapse"
            );
            side_a.extend_from_slice(&class_ids[..cut]);
            side_b.extend_from_slice(&class_ids[cut..]);
        }

        (side_a, side_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synapse(id: u128, skeleton: i64, nt: &str) -> Synapse {
        Synapse {
            synapse_id: id,
            x: 0,
            y: 0,
            z: 0,
            skeleton_id: Some(skeleton),
            brain_region: None,
            hemilineage: None,
            lineage: None,
            compartment: None,
            neurotransmitter: Some(nt.to_string()),
        }
    }

    /// 10 equal skeletons, 5 synapses each, one class.
    fn uniform_synapses() -> Vec<Synapse> {
        let mut synapses = Vec::new();
        let mut id = 0u128;
        for skeleton in 0..10 {
            for _ in 0..5 {
                synapses.push(synapse(id, skeleton, "gaba"));
                id += 1;
            }
        }
        synapses
    }

    fn orchestrator() -> SplitOrchestrator {
        SplitOrchestrator::new(SplitConfig {
            min_synapses_per_class: 1,
            min_skeletons_per_class: 1,
            ..SplitConfig::default()
        })
    }

    #[test]
    fn split_assigns_every_eligible_synapse_exactly_once() {
        let synapses = uniform_synapses();
        let outcome = orchestrator()
            .create_split(&synapses, SplitAttribute::SkeletonId, 0.2, 0.25)
            .unwrap();
        let mut all: Vec<SynapseId> = outcome
            .train
            .iter()
            .chain(&outcome.validation)
            .chain(&outcome.test)
            .copied()
            .collect();
        all.sort();
        let mut expected: Vec<SynapseId> = (0..50).collect();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn groups_stay_atomic_without_fallback() {
        let synapses = uniform_synapses();
        let outcome = orchestrator()
            .create_split(&synapses, SplitAttribute::SkeletonId, 0.2, 0.25)
            .unwrap();
        assert!(outcome.fallback_classes.is_empty());
        for partition in [&outcome.train, &outcome.validation, &outcome.test] {
            for id in partition {
                let skeleton = synapses[*id as usize].skeleton_id.unwrap();
                for other in &synapses {
                    if other.skeleton_id == Some(skeleton) {
                        assert!(partition.contains(&other.synapse_id));
                    }
                }
            }
        }
    }

    #[test]
    fn zero_test_fraction_leaves_test_empty() {
        let synapses = uniform_synapses();
        let outcome = orchestrator()
            .create_split(&synapses, SplitAttribute::SkeletonId, 0.0, 0.2)
            .unwrap();
        assert!(outcome.test.is_empty());
        assert_eq!(outcome.train.len() + outcome.validation.len(), 50);
    }

    #[test]
    fn unbalanceable_class_falls_back_per_synapse_deterministically() {
        // one giant skeleton per class: group-level balance is impossible
        let mut synapses = Vec::new();
        for id in 0..40u128 {
            synapses.push(synapse(id, 1, "gaba"));
        }
        for id in 40..60u128 {
            synapses.push(synapse(id, 2, "ach"));
        }
        let first = orchestrator()
            .create_split(&synapses, SplitAttribute::SkeletonId, 0.25, 0.0)
            .unwrap();
        assert_eq!(
            first.fallback_classes,
            vec!["ach".to_string(), "gaba".to_string()]
        );
        // exact per-class cuts despite indivisible groups
        let gaba_test = first.test.iter().filter(|id| **id < 40).count();
        let ach_test = first.test.iter().filter(|id| **id >= 40).count();
        assert_eq!(gaba_test, 10);
        assert_eq!(ach_test, 5);

        let second = orchestrator()
            .create_split(&synapses, SplitAttribute::SkeletonId, 0.25, 0.0)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn ineligible_synapses_are_counted_and_split_is_skipped_when_empty() {
        let mut no_attribute = synapse(1, 0, "gaba");
        no_attribute.skeleton_id = None;
        let mut no_class = synapse(2, 3, "gaba");
        no_class.neurotransmitter = None;
        let outcome =
            orchestrator().create_split(&[no_attribute.clone()], SplitAttribute::SkeletonId, 0.2, 0.2);
        assert!(outcome.is_none());

        let outcome = orchestrator()
            .create_split(
                &[no_attribute, no_class, synapse(3, 4, "gaba")],
                SplitAttribute::SkeletonId,
                0.0,
                0.0,
            )
            .unwrap();
        assert_eq!(outcome.skipped_missing_attribute, 1);
        assert_eq!(outcome.skipped_missing_class, 1);
        assert_eq!(outcome.train, vec![3]);
    }

    #[test]
    fn holdout_ids_are_excluded_before_splitting() {
        let synapses = uniform_synapses();
        let holdout: HashSet<SynapseId> = (0..5).collect();
        let (kept, excluded) = SplitOrchestrator::exclude_holdout(synapses, &holdout);
        assert_eq!(excluded, 5);
        assert_eq!(kept.len(), 45);
        assert!(kept.iter().all(|s| !holdout.contains(&s.synapse_id)));
    }

    #[test]
    fn region_attribute_groups_by_brain_region() {
        let mut synapses = Vec::new();
        for id in 0..10u128 {
            let mut s = synapse(id, id as i64, "gaba");
            s.brain_region = Some(if id < 5 { "AL_R" } else { "MB_L" }.to_string());
            synapses.push(s);
        }
        let outcome = orchestrator()
            .create_split(&synapses, SplitAttribute::BrainRegion, 0.5, 0.0)
            .unwrap();
        // both regions are indivisible blocks of five
        let test_regions: HashSet<&str> = outcome
            .test
            .iter()
            .map(|id| synapses[*id as usize].brain_region.as_deref().unwrap())
            .collect();
        assert_eq!(test_regions.len(), 1);
        assert_eq!(outcome.test.len(), 5);
    }
}
