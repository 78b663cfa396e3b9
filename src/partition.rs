//! Group-atomic two-way partitioning with per-class balance.
//!
//! Given items tagged with `(group, class)`, assigns every *group* to side A
//! or side B so that, for each class independently, the fraction of that
//! class's items routed to side B approximates a target. The search is
//! exhaustive up to [`crate::constants::split::EXHAUSTIVE_GROUP_CAP`] groups
//! and greedy-with-local-improvement beyond that; both paths are
//! deterministic for identical input order.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::constants::split::{EXHAUSTIVE_GROUP_CAP, IMPROVEMENT_SWEEPS};
use crate::data::GroupKey;
use crate::errors::SplitError;
use crate::types::Neurotransmitter;

/// Result of one group-level partition pass.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionOutcome {
    /// Groups assigned to side A, in stable key order.
    pub side_a: Vec<GroupKey>,
    /// Groups assigned to side B, in stable key order.
    pub side_b: Vec<GroupKey>,
    /// Achieved side-B fraction per class.
    pub achieved: IndexMap<Neurotransmitter, f64>,
}

/// Assign every group to side A or side B, keeping each class's side-B
/// fraction within `tolerance` of `target_fraction_b`.
///
/// `classes` lists the balancing dimensions; when it is empty the aggregate
/// item count is balanced instead and the tolerance check is skipped. Returns
/// [`SplitError::Infeasible`] naming the worst class when even the best found
/// assignment deviates beyond the tolerance — the caller decides whether to
/// retry with fewer classes.
pub fn partition_groups(
    items: &[(GroupKey, Neurotransmitter)],
    classes: &[Neurotransmitter],
    target_fraction_b: f64,
    tolerance: f64,
) -> Result<PartitionOutcome, SplitError> {
    let key_set: IndexSet<GroupKey> = items.iter().map(|(key, _)| key.clone()).collect();
    let mut keys: Vec<GroupKey> = key_set.into_iter().collect();
    keys.sort();

    // Trivial fractions route everything to one side without any search.
    if target_fraction_b <= 0.0 {
        return Ok(trivial_outcome(keys, classes, items, false));
    }
    if target_fraction_b >= 1.0 {
        return Ok(trivial_outcome(keys, classes, items, true));
    }

    // Balancing dimensions: requested classes with at least one item, or the
    // aggregate item count when no classes were requested.
    let balance_aggregate = classes.is_empty();
    let dims: Vec<Neurotransmitter> = if balance_aggregate {
        Vec::new()
    } else {
        classes
            .iter()
            .filter(|class| items.iter().any(|(_, c)| c == *class))
            .cloned()
            .collect()
    };
    let dim_count = dims.len().max(1);

    let group_index: IndexMap<&GroupKey, usize> =
        keys.iter().enumerate().map(|(idx, key)| (key, idx)).collect();
    let mut counts = vec![vec![0u64; dim_count]; keys.len()];
    for (key, class) in items {
        let group = group_index[key];
        if balance_aggregate {
            counts[group][0] += 1;
        } else if let Some(dim) = dims.iter().position(|c| c == class) {
            counts[group][dim] += 1;
        }
    }
    let mut totals = vec![0u64; dim_count];
    for group_counts in &counts {
        for (dim, count) in group_counts.iter().enumerate() {
            totals[dim] += count;
        }
    }

    let in_b = if keys.len() <= EXHAUSTIVE_GROUP_CAP {
        exhaustive_assignment(&counts, &totals, target_fraction_b)
    } else {
        greedy_assignment(&counts, &totals, target_fraction_b)
    };

    let mut b_counts = vec![0u64; dim_count];
    for (group, selected) in in_b.iter().enumerate() {
        if *selected {
            for (dim, count) in counts[group].iter().enumerate() {
                b_counts[dim] += count;
            }
        }
    }

    let mut achieved = IndexMap::new();
    let mut worst: Option<(usize, f64)> = None;
    for (dim, class) in dims.iter().enumerate() {
        let fraction = b_counts[dim] as f64 / totals[dim] as f64;
        achieved.insert(class.clone(), fraction);
        let deviation = (fraction - target_fraction_b).abs();
        debug!(
            class = class.as_str(),
            achieved = fraction,
            target = target_fraction_b,
            "achieved class fraction"
        );
        if deviation > tolerance {
            let update = match worst {
                Some((_, worst_dev)) => deviation > worst_dev,
                None => true,
            };
            if update {
                worst = Some((dim, deviation));
            }
        }
    }
    if let Some((dim, _)) = worst {
        return Err(SplitError::Infeasible {
            class: dims[dim].clone(),
            achieved: achieved[&dims[dim]],
            target: target_fraction_b,
            tolerance,
        });
    }

    let (mut side_a, mut side_b) = (Vec::new(), Vec::new());
    for (group, key) in keys.into_iter().enumerate() {
        if in_b[group] {
            side_b.push(key);
        } else {
            side_a.push(key);
        }
    }
    Ok(PartitionOutcome { side_a, side_b, achieved })
}

fn trivial_outcome(
    keys: Vec<GroupKey>,
    classes: &[Neurotransmitter],
    items: &[(GroupKey, Neurotransmitter)],
    all_to_b: bool,
) -> PartitionOutcome {
    let fraction = if all_to_b { 1.0 } else { 0.0 };
    let achieved = classes
        .iter()
        .filter(|class| items.iter().any(|(_, c)| c == *class))
        .map(|class| (class.clone(), fraction))
        .collect();
    if all_to_b {
        PartitionOutcome { side_a: Vec::new(), side_b: keys, achieved }
    } else {
        PartitionOutcome { side_a: keys, side_b: Vec::new(), achieved }
    }
}

/// Search objective: maximum per-class deviation first, sum of squared
/// deviations second. The secondary term lets local moves make progress when
/// the maximum is pinned by a different class.
fn objective(b_counts: &[u64], totals: &[u64], target: f64) -> (f64, f64) {
    let mut max_dev = 0.0f64;
    let mut sum_sq = 0.0f64;
    for (dim, total) in totals.iter().enumerate() {
        if *total == 0 {
            continue;
        }
        let deviation = (b_counts[dim] as f64 / *total as f64 - target).abs();
        max_dev = max_dev.max(deviation);
        sum_sq += deviation * deviation;
    }
    (max_dev, sum_sq)
}

fn is_better(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 < b.0 || (a.0 == b.0 && a.1 < b.1)
}

/// Enumerate every assignment; feasible for small group counts only.
/// The first-best assignment wins, so ties break on the lowest bitmask,
/// which corresponds to stable group-key order.
fn exhaustive_assignment(counts: &[Vec<u64>], totals: &[u64], target: f64) -> Vec<bool> {
    let n = counts.len();
    let dim_count = totals.len();
    let mut best_mask = 0u64;
    let mut best = (f64::INFINITY, f64::INFINITY);
    for mask in 0u64..(1u64 << n) {
        let mut b_counts = vec![0u64; dim_count];
        for (group, group_counts) in counts.iter().enumerate() {
            if mask & (1 << group) != 0 {
                for (dim, count) in group_counts.iter().enumerate() {
                    b_counts[dim] += count;
                }
            }
        }
        let candidate = objective(&b_counts, totals, target);
        if is_better(candidate, best) {
            best = candidate;
            best_mask = mask;
        }
    }
    (0..n).map(|group| best_mask & (1 << group) != 0).collect()
}

/// Largest-first greedy assignment followed by bounded single-group
/// improvement sweeps. Deterministic: group order and all tie-breaks are
/// fixed by the stable key ordering.
fn greedy_assignment(counts: &[Vec<u64>], totals: &[u64], target: f64) -> Vec<bool> {
    let n = counts.len();
    let dim_count = totals.len();
    let mut order: Vec<usize> = (0..n).collect();
    let group_totals: Vec<u64> = counts.iter().map(|c| c.iter().sum()).collect();
    order.sort_by(|&a, &b| group_totals[b].cmp(&group_totals[a]).then(a.cmp(&b)));

    let mut in_b = vec![false; n];
    let mut b_counts = vec![0u64; dim_count];
    for &group in &order {
        let mut with_group = b_counts.clone();
        for (dim, count) in counts[group].iter().enumerate() {
            with_group[dim] += count;
        }
        let to_b = objective(&with_group, totals, target);
        let to_a = objective(&b_counts, totals, target);
        if is_better(to_b, to_a) {
            in_b[group] = true;
            b_counts = with_group;
        }
    }

    for _ in 0..IMPROVEMENT_SWEEPS {
        let mut improved = false;
        for group in 0..n {
            let mut flipped = b_counts.clone();
            for (dim, count) in counts[group].iter().enumerate() {
                if in_b[group] {
                    flipped[dim] -= count;
                } else {
                    flipped[dim] += count;
                }
            }
            if is_better(
                objective(&flipped, totals, target),
                objective(&b_counts, totals, target),
            ) {
                in_b[group] = !in_b[group];
                b_counts = flipped;
                improved = true;
            }
        }
        if !improved {
            break;
        }
    }

    in_b
}
