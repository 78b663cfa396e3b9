//! Deterministic identifier derivation for synapses without a natural id.

use crate::data::RawSynapse;
use crate::types::{SkeletonId, SynapseId};

/// Map a signed value onto the naturals (zigzag) so negative quantized
/// coordinates still pair bijectively.
fn to_natural(value: i64) -> u128 {
    if value >= 0 {
        (value as u128) * 2
    } else {
        (-(value + 1) as u128) * 2 + 1
    }
}

/// Cantor pairing of two naturals.
fn cantor_pair(a: u128, b: u128) -> u128 {
    (a + b) * (a + b + 1) / 2 + b
}

/// Cantor number of a fixed-size integer tuple (left fold of the pairing).
///
/// A bijection from the tuple to a single integer: identical tuples always
/// yield the identical id, distinct tuples never collide.
pub fn cantor_number(values: &[i64]) -> SynapseId {
    let mut iter = values.iter().map(|v| to_natural(*v));
    let first = iter.next().unwrap_or(0);
    iter.fold(first, cantor_pair)
}

/// Quantize nanometer coordinates to voxel indices in `(z, y, x)` order.
///
/// Floor division, so coordinates just below zero land in voxel -1 rather
/// than sharing voxel 0.
pub fn quantized_zyx(x: i64, y: i64, z: i64, voxel_size_zyx: [i64; 3]) -> [i64; 3] {
    [
        z.div_euclid(voxel_size_zyx[0]),
        y.div_euclid(voxel_size_zyx[1]),
        x.div_euclid(voxel_size_zyx[2]),
    ]
}

/// Resolve the owning skeleton from the first available natural key.
pub fn resolve_skeleton_id(raw: &RawSynapse) -> Option<SkeletonId> {
    raw.skid.or(raw.flywire_id).or(raw.body_id)
}

/// Resolve the synapse id: the natural connector id when present, otherwise
/// the Cantor number of the voxel-quantized coordinates. The derived id is a
/// last resort and never preferred over a natural id.
pub fn resolve_synapse_id(raw: &RawSynapse, voxel_size_zyx: [i64; 3]) -> SynapseId {
    if let Some(connector_id) = raw.connector_id {
        return connector_id as SynapseId;
    }
    let zyx = quantized_zyx(raw.x as i64, raw.y as i64, raw.z as i64, voxel_size_zyx);
    cantor_number(&zyx)
}
