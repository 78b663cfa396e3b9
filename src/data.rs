use serde::{Deserialize, Serialize};

pub use crate::types::{HemiLineageId, Neurotransmitter, RegionName, SkeletonId, SynapseId};

/// Raw normalized synapse record as emitted by the consolidation scripts.
///
/// All source-specific parsing happens upstream; this is the boundary schema.
/// Which of the natural-id fields is populated depends on the dataset.
#[derive(Clone, Debug, Deserialize)]
pub struct RawSynapse {
    /// CATMAID skeleton id, when the source provides one.
    #[serde(default)]
    pub skid: Option<SkeletonId>,
    /// FlyWire segment id, when the source provides one.
    #[serde(default)]
    pub flywire_id: Option<SkeletonId>,
    /// Neuprint body id, when the source provides one.
    #[serde(default)]
    pub body_id: Option<SkeletonId>,
    /// Natural synapse id; absent ids are derived from coordinates.
    #[serde(default)]
    pub connector_id: Option<i64>,
    /// X coordinate in nanometers.
    pub x: f64,
    /// Y coordinate in nanometers.
    pub y: f64,
    /// Z coordinate in nanometers.
    pub z: f64,
    /// Hemilineage name, if known.
    #[serde(default)]
    pub hemilineage: Option<String>,
    /// Lineage name, if known.
    #[serde(default)]
    pub lineage: Option<String>,
    /// Neuropil compartment, if known.
    #[serde(default)]
    pub compartment: Option<String>,
    /// Brain region containing the synapse, if known.
    #[serde(default)]
    pub region: Option<RegionName>,
    /// Neurotransmitter label, if known.
    #[serde(default)]
    pub neurotransmitter: Option<Neurotransmitter>,
}

/// Canonical synapse record after id resolution and coordinate rounding.
///
/// Field-by-field equality is what the deduplicator compares, so every field
/// participates in `PartialEq`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synapse {
    /// Stable synapse id (natural connector id or Cantor-derived).
    pub synapse_id: SynapseId,
    /// X coordinate in nanometers.
    pub x: i64,
    /// Y coordinate in nanometers.
    pub y: i64,
    /// Z coordinate in nanometers.
    pub z: i64,
    /// Owning skeleton, if any.
    pub skeleton_id: Option<SkeletonId>,
    /// Brain region, if any.
    pub brain_region: Option<RegionName>,
    /// Hemilineage name, if any.
    pub hemilineage: Option<String>,
    /// Lineage name, if any.
    pub lineage: Option<String>,
    /// Neuropil compartment, if any.
    pub compartment: Option<String>,
    /// Neurotransmitter label, if any.
    pub neurotransmitter: Option<Neurotransmitter>,
}

/// Skeleton entity derived from the synapse stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skeleton {
    /// Natural skeleton id.
    pub skeleton_id: SkeletonId,
    /// Hemilineage of this skeleton, taken from its first synapse.
    pub hemi_lineage_id: Option<HemiLineageId>,
    /// Neurotransmitter labels seen across this skeleton's synapses.
    pub nt_known: Vec<Neurotransmitter>,
}

/// Hemilineage entity with a dense encounter-order id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HemiLineage {
    /// Dense id assigned in encounter order over the input stream.
    pub hemi_lineage_id: HemiLineageId,
    /// Hemilineage name as found on the synapses.
    pub hemi_lineage_name: String,
}

/// Attribute under which synapses are grouped for one split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitAttribute {
    /// Group by owning skeleton; all synapses of a neuron move together.
    SkeletonId,
    /// Group by brain region.
    BrainRegion,
}

impl SplitAttribute {
    /// Group key of `synapse` under this attribute, or `None` when the
    /// attribute is missing (such synapses are ineligible for the split).
    pub fn group_key(&self, synapse: &Synapse) -> Option<GroupKey> {
        match self {
            SplitAttribute::SkeletonId => synapse.skeleton_id.map(GroupKey::Skeleton),
            SplitAttribute::BrainRegion => {
                synapse.brain_region.clone().map(GroupKey::Region)
            }
        }
    }

    /// Attribute name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitAttribute::SkeletonId => "skeleton_id",
            SplitAttribute::BrainRegion => "brain_region",
        }
    }
}

/// Atomicity boundary for splitting; all synapses sharing a key move together.
///
/// `Ord` is derived so ties in the partition search break on stable key order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// Skeleton-scoped group.
    Skeleton(SkeletonId),
    /// Region-scoped group.
    Region(RegionName),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synapse(skeleton_id: Option<SkeletonId>, region: Option<&str>) -> Synapse {
        Synapse {
            synapse_id: 1,
            x: 0,
            y: 0,
            z: 0,
            skeleton_id,
            brain_region: region.map(|r| r.to_string()),
            hemilineage: None,
            lineage: None,
            compartment: None,
            neurotransmitter: None,
        }
    }

    #[test]
    fn group_key_follows_the_active_attribute() {
        let s = synapse(Some(7), Some("AL_R"));
        assert_eq!(
            SplitAttribute::SkeletonId.group_key(&s),
            Some(GroupKey::Skeleton(7))
        );
        assert_eq!(
            SplitAttribute::BrainRegion.group_key(&s),
            Some(GroupKey::Region("AL_R".to_string()))
        );
    }

    #[test]
    fn missing_attribute_yields_no_group() {
        let s = synapse(None, None);
        assert_eq!(SplitAttribute::SkeletonId.group_key(&s), None);
        assert_eq!(SplitAttribute::BrainRegion.group_key(&s), None);
    }

    #[test]
    fn raw_synapse_tolerates_absent_optional_fields() {
        let raw: RawSynapse =
            serde_json::from_str(r#"{"x": 1.0, "y": 2.0, "z": 3.0}"#).unwrap();
        assert!(raw.connector_id.is_none());
        assert!(raw.neurotransmitter.is_none());
    }
}
