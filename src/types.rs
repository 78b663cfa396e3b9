/// Stable synapse identifier.
///
/// Natural connector ids fit in 64 bits; derived ids come from a Cantor
/// pairing over quantized coordinates and may need the full 128-bit range.
pub type SynapseId = u128;
/// Identifier of the skeleton (neuron reconstruction) owning a synapse.
/// Resolved from the first available of `skid`, `flywire_id`, `body_id`.
pub type SkeletonId = i64;
/// Dense hemilineage identifier assigned in encounter order.
pub type HemiLineageId = u32;
/// Neurotransmitter class label used as the balancing dimension.
/// Examples: `acetylcholine`, `gaba`, `glutamate`
pub type Neurotransmitter = String;
/// Brain region name used as an alternative grouping attribute.
/// Example: `AL_R`
pub type RegionName = String;
