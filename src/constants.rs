/// Constants gating which neurotransmitter classes are admitted for splitting.
pub mod admission {
    /// Minimum synapse count a class needs to participate in splits.
    pub const MIN_SYNAPSES_PER_CLASS: usize = 1000;
    /// Minimum distinct-skeleton count a class needs to participate in splits.
    pub const MIN_SKELETONS_PER_CLASS: usize = 3;
}

/// Constants controlling the group partition search and the per-item fallback.
pub mod split {
    /// Fixed seed for the per-synapse fallback shuffle.
    pub const FALLBACK_SHUFFLE_SEED: u64 = 19_120_623;
    /// Maximum group count for exhaustive assignment enumeration.
    ///
    /// Above this the partitioner switches to greedy largest-first assignment
    /// with bounded local-improvement sweeps; the exhaustive path visits
    /// `2^EXHAUSTIVE_GROUP_CAP` assignments in the worst case.
    pub const EXHAUSTIVE_GROUP_CAP: usize = 12;
    /// Maximum local-improvement sweeps after the greedy pass.
    pub const IMPROVEMENT_SWEEPS: usize = 32;
    /// Default absolute tolerance on per-class fraction deviation.
    pub const DEFAULT_TOLERANCE: f64 = 0.05;
}

/// Filenames used by the JSON-file database backend.
pub mod db {
    /// Canonical synapse records.
    pub const SYNAPSES_FILENAME: &str = "synapses.json";
    /// Derived skeleton table.
    pub const SKELETONS_FILENAME: &str = "skeletons.json";
    /// Derived hemilineage table.
    pub const HEMI_LINEAGES_FILENAME: &str = "hemi_lineages.json";
    /// Named split assignments.
    pub const SPLITS_FILENAME: &str = "splits.json";
}
