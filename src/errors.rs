use std::io;

use thiserror::Error;

use crate::types::Neurotransmitter;

/// Error type for ingestion, configuration, and persistence failures.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Filesystem failure while reading inputs or writing the database.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An input file could not be parsed as an array of synapse records.
    #[error("failed to parse synapse records from '{path}': {source}")]
    Json {
        /// Path of the unreadable file.
        path: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// The database backend rejected an operation.
    #[error("database failure: {0}")]
    Database(String),
    /// A tuning knob was outside its valid range.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The requested dataset preset does not exist.
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),
}

/// Typed, recoverable failure of the group-level partition search.
///
/// Carried back to the orchestrator so it can retry without the offending
/// class; never used for broad catch-all control flow.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SplitError {
    #[error(
        "cannot balance class '{class}': best achievable fraction {achieved:.4} \
         deviates from target {target:.4} by more than {tolerance}"
    )]
    /// No group assignment keeps this class within tolerance of the target.
    Infeasible {
        /// The class whose deviation is worst.
        class: Neurotransmitter,
        /// Side-B fraction of the best assignment found.
        achieved: f64,
        /// Requested side-B fraction.
        target: f64,
        /// Permitted absolute deviation.
        tolerance: f64,
    },
}
