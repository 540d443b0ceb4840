//! Crate-level error hierarchy (§7, §11).
//!
//! `InvariantBreach` is deliberately absent: per §7 it is a `debug_assert!`
//! inside the engine, never a value a caller observes.

use crate::ids::{GID, SID};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhyloError {
    /// A genome id was looked up in the GID->SID index but is not present.
    /// Callers must have inserted the genome or its ancestor previously.
    #[error("genome {0} is not tracked by the phylogeny index")]
    UnknownGenome(GID),

    /// A refcounted index entry would have gone negative, or a species
    /// lookup was attempted for a SID outside the node table.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// The enveloppe-contribution judge was invoked on a representative set
    /// that is not yet at capacity.
    #[error("enveloppe-contribution judge called on a non-full representative set (size {0})")]
    EmptyEnveloppe(usize),

    /// An unrecognised judge-rule tag reached the engine outside of the
    /// serde deserialization path (which would reject it earlier).
    #[error("unknown enveloppe-contribution judge rule: {0}")]
    ConfigurationGap(String),

    /// A JSON snapshot was missing required keys, had out-of-range indices,
    /// or otherwise failed to reconstruct a tree satisfying the data-model
    /// invariants (§3). The tree is left untouched.
    #[error("malformed snapshot: {0}")]
    SnapshotMalformed(String),

    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PhyloError {
    pub fn species_not_found(sid: SID) -> Self {
        PhyloError::PreconditionViolation(format!("species {sid} is not in the node table"))
    }
}

pub type Result<T> = std::result::Result<T, PhyloError>;
