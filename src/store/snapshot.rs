//! Opaque match snapshots for an external persistence layer.
//!
//! A snapshot captures the whole match, RNG position included, so a restored
//! match continues exactly as the original would have.

use crate::error::SnapshotError;
use crate::model::Match;

/// Encode a match as a bincode blob.
pub fn encode(m: &Match) -> Result<Vec<u8>, SnapshotError> {
    bincode::serialize(m).map_err(SnapshotError::Encode)
}

/// Decode a blob produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Match, SnapshotError> {
    bincode::deserialize(bytes).map_err(SnapshotError::Decode)
}
