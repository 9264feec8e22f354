//! Overwrite arbitration shared by every backend.
//!
//! Immutable blocks are write-once. A mutable block replaces the stored one
//! only if it derives it, or if both sit at the same revision number and the
//! incoming encoding compares greater byte-for-byte. The byte comparison is
//! content-derived, so replicas that never talk to each other still agree on
//! the winner of a concurrent write.

use proton_block::Block;
use proton_types::Address;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Outcome of a successful arbitration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Write the incoming block.
    Accept,
    /// The incoming block is byte-identical to the stored one; nothing to do.
    Unchanged,
}

/// Decide whether `incoming` may replace `current` at `address`.
pub fn arbitrate(
    address: &Address,
    current: Option<&Block>,
    incoming: &Block,
) -> StorageResult<Verdict> {
    let Some(current) = current else {
        return Ok(Verdict::Accept);
    };

    if !incoming.is_mutable() {
        return Err(StorageError::AlreadyExists(*address));
    }

    if incoming.derives(current) {
        return Ok(Verdict::Accept);
    }

    let conflict = || StorageError::Conflict {
        address: *address,
        current: current.revision(),
        incoming: incoming.revision(),
    };

    if incoming.revision() != current.revision() {
        debug!(%address, current = current.revision(), incoming = incoming.revision(), "revision does not derive");
        return Err(conflict());
    }

    let mine = incoming.encode()?;
    let theirs = current.encode()?;
    if mine == theirs {
        Ok(Verdict::Unchanged)
    } else if mine > theirs {
        debug!(%address, revision = incoming.revision(), "tie-break won by incoming block");
        Ok(Verdict::Accept)
    } else {
        debug!(%address, revision = incoming.revision(), "tie-break won by stored block");
        Err(conflict())
    }
}

/// The authoritative block among two revisions at the same number: the one
/// whose encoding is lexicographically greater.
pub fn winner<'a>(x: &'a Block, y: &'a Block) -> StorageResult<&'a Block> {
    if x.encode()? >= y.encode()? {
        Ok(x)
    } else {
        Ok(y)
    }
}
