use proton_block::Block;
use proton_types::{Address, Revision};

use crate::error::StorageResult;

/// Persistence backend for blocks.
///
/// All implementations must satisfy these invariants:
/// - `store` runs [`arbitrate`](crate::arbitrate) against the stored block and
///   holds a per-address lock across the read, the decision and the write.
/// - `store` validates the block against `address` before persisting it.
/// - `load` returns a freshly decoded, clean block.
/// - Only the latest revision of a mutable block is kept; asking for an older
///   revision is a `NotFound`.
/// - All I/O errors are propagated, never silently ignored or retried.
pub trait Storage: Send + Sync {
    /// Whether a block exists at `address` at the requested revision.
    fn exist(&self, address: &Address, revision: Revision) -> StorageResult<bool>;

    /// Load the block at `address` at the requested revision.
    fn load(&self, address: &Address, revision: Revision) -> StorageResult<Block>;

    /// Persist `block` at `address`, subject to conflict arbitration.
    fn store(&self, address: &Address, block: &Block) -> StorageResult<()>;

    /// Remove the block at `address`.
    fn erase(&self, address: &Address) -> StorageResult<()>;

    /// Load the latest revision at `address`.
    fn load_latest(&self, address: &Address) -> StorageResult<Block> {
        self.load(address, Revision::Last)
    }
}
