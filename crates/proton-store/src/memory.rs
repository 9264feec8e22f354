use std::collections::HashMap;
use std::sync::RwLock;

use proton_block::Block;
use proton_types::{Address, Revision};
use tracing::debug;

use crate::conflict::{arbitrate, Verdict};
use crate::error::{StorageError, StorageResult};
use crate::traits::Storage;

/// In-memory, HashMap-based block store.
///
/// Intended for tests and embedding. Blocks are held encoded behind a
/// `RwLock`, so every load decodes a fresh, clean copy. The write lock spans
/// the whole arbitrate-and-insert sequence of `store`.
pub struct InMemoryStorage {
    blocks: RwLock<HashMap<Address, Vec<u8>>>,
}

impl InMemoryStorage {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Return a sorted list of all stored addresses.
    pub fn addresses(&self) -> Vec<Address> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut addresses: Vec<Address> = map.keys().copied().collect();
        addresses.sort();
        addresses
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn check(address: &Address) -> StorageResult<()> {
    if address.is_null() {
        return Err(StorageError::NullAddress);
    }
    Ok(())
}

impl Storage for InMemoryStorage {
    fn exist(&self, address: &Address, revision: Revision) -> StorageResult<bool> {
        check(address)?;
        let map = self.blocks.read().expect("lock poisoned");
        match map.get(address) {
            None => Ok(false),
            Some(_) if revision == Revision::Last => Ok(true),
            Some(bytes) => Ok(revision.admits(Block::decode(bytes)?.revision())),
        }
    }

    fn load(&self, address: &Address, revision: Revision) -> StorageResult<Block> {
        check(address)?;
        let map = self.blocks.read().expect("lock poisoned");
        let not_found = || StorageError::NotFound {
            address: *address,
            revision,
        };
        let block = Block::decode(map.get(address).ok_or_else(not_found)?)?;
        if !revision.admits(block.revision()) {
            return Err(not_found());
        }
        Ok(block)
    }

    fn store(&self, address: &Address, block: &Block) -> StorageResult<()> {
        check(address)?;
        block.validate(address)?;
        let mut map = self.blocks.write().expect("lock poisoned");
        let current = map.get(address).map(|bytes| Block::decode(bytes)).transpose()?;
        match arbitrate(address, current.as_ref(), block)? {
            Verdict::Accept => {
                map.insert(*address, block.encode()?);
                debug!(%address, revision = block.revision(), "stored block");
            }
            Verdict::Unchanged => {}
        }
        Ok(())
    }

    fn erase(&self, address: &Address) -> StorageResult<()> {
        check(address)?;
        let mut map = self.blocks.write().expect("lock poisoned");
        match map.remove(address) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound {
                address: *address,
                revision: Revision::Last,
            }),
        }
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("block_count", &self.len())
            .finish()
    }
}
