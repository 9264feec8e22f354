use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use proton_block::Block;
use proton_types::{Address, Revision};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::conflict::{arbitrate, Verdict};
use crate::error::{StorageError, StorageResult};
use crate::traits::Storage;

/// Number of lock stripes guarding writes.
const STRIPES: usize = 64;

/// Filesystem block store: `root/<first two hex chars>/<address.unique()>`.
///
/// Files are written to a temporary file in the target directory and renamed
/// into place, so readers never observe a partial block. Writes to addresses
/// sharing a stripe are serialized; reads take no lock.
pub struct DirectoryStorage {
    root: PathBuf,
    stripes: Vec<Mutex<()>>,
}

impl DirectoryStorage {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!(root = %root.display(), "opened directory storage");
        Ok(Self {
            root,
            stripes: (0..STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding the block at `address`.
    pub fn path(&self, address: &Address) -> PathBuf {
        let unique = address.unique();
        self.root.join(&unique[..2]).join(unique)
    }

    fn lock(&self, address: &Address) -> MutexGuard<'_, ()> {
        let index = address
            .digest()
            .map_or(0, |d| d.as_bytes()[0] as usize % STRIPES);
        self.stripes[index].lock().expect("lock poisoned")
    }

    fn read(&self, address: &Address) -> StorageResult<Option<Block>> {
        match fs::read(self.path(address)) {
            Ok(bytes) => Ok(Some(Block::decode(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "block path has no parent"))?;
        fs::create_dir_all(dir)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn check(address: &Address) -> StorageResult<()> {
    if address.is_null() {
        return Err(StorageError::NullAddress);
    }
    Ok(())
}

impl Storage for DirectoryStorage {
    fn exist(&self, address: &Address, revision: Revision) -> StorageResult<bool> {
        check(address)?;
        if revision == Revision::Last {
            return Ok(self.path(address).is_file());
        }
        Ok(self
            .read(address)?
            .is_some_and(|block| revision.admits(block.revision())))
    }

    fn load(&self, address: &Address, revision: Revision) -> StorageResult<Block> {
        check(address)?;
        match self.read(address)? {
            Some(block) if revision.admits(block.revision()) => Ok(block),
            _ => Err(StorageError::NotFound {
                address: *address,
                revision,
            }),
        }
    }

    fn store(&self, address: &Address, block: &Block) -> StorageResult<()> {
        check(address)?;
        block.validate(address)?;
        let _guard = self.lock(address);
        let current = self.read(address)?;
        if arbitrate(address, current.as_ref(), block)? == Verdict::Unchanged {
            return Ok(());
        }
        self.write(&self.path(address), &block.encode()?)?;
        debug!(%address, revision = block.revision(), "stored block");
        Ok(())
    }

    fn erase(&self, address: &Address) -> StorageResult<()> {
        check(address)?;
        let _guard = self.lock(address);
        match fs::remove_file(self.path(address)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound {
                address: *address,
                revision: Revision::Last,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for DirectoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryStorage")
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proton_crypto::SigningKey;
    use proton_types::{Component, Digest, Network};
    use tempfile::TempDir;

    fn chb(content: &[u8]) -> Block {
        Block::content_hash(Network::named("dir"), Component::Data, Digest::null(), content.to_vec())
    }

    #[test]
    fn store_load_erase() {
        let dir = TempDir::new().unwrap();
        let storage = DirectoryStorage::open(dir.path()).unwrap();
        let block = chb(b"on disk");
        let address = block.bind();

        storage.store(&address, &block).unwrap();
        assert!(storage.path(&address).is_file());
        assert_eq!(storage.load_latest(&address).unwrap(), block);

        storage.erase(&address).unwrap();
        assert!(!storage.exist(&address, Revision::Last).unwrap());
    }

    #[test]
    fn layout_fans_out_by_prefix() {
        let dir = TempDir::new().unwrap();
        let storage = DirectoryStorage::open(dir.path()).unwrap();
        let address = chb(b"x").bind();
        let unique = address.unique();
        assert_eq!(
            storage.path(&address),
            dir.path().join(&unique[..2]).join(&unique)
        );
    }

    #[test]
    fn blocks_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let block = chb(b"durable");
        {
            let storage = DirectoryStorage::open(dir.path()).unwrap();
            storage.store(&block.bind(), &block).unwrap();
        }
        let storage = DirectoryStorage::open(dir.path()).unwrap();
        assert_eq!(storage.load_latest(&block.bind()).unwrap(), block);
    }

    #[test]
    fn no_temporary_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let storage = DirectoryStorage::open(dir.path()).unwrap();
        let block = chb(b"tidy");
        storage.store(&block.bind(), &block).unwrap();
        let fan = storage.path(&block.bind()).parent().unwrap().to_path_buf();
        assert_eq!(fs::read_dir(fan).unwrap().count(), 1);
    }

    #[test]
    fn conflicts_are_detected_on_disk() {
        let dir = TempDir::new().unwrap();
        let storage = DirectoryStorage::open(dir.path()).unwrap();
        let owner = SigningKey::generate();
        let v0 = Block::public_key(Network::named("dir"), Component::Group, &owner, b"v0".to_vec());
        let address = v0.bind();
        storage.store(&address, &v0).unwrap();
        let v1 = v0.derive(&owner, b"v1".to_vec()).unwrap();
        storage.store(&address, &v1).unwrap();
        assert!(matches!(
            storage.store(&address, &v0),
            Err(StorageError::Conflict { .. })
        ));

        let once = chb(b"c");
        storage.store(&once.bind(), &once).unwrap();
        assert!(matches!(
            storage.store(&once.bind(), &chb(b"c")),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn corrupt_file_surfaces_format_error() {
        let dir = TempDir::new().unwrap();
        let storage = DirectoryStorage::open(dir.path()).unwrap();
        let address = chb(b"bad").bind();
        let path = storage.path(&address);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, [0u8, 1, 2]).unwrap();
        let err = storage.load_latest(&address).unwrap_err();
        assert_eq!(err.class(), proton_types::ErrorClass::ProtocolFormat);
    }
}
