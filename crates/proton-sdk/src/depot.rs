use std::sync::Arc;

use proton_block::Block;
use proton_journal::{Journal, JournalMode};
use proton_nest::{Nest, Transcript};
use proton_store::{DirectoryStorage, InMemoryStorage, Storage, StorageBackend, StorageConfig};
use proton_types::{Address, Network, Revision};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ProtonConfig;
use crate::error::{SdkError, SdkResult};

/// Build the backend described by `config`.
pub fn open_storage(config: &StorageConfig) -> SdkResult<Arc<dyn Storage>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryStorage::new())),
        StorageBackend::Directory => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| SdkError::Config("directory storage needs a path".into()))?;
            Ok(Arc::new(DirectoryStorage::open(path)?))
        }
    }
}

/// Storage, journal and nest factory wired from one [`ProtonConfig`].
///
/// Nests opened here read through the journal, so they see writes that are
/// still in flight. Transcripts go to the journal through
/// [`Depot::commit`].
pub struct Depot {
    config: ProtonConfig,
    network: Network,
    backend: Arc<dyn Storage>,
    journal: Arc<Journal>,
    worker: Option<JoinHandle<()>>,
}

impl Depot {
    /// Open storage and the journal, recovering its WAL if configured.
    ///
    /// With a background journal this must run inside a tokio runtime; the
    /// worker is started here.
    pub fn open(config: ProtonConfig) -> SdkResult<Self> {
        config.validate()?;
        let backend = open_storage(&config.storage)?;
        let journal = Arc::new(Journal::open(Arc::clone(&backend), &config.journal)?);

        let worker = match config.journal.mode {
            JournalMode::Inline => {
                // Recovered transcripts have nobody else to apply them.
                journal.drain()?;
                None
            }
            JournalMode::Background => {
                tokio::runtime::Handle::try_current().map_err(|_| SdkError::NoRuntime)?;
                Some(journal.spawn())
            }
        };

        info!(
            network = %config.network,
            backend = ?config.storage.backend,
            mode = ?config.journal.mode,
            "depot opened"
        );
        Ok(Self {
            network: config.network(),
            config,
            backend,
            journal,
            worker,
        })
    }

    pub fn config(&self) -> &ProtonConfig {
        &self.config
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// The backend, bypassing in-flight transcripts.
    pub fn backend(&self) -> &Arc<dyn Storage> {
        &self.backend
    }

    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    /// A fresh nest reading through the journal.
    pub fn nest(&self) -> Nest {
        let storage: Arc<dyn Storage> = self.journal.clone();
        Nest::new(storage, &self.config.nest)
    }

    /// Transcribe `nest` and record the result. Returns the record id, or
    /// `None` if the nest had nothing to write.
    ///
    /// If the journal refuses the transcript the nest keeps its pending
    /// writes and a later commit retries them.
    pub fn commit(&self, nest: &mut Nest) -> SdkResult<Option<Uuid>> {
        nest.transcribe_with(|transcript| Ok(self.journal.record(transcript)?))
    }

    /// The freshest block at `address`: in-flight first, then storage.
    pub fn pull(&self, address: &Address, revision: Revision) -> SdkResult<Block> {
        Ok(self.journal.load(address, revision)?)
    }

    /// Record a block managed outside any nest, such as a mutable root.
    ///
    /// The block is validated against `address` first. Storage conflicts
    /// surface as journal processing failures, not here.
    pub fn publish(&self, address: &Address, block: Block) -> SdkResult<Uuid> {
        block.validate(address)?;
        let mut transcript = Transcript::new();
        transcript.push(*address, block);
        self.journal
            .record(transcript)?
            .ok_or_else(|| SdkError::Config("empty publish transcript".into()))
    }

    /// Wait until every recorded transcript reached storage.
    pub async fn settle(&self) {
        if self.worker.is_some() {
            self.journal.settle().await;
        }
    }

    /// Stop the worker after it drains what is in flight.
    pub async fn close(mut self) -> SdkResult<()> {
        self.journal.shutdown();
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                error!(error = %err, "journal worker failed");
            }
        }
        info!(pending = self.journal.pending(), "depot closed");
        Ok(())
    }
}

impl Drop for Depot {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.journal.shutdown();
        }
    }
}

impl std::fmt::Debug for Depot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Depot")
            .field("network", &self.config.network)
            .field("journal", &self.journal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proton_crypto::SigningKey;
    use proton_journal::{JournalConfig, JournalError, SyncMode};
    use proton_nest::Handle;
    use proton_store::StorageError;
    use proton_types::{Component, Digest};

    fn inline() -> ProtonConfig {
        ProtonConfig::default()
    }

    fn data(depot: &Depot, payload: &[u8]) -> Block {
        Block::content_hash(depot.network(), Component::Data, Digest::null(), payload.to_vec())
    }

    #[test]
    fn commit_then_reload_in_a_new_nest() {
        let depot = Depot::open(inline()).unwrap();
        let original = data(&depot, b"hello proton");

        let mut nest = depot.nest();
        let handle = nest.attach(original.clone());
        assert!(depot.commit(&mut nest).unwrap().is_some());
        let clef = handle.clef();
        assert!(!clef.is_placeholder());
        assert_eq!(depot.backend().load_latest(&clef.address).unwrap().revision(), 0);

        let mut other = depot.nest();
        let mut unplaced = Handle::unplaced(clef);
        let block = other.load(&mut unplaced).unwrap().clone();
        assert_eq!(block.payload(), original.payload());
        other.unload(&unplaced).unwrap();
    }

    #[test]
    fn refused_commit_keeps_the_nest_dirty() {
        let depot = Depot::open(inline()).unwrap();
        let mut nest = depot.nest();
        let handle = nest.attach(data(&depot, b"must survive"));

        depot.journal().shutdown();
        let err = depot.commit(&mut nest).unwrap_err();
        assert!(matches!(err, SdkError::Journal(JournalError::Shutdown)));
        assert!(handle.clef().is_placeholder());

        // Still pending: apply it by hand to the backend.
        let transcript = nest.transcribe().unwrap();
        assert_eq!(transcript.pushes().count(), 1);
        for (address, block) in transcript.pushes() {
            depot.backend().store(address, block).unwrap();
        }
        assert!(depot.backend().exist(&handle.address(), Revision::Last).unwrap());
    }

    #[test]
    fn committing_an_untouched_nest_records_nothing() {
        let depot = Depot::open(inline()).unwrap();
        let mut nest = depot.nest();
        assert!(depot.commit(&mut nest).unwrap().is_none());
    }

    #[test]
    fn detach_after_commit_erases_the_stored_copy() {
        let depot = Depot::open(inline()).unwrap();
        let mut nest = depot.nest();
        let handle = nest.attach(data(&depot, b"short lived"));
        depot.commit(&mut nest).unwrap();
        let address = handle.address();
        assert!(depot.pull(&address, Revision::Last).is_ok());

        nest.detach(handle);
        depot.commit(&mut nest).unwrap();
        assert!(matches!(
            depot.pull(&address, Revision::Last),
            Err(SdkError::Storage(StorageError::NotFound { .. }))
        ));
    }

    #[test]
    fn publish_mutable_root_revisions() {
        let depot = Depot::open(inline()).unwrap();
        let owner = SigningKey::generate();
        let v0 = Block::owner_key(depot.network(), Component::Reference, &owner, b"root v0".to_vec());
        let address = v0.bind();
        depot.publish(&address, v0.clone()).unwrap();
        let v1 = v0.derive(&owner, b"root v1".to_vec()).unwrap();
        depot.publish(&address, v1.clone()).unwrap();

        assert_eq!(depot.pull(&address, Revision::Last).unwrap(), v1);
        assert!(depot.pull(&address, Revision::Number(0)).is_err());
    }

    #[test]
    fn publish_rejects_a_block_for_another_address() {
        let depot = Depot::open(inline()).unwrap();
        let block = data(&depot, b"a");
        let other = data(&depot, b"b").bind();
        assert!(matches!(depot.publish(&other, block), Err(SdkError::Block(_))));
    }

    #[test]
    fn background_mode_needs_a_runtime() {
        let mut config = inline();
        config.journal.mode = JournalMode::Background;
        assert!(matches!(Depot::open(config), Err(SdkError::NoRuntime)));
    }

    #[tokio::test]
    async fn background_depot_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = inline();
        config.storage = StorageConfig {
            backend: StorageBackend::Directory,
            path: Some(dir.path().join("blocks")),
        };
        config.journal = JournalConfig {
            mode: JournalMode::Background,
            wal: Some(dir.path().join("journal.wal")),
            sync: SyncMode::EveryWrite,
        };

        let depot = Depot::open(config.clone()).unwrap();
        let address = {
            let mut nest = depot.nest();
            let handle = nest.attach(data(&depot, b"on disk"));
            depot.commit(&mut nest).unwrap();
            // Readable before and after the worker catches up.
            assert!(depot.pull(&handle.address(), Revision::Last).is_ok());
            handle.address()
        };
        depot.settle().await;
        assert!(depot.journal().is_idle());
        depot.close().await.unwrap();

        let reopened = Depot::open(config).unwrap();
        assert!(reopened.backend().exist(&address, Revision::Last).unwrap());
        reopened.close().await.unwrap();
    }
}
