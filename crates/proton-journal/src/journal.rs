use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use proton_block::{Block, State};
use proton_nest::{Action, Transcript};
use proton_store::{Storage, StorageError, StorageResult};
use proton_types::{Address, Revision};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{JournalConfig, JournalMode};
use crate::error::{JournalError, JournalResult};
use crate::wal::{WalEntry, WriteAheadLog};

/// A transcript waiting to be applied.
#[derive(Clone, Debug)]
struct Record {
    id: Uuid,
    transcript: Arc<Transcript>,
    /// Framed bytes this record occupies at the front of the WAL.
    wal_len: u64,
}

#[derive(Default)]
struct Queue {
    records: VecDeque<Record>,
    /// Bytes of processed records whose checkpoint failed and must be
    /// dropped with the next one.
    unpruned: u64,
}

/// One action that storage refused while a transcript was processed.
#[derive(Debug)]
pub struct ActionFailure {
    pub record: Uuid,
    pub address: Address,
    /// `true` for a push, `false` for a wipe.
    pub push: bool,
    pub error: StorageError,
}

/// Summary of a processing pass.
#[derive(Debug, Default)]
pub struct ProcessReport {
    /// Transcripts applied and dequeued.
    pub transcripts: usize,
    pub pushed: usize,
    pub wiped: usize,
    pub failures: Vec<ActionFailure>,
}

impl ProcessReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies transcripts to storage while exposing the ones still in flight.
///
/// Transcripts are applied strictly in record order, each as all of its
/// pushes followed by all of its wipes. A failed action is reported and
/// skipped; the rest of the batch still runs. Readers going through
/// [`Journal::retrieve`] (or the journal's own [`Storage`] implementation)
/// see pushes that have not reached storage yet and are refused blocks that
/// are about to be wiped.
pub struct Journal {
    storage: Arc<dyn Storage>,
    queue: RwLock<Queue>,
    wal: Option<WriteAheadLog>,
    mode: JournalMode,
    /// Serializes processing passes.
    processing: Mutex<()>,
    wakeup: Notify,
    idle: Notify,
    closed: AtomicBool,
}

impl Journal {
    /// A volatile journal without a WAL.
    pub fn new(storage: Arc<dyn Storage>, mode: JournalMode) -> Self {
        Self {
            storage,
            queue: RwLock::new(Queue::default()),
            wal: None,
            mode,
            processing: Mutex::new(()),
            wakeup: Notify::new(),
            idle: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Open a journal, recovering unprocessed transcripts from its WAL.
    ///
    /// Recovered records are in flight again but not applied: call
    /// [`Journal::drain`] or start the worker.
    pub fn open(storage: Arc<dyn Storage>, config: &JournalConfig) -> JournalResult<Self> {
        let mut journal = Self::new(storage, config.mode);
        let Some(path) = &config.wal else {
            return Ok(journal);
        };

        let wal = WriteAheadLog::open(path, config.sync)?;
        let entries = wal.recover()?;
        // Compact so the log holds exactly the recovered records, front first.
        let lengths = wal.rewrite(&entries)?;
        {
            let queue = journal.queue.get_mut().expect("journal lock poisoned");
            for (entry, wal_len) in entries.into_iter().zip(lengths) {
                queue.records.push_back(Record {
                    id: entry.id,
                    transcript: Arc::new(entry.transcript),
                    wal_len,
                });
            }
            info!(
                wal = %path.display(),
                recovered = queue.records.len(),
                "opened journal"
            );
        }
        journal.wal = Some(wal);
        Ok(journal)
    }

    pub fn mode(&self) -> JournalMode {
        self.mode
    }

    /// The storage transcripts are applied to.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Number of transcripts in flight.
    pub fn pending(&self) -> usize {
        self.queue.read().expect("journal lock poisoned").records.len()
    }

    /// Returns `true` if nothing is in flight.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    // ---------------------------------------------------------------
    // Recording and reading
    // ---------------------------------------------------------------

    /// Take a transcript in flight.
    ///
    /// Empty transcripts return `Ok(None)` without touching the WAL, the
    /// queue or storage. Otherwise the transcript is logged, becomes visible
    /// to readers, and is processed before returning (inline mode) or handed
    /// to the worker (background mode). An error means nothing was
    /// recorded.
    pub fn record(&self, transcript: Transcript) -> JournalResult<Option<Uuid>> {
        if transcript.is_empty() {
            return Ok(None);
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(JournalError::Shutdown);
        }

        let id = Uuid::now_v7();
        let actions = transcript.len();
        {
            let mut queue = self.queue.write().expect("journal lock poisoned");
            let entry = WalEntry { id, transcript };
            let wal_len = match &self.wal {
                Some(wal) => wal.append(&entry)?,
                None => 0,
            };
            queue.records.push_back(Record {
                id,
                transcript: Arc::new(entry.transcript),
                wal_len,
            });
        }
        debug!(%id, actions, "recorded transcript");

        match self.mode {
            JournalMode::Inline => match self.drain() {
                Ok(report) if !report.is_clean() => {
                    warn!(%id, failures = report.failures.len(), "transcript applied with failures");
                }
                Ok(_) => {}
                // Already in flight; the next pass applies it.
                Err(err) => error!(%id, error = %err, "inline pass failed"),
            },
            JournalMode::Background => self.wakeup.notify_one(),
        }
        Ok(Some(id))
    }

    /// The freshest in-flight version of the block at `address`.
    ///
    /// Scans newest record first. A pending wipe fails with
    /// [`JournalError::ScheduledForDeletion`]; `Ok(None)` means nothing in
    /// flight matches and the caller should ask storage. The returned block
    /// is a clean copy.
    pub fn retrieve(&self, address: &Address, revision: Revision) -> JournalResult<Option<Block>> {
        let queue = self.queue.read().expect("journal lock poisoned");
        for record in queue.records.iter().rev() {
            for action in record.transcript.actions().iter().rev() {
                match action {
                    Action::Wipe { address: wiped } if wiped == address => {
                        return Err(JournalError::ScheduledForDeletion(*address));
                    }
                    Action::Push { address: pushed, block }
                        if pushed == address && revision.admits(block.revision()) =>
                    {
                        let mut copy = block.clone();
                        copy.set_state(State::Clean);
                        return Ok(Some(copy));
                    }
                    _ => {}
                }
            }
        }
        Ok(None)
    }

    // ---------------------------------------------------------------
    // Processing
    // ---------------------------------------------------------------

    /// Apply every in-flight transcript, oldest first, and dequeue it.
    pub fn drain(&self) -> JournalResult<ProcessReport> {
        let _pass = self.processing.lock().expect("journal lock poisoned");
        let mut report = ProcessReport::default();

        loop {
            let front = self
                .queue
                .read()
                .expect("journal lock poisoned")
                .records
                .front()
                .cloned();
            let Some(record) = front else {
                break;
            };

            self.apply(&record, &mut report);

            let mut queue = self.queue.write().expect("journal lock poisoned");
            queue.records.pop_front();
            report.transcripts += 1;
            if let Some(wal) = &self.wal {
                let length = queue.unpruned + record.wal_len;
                match wal.checkpoint(length) {
                    Ok(()) => queue.unpruned = 0,
                    Err(err) => {
                        error!(id = %record.id, error = %err, "WAL checkpoint failed");
                        queue.unpruned = length;
                    }
                }
            }
        }

        if self.is_idle() {
            self.idle.notify_waiters();
        }
        if report.transcripts > 0 {
            info!(
                transcripts = report.transcripts,
                pushed = report.pushed,
                wiped = report.wiped,
                failures = report.failures.len(),
                "journal drained"
            );
        }
        Ok(report)
    }

    /// Pushes, then wipes. Failures are collected, never fatal.
    fn apply(&self, record: &Record, report: &mut ProcessReport) {
        for (address, block) in record.transcript.pushes() {
            match self.storage.store(address, block) {
                Ok(()) => report.pushed += 1,
                Err(error) => {
                    warn!(id = %record.id, %address, %error, "push failed");
                    report.failures.push(ActionFailure {
                        record: record.id,
                        address: *address,
                        push: true,
                        error,
                    });
                }
            }
        }
        for address in record.transcript.wipes() {
            match self.storage.erase(address) {
                Ok(()) => report.wiped += 1,
                Err(error) => {
                    warn!(id = %record.id, %address, %error, "wipe failed");
                    report.failures.push(ActionFailure {
                        record: record.id,
                        address: *address,
                        push: false,
                        error,
                    });
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Worker
    // ---------------------------------------------------------------

    /// Start the background worker on the current tokio runtime.
    ///
    /// The worker drains whenever a transcript is recorded and once more
    /// after [`Journal::shutdown`] before it exits.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let journal = Arc::clone(self);
        tokio::spawn(async move {
            info!("journal worker started");
            loop {
                let closed = journal.closed.load(Ordering::Acquire);
                if !journal.is_idle() || closed {
                    let pass = Arc::clone(&journal);
                    match tokio::task::spawn_blocking(move || pass.drain()).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(err)) => error!(error = %err, "journal pass failed"),
                        Err(err) => error!(error = %err, "journal pass panicked"),
                    }
                }
                if closed {
                    break;
                }
                journal.wakeup.notified().await;
            }
            info!(pending = journal.pending(), "journal worker stopped");
        })
    }

    /// Refuse new transcripts and let the worker finish.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.wakeup.notify_one();
    }

    /// Wait until nothing is in flight.
    ///
    /// In background mode this only returns once a worker is running.
    pub async fn settle(&self) {
        loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.is_idle() {
                return;
            }
            idle.await;
        }
    }
}

impl Storage for Journal {
    fn exist(&self, address: &Address, revision: Revision) -> StorageResult<bool> {
        match self.retrieve(address, revision) {
            Ok(Some(_)) => Ok(true),
            Ok(None) => self.storage.exist(address, revision),
            Err(JournalError::ScheduledForDeletion(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn load(&self, address: &Address, revision: Revision) -> StorageResult<Block> {
        match self.retrieve(address, revision)? {
            Some(block) => Ok(block),
            None => self.storage.load(address, revision),
        }
    }

    fn store(&self, address: &Address, block: &Block) -> StorageResult<()> {
        self.storage.store(address, block)
    }

    fn erase(&self, address: &Address) -> StorageResult<()> {
        self.storage.erase(address)
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("mode", &self.mode)
            .field("pending", &self.pending())
            .field("wal", &self.wal.as_ref().map(|w| w.path().to_path_buf()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncMode;
    use proton_crypto::SigningKey;
    use proton_store::InMemoryStorage;
    use proton_types::{Component, Digest, Network};
    use std::sync::atomic::AtomicUsize;

    fn block(n: u8) -> Block {
        Block::content_hash(Network::named("journal"), Component::Data, Digest::null(), vec![n; 16])
    }

    fn push(blocks: &[Block]) -> Transcript {
        let mut transcript = Transcript::new();
        for b in blocks {
            transcript.push(b.bind(), b.clone());
        }
        transcript
    }

    /// Counts every call that reaches the backend.
    #[derive(Default)]
    struct CountingStorage {
        inner: InMemoryStorage,
        calls: AtomicUsize,
    }

    impl Storage for CountingStorage {
        fn exist(&self, a: &Address, r: Revision) -> StorageResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.exist(a, r)
        }
        fn load(&self, a: &Address, r: Revision) -> StorageResult<Block> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.load(a, r)
        }
        fn store(&self, a: &Address, b: &Block) -> StorageResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.store(a, b)
        }
        fn erase(&self, a: &Address) -> StorageResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.erase(a)
        }
    }

    #[test]
    fn empty_transcript_is_a_no_op() {
        let storage = Arc::new(CountingStorage::default());
        let journal = Journal::new(storage.clone(), JournalMode::Inline);
        assert_eq!(journal.record(Transcript::new()).unwrap(), None);
        assert_eq!(journal.pending(), 0);
        assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn inline_mode_applies_before_returning() {
        let storage = Arc::new(InMemoryStorage::new());
        let journal = Journal::new(storage.clone(), JournalMode::Inline);
        let b = block(1);
        assert!(journal.record(push(&[b.clone()])).unwrap().is_some());
        assert!(journal.is_idle());
        assert_eq!(storage.load_latest(&b.bind()).unwrap(), b);
        // Settled records are storage's business, not the journal's.
        assert!(journal.retrieve(&b.bind(), Revision::Last).unwrap().is_none());
    }

    #[test]
    fn retrieve_sees_in_flight_pushes() {
        let storage = Arc::new(InMemoryStorage::new());
        let journal = Journal::new(storage.clone(), JournalMode::Background);
        let b = block(2);
        journal.record(push(&[b.clone()])).unwrap();

        let seen = journal.retrieve(&b.bind(), Revision::Last).unwrap().unwrap();
        assert_eq!(seen, b);
        assert_eq!(seen.state(), State::Clean);
        assert!(storage.is_empty());

        journal.drain().unwrap();
        assert!(journal.retrieve(&b.bind(), Revision::Last).unwrap().is_none());
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn retrieve_prefers_newest_record_and_matches_revision() {
        let storage = Arc::new(InMemoryStorage::new());
        let journal = Journal::new(storage, JournalMode::Background);
        let owner = SigningKey::generate();
        let v0 = Block::owner_key(Network::named("journal"), Component::Object, &owner, b"v0".to_vec());
        let v1 = v0.derive(&owner, b"v1".to_vec()).unwrap();
        journal.record(push(&[v0.clone()])).unwrap();
        journal.record(push(&[v1.clone()])).unwrap();

        let address = v0.bind();
        assert_eq!(journal.retrieve(&address, Revision::Last).unwrap().unwrap(), v1);
        assert_eq!(journal.retrieve(&address, Revision::Number(0)).unwrap().unwrap(), v0);
        assert!(journal.retrieve(&address, Revision::Number(5)).unwrap().is_none());
    }

    #[test]
    fn pending_wipe_blocks_reads() {
        let storage = Arc::new(InMemoryStorage::new());
        let b = block(3);
        storage.store(&b.bind(), &b).unwrap();
        let journal = Journal::new(storage.clone(), JournalMode::Background);

        let mut transcript = Transcript::new();
        transcript.wipe(b.bind());
        journal.record(transcript).unwrap();

        assert!(matches!(
            journal.retrieve(&b.bind(), Revision::Last),
            Err(JournalError::ScheduledForDeletion(_))
        ));
        assert!(matches!(
            journal.load_latest(&b.bind()),
            Err(StorageError::PendingDeletion(_))
        ));
        assert!(!journal.exist(&b.bind(), Revision::Last).unwrap());

        journal.drain().unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn storage_view_falls_through() {
        let storage = Arc::new(InMemoryStorage::new());
        let b = block(4);
        storage.store(&b.bind(), &b).unwrap();
        let journal = Journal::new(storage, JournalMode::Background);
        assert_eq!(journal.load_latest(&b.bind()).unwrap(), b);
        assert!(journal.exist(&b.bind(), Revision::Last).unwrap());
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let storage = Arc::new(InMemoryStorage::new());
        let existing = block(5);
        storage.store(&existing.bind(), &existing).unwrap();
        let journal = Journal::new(storage.clone(), JournalMode::Background);

        let fresh = block(6);
        let mut transcript = push(&[existing.clone(), fresh.clone()]);
        transcript.wipe(block(7).bind());
        transcript.wipe(existing.bind());
        journal.record(transcript).unwrap();

        let report = journal.drain().unwrap();
        assert_eq!(report.transcripts, 1);
        assert_eq!(report.pushed, 1);
        assert_eq!(report.wiped, 1);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0].error, StorageError::AlreadyExists(_)));
        assert!(report.failures[0].push);
        assert!(!report.failures[1].push);
        assert!(journal.is_idle());
        assert_eq!(storage.addresses(), vec![fresh.bind()]);
    }

    #[test]
    fn wal_recovers_unprocessed_transcripts() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig {
            mode: JournalMode::Background,
            wal: Some(dir.path().join("journal.wal")),
            sync: SyncMode::EveryWrite,
        };
        let storage = Arc::new(InMemoryStorage::new());
        let (a, b) = (block(8), block(9));
        {
            let journal = Journal::open(storage.clone(), &config).unwrap();
            journal.record(push(&[a.clone()])).unwrap();
            journal.drain().unwrap();
            journal.record(push(&[b.clone()])).unwrap();
            // Dropped before processing `b`.
        }

        let journal = Journal::open(storage.clone(), &config).unwrap();
        assert_eq!(journal.pending(), 1);
        assert_eq!(journal.retrieve(&b.bind(), Revision::Last).unwrap().unwrap(), b);
        assert!(journal.drain().unwrap().is_clean());
        assert_eq!(storage.len(), 2);

        let reopened = Journal::open(storage, &config).unwrap();
        assert_eq!(reopened.pending(), 0);
    }

    #[test]
    fn replayed_pushes_are_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig {
            mode: JournalMode::Background,
            wal: Some(dir.path().join("replay.wal")),
            sync: SyncMode::OsDefault,
        };
        let storage = Arc::new(InMemoryStorage::new());
        let a = block(10);
        {
            let journal = Journal::open(storage.clone(), &config).unwrap();
            journal.record(push(&[a.clone()])).unwrap();
        }
        // The push reached storage but the checkpoint did not.
        storage.store(&a.bind(), &a).unwrap();

        let journal = Journal::open(storage, &config).unwrap();
        let report = journal.drain().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.is_recoverable());
        assert!(journal.is_idle());
    }

    #[test]
    fn shutdown_refuses_new_transcripts() {
        let journal = Journal::new(Arc::new(InMemoryStorage::new()), JournalMode::Inline);
        journal.shutdown();
        assert!(matches!(
            journal.record(push(&[block(11)])),
            Err(JournalError::Shutdown)
        ));
        // Empty transcripts stay a no-op.
        assert!(journal.record(Transcript::new()).unwrap().is_none());
    }

    #[tokio::test]
    async fn background_worker_settles() {
        let storage = Arc::new(InMemoryStorage::new());
        let journal = Arc::new(Journal::new(storage.clone(), JournalMode::Background));
        let worker = journal.spawn();

        for n in 20..30 {
            journal.record(push(&[block(n)])).unwrap();
        }
        journal.settle().await;
        assert!(journal.is_idle());
        assert_eq!(storage.len(), 10);

        journal.shutdown();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn worker_drains_on_shutdown() {
        let storage = Arc::new(InMemoryStorage::new());
        let journal = Arc::new(Journal::new(storage.clone(), JournalMode::Background));
        journal.record(push(&[block(40)])).unwrap();
        journal.shutdown();
        journal.spawn().await.unwrap();
        assert!(journal.is_idle());
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn settle_is_immediate_when_idle() {
        let journal = Journal::new(Arc::new(InMemoryStorage::new()), JournalMode::Inline);
        journal.record(push(&[block(50)])).unwrap();
        journal.settle().await;
    }
}
