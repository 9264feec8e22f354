//! The nest: a bounded cache of blocks with LRU pre-publication.
//!
//! # Invariants
//!
//! - `size` is the sum of the footprints of queued pods.
//! - A pod is queued iff no loaded handle uses it and its payload is resident.
//! - Every permanent egg is indexed under its alive address.
//! - Wipes accumulate until the next [`Nest::transcribe`].

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use proton_block::{Block, State};
use proton_crypto::Secret;
use proton_store::Storage;
use proton_types::{Address, Revision};
use tracing::{debug, info, warn};

use crate::clef::Clef;
use crate::config::NestConfig;
use crate::egg::{Egg, EggId, EggKind};
use crate::error::{NestError, NestResult};
use crate::handle::{Handle, HandleState};
use crate::pod::Pod;
use crate::stats::NestStatistics;
use crate::transcript::Transcript;

/// Bounded in-memory cache of blocks, spilling to storage.
pub struct Nest {
    /// All pods, keyed by egg identity.
    pods: HashMap<EggId, Pod>,
    /// Permanent eggs, keyed by alive address.
    addresses: HashMap<Address, EggId>,
    /// LRU queue: stamp -> egg. The first entry is the least recently used.
    history: BTreeMap<u64, EggId>,
    /// Next LRU stamp.
    clock: u64,
    /// Next egg identity.
    next_id: u64,
    size: u64,
    threshold: u64,
    storage: Arc<dyn Storage>,
    /// Addresses to delete, collected until the next transcribe.
    wipes: Vec<Address>,
    stats: NestStatistics,
}

impl Nest {
    /// Create an empty nest over `storage`.
    pub fn new(storage: Arc<dyn Storage>, config: &NestConfig) -> Self {
        Self {
            pods: HashMap::new(),
            addresses: HashMap::new(),
            history: BTreeMap::new(),
            clock: 0,
            next_id: 0,
            size: 0,
            threshold: config.threshold,
            storage,
            wipes: Vec::new(),
            stats: NestStatistics::default(),
        }
    }

    /// Sum of the footprints of queued (unused, resident) blocks.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Number of eggs the nest tracks.
    pub fn len(&self) -> usize {
        self.pods.len()
    }

    /// Returns `true` if the nest tracks no eggs.
    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    /// Number of pods on the LRU queue.
    pub fn queued(&self) -> usize {
        self.history.len()
    }

    pub fn statistics(&self) -> NestStatistics {
        self.stats
    }

    // ---------------------------------------------------------------
    // Public operations
    // ---------------------------------------------------------------

    /// Take ownership of a new block and return a handle to it.
    ///
    /// The block is queued as unused but no eviction runs: its footprint is
    /// only an estimate until it is sealed.
    pub fn attach(&mut self, block: Block) -> Handle {
        let id = self.allocate();
        let egg = Rc::new(RefCell::new(Egg::new_transient(id, block, Clef::placeholder())));
        self.pods.insert(id, Pod::new(Rc::clone(&egg)));
        self.enqueue(id);
        self.stats.attached += 1;
        debug!(egg = %id, size = self.size, "attached block");
        Handle::placed(egg)
    }

    /// Forget the block behind `handle`, scheduling deletion of any stored copy.
    ///
    /// # Panics
    ///
    /// Panics if the handle is unknown to this nest or currently loaded.
    pub fn detach(&mut self, handle: Handle) {
        let egg = match handle.state {
            HandleState::Placed(egg) => egg,
            HandleState::Unplaced(clef) => match self.addresses.get(&clef.address) {
                Some(id) => Rc::clone(&self.pod(*id).egg),
                None => {
                    if !clef.address.is_null() {
                        self.wipes.push(clef.address);
                    }
                    return;
                }
            },
        };

        let id = self.resolve(&egg);
        assert!(!self.pod(id).in_use(), "detach() on {id} while it is loaded");
        self.dequeue(id);
        self.pods.remove(&id);

        let egg = egg.borrow();
        self.addresses.remove(&egg.alive().address);
        if let Some(historical) = egg.historical() {
            self.wipes.push(historical.address);
        }
        debug!(egg = %id, kind = ?egg.kind(), "detached block");
    }

    /// Borrow the block behind `handle`, fetching it from storage if needed.
    ///
    /// The pod leaves the LRU queue until the matching [`Nest::unload`]. A
    /// failed fetch leaves the egg without payload and not in use.
    ///
    /// # Panics
    ///
    /// Panics if the handle belongs to a detached egg or another nest.
    pub fn load<'h>(&mut self, handle: &'h mut Handle) -> NestResult<Ref<'h, Block>> {
        self.acquire(handle)?;
        let handle: &'h Handle = handle;
        let egg = handle.egg().expect("acquire() places the handle");
        Ok(Ref::map(egg.borrow(), |egg| {
            egg.block().expect("acquire() makes the payload resident")
        }))
    }

    /// Like [`Nest::load`], but marks the block dirty and borrows it mutably.
    pub fn load_mut<'h>(&mut self, handle: &'h mut Handle) -> NestResult<RefMut<'h, Block>> {
        self.acquire(handle)?;
        let handle: &'h Handle = handle;
        let egg = handle.egg().expect("acquire() places the handle");
        Ok(RefMut::map(egg.borrow_mut(), |egg| {
            let block = egg
                .block
                .as_mut()
                .expect("acquire() makes the payload resident");
            block.set_state(State::Dirty);
            block
        }))
    }

    /// Release a loaded handle and run an eviction pass.
    ///
    /// # Panics
    ///
    /// Panics if the handle is unknown to this nest or was not loaded.
    pub fn unload(&mut self, handle: &Handle) -> NestResult<()> {
        let id = match handle.egg() {
            Some(egg) => self.resolve(egg),
            None => panic!("unload() on a handle that was never loaded"),
        };
        let pod = self.pod_mut(id);
        assert!(pod.in_use(), "unload() on {id} which is not loaded");
        pod.uses -= 1;
        if !pod.in_use() {
            self.enqueue(id);
        }
        self.optimize()
    }

    /// Evict least recently used blocks until the size fits the threshold.
    ///
    /// Dirty and transient blocks are sealed and written through to storage
    /// first. The first storage error ends the pass; what was already evicted
    /// stays evicted.
    pub fn optimize(&mut self) -> NestResult<()> {
        if self.size <= self.threshold {
            return Ok(());
        }
        debug!(size = self.size, threshold = self.threshold, "eviction pass");
        while self.size > self.threshold {
            let Some((_, &id)) = self.history.first_key_value() else {
                break;
            };
            if let Err(err) = self.evict(id) {
                warn!(egg = %id, error = %err, "eviction pass aborted");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Seal every dirty or transient block and drain the pending actions.
    ///
    /// # Panics
    ///
    /// Panics if any block is still loaded.
    pub fn transcribe(&mut self) -> NestResult<Transcript> {
        self.transcribe_with(Ok)
    }

    /// Like [`Nest::transcribe`], but the nest only adopts the new seals and
    /// forgets its pending wipes once `accept` takes the transcript.
    ///
    /// If `accept` fails the nest is left as it was, so a later call
    /// produces the same actions again (under fresh secrets).
    pub fn transcribe_with<T, E, F>(&mut self, accept: F) -> Result<T, E>
    where
        F: FnOnce(Transcript) -> Result<T, E>,
        E: From<NestError>,
    {
        if let Some((id, _)) = self.pods.iter().find(|(_, pod)| pod.in_use()) {
            panic!("transcribe() called while {id} is in use");
        }

        let mut ids: Vec<EggId> = self.pods.keys().copied().collect();
        ids.sort();

        let mut transcript = Transcript::new();
        let mut clefs = Vec::new();
        let mut superseded = Vec::new();
        for id in ids {
            let egg = self.pod(id).egg.borrow();
            if !egg.needs_seal() {
                continue;
            }
            let block = egg.block().expect("needs_seal() implies a payload");
            let (clef, envelope) = seal(block)?;
            if let Some(previous) = egg.historical() {
                superseded.push(previous.address);
            }
            transcript.push(clef.address, envelope);
            clefs.push((id, clef));
        }
        for address in self.wipes.iter().chain(&superseded) {
            transcript.wipe(*address);
        }
        let pushes = clefs.len();
        let wipes = transcript.len() - pushes;
        let actions = transcript.len();

        let accepted = accept(transcript)?;

        self.wipes.clear();
        for (id, clef) in clefs {
            // Superseded copies are already in the transcript.
            self.adopt_seal(id, clef);
        }
        self.stats.transcribed += actions as u64;
        info!(pushes, wipes, "transcribed nest");
        Ok(accepted)
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn allocate(&mut self) -> EggId {
        let id = EggId(self.next_id);
        self.next_id += 1;
        id
    }

    fn pod(&self, id: EggId) -> &Pod {
        match self.pods.get(&id) {
            Some(pod) => pod,
            None => panic!("unknown handle: {id} is not in this nest"),
        }
    }

    fn pod_mut(&mut self, id: EggId) -> &mut Pod {
        match self.pods.get_mut(&id) {
            Some(pod) => pod,
            None => panic!("unknown handle: {id} is not in this nest"),
        }
    }

    /// Identity of `egg` in this nest. Ids restart in every nest, so the
    /// pod found under the id must hold this very egg.
    ///
    /// Panics if the egg was detached or belongs to another nest.
    fn resolve(&self, egg: &Rc<RefCell<Egg>>) -> EggId {
        let id = egg.borrow().id();
        match self.pods.get(&id) {
            Some(pod) if Rc::ptr_eq(&pod.egg, egg) => id,
            _ => panic!("unknown handle: {id} is not in this nest"),
        }
    }

    /// Put a resident, unused pod at the LRU tail.
    fn enqueue(&mut self, id: EggId) {
        self.dequeue(id);
        let stamp = self.clock;
        self.clock += 1;
        let pod = self.pod_mut(id);
        if !pod.egg.borrow().is_resident() {
            return;
        }
        pod.footprint = pod.measure();
        pod.position = Some(stamp);
        let footprint = pod.footprint;
        self.history.insert(stamp, id);
        self.size += footprint;
    }

    /// Take a pod off the LRU queue, if it is on it.
    fn dequeue(&mut self, id: EggId) {
        let pod = self.pod_mut(id);
        if let Some(stamp) = pod.position.take() {
            let footprint = pod.footprint;
            self.history.remove(&stamp);
            self.size -= footprint;
        }
    }

    /// Place `handle`, make its payload resident and mark the pod in use.
    fn acquire(&mut self, handle: &mut Handle) -> NestResult<()> {
        if let HandleState::Unplaced(clef) = &handle.state {
            let egg = match self.addresses.get(&clef.address) {
                Some(id) => Rc::clone(&self.pod(*id).egg),
                None => self.adopt(clef.clone()),
            };
            handle.state = HandleState::Placed(egg);
        }
        let egg = Rc::clone(handle.egg().expect("handle was just placed"));
        // Unknown handles panic here, before any I/O.
        let id = self.resolve(&egg);

        if !egg.borrow().is_resident() {
            let clef = egg.borrow().historical().cloned().unwrap_or_else(Clef::placeholder);
            let block = self.fetch(&clef)?;
            egg.borrow_mut().block = Some(block);
            self.stats.misses += 1;
        }

        self.dequeue(id);
        self.pod_mut(id).uses += 1;
        self.stats.loads += 1;
        Ok(())
    }

    /// Track a stored block nobody in this nest has loaded yet.
    fn adopt(&mut self, clef: Clef) -> Rc<RefCell<Egg>> {
        let id = self.allocate();
        let address = clef.address;
        let egg = Rc::new(RefCell::new(Egg::new_permanent(id, clef)));
        self.pods.insert(id, Pod::new(Rc::clone(&egg)));
        self.addresses.insert(address, id);
        egg
    }

    fn fetch(&self, clef: &Clef) -> NestResult<Block> {
        let envelope = self.storage.load(&clef.address, Revision::Last)?;
        envelope.validate(&clef.address)?;
        let block = envelope.decrypt(&clef.secret)?;
        debug!(address = %clef.address, "fetched block from storage");
        Ok(block)
    }

    /// Drop the payload of the LRU pod, writing it through first if needed.
    fn evict(&mut self, id: EggId) -> NestResult<()> {
        let egg = Rc::clone(&self.pod(id).egg);
        if egg.borrow().needs_seal() {
            let (clef, envelope) = {
                let egg = egg.borrow();
                seal(egg.block().expect("needs_seal() implies a payload"))?
            };
            self.storage.store(&clef.address, &envelope)?;
            if let Some(previous) = self.adopt_seal(id, clef) {
                self.wipes.push(previous);
            }
            self.stats.prepublications += 1;
            info!(egg = %id, address = %envelope.bind(), footprint = self.pod(id).footprint, "pre-published block");
        }
        self.dequeue(id);
        egg.borrow_mut().block = None;
        self.stats.evictions += 1;
        Ok(())
    }

    /// Point the egg at a freshly sealed copy and reindex it. Returns the
    /// address of the stored copy it supersedes, if any.
    fn adopt_seal(&mut self, id: EggId, clef: Clef) -> Option<Address> {
        let egg = Rc::clone(&self.pod(id).egg);
        let mut egg = egg.borrow_mut();
        if egg.kind() == EggKind::Permanent {
            self.addresses.remove(&egg.alive().address);
        }
        let superseded = egg
            .historical()
            .map(|previous| previous.address)
            .filter(|previous| *previous != clef.address);
        self.addresses.insert(clef.address, id);
        egg.reset(clef);
        if let Some(block) = egg.block.as_mut() {
            block.set_state(State::Clean);
        }
        superseded
    }
}

/// Encrypt `block` under a fresh secret; the envelope's address completes the clef.
fn seal(block: &Block) -> NestResult<(Clef, Block)> {
    let secret = Secret::generate();
    let envelope = block.encrypt(&secret)?;
    Ok((Clef::new(envelope.bind(), secret), envelope))
}

impl fmt::Debug for Nest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nest")
            .field("eggs", &self.pods.len())
            .field("queued", &self.history.len())
            .field("size", &self.size)
            .field("threshold", &self.threshold)
            .field("pending_wipes", &self.wipes.len())
            .finish()
    }
}
