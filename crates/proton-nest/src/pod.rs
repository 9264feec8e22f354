use std::cell::RefCell;
use std::rc::Rc;

use crate::egg::Egg;

/// LRU and footprint bookkeeping around one egg.
///
/// A pod is either queued (`position` is its LRU stamp) or in use by at
/// least one loaded handle. Only queued pods count towards the nest size.
#[derive(Debug)]
pub(crate) struct Pod {
    pub(crate) egg: Rc<RefCell<Egg>>,
    pub(crate) position: Option<u64>,
    pub(crate) footprint: u64,
    pub(crate) uses: u32,
}

impl Pod {
    pub(crate) fn new(egg: Rc<RefCell<Egg>>) -> Self {
        Self {
            egg,
            position: None,
            footprint: 0,
            uses: 0,
        }
    }

    /// Estimated bytes of the resident payload; zero when not resident.
    pub(crate) fn measure(&self) -> u64 {
        self.egg.borrow().block().map_or(0, |b| b.footprint())
    }

    pub(crate) fn in_use(&self) -> bool {
        self.uses > 0
    }
}
