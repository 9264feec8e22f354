use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use proton_types::Address;

use crate::clef::Clef;
use crate::egg::Egg;

#[derive(Clone)]
pub(crate) enum HandleState {
    /// Never loaded through a nest; carries its own clef.
    Unplaced(Clef),
    /// Resolved to an egg.
    Placed(Rc<RefCell<Egg>>),
}

/// Cheap, clonable reference to a block managed by a [`Nest`](crate::Nest).
///
/// Handles of detached eggs, or handles carried over to another nest, are
/// invalid: using them panics.
#[derive(Clone)]
pub struct Handle {
    pub(crate) state: HandleState,
}

impl Handle {
    /// A handle to a stored block that no nest has seen yet.
    pub fn unplaced(clef: Clef) -> Self {
        Self {
            state: HandleState::Unplaced(clef),
        }
    }

    pub(crate) fn placed(egg: Rc<RefCell<Egg>>) -> Self {
        Self {
            state: HandleState::Placed(egg),
        }
    }

    /// Returns `true` once the handle resolves to an egg.
    pub fn is_placed(&self) -> bool {
        matches!(self.state, HandleState::Placed(_))
    }

    /// Clef of the in-memory copy; a placeholder while the block was never sealed.
    pub fn clef(&self) -> Clef {
        match &self.state {
            HandleState::Unplaced(clef) => clef.clone(),
            HandleState::Placed(egg) => egg.borrow().alive().clone(),
        }
    }

    pub fn address(&self) -> Address {
        match &self.state {
            HandleState::Unplaced(clef) => clef.address,
            HandleState::Placed(egg) => egg.borrow().alive().address,
        }
    }

    pub(crate) fn egg(&self) -> Option<&Rc<RefCell<Egg>>> {
        match &self.state {
            HandleState::Unplaced(_) => None,
            HandleState::Placed(egg) => Some(egg),
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            HandleState::Unplaced(clef) => f.debug_tuple("Handle::Unplaced").field(&clef.address).finish(),
            HandleState::Placed(egg) => f.debug_tuple("Handle::Placed").field(&egg.borrow().id()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::egg::EggId;
    use proton_crypto::Secret;

    #[test]
    fn unplaced_handle_reports_its_clef() {
        let clef = Clef::new(Address::null(), Secret::generate());
        let handle = Handle::unplaced(clef.clone());
        assert!(!handle.is_placed());
        assert_eq!(handle.clef(), clef);
        assert!(handle.egg().is_none());
    }

    #[test]
    fn clones_share_the_egg() {
        let egg = Rc::new(RefCell::new(Egg::new_permanent(EggId(4), Clef::placeholder())));
        let a = Handle::placed(Rc::clone(&egg));
        let b = a.clone();
        assert!(Rc::ptr_eq(a.egg().unwrap(), b.egg().unwrap()));
        assert_eq!(Rc::strong_count(&egg), 3);
    }
}
