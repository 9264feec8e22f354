use std::fmt;

use proton_block::Block;

use crate::clef::Clef;

/// Identity of an egg within its nest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EggId(pub(crate) u64);

impl fmt::Display for EggId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "egg#{}", self.0)
    }
}

/// Whether the egg's block has ever been sealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EggKind {
    /// Created in memory; its clef is a placeholder.
    Transient,
    /// Sealed at least once; its clef locates a stored copy.
    Permanent,
}

/// The nest's descriptor of one block.
///
/// `alive` locates the copy held in memory, `historical` the copy last
/// published. They only differ between a seal and the moment the new copy is
/// pushed. Transient eggs have no historical clef.
#[derive(Debug)]
pub struct Egg {
    pub(crate) id: EggId,
    pub(crate) kind: EggKind,
    pub(crate) alive: Clef,
    pub(crate) historical: Option<Clef>,
    pub(crate) block: Option<Block>,
}

impl Egg {
    pub(crate) fn new_transient(id: EggId, block: Block, provisional: Clef) -> Self {
        Self {
            id,
            kind: EggKind::Transient,
            alive: provisional,
            historical: None,
            block: Some(block),
        }
    }

    pub(crate) fn new_permanent(id: EggId, clef: Clef) -> Self {
        Self {
            id,
            kind: EggKind::Permanent,
            alive: clef.clone(),
            historical: Some(clef),
            block: None,
        }
    }

    /// Adopt the clef produced by sealing the resident block.
    ///
    /// # Panics
    ///
    /// Panics if the payload is not resident: sealing needs the plaintext.
    pub(crate) fn reset(&mut self, clef: Clef) {
        assert!(
            self.block.is_some(),
            "reset() on {} without a resident payload",
            self.id
        );
        self.kind = EggKind::Permanent;
        self.historical = Some(clef.clone());
        self.alive = clef;
    }

    pub fn id(&self) -> EggId {
        self.id
    }

    pub fn kind(&self) -> EggKind {
        self.kind
    }

    pub fn alive(&self) -> &Clef {
        &self.alive
    }

    pub fn historical(&self) -> Option<&Clef> {
        self.historical.as_ref()
    }

    pub fn block(&self) -> Option<&Block> {
        self.block.as_ref()
    }

    /// Returns `true` if the payload is in memory.
    pub fn is_resident(&self) -> bool {
        self.block.is_some()
    }

    /// Returns `true` if the resident payload must be sealed before it can be
    /// dropped.
    pub(crate) fn needs_seal(&self) -> bool {
        match (&self.block, self.kind) {
            (None, _) => false,
            (Some(_), EggKind::Transient) => true,
            (Some(block), EggKind::Permanent) => block.state() == proton_block::State::Dirty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proton_crypto::Secret;
    use proton_types::{Component, Digest, Network};

    fn block() -> Block {
        Block::content_hash(Network::named("egg"), Component::Data, Digest::null(), vec![7; 8])
    }

    #[test]
    fn transient_egg_needs_seal() {
        let egg = Egg::new_transient(EggId(1), block(), Clef::placeholder());
        assert_eq!(egg.kind(), EggKind::Transient);
        assert!(egg.needs_seal());
        assert!(egg.historical().is_none());
    }

    #[test]
    fn reset_makes_egg_permanent() {
        let mut egg = Egg::new_transient(EggId(1), block(), Clef::placeholder());
        let clef = Clef::new(block().bind(), Secret::generate());
        egg.reset(clef.clone());
        assert_eq!(egg.kind(), EggKind::Permanent);
        assert_eq!(egg.alive(), &clef);
        assert_eq!(egg.historical(), Some(&clef));
    }

    #[test]
    #[should_panic(expected = "without a resident payload")]
    fn reset_requires_payload() {
        let mut egg = Egg::new_permanent(EggId(2), Clef::placeholder());
        egg.reset(Clef::placeholder());
    }
}
