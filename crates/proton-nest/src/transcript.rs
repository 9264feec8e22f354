use serde::{Deserialize, Serialize};

use proton_block::Block;
use proton_types::Address;

/// One pending storage operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Write `block` at `address`.
    Push { address: Address, block: Block },
    /// Delete whatever is stored at `address`.
    Wipe { address: Address },
}

impl Action {
    pub fn address(&self) -> &Address {
        match self {
            Self::Push { address, .. } | Self::Wipe { address } => address,
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(self, Self::Push { .. })
    }
}

/// Ordered batch of storage operations produced by one nest scope.
///
/// Every push precedes every wipe. [`Transcript::push`] inserts before the
/// first wipe, so the order holds however the batch is built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    actions: Vec<Action>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a write-intent after the existing pushes.
    pub fn push(&mut self, address: Address, block: Block) {
        let at = self.actions.partition_point(Action::is_push);
        self.actions.insert(at, Action::Push { address, block });
    }

    /// Append a delete-intent.
    pub fn wipe(&mut self, address: Address) {
        self.actions.push(Action::Wipe { address });
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn pushes(&self) -> impl Iterator<Item = (&Address, &Block)> {
        self.actions.iter().filter_map(|action| match action {
            Action::Push { address, block } => Some((address, block)),
            Action::Wipe { .. } => None,
        })
    }

    pub fn wipes(&self) -> impl Iterator<Item = &Address> {
        self.actions.iter().filter_map(|action| match action {
            Action::Wipe { address } => Some(address),
            Action::Push { .. } => None,
        })
    }

    /// Move every action of `other` into `self`, keeping pushes first.
    pub fn merge(&mut self, other: Transcript) {
        for action in other.actions {
            match action {
                Action::Push { address, block } => self.push(address, block),
                Action::Wipe { address } => self.wipe(address),
            }
        }
    }
}

impl IntoIterator for Transcript {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use proton_types::{Component, Digest, Network};

    fn block(n: u8) -> Block {
        Block::content_hash(Network::named("t"), Component::Data, Digest::null(), vec![n])
    }

    #[test]
    fn pushes_stay_ahead_of_wipes() {
        let mut transcript = Transcript::new();
        transcript.wipe(block(1).bind());
        transcript.push(block(2).bind(), block(2));
        transcript.wipe(block(3).bind());
        transcript.push(block(4).bind(), block(4));

        let kinds: Vec<bool> = transcript.actions().iter().map(Action::is_push).collect();
        assert_eq!(kinds, vec![true, true, false, false]);
        assert_eq!(transcript.pushes().count(), 2);
        assert_eq!(transcript.wipes().next(), Some(&block(1).bind()));
    }

    #[test]
    fn merge_keeps_order() {
        let mut a = Transcript::new();
        a.wipe(block(1).bind());
        let mut b = Transcript::new();
        b.push(block(2).bind(), block(2));
        a.merge(b);
        assert!(a.actions()[0].is_push());
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn serializes_to_json() {
        let mut transcript = Transcript::new();
        transcript.push(block(5).bind(), block(5));
        let json = serde_json::to_string(&transcript).unwrap();
        let back: Transcript = serde_json::from_str(&json).unwrap();
        assert_eq!(back, transcript);
    }

    // 0 pushes, 1 wipes, anything else merges a two-action batch.
    fn apply(transcript: &mut Transcript, op: u8, n: u8) {
        match op {
            0 => transcript.push(block(n).bind(), block(n)),
            1 => transcript.wipe(block(n).bind()),
            _ => {
                let mut batch = Transcript::new();
                batch.wipe(block(n).bind());
                batch.push(block(n.wrapping_add(1)).bind(), block(n.wrapping_add(1)));
                transcript.merge(batch);
            }
        }
    }

    proptest! {
        #[test]
        fn pushes_always_precede_wipes(
            ops in proptest::collection::vec((0u8..3, any::<u8>()), 0..48),
        ) {
            let mut transcript = Transcript::new();
            let mut pushes = 0;
            let mut wipes = 0;
            for (op, n) in ops {
                apply(&mut transcript, op, n);
                match op {
                    0 => pushes += 1,
                    1 => wipes += 1,
                    _ => {
                        pushes += 1;
                        wipes += 1;
                    }
                }
            }
            let first_wipe = transcript.actions().iter().position(|a| !a.is_push());
            if let Some(at) = first_wipe {
                prop_assert!(transcript.actions()[at..].iter().all(|a| !a.is_push()));
            }
            prop_assert_eq!(transcript.pushes().count(), pushes);
            prop_assert_eq!(transcript.wipes().count(), wipes);
        }
    }
}
