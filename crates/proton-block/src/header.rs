use rand::Rng;
use serde::{Deserialize, Serialize};

use proton_types::{Component, Digest, Network, Timestamp};

/// In-memory modification state of a block. Never serialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    /// Matches what storage holds (or was just decoded).
    #[default]
    Clean,
    /// Created or modified since it was last persisted.
    Dirty,
}

/// Attributes shared by every block kind.
///
/// Equality ignores [`State`]: two headers that serialize identically are
/// equal no matter what the in-memory copy has been through.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Network the block belongs to.
    pub network: Network,
    /// Kind of object the block carries.
    pub component: Component,
    /// Identity digest of the creator.
    pub creator: Digest,
    /// Creation time.
    pub created: Timestamp,
    /// Random value telling apart simultaneous creations by one creator.
    pub salt: u64,
    /// Modification state; resets to `Clean` on decode.
    #[serde(skip)]
    pub state: State,
}

impl BlockHeader {
    /// Header for a freshly created block: stamped now, random salt, dirty.
    pub fn new(network: Network, component: Component, creator: Digest) -> Self {
        Self {
            network,
            component,
            creator,
            created: Timestamp::now(),
            salt: rand::thread_rng().gen(),
            state: State::Dirty,
        }
    }
}

impl PartialEq for BlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.network == other.network
            && self.component == other.component
            && self.creator == other.creator
            && self.created == other.created
            && self.salt == other.salt
    }
}

impl Eq for BlockHeader {}
