use std::fmt;

use serde::{Deserialize, Serialize};

/// Revision selector used when reading blocks.
///
/// Immutable blocks have a single implicit revision, [`Revision::FIRST`].
/// Mutable blocks advance one revision per derivation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Revision {
    /// Whatever revision is the most recent one.
    #[default]
    Last,
    /// Exactly this revision number.
    Number(u64),
}

impl Revision {
    /// The revision of every immutable block and of a freshly created mutable one.
    pub const FIRST: u64 = 0;

    /// Returns `true` if a block at `revision` satisfies this selector.
    pub fn admits(&self, revision: u64) -> bool {
        match self {
            Self::Last => true,
            Self::Number(n) => *n == revision,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Last => write!(f, "last"),
            Self::Number(n) => write!(f, "#{n}"),
        }
    }
}
