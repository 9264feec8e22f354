use serde::{Deserialize, Serialize};

use proton_crypto::Secret;
use proton_types::Address;

/// Everything needed to find and open one sealed block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clef {
    pub address: Address,
    pub secret: Secret,
}

impl Clef {
    pub fn new(address: Address, secret: Secret) -> Self {
        Self { address, secret }
    }

    /// Null address and null secret; stands in until the block is sealed.
    pub fn placeholder() -> Self {
        Self::new(Address::null(), Secret::null())
    }

    pub fn is_placeholder(&self) -> bool {
        self.address.is_null()
    }
}
