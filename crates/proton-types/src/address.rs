//! Typed, content-derived block addresses.
//!
//! An [`Address`] names a block by the network it belongs to, the family of
//! block it is (which decides how the digest is computed), the kind of object
//! it carries, and the digest itself.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::TypeError;

/// Identifier of the network a block belongs to.
///
/// Derived from the network name, so every node configured with the same
/// name computes the same identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Network(Digest);

impl Network {
    /// Derive the network identifier from its name.
    pub fn named(name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"proton-network-v1:");
        hasher.update(name.as_bytes());
        Self(Digest::from_hash(*hasher.finalize().as_bytes()))
    }

    /// The underlying digest.
    pub fn digest(&self) -> &Digest {
        &self.0
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Network({})", self.0.short_hex())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net:{}", self.0.short_hex())
    }
}

/// How a block's digest is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    /// Immutable; digest over the content.
    ContentHash,
    /// Mutable; digest over a generated block key signed by the owner.
    OwnerKey,
    /// Mutable; digest over the owner key, creation time and salt.
    Imprint,
    /// Mutable; digest over the owner key itself.
    PublicKey,
}

impl Family {
    /// Stable one-byte tag, used in hashing and on the wire.
    pub fn tag(&self) -> u8 {
        match self {
            Self::ContentHash => 1,
            Self::OwnerKey => 2,
            Self::Imprint => 3,
            Self::PublicKey => 4,
        }
    }

    /// Returns `true` for families whose blocks advance through revisions.
    pub fn is_mutable(&self) -> bool {
        !matches!(self, Self::ContentHash)
    }
}

impl TryFrom<u8> for Family {
    type Error = TypeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::ContentHash),
            2 => Ok(Self::OwnerKey),
            3 => Ok(Self::Imprint),
            4 => Ok(Self::PublicKey),
            _ => Err(TypeError::UnknownTag { what: "family", tag }),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentHash => write!(f, "content-hash"),
            Self::OwnerKey => write!(f, "owner-key"),
            Self::Imprint => write!(f, "imprint"),
            Self::PublicKey => write!(f, "public-key"),
        }
    }
}

/// The kind of filesystem object a block carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Component {
    /// File, directory or link metadata root.
    Object,
    /// File content chunk.
    Data,
    /// Directory entries.
    Catalog,
    /// Symbolic link target.
    Reference,
    /// Access control list.
    Access,
    /// Group definition.
    Group,
    /// Interior node of a tree of blocks.
    Seam,
    /// Leaf-level index node of a tree of blocks.
    Quill,
}

impl Component {
    /// Stable one-byte tag, used in hashing and on the wire.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Object => 1,
            Self::Data => 2,
            Self::Catalog => 3,
            Self::Reference => 4,
            Self::Access => 5,
            Self::Group => 6,
            Self::Seam => 7,
            Self::Quill => 8,
        }
    }
}

impl TryFrom<u8> for Component {
    type Error = TypeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::Object),
            2 => Ok(Self::Data),
            3 => Ok(Self::Catalog),
            4 => Ok(Self::Reference),
            5 => Ok(Self::Access),
            6 => Ok(Self::Group),
            7 => Ok(Self::Seam),
            8 => Ok(Self::Quill),
            _ => Err(TypeError::UnknownTag {
                what: "component",
                tag,
            }),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Data => write!(f, "data"),
            Self::Catalog => write!(f, "catalog"),
            Self::Reference => write!(f, "reference"),
            Self::Access => write!(f, "access"),
            Self::Group => write!(f, "group"),
            Self::Seam => write!(f, "seam"),
            Self::Quill => write!(f, "quill"),
        }
    }
}

/// Content-derived identifier of a block.
///
/// `Null` is the "no reference" sentinel and sorts before every valid
/// address. Valid addresses order by digest bytes first; network, family and
/// component only break ties between equal digests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    Null,
    Valid {
        network: Network,
        family: Family,
        component: Component,
        digest: Digest,
    },
}

impl Address {
    /// Assemble an address from a computed digest and its type tags.
    pub fn bind(digest: Digest, network: Network, family: Family, component: Component) -> Self {
        Self::Valid {
            network,
            family,
            component,
            digest,
        }
    }

    /// The null address.
    pub const fn null() -> Self {
        Self::Null
    }

    /// Returns `true` for the null address.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The digest, if the address is valid.
    pub fn digest(&self) -> Option<&Digest> {
        match self {
            Self::Null => None,
            Self::Valid { digest, .. } => Some(digest),
        }
    }

    /// The network, if the address is valid.
    pub fn network(&self) -> Option<Network> {
        match self {
            Self::Null => None,
            Self::Valid { network, .. } => Some(*network),
        }
    }

    /// The family, if the address is valid.
    pub fn family(&self) -> Option<Family> {
        match self {
            Self::Null => None,
            Self::Valid { family, .. } => Some(*family),
        }
    }

    /// The component, if the address is valid.
    pub fn component(&self) -> Option<Component> {
        match self {
            Self::Null => None,
            Self::Valid { component, .. } => Some(*component),
        }
    }

    /// Hex encoding of the digest, used as the storage-layer key.
    ///
    /// # Panics
    ///
    /// Panics on [`Address::Null`]; a null address never reaches storage.
    pub fn unique(&self) -> String {
        match self {
            Self::Null => panic!("unique() called on a null address"),
            Self::Valid { digest, .. } => digest.to_hex(),
        }
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::Null
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, Self::Valid { .. }) => Ordering::Less,
            (Self::Valid { .. }, Self::Null) => Ordering::Greater,
            (
                Self::Valid {
                    network: n1,
                    family: f1,
                    component: c1,
                    digest: d1,
                },
                Self::Valid {
                    network: n2,
                    family: f2,
                    component: c2,
                    digest: d2,
                },
            ) => d1
                .cmp(d2)
                .then(n1.cmp(n2))
                .then(f1.cmp(f2))
                .then(c1.cmp(c2)),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Address(null)"),
            Self::Valid {
                family,
                component,
                digest,
                ..
            } => write!(f, "Address({family}/{component}/{})", digest.short_hex()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Valid { digest, .. } => write!(f, "{}", digest.short_hex()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn address(seed: &[u8], component: Component) -> Address {
        Address::bind(
            Digest::from_bytes(seed),
            Network::named("test"),
            Family::ContentHash,
            component,
        )
    }

    #[test]
    fn null_sorts_first() {
        let valid = address(b"a", Component::Data);
        assert!(Address::Null < valid);
        assert_eq!(Address::Null.cmp(&Address::Null), Ordering::Equal);
        assert!(Address::null().is_null());
    }

    #[test]
    fn valid_addresses_order_by_digest_first() {
        let low = Address::bind(
            Digest::from_hash([0; 32]),
            Network::named("zzz"),
            Family::PublicKey,
            Component::Quill,
        );
        let high = Address::bind(
            Digest::from_hash([1; 32]),
            Network::named("aaa"),
            Family::ContentHash,
            Component::Object,
        );
        assert!(low < high);
    }

    #[test]
    fn equal_digests_tie_break_on_tags() {
        let data = address(b"same", Component::Data);
        let catalog = address(b"same", Component::Catalog);
        assert_ne!(data, catalog);
        assert!(data < catalog);
    }

    #[test]
    fn unique_is_digest_hex() {
        let a = address(b"content", Component::Data);
        assert_eq!(a.unique(), Digest::from_bytes(b"content").to_hex());
    }

    #[test]
    #[should_panic(expected = "null address")]
    fn unique_on_null_panics() {
        let _ = Address::Null.unique();
    }

    #[test]
    fn accessors() {
        let a = address(b"x", Component::Seam);
        assert_eq!(a.family(), Some(Family::ContentHash));
        assert_eq!(a.component(), Some(Component::Seam));
        assert_eq!(a.network(), Some(Network::named("test")));
        assert!(Address::Null.digest().is_none());
    }

    #[test]
    fn tags_roundtrip() {
        for family in [
            Family::ContentHash,
            Family::OwnerKey,
            Family::Imprint,
            Family::PublicKey,
        ] {
            assert_eq!(Family::try_from(family.tag()).unwrap(), family);
        }
        assert!(Component::try_from(0).is_err());
        assert_eq!(Component::try_from(Component::Quill.tag()).unwrap(), Component::Quill);
    }

    #[test]
    fn network_is_derived_from_name() {
        assert_eq!(Network::named("a"), Network::named("a"));
        assert_ne!(Network::named("a"), Network::named("b"));
    }

    #[test]
    fn serde_roundtrip() {
        let a = address(b"serde", Component::Catalog);
        let json = serde_json::to_string(&a).unwrap();
        let parsed: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(a, parsed);
    }

    proptest! {
        #[test]
        fn ordering_is_total_and_consistent(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
            let x = address(&a, Component::Data);
            let y = address(&b, Component::Data);
            prop_assert_eq!(x.cmp(&y), y.cmp(&x).reverse());
            prop_assert_eq!(x.cmp(&y) == Ordering::Equal, x == y);
        }
    }
}
