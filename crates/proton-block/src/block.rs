//! The closed set of block kinds and the operations they share.

use serde::{Deserialize, Serialize};

use proton_crypto::{ContentHasher, Signature, SigningKey, VerifyingKey};
use proton_types::{Address, Component, Digest, Family, Network, Revision};

use crate::error::{BlockError, BlockResult};
use crate::header::{BlockHeader, State};
use crate::mutable::MutableBody;

/// Bookkeeping bytes added to the payload length when estimating footprints.
const IMMUTABLE_OVERHEAD: u64 = 96;
const MUTABLE_OVERHEAD: u64 = 256;

/// Immutable block addressed by a hash of its content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHashBlock {
    pub header: BlockHeader,
    pub payload: Vec<u8>,
}

/// Mutable block addressed by a generated block key the owner vouches for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerKeyBlock {
    pub header: BlockHeader,
    /// Public half of a key generated for this block alone.
    pub block_key: VerifyingKey,
    pub owner: VerifyingKey,
    /// Owner signature over `block_key`.
    pub owner_signature: Signature,
    pub body: MutableBody,
}

/// Mutable block addressed by its owner key, creation time and salt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprintBlock {
    pub header: BlockHeader,
    pub owner: VerifyingKey,
    pub body: MutableBody,
}

/// Mutable block addressed by its owner key alone; one per owner and component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyBlock {
    pub header: BlockHeader,
    pub owner: VerifyingKey,
    pub body: MutableBody,
}

/// A storable unit of the object graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    ContentHash(ContentHashBlock),
    OwnerKey(OwnerKeyBlock),
    Imprint(ImprintBlock),
    PublicKey(PublicKeyBlock),
}

impl Block {
    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    /// Create an immutable block.
    pub fn content_hash(
        network: Network,
        component: Component,
        creator: Digest,
        payload: Vec<u8>,
    ) -> Self {
        Self::ContentHash(ContentHashBlock {
            header: BlockHeader::new(network, component, creator),
            payload,
        })
    }

    /// Create the first revision of an owner-key block.
    ///
    /// The private half of the generated block key is dropped right away: the
    /// key only identifies the block, the owner signs everything.
    pub fn owner_key(
        network: Network,
        component: Component,
        owner: &SigningKey,
        payload: Vec<u8>,
    ) -> Self {
        let header = BlockHeader::new(network, component, owner.verifying_key().digest());
        let block_key = SigningKey::generate().verifying_key();
        let owner_signature = owner.sign(&block_key.as_bytes());
        let digest = key_digest(Family::OwnerKey, &header, &block_key);
        let body = MutableBody::signed(owner, &digest, Revision::FIRST, Vec::new(), payload);
        Self::OwnerKey(OwnerKeyBlock {
            header,
            block_key,
            owner: owner.verifying_key(),
            owner_signature,
            body,
        })
    }

    /// Create the first revision of an imprint block.
    pub fn imprint(
        network: Network,
        component: Component,
        owner: &SigningKey,
        payload: Vec<u8>,
    ) -> Self {
        let header = BlockHeader::new(network, component, owner.verifying_key().digest());
        let key = owner.verifying_key();
        let digest = imprint_digest(&header, &key);
        let body = MutableBody::signed(owner, &digest, Revision::FIRST, Vec::new(), payload);
        Self::Imprint(ImprintBlock {
            header,
            owner: key,
            body,
        })
    }

    /// Create the first revision of a public-key block.
    pub fn public_key(
        network: Network,
        component: Component,
        owner: &SigningKey,
        payload: Vec<u8>,
    ) -> Self {
        let header = BlockHeader::new(network, component, owner.verifying_key().digest());
        let key = owner.verifying_key();
        let digest = key_digest(Family::PublicKey, &header, &key);
        let body = MutableBody::signed(owner, &digest, Revision::FIRST, Vec::new(), payload);
        Self::PublicKey(PublicKeyBlock {
            header,
            owner: key,
            body,
        })
    }

    // ---------------------------------------------------------------
    // Addressing and integrity
    // ---------------------------------------------------------------

    /// Compute the block address.
    ///
    /// Pure function of the serialized fields. Content-hash blocks hash their
    /// payload; key-addressed families hash key material only, so their
    /// creation time and salt stay out of the digest (imprints excepted,
    /// which fold both in on purpose).
    pub fn bind(&self) -> Address {
        let header = self.header();
        Address::bind(
            self.digest(),
            header.network,
            self.family(),
            header.component,
        )
    }

    /// Check that the block lives at `address` and that its signatures hold.
    pub fn validate(&self, address: &Address) -> BlockResult<()> {
        let computed = self.bind();
        if computed != *address {
            return Err(BlockError::AddressMismatch {
                expected: *address,
                computed,
            });
        }

        if let Some(body) = self.body().filter(|body| !body.is_complete()) {
            return Err(BlockError::BrokenLineage {
                revision: body.revision,
                links: body.lineage.len(),
            });
        }

        let family = self.family();
        let digest = self.digest();
        match self {
            Self::ContentHash(_) => Ok(()),
            Self::OwnerKey(b) => {
                b.owner
                    .verify(&b.block_key.as_bytes(), &b.owner_signature)
                    .map_err(|_| BlockError::SignatureInvalid(family))?;
                b.body
                    .verify(&b.owner, &digest)
                    .map_err(|_| BlockError::SignatureInvalid(family))
            }
            Self::Imprint(b) => b
                .body
                .verify(&b.owner, &digest)
                .map_err(|_| BlockError::SignatureInvalid(family)),
            Self::PublicKey(b) => b
                .body
                .verify(&b.owner, &digest)
                .map_err(|_| BlockError::SignatureInvalid(family)),
        }
    }

    /// Content hash of the encoded block; links a revision to its successor.
    pub fn fingerprint(&self) -> BlockResult<Digest> {
        Ok(ContentHasher::FINGERPRINT.hash(&self.encode()?))
    }

    // ---------------------------------------------------------------
    // Revisions
    // ---------------------------------------------------------------

    /// Returns `true` if `self` legitimately succeeds `other`.
    ///
    /// Both must be mutable revisions of the same block, `self` must carry a
    /// higher revision number, and its lineage must record `other`'s
    /// fingerprint at `other`'s revision. Any number of revisions may lie in
    /// between.
    pub fn derives(&self, other: &Block) -> bool {
        let (Some(mine), Some(theirs)) = (self.body(), other.body()) else {
            return false;
        };
        if self.bind() != other.bind() || mine.revision <= theirs.revision {
            return false;
        }
        match (mine.ancestor(theirs.revision), other.fingerprint()) {
            (Some(link), Ok(fingerprint)) => *link == fingerprint,
            _ => false,
        }
    }

    /// Produce the next revision of a mutable block with a new payload.
    pub fn derive(&self, owner: &SigningKey, payload: Vec<u8>) -> BlockResult<Block> {
        let Some(current) = self.body() else {
            return Err(BlockError::WrongFamily {
                expected: "mutable",
                actual: self.family(),
            });
        };
        if self.owner() != Some(&owner.verifying_key()) {
            return Err(BlockError::NotOwner);
        }

        let mut lineage = current.lineage.clone();
        lineage.push(self.fingerprint()?);
        let digest = self.digest();
        let body = MutableBody::signed(owner, &digest, current.revision + 1, lineage, payload);

        let mut next = self.clone();
        next.header_mut().state = State::Dirty;
        if let Some(slot) = next.body_mut() {
            *slot = body;
        }
        Ok(next)
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    /// Shared attributes.
    pub fn header(&self) -> &BlockHeader {
        match self {
            Self::ContentHash(b) => &b.header,
            Self::OwnerKey(b) => &b.header,
            Self::Imprint(b) => &b.header,
            Self::PublicKey(b) => &b.header,
        }
    }

    /// Shared attributes, mutably.
    pub fn header_mut(&mut self) -> &mut BlockHeader {
        match self {
            Self::ContentHash(b) => &mut b.header,
            Self::OwnerKey(b) => &mut b.header,
            Self::Imprint(b) => &mut b.header,
            Self::PublicKey(b) => &mut b.header,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Self::ContentHash(_) => Family::ContentHash,
            Self::OwnerKey(_) => Family::OwnerKey,
            Self::Imprint(_) => Family::Imprint,
            Self::PublicKey(_) => Family::PublicKey,
        }
    }

    pub fn network(&self) -> Network {
        self.header().network
    }

    pub fn component(&self) -> Component {
        self.header().component
    }

    /// Returns `true` for the key-addressed, revisioned families.
    pub fn is_mutable(&self) -> bool {
        self.family().is_mutable()
    }

    /// Revision number; immutable blocks are always at [`Revision::FIRST`].
    pub fn revision(&self) -> u64 {
        self.body().map_or(Revision::FIRST, |b| b.revision)
    }

    /// The versioned body of a mutable block.
    pub fn body(&self) -> Option<&MutableBody> {
        match self {
            Self::ContentHash(_) => None,
            Self::OwnerKey(b) => Some(&b.body),
            Self::Imprint(b) => Some(&b.body),
            Self::PublicKey(b) => Some(&b.body),
        }
    }

    fn body_mut(&mut self) -> Option<&mut MutableBody> {
        match self {
            Self::ContentHash(_) => None,
            Self::OwnerKey(b) => Some(&mut b.body),
            Self::Imprint(b) => Some(&mut b.body),
            Self::PublicKey(b) => Some(&mut b.body),
        }
    }

    /// The owner key of a mutable block.
    pub fn owner(&self) -> Option<&VerifyingKey> {
        match self {
            Self::ContentHash(_) => None,
            Self::OwnerKey(b) => Some(&b.owner),
            Self::Imprint(b) => Some(&b.owner),
            Self::PublicKey(b) => Some(&b.owner),
        }
    }

    /// The opaque content.
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::ContentHash(b) => &b.payload,
            Self::OwnerKey(b) => &b.body.payload,
            Self::Imprint(b) => &b.body.payload,
            Self::PublicKey(b) => &b.body.payload,
        }
    }

    /// In-place access to a content-hash payload.
    ///
    /// Mutable payloads are signed; change them through [`Block::derive`].
    pub fn payload_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            Self::ContentHash(b) => Some(&mut b.payload),
            _ => None,
        }
    }

    pub fn state(&self) -> State {
        self.header().state
    }

    pub fn set_state(&mut self, state: State) {
        self.header_mut().state = state;
    }

    /// Estimated resident size in bytes.
    pub fn footprint(&self) -> u64 {
        let overhead = if self.is_mutable() {
            MUTABLE_OVERHEAD
        } else {
            IMMUTABLE_OVERHEAD
        };
        self.payload().len() as u64 + overhead
    }

    fn digest(&self) -> Digest {
        match self {
            Self::ContentHash(b) => {
                let tags = [Family::ContentHash.tag(), b.header.component.tag()];
                ContentHasher::CONTENT_HASH.hash_parts(&[
                    b.header.network.digest().as_bytes(),
                    &tags,
                    &b.payload,
                ])
            }
            Self::OwnerKey(b) => key_digest(Family::OwnerKey, &b.header, &b.block_key),
            Self::Imprint(b) => imprint_digest(&b.header, &b.owner),
            Self::PublicKey(b) => key_digest(Family::PublicKey, &b.header, &b.owner),
        }
    }
}

fn key_digest(family: Family, header: &BlockHeader, key: &VerifyingKey) -> Digest {
    let tags = [family.tag(), header.component.tag()];
    ContentHasher::for_family(family).hash_parts(&[
        header.network.digest().as_bytes(),
        &tags,
        &key.as_bytes(),
    ])
}

fn imprint_digest(header: &BlockHeader, owner: &VerifyingKey) -> Digest {
    let tags = [Family::Imprint.tag(), header.component.tag()];
    ContentHasher::IMPRINT.hash_parts(&[
        header.network.digest().as_bytes(),
        &tags,
        &owner.as_bytes(),
        &header.created.as_millis().to_le_bytes(),
        &header.salt.to_le_bytes(),
    ])
}
