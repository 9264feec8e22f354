use serde::{Deserialize, Serialize};

use proton_crypto::{Signature, SignatureError, SigningKey, VerifyingKey};
use proton_types::Digest;

/// Versioned content shared by every mutable block kind.
///
/// The owner signs the block digest, revision, lineage and payload together,
/// so a body cannot be moved onto another block or revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableBody {
    /// Monotonic revision counter; the first revision is 0.
    pub revision: u64,
    /// Fingerprints of every earlier revision: `lineage[r]` is the
    /// fingerprint of revision `r`, so the length equals `revision`.
    pub lineage: Vec<Digest>,
    /// Opaque content.
    pub payload: Vec<u8>,
    /// Owner signature over the fields above and the block digest.
    pub signature: Signature,
}

impl MutableBody {
    /// Build and sign a body for the block identified by `digest`.
    pub(crate) fn signed(
        owner: &SigningKey,
        digest: &Digest,
        revision: u64,
        lineage: Vec<Digest>,
        payload: Vec<u8>,
    ) -> Self {
        let signature = owner.sign(&message(digest, revision, &lineage, &payload));
        Self {
            revision,
            lineage,
            payload,
            signature,
        }
    }

    /// Fingerprint of the revision this one was derived from.
    pub fn predecessor(&self) -> Option<&Digest> {
        self.lineage.last()
    }

    /// Fingerprint recorded for the earlier `revision`, if this body descends
    /// from one.
    pub fn ancestor(&self, revision: u64) -> Option<&Digest> {
        if revision >= self.revision {
            return None;
        }
        usize::try_from(revision).ok().and_then(|r| self.lineage.get(r))
    }

    /// Returns `true` if the lineage has one link per earlier revision.
    pub(crate) fn is_complete(&self) -> bool {
        self.lineage.len() as u64 == self.revision
    }

    /// Check the owner signature against the block digest.
    pub(crate) fn verify(
        &self,
        owner: &VerifyingKey,
        digest: &Digest,
    ) -> Result<(), SignatureError> {
        let msg = message(digest, self.revision, &self.lineage, &self.payload);
        owner.verify(&msg, &self.signature)
    }
}

fn message(digest: &Digest, revision: u64, lineage: &[Digest], payload: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(16 + 32 + 16 + 32 * lineage.len() + payload.len());
    msg.extend_from_slice(b"proton-body-v1:");
    msg.extend_from_slice(digest.as_bytes());
    msg.extend_from_slice(&revision.to_le_bytes());
    msg.extend_from_slice(&(lineage.len() as u64).to_le_bytes());
    for link in lineage {
        msg.extend_from_slice(link.as_bytes());
    }
    msg.extend_from_slice(payload);
    msg
}
