use proton_types::{Digest, Family};

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"proton-content-hash-v1"`) that is
/// prepended to every hash computation. A content-hash block and an owner key
/// with identical bytes therefore never produce the same digest.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Digests of immutable, content-hash blocks.
    pub const CONTENT_HASH: Self = Self {
        domain: "proton-content-hash-v1",
    };
    /// Digests of owner-key blocks (over the generated block key).
    pub const OWNER_KEY: Self = Self {
        domain: "proton-owner-key-v1",
    };
    /// Digests of imprint blocks (over owner key, creation time and salt).
    pub const IMPRINT: Self = Self {
        domain: "proton-imprint-v1",
    };
    /// Digests of public-key blocks (over the owner key).
    pub const PUBLIC_KEY: Self = Self {
        domain: "proton-public-key-v1",
    };
    /// Fingerprints of encoded blocks, used to link revisions.
    pub const FINGERPRINT: Self = Self {
        domain: "proton-fingerprint-v1",
    };
    /// Digests identifying a signing identity (block creators).
    pub const IDENTITY: Self = Self {
        domain: "proton-identity-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// The hasher that derives addresses for the given block family.
    pub fn for_family(family: Family) -> &'static Self {
        match family {
            Family::ContentHash => &Self::CONTENT_HASH,
            Family::OwnerKey => &Self::OWNER_KEY,
            Family::Imprint => &Self::IMPRINT,
            Family::PublicKey => &Self::PUBLIC_KEY,
        }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        self.hash_parts(&[data])
    }

    /// Hash several fields with domain separation.
    ///
    /// Every part is length-prefixed so that `["ab", "c"]` and `["a", "bc"]`
    /// hash differently.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    /// Raw BLAKE3 hash without domain separation (for low-level use).
    pub fn raw_hash(data: &[u8]) -> [u8; 32] {
        *blake3::hash(data).as_bytes()
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(
            ContentHasher::CONTENT_HASH.hash(data),
            ContentHasher::CONTENT_HASH.hash(data)
        );
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let content = ContentHasher::CONTENT_HASH.hash(data);
        let owner = ContentHasher::OWNER_KEY.hash(data);
        let imprint = ContentHasher::IMPRINT.hash(data);
        assert_ne!(content, owner);
        assert_ne!(content, imprint);
        assert_ne!(owner, imprint);
    }

    #[test]
    fn parts_are_length_prefixed() {
        let h = &ContentHasher::IMPRINT;
        assert_ne!(
            h.hash_parts(&[b"ab", b"c"]),
            h.hash_parts(&[b"a", b"bc"])
        );
    }

    #[test]
    fn verify_correct_and_tampered_data() {
        let id = ContentHasher::CONTENT_HASH.hash(b"original");
        assert!(ContentHasher::CONTENT_HASH.verify(b"original", &id));
        assert!(!ContentHasher::CONTENT_HASH.verify(b"tampered", &id));
    }

    #[test]
    fn family_hashers_are_distinct() {
        let families = [
            Family::ContentHash,
            Family::OwnerKey,
            Family::Imprint,
            Family::PublicKey,
        ];
        for a in families {
            for b in families {
                let same = ContentHasher::for_family(a).domain() == ContentHasher::for_family(b).domain();
                assert_eq!(same, a == b);
            }
        }
    }

    #[test]
    fn raw_hash_no_domain() {
        let raw = ContentHasher::raw_hash(b"test");
        assert_eq!(raw, ContentHasher::raw_hash(b"test"));
        assert_ne!(raw, *ContentHasher::CONTENT_HASH.hash(b"test").as_bytes());
    }
}
