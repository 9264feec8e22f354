//! Sealing blocks under a symmetric secret.
//!
//! A sealed block is always a [`Block::ContentHash`] envelope whose payload is
//! the encrypted encoding of the original block, whatever its family.

use proton_crypto::{decrypt, encrypt, Secret};
use proton_types::Family;

use crate::block::{Block, ContentHashBlock};
use crate::error::{BlockError, BlockResult};
use crate::header::BlockHeader;

impl Block {
    /// Encrypt the block into a fresh content-hash envelope.
    ///
    /// The envelope inherits network, component and creator. Its address is
    /// unrelated to the address of the block it carries.
    pub fn encrypt(&self, secret: &Secret) -> BlockResult<Block> {
        let sealed = encrypt(secret, &self.encode()?)?;
        let header = self.header();
        Ok(Block::ContentHash(ContentHashBlock {
            header: BlockHeader::new(header.network, header.component, header.creator),
            payload: sealed,
        }))
    }

    /// Open an envelope produced by [`Block::encrypt`].
    pub fn decrypt(&self, secret: &Secret) -> BlockResult<Block> {
        let Block::ContentHash(envelope) = self else {
            return Err(BlockError::WrongFamily {
                expected: "content-hash",
                actual: self.family(),
            });
        };
        let plain = decrypt(secret, &envelope.payload)?;
        Block::decode(&plain)
    }

    /// Returns `true` if this block could be an envelope.
    pub fn is_envelope(&self) -> bool {
        self.family() == Family::ContentHash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proton_crypto::SigningKey;
    use proton_types::{Component, Digest, Network};

    fn network() -> Network {
        Network::named("seal")
    }

    #[test]
    fn immutable_block_survives_sealing() {
        let secret = Secret::generate();
        let block = Block::content_hash(network(), Component::Data, Digest::null(), b"secret data".to_vec());
        let envelope = block.encrypt(&secret).unwrap();

        assert_eq!(envelope.family(), Family::ContentHash);
        assert_ne!(envelope.payload(), block.payload());
        assert_eq!(envelope.component(), Component::Data);

        let opened = envelope.decrypt(&secret).unwrap();
        assert_eq!(opened, block);
        assert_eq!(opened.bind(), block.bind());
    }

    #[test]
    fn mutable_block_survives_sealing() {
        let secret = Secret::generate();
        let owner = SigningKey::generate();
        let block = Block::imprint(network(), Component::Object, &owner, b"tree".to_vec());
        let opened = block.encrypt(&secret).unwrap().decrypt(&secret).unwrap();
        assert_eq!(opened, block);
        opened.validate(&block.bind()).unwrap();
    }

    #[test]
    fn wrong_secret_fails() {
        let block = Block::content_hash(network(), Component::Data, Digest::null(), b"x".to_vec());
        let envelope = block.encrypt(&Secret::generate()).unwrap();
        assert_eq!(
            envelope.decrypt(&Secret::generate()).unwrap_err(),
            BlockError::DecryptionFailed
        );
    }

    #[test]
    fn decrypt_requires_an_envelope() {
        let owner = SigningKey::generate();
        let block = Block::public_key(network(), Component::Group, &owner, vec![]);
        assert!(!block.is_envelope());
        assert!(matches!(
            block.decrypt(&Secret::generate()),
            Err(BlockError::WrongFamily { .. })
        ));
    }
}
