//! Versioned wire encoding: `[1 byte format tag][bincode body]`.

use crate::block::Block;
use crate::error::{BlockError, BlockResult};

/// The only format tag this build writes and reads.
pub const FORMAT_V1: u8 = 1;

impl Block {
    /// Serialize the block, prefixed with its format tag.
    pub fn encode(&self) -> BlockResult<Vec<u8>> {
        let body =
            bincode::serialize(self).map_err(|e| BlockError::Serialization(e.to_string()))?;
        let mut buf = Vec::with_capacity(1 + body.len());
        buf.push(FORMAT_V1);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Deserialize a block. The result is always [`State::Clean`](crate::State::Clean).
    pub fn decode(data: &[u8]) -> BlockResult<Block> {
        let (&tag, body) = data.split_first().ok_or(BlockError::Truncated)?;
        if tag != FORMAT_V1 {
            return Err(BlockError::UnknownFormat(tag));
        }
        bincode::deserialize(body).map_err(|e| BlockError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::State;
    use proton_crypto::SigningKey;
    use proton_types::{Component, Digest, Network};

    #[test]
    fn decoded_block_equals_original_and_is_clean() {
        let owner = SigningKey::generate();
        let block = Block::owner_key(Network::named("n"), Component::Object, &owner, b"v".to_vec());
        assert_eq!(block.state(), State::Dirty);

        let decoded = Block::decode(&block.encode().unwrap()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.state(), State::Clean);
        assert_eq!(decoded.bind(), block.bind());
        decoded.validate(&block.bind()).unwrap();
    }

    #[test]
    fn encoding_starts_with_format_tag() {
        let block = Block::content_hash(Network::named("n"), Component::Data, Digest::null(), vec![]);
        assert_eq!(block.encode().unwrap()[0], FORMAT_V1);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let block = Block::content_hash(Network::named("n"), Component::Data, Digest::null(), vec![1]);
        let mut bytes = block.encode().unwrap();
        bytes[0] = 9;
        let err = Block::decode(&bytes).unwrap_err();
        assert_eq!(err, BlockError::UnknownFormat(9));
        assert_eq!(err.class(), proton_types::ErrorClass::ProtocolFormat);
    }

    #[test]
    fn empty_and_garbage_inputs_fail() {
        assert_eq!(Block::decode(&[]).unwrap_err(), BlockError::Truncated);
        assert!(matches!(
            Block::decode(&[FORMAT_V1, 0xff, 0xff]),
            Err(BlockError::Serialization(_))
        ));
    }
}
