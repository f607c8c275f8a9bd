//! The fixed 8-byte message header.

use crate::MessageError;
use vela_blocks::BlockType;
use vela_types::Network;

/// Serialized header size.
pub const HEADER_SIZE: usize = 8;

/// Highest protocol version this node speaks.
pub const VERSION_MAX: u8 = 4;
/// Version this node emits.
pub const VERSION_USING: u8 = 4;
/// Oldest version this node still accepts.
pub const VERSION_MIN: u8 = 1;

/// Extensions bit flagging an IPv4-only peer.
const EXTENSION_IPV4_ONLY: u16 = 0x0002;
/// Extensions bit advertising a bootstrap-server endpoint.
const EXTENSION_BOOTSTRAP_SERVER: u16 = 0x0004;
/// Extensions bits [11:8]: the block variant carried by the payload.
const EXTENSION_BLOCK_TYPE_SHIFT: u16 = 8;
const EXTENSION_BLOCK_TYPE_MASK: u16 = 0x0F00;

/// Wire message types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Keepalive = 2,
    Publish = 3,
    ConfirmReq = 4,
    ConfirmAck = 5,
    BulkPull = 6,
    BulkPush = 7,
    FrontierReq = 8,
}

impl MessageType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            2 => Some(Self::Keepalive),
            3 => Some(Self::Publish),
            4 => Some(Self::ConfirmReq),
            5 => Some(Self::ConfirmAck),
            6 => Some(Self::BulkPull),
            7 => Some(Self::BulkPush),
            8 => Some(Self::FrontierReq),
            _ => None,
        }
    }
}

/// The 8-byte prefix of every wire message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    pub network: Network,
    pub version_max: u8,
    pub version_using: u8,
    pub version_min: u8,
    pub message_type: MessageType,
    pub extensions: u16,
}

impl MessageHeader {
    pub fn new(network: Network, message_type: MessageType) -> Self {
        Self {
            network,
            version_max: VERSION_MAX,
            version_using: VERSION_USING,
            version_min: VERSION_MIN,
            message_type,
            extensions: 0,
        }
    }

    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let magic = self.network.magic();
        let extensions = self.extensions.to_le_bytes();
        [
            magic[0],
            magic[1],
            self.version_max,
            self.version_using,
            self.version_min,
            self.message_type as u8,
            extensions[0],
            extensions[1],
        ]
    }

    /// Parse a header, validating the magic against the local network.
    pub fn deserialize(network: Network, bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() < HEADER_SIZE {
            return Err(MessageError::Truncated {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let magic = network.magic();
        if bytes[0] != magic[0] || bytes[1] != magic[1] {
            return Err(MessageError::BadMagic(bytes[0], bytes[1]));
        }
        let message_type =
            MessageType::from_u8(bytes[5]).ok_or(MessageError::UnknownType(bytes[5]))?;
        Ok(Self {
            network,
            version_max: bytes[2],
            version_using: bytes[3],
            version_min: bytes[4],
            message_type,
            extensions: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    pub fn set_block_type(&mut self, block_type: BlockType) {
        self.extensions = (self.extensions & !EXTENSION_BLOCK_TYPE_MASK)
            | ((block_type.as_u8() as u16) << EXTENSION_BLOCK_TYPE_SHIFT);
    }

    pub fn block_type(&self) -> Result<BlockType, MessageError> {
        let bits = ((self.extensions & EXTENSION_BLOCK_TYPE_MASK) >> EXTENSION_BLOCK_TYPE_SHIFT) as u8;
        BlockType::from_u8(bits).ok_or(MessageError::UnknownBlockType(bits))
    }

    pub fn set_ipv4_only(&mut self, value: bool) {
        if value {
            self.extensions |= EXTENSION_IPV4_ONLY;
        } else {
            self.extensions &= !EXTENSION_IPV4_ONLY;
        }
    }

    pub fn ipv4_only(&self) -> bool {
        self.extensions & EXTENSION_IPV4_ONLY != 0
    }

    pub fn set_bootstrap_server(&mut self, value: bool) {
        if value {
            self.extensions |= EXTENSION_BOOTSTRAP_SERVER;
        } else {
            self.extensions &= !EXTENSION_BOOTSTRAP_SERVER;
        }
    }

    pub fn bootstrap_server(&self) -> bool {
        self.extensions & EXTENSION_BOOTSTRAP_SERVER != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut header = MessageHeader::new(Network::Test, MessageType::Publish);
        header.set_block_type(BlockType::Send);
        header.set_bootstrap_server(true);
        let bytes = header.serialize();
        let parsed = MessageHeader::deserialize(Network::Test, &bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.block_type().unwrap(), BlockType::Send);
        assert!(parsed.bootstrap_server());
        assert!(!parsed.ipv4_only());
    }

    #[test]
    fn magic_encodes_network() {
        let header = MessageHeader::new(Network::Live, MessageType::Keepalive);
        let bytes = header.serialize();
        assert_eq!(&bytes[0..2], b"RC");
    }

    #[test]
    fn wrong_network_rejected() {
        let header = MessageHeader::new(Network::Beta, MessageType::Keepalive);
        let bytes = header.serialize();
        assert!(matches!(
            MessageHeader::deserialize(Network::Live, &bytes),
            Err(MessageError::BadMagic(_, _))
        ));
    }

    #[test]
    fn unknown_type_rejected() {
        let mut bytes = MessageHeader::new(Network::Test, MessageType::Publish).serialize();
        bytes[5] = 99;
        assert!(matches!(
            MessageHeader::deserialize(Network::Test, &bytes),
            Err(MessageError::UnknownType(99))
        ));
    }

    #[test]
    fn truncated_rejected() {
        assert!(matches!(
            MessageHeader::deserialize(Network::Test, &[0x52]),
            Err(MessageError::Truncated { .. })
        ));
    }

    #[test]
    fn block_type_bits_are_isolated() {
        let mut header = MessageHeader::new(Network::Test, MessageType::ConfirmAck);
        header.set_ipv4_only(true);
        header.set_block_type(BlockType::Change);
        assert!(header.ipv4_only());
        assert_eq!(header.block_type().unwrap(), BlockType::Change);
        header.set_block_type(BlockType::Open);
        assert_eq!(header.block_type().unwrap(), BlockType::Open);
        assert!(header.ipv4_only());
    }
}
