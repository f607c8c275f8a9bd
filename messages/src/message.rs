//! Message payload serialization.

use crate::header::{MessageHeader, MessageType, HEADER_SIZE};
use crate::MessageError;
use std::net::{Ipv6Addr, SocketAddrV6};
use vela_blocks::Block;
use vela_consensus::Vote;
use vela_types::{Account, BlockHash, Network};

/// Keepalive always carries exactly eight peer slots, padded with the
/// unspecified address.
pub const KEEPALIVE_PEERS: usize = 8;

const PEER_ENTRY_SIZE: usize = 18;

/// A parsed wire message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Keepalive(Vec<SocketAddrV6>),
    Publish(Block),
    ConfirmReq(Block),
    ConfirmAck(Vote),
    FrontierReq {
        start: Account,
        age: u32,
        count: u32,
    },
    BulkPull {
        start: BlockHash,
        end: BlockHash,
    },
    BulkPush,
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Keepalive(_) => MessageType::Keepalive,
            Self::Publish(_) => MessageType::Publish,
            Self::ConfirmReq(_) => MessageType::ConfirmReq,
            Self::ConfirmAck(_) => MessageType::ConfirmAck,
            Self::FrontierReq { .. } => MessageType::FrontierReq,
            Self::BulkPull { .. } => MessageType::BulkPull,
            Self::BulkPush => MessageType::BulkPush,
        }
    }

    /// The block carried by this message, if any.
    pub fn block(&self) -> Option<&Block> {
        match self {
            Self::Publish(block) | Self::ConfirmReq(block) => Some(block),
            Self::ConfirmAck(vote) => Some(&vote.block),
            _ => None,
        }
    }

    /// Header plus payload, ready for the wire.
    pub fn serialize(&self, network: Network) -> Vec<u8> {
        let mut header = MessageHeader::new(network, self.message_type());
        if let Some(block) = self.block() {
            header.set_block_type(block.block_type());
        }
        let mut out = Vec::with_capacity(HEADER_SIZE + 192);
        out.extend_from_slice(&header.serialize());
        match self {
            Self::Keepalive(peers) => {
                for slot in 0..KEEPALIVE_PEERS {
                    let (ip, port) = peers
                        .get(slot)
                        .map(|peer| (*peer.ip(), peer.port()))
                        .unwrap_or((Ipv6Addr::UNSPECIFIED, 0));
                    out.extend_from_slice(&ip.octets());
                    out.extend_from_slice(&port.to_le_bytes());
                }
            }
            Self::Publish(block) | Self::ConfirmReq(block) => {
                out.extend_from_slice(&block.serialize());
            }
            Self::ConfirmAck(vote) => {
                out.extend_from_slice(vote.account.as_bytes());
                out.extend_from_slice(vote.signature.as_bytes());
                out.extend_from_slice(&vote.sequence.to_le_bytes());
                out.extend_from_slice(&vote.block.serialize());
            }
            Self::FrontierReq { start, age, count } => {
                out.extend_from_slice(start.as_bytes());
                out.extend_from_slice(&age.to_be_bytes());
                out.extend_from_slice(&count.to_be_bytes());
            }
            Self::BulkPull { start, end } => {
                out.extend_from_slice(start.as_bytes());
                out.extend_from_slice(end.as_bytes());
            }
            Self::BulkPush => {}
        }
        out
    }

    /// Parse one full message (header and payload).
    pub fn deserialize(network: Network, bytes: &[u8]) -> Result<Self, MessageError> {
        let header = MessageHeader::deserialize(network, bytes)?;
        let payload = &bytes[HEADER_SIZE..];
        match header.message_type {
            MessageType::Keepalive => {
                let expected = KEEPALIVE_PEERS * PEER_ENTRY_SIZE;
                if payload.len() < expected {
                    return Err(MessageError::Truncated {
                        expected: HEADER_SIZE + expected,
                        actual: bytes.len(),
                    });
                }
                let mut peers = Vec::with_capacity(KEEPALIVE_PEERS);
                for slot in 0..KEEPALIVE_PEERS {
                    let offset = slot * PEER_ENTRY_SIZE;
                    let mut octets = [0u8; 16];
                    octets.copy_from_slice(&payload[offset..offset + 16]);
                    let port = u16::from_le_bytes([payload[offset + 16], payload[offset + 17]]);
                    let ip = Ipv6Addr::from(octets);
                    if !ip.is_unspecified() || port != 0 {
                        peers.push(SocketAddrV6::new(ip, port, 0, 0));
                    }
                }
                Ok(Self::Keepalive(peers))
            }
            MessageType::Publish => {
                let block = Block::deserialize(header.block_type()?, payload)?;
                Ok(Self::Publish(block))
            }
            MessageType::ConfirmReq => {
                let block = Block::deserialize(header.block_type()?, payload)?;
                Ok(Self::ConfirmReq(block))
            }
            MessageType::ConfirmAck => {
                if payload.len() < 104 {
                    return Err(MessageError::Truncated {
                        expected: HEADER_SIZE + 104,
                        actual: bytes.len(),
                    });
                }
                let mut account = [0u8; 32];
                account.copy_from_slice(&payload[0..32]);
                let mut signature = [0u8; 64];
                signature.copy_from_slice(&payload[32..96]);
                let mut sequence = [0u8; 8];
                sequence.copy_from_slice(&payload[96..104]);
                let block = Block::deserialize(header.block_type()?, &payload[104..])?;
                Ok(Self::ConfirmAck(Vote {
                    account: Account::new(account),
                    signature: vela_types::Signature::new(signature),
                    sequence: u64::from_le_bytes(sequence),
                    block,
                }))
            }
            MessageType::FrontierReq => {
                if payload.len() < 40 {
                    return Err(MessageError::Truncated {
                        expected: HEADER_SIZE + 40,
                        actual: bytes.len(),
                    });
                }
                let mut start = [0u8; 32];
                start.copy_from_slice(&payload[0..32]);
                let age = u32::from_be_bytes([payload[32], payload[33], payload[34], payload[35]]);
                let count = u32::from_be_bytes([payload[36], payload[37], payload[38], payload[39]]);
                Ok(Self::FrontierReq {
                    start: Account::new(start),
                    age,
                    count,
                })
            }
            MessageType::BulkPull => {
                if payload.len() < 64 {
                    return Err(MessageError::Truncated {
                        expected: HEADER_SIZE + 64,
                        actual: bytes.len(),
                    });
                }
                let mut start = [0u8; 32];
                start.copy_from_slice(&payload[0..32]);
                let mut end = [0u8; 32];
                end.copy_from_slice(&payload[32..64]);
                Ok(Self::BulkPull {
                    start: BlockHash::new(start),
                    end: BlockHash::new(end),
                })
            }
            MessageType::BulkPush => Ok(Self::BulkPush),
        }
    }
}
