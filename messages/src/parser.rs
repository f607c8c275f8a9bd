//! Inbound datagram classification.
//!
//! Wraps deserialization with the work-proof gate: a block whose nonce does
//! not meet the network threshold is rejected here and never reaches the
//! ledger.

use crate::message::Message;
use crate::MessageError;
use vela_types::Network;
use vela_work::validate_work;

/// Parses and vets raw datagrams for one network.
#[derive(Clone, Copy)]
pub struct MessageParser {
    network: Network,
}

impl MessageParser {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Parse a datagram and verify the work of any carried block.
    pub fn parse(&self, bytes: &[u8]) -> Result<Message, MessageError> {
        let message = Message::deserialize(self.network, bytes)?;
        if let Some(block) = message.block() {
            if !validate_work(&block.root(), block.work(), self.network.work_threshold()) {
                return Err(MessageError::InsufficientWork);
            }
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_blocks::{Block, SendBlock};
    use vela_crypto::KeyPair;
    use vela_types::{Account, Amount, BlockHash, RawKey};

    fn sample_send() -> Block {
        let kp = KeyPair::from_private(RawKey::new([66u8; 32]));
        Block::Send(SendBlock::new(
            BlockHash::new([1; 32]),
            Account::new([2; 32]),
            Amount::new(5),
            &kp.private,
            &kp.public,
            0,
        ))
    }

    #[test]
    fn test_network_accepts_zero_work() {
        let parser = MessageParser::new(Network::Test);
        let bytes = Message::Publish(sample_send()).serialize(Network::Test);
        assert!(parser.parse(&bytes).is_ok());
    }

    #[test]
    fn live_network_rejects_zero_work() {
        let parser = MessageParser::new(Network::Live);
        let bytes = Message::Publish(sample_send()).serialize(Network::Live);
        match parser.parse(&bytes) {
            Err(MessageError::InsufficientWork) => {}
            other => panic!("expected InsufficientWork, got {other:?}"),
        }
    }

    #[test]
    fn keepalive_needs_no_work() {
        let parser = MessageParser::new(Network::Live);
        let bytes = Message::Keepalive(Vec::new()).serialize(Network::Live);
        assert!(parser.parse(&bytes).is_ok());
    }

    #[test]
    fn error_counters_are_classified() {
        let parser = MessageParser::new(Network::Test);
        let err = parser.parse(&[0u8; 4]).unwrap_err();
        assert_eq!(err.counter(), "malformed_message");

        let foreign = Message::Keepalive(Vec::new()).serialize(Network::Beta);
        let err = parser.parse(&foreign).unwrap_err();
        assert_eq!(err.counter(), "bad_network");
    }
}
