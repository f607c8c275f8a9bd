//! The parser must classify arbitrary bytes without panicking, and every
//! well-formed message must survive a serialize/parse round trip.

use proptest::prelude::*;
use vela_messages::{Message, MessageHeader, MessageParser, MessageType, HEADER_SIZE};
use vela_types::{Account, BlockHash, Network};

proptest! {
    /// Arbitrary garbage is an error, never a panic.
    #[test]
    fn parser_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let parser = MessageParser::new(Network::Test);
        let _ = parser.parse(&bytes);
    }

    /// Garbage stamped with a valid header prefix still cannot panic.
    #[test]
    fn garbage_payload_never_panics(
        message_type in 2u8..=8,
        payload in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let header = MessageHeader::new(
            Network::Test,
            MessageType::from_u8(message_type).unwrap(),
        );
        let mut bytes = header.serialize().to_vec();
        bytes.extend_from_slice(&payload);
        let parser = MessageParser::new(Network::Test);
        let _ = parser.parse(&bytes);
    }

    #[test]
    fn bulk_pull_roundtrip(start in any::<[u8; 32]>(), end in any::<[u8; 32]>()) {
        let message = Message::BulkPull {
            start: BlockHash::new(start),
            end: BlockHash::new(end),
        };
        let bytes = message.serialize(Network::Test);
        prop_assert_eq!(Message::deserialize(Network::Test, &bytes).unwrap(), message);
    }

    #[test]
    fn frontier_req_roundtrip(
        start in any::<[u8; 32]>(),
        age in any::<u32>(),
        count in any::<u32>(),
    ) {
        let message = Message::FrontierReq {
            start: Account::new(start),
            age,
            count,
        };
        let bytes = message.serialize(Network::Test);
        prop_assert_eq!(Message::deserialize(Network::Test, &bytes).unwrap(), message);
    }

    /// Truncating any message at any point is a clean error.
    #[test]
    fn truncation_is_an_error(cut in 0usize..72) {
        let message = Message::FrontierReq {
            start: Account::ZERO,
            age: u32::MAX,
            count: u32::MAX,
        };
        let bytes = message.serialize(Network::Test);
        prop_assume!(cut < bytes.len());
        if cut < HEADER_SIZE + 40 {
            prop_assert!(Message::deserialize(Network::Test, &bytes[..cut]).is_err());
        }
    }
}
