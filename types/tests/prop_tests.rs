//! Property tests for the primitive codecs.

use proptest::prelude::*;
use vela_types::{Account, Amount, BlockHash, Signature};

proptest! {
    #[test]
    fn amount_be_roundtrip(raw in any::<u128>()) {
        let a = Amount::new(raw);
        prop_assert_eq!(Amount::from_be_bytes(a.to_be_bytes()), a);
    }

    #[test]
    fn hash_hex_roundtrip(bytes in any::<[u8; 32]>()) {
        let h = BlockHash::new(bytes);
        prop_assert_eq!(BlockHash::decode_hex(&h.encode_hex()).unwrap(), h);
    }

    #[test]
    fn account_hex_roundtrip(bytes in any::<[u8; 32]>()) {
        let a = Account::new(bytes);
        prop_assert_eq!(Account::decode_hex(&a.encode_hex()).unwrap(), a);
    }

    #[test]
    fn signature_hex_roundtrip(bytes in any::<[u8; 64]>()) {
        let s = Signature::new(bytes);
        prop_assert_eq!(Signature::decode_hex(&s.encode_hex()).unwrap(), s);
    }

    #[test]
    fn account_next_is_strictly_greater(bytes in any::<[u8; 32]>()) {
        let a = Account::new(bytes);
        if a != Account::new([0xFF; 32]) {
            prop_assert!(a.next() > a);
        }
    }
}
