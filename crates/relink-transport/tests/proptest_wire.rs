//! Property-based tests for the GBN wire format.
//!
//! The decoder must be total: arbitrary datagrams either parse into a valid
//! packet or return a typed error — never panic, never accept a packet whose
//! advertised length disagrees with the datagram.

use bytes::{Bytes, BytesMut};
use proptest::prelude::*;
use relink_transport::wire::*;

fn any_packet() -> impl Strategy<Value = Packet> {
    let data = (0i32..SEQ_MODULO as i32, prop::collection::vec(any::<u8>(), 1..=MAX_DATA_LEN))
        .prop_map(|(seq, payload)| Packet::data(seq, Bytes::from(payload)));
    let ack = (-1i32..SEQ_MODULO as i32).prop_map(Packet::ack);
    let eot = (0i32..SEQ_MODULO as i32).prop_map(Packet::eot);
    prop_oneof![data, ack, eot]
}

proptest! {
    #[test]
    fn decode_never_panics_on_arbitrary_bytes(raw in prop::collection::vec(any::<u8>(), 0..600)) {
        let _ = Packet::decode(&mut Bytes::from(raw));
    }

    #[test]
    fn encode_then_decode_is_identity(pkt in any_packet()) {
        let wire = pkt.encode().freeze();
        prop_assert_eq!(wire.len(), pkt.encoded_len());
        let decoded = Packet::decode(&mut wire.clone()).unwrap();
        prop_assert_eq!(decoded, pkt);
    }

    #[test]
    fn any_truncation_is_rejected(pkt in any_packet(), cut in 1usize..12) {
        let wire = pkt.encode().freeze();
        let cut = cut.min(wire.len());
        let mut truncated = wire.slice(..wire.len() - cut);
        prop_assert!(Packet::decode(&mut truncated).is_err());
    }

    #[test]
    fn appended_garbage_is_rejected(pkt in any_packet(), tail in prop::collection::vec(any::<u8>(), 1..32)) {
        let mut wire = BytesMut::from(&pkt.encode()[..]);
        wire.extend_from_slice(&tail);
        prop_assert!(Packet::decode(&mut wire.freeze()).is_err());
    }
}
