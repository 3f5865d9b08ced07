use bacnet_device::network::{
    self, Address, NetworkMessageType, NetworkPriority, NpduHeader, INITIAL_HOP_COUNT, MAX_MAC_LEN,
};
use proptest::prelude::*;

fn priority() -> impl Strategy<Value = NetworkPriority> {
    (0u8..4).prop_map(NetworkPriority::from_bits)
}

/// A routed address: non-zero network number, up to 7 octets of MAC
fn routed_address() -> impl Strategy<Value = Address> {
    (1u16..=0xFFFF, prop::collection::vec(any::<u8>(), 0..=MAX_MAC_LEN))
        .prop_map(|(network, mac)| Address::new(network, &mac).unwrap())
}

proptest! {
    #[test]
    fn apdu_header_round_trips(
        expecting_reply in any::<bool>(),
        priority in priority(),
        destination in prop::option::of(routed_address()),
        source in prop::option::of(routed_address()),
        payload in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let header = NpduHeader::for_apdu(expecting_reply, priority);
        let mut frame = Vec::new();
        let len = network::encode(&mut frame, destination.as_ref(), source.as_ref(), &header).unwrap();
        prop_assert_eq!(len, frame.len());
        frame.extend_from_slice(&payload);

        let decoded = network::decode(&frame).unwrap();
        prop_assert_eq!(decoded.offset, len);
        prop_assert_eq!(&frame[decoded.offset..], &payload[..]);
        prop_assert_eq!(decoded.header.control.expecting_reply, expecting_reply);
        prop_assert_eq!(decoded.header.control.priority, priority);
        prop_assert!(!decoded.header.control.network_message);
        prop_assert_eq!(decoded.header.message_type, None);
        prop_assert_eq!(decoded.header.vendor_id, None);

        match destination {
            Some(dest) => {
                prop_assert_eq!(decoded.destination, dest);
                prop_assert_eq!(decoded.header.hop_count, Some(INITIAL_HOP_COUNT));
            }
            None => {
                prop_assert_eq!(decoded.destination, Address::default());
                prop_assert_eq!(decoded.header.hop_count, None);
            }
        }
        match source {
            Some(src) => prop_assert_eq!(decoded.source, src),
            None => prop_assert_eq!(decoded.source, Address::default()),
        }
    }

    #[test]
    fn network_message_vendor_id_only_when_proprietary(
        message_type in any::<u8>(),
        vendor_id in any::<u16>(),
        destination in prop::option::of(routed_address()),
    ) {
        let message_type = NetworkMessageType::from(message_type);
        let header = NpduHeader::for_network_message(message_type, vendor_id, false, NetworkPriority::Normal);
        let mut frame = Vec::new();
        network::encode(&mut frame, destination.as_ref(), None, &header).unwrap();

        let decoded = network::decode(&frame).unwrap();
        prop_assert_eq!(decoded.header.message_type, Some(message_type));
        if u8::from(message_type) >= 0x80 {
            prop_assert_eq!(decoded.header.vendor_id, Some(vendor_id));
        } else {
            prop_assert_eq!(decoded.header.vendor_id, None);
        }
        prop_assert_eq!(decoded.offset, frame.len());
    }

    #[test]
    fn truncated_frames_never_panic(
        source in routed_address(),
        destination in routed_address(),
        cut in 0usize..64,
    ) {
        let header = NpduHeader::for_apdu(true, NetworkPriority::Urgent);
        let mut frame = Vec::new();
        let len = network::encode(&mut frame, Some(&destination), Some(&source), &header).unwrap();
        let cut = cut.min(len);
        let result = network::decode(&frame[..cut]);
        if cut < len {
            prop_assert!(result.is_err());
        } else {
            prop_assert!(result.is_ok());
        }
    }
}

#[test]
fn local_addresses_are_never_written() {
    let header = NpduHeader::for_apdu(false, NetworkPriority::Normal);
    let local = Address::local(&[0x10, 0x20]).unwrap();
    let mut frame = Vec::new();
    network::encode(&mut frame, Some(&local), Some(&local), &header).unwrap();
    assert_eq!(frame, [0x01, 0x00]);
}
