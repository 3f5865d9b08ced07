//! BACnet Network Layer Module
//!
//! This module frames application payloads with the BACnet network layer
//! header (NPDU) as defined in ASHRAE 135 clause 6, and decides what happens
//! to a received frame once its header is understood.
//!
//! # Overview
//!
//! The NPDU header carries:
//! - Protocol version
//! - A control octet (network message flag, address presence, expecting
//!   reply, priority)
//! - Destination network address (DNET, DLEN, DADR) and hop count
//! - Source network address (SNET, SLEN, SADR)
//! - For network layer messages, the message type and, for proprietary
//!   types, a vendor identifier
//!
//! Which optional fields appear is decided entirely by the addresses and the
//! message type, never by separate flags: a destination is written only when
//! its network number is non-zero, the hop count only with a destination, and
//! the vendor id only for message types 0x80 and above.
//!
//! # Receive path
//!
//! [`route_received`] applies the device rule for a decoded frame: network
//! layer messages are reported and dropped (this device does not route),
//! application payloads with the supported protocol version go up to the
//! application layer, and anything else is discarded.
//!
//! # Example
//!
//! ```
//! use bacnet_device::network::{self, Address, NpduHeader, NetworkPriority};
//!
//! let dest = Address::remote(5, &[0x0A]).unwrap();
//! let header = NpduHeader::for_apdu(true, NetworkPriority::Normal);
//!
//! let mut frame = Vec::new();
//! let len = network::encode(&mut frame, Some(&dest), None, &header).unwrap();
//! assert_eq!(len, frame.len());
//!
//! let decoded = network::decode(&frame).unwrap();
//! assert_eq!(decoded.destination, dest);
//! assert_eq!(decoded.header.hop_count, Some(0xFF));
//! ```

use log::{trace, warn};
use thiserror::Error;

use crate::generate_custom_enum;
use crate::util::{hex_dump, Reader};
use crate::BACNET_PROTOCOL_VERSION;

pub mod address;

pub use address::{Address, GLOBAL_BROADCAST_NETWORK, LOCAL_NETWORK, MAX_MAC_LEN};

/// Result type for network layer operations
pub type Result<T> = core::result::Result<T, NetworkError>;

/// Hop count written on every frame sent to a remote network.
pub const INITIAL_HOP_COUNT: u8 = 0xFF;

/// Largest possible NPDU header: version, control, two full address triples,
/// hop count, message type and vendor id.
pub const MAX_NPDU_HEADER_LEN: usize = 1 + 1 + 2 * (2 + 1 + MAX_MAC_LEN) + 1 + 1 + 2;

/// Network layer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The frame ended before a field the header says is present
    #[error("malformed NPDU: {0}")]
    Malformed(&'static str),
    /// A station address longer than [`MAX_MAC_LEN`]
    #[error("station address of {0} octets is too long")]
    InvalidAddress(usize),
    /// The header is flagged as a network message but carries no type
    #[error("network layer message without a message type")]
    MissingMessageType,
}

generate_custom_enum!(
    /// Network layer message types (ASHRAE 135 clause 6.2.4)
    ///
    /// Types 0x80 to 0xFF are vendor proprietary and carry a vendor id.
    NetworkMessageType {
        WhoIsRouterToNetwork = 0x00,
        IAmRouterToNetwork = 0x01,
        ICouldBeRouterToNetwork = 0x02,
        RejectMessageToNetwork = 0x03,
        RouterBusyToNetwork = 0x04,
        RouterAvailableToNetwork = 0x05,
        InitializeRoutingTable = 0x06,
        InitializeRoutingTableAck = 0x07,
        EstablishConnectionToNetwork = 0x08,
        DisconnectConnectionToNetwork = 0x09,
        ChallengeRequest = 0x0A,
        SecurityPayload = 0x0B,
        SecurityResponse = 0x0C,
        RequestKeyUpdate = 0x0D,
        UpdateKeySet = 0x0E,
        UpdateDistributionKey = 0x0F,
        RequestMasterKey = 0x10,
        SetMasterKey = 0x11,
        WhatIsNetworkNumber = 0x12,
        NetworkNumberIs = 0x13,
    },
    u8,
    0x80..=0xFF
);

impl NetworkMessageType {
    /// Proprietary message types are followed by a vendor id on the wire.
    pub fn has_vendor_id(self) -> bool {
        u8::from(self) >= 0x80
    }
}

/// Network priority carried in the low two bits of the control octet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NetworkPriority {
    /// Normal messages (lowest priority)
    #[default]
    Normal = 0,
    /// Urgent messages
    Urgent = 1,
    /// Critical Equipment messages
    CriticalEquipment = 2,
    /// Life Safety messages (highest priority)
    LifeSafety = 3,
}

impl NetworkPriority {
    pub fn to_bits(self) -> u8 {
        self as u8
    }

    /// Only the low two bits are looked at.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            3 => NetworkPriority::LifeSafety,
            2 => NetworkPriority::CriticalEquipment,
            1 => NetworkPriority::Urgent,
            _ => NetworkPriority::Normal,
        }
    }
}

/// NPDU control octet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NpduControl {
    /// Bit 7: the payload is a network layer message
    pub network_message: bool,
    /// Bit 5: DNET, DLEN, DADR and hop count present
    pub destination_present: bool,
    /// Bit 3: SNET, SLEN and SADR present
    pub source_present: bool,
    /// Bit 2: a reply is expected
    pub expecting_reply: bool,
    /// Bits 1-0
    pub priority: NetworkPriority,
}

impl NpduControl {
    pub fn to_byte(&self) -> u8 {
        let mut byte = 0u8;
        if self.network_message {
            byte |= 0x80;
        }
        if self.destination_present {
            byte |= 0x20;
        }
        if self.source_present {
            byte |= 0x08;
        }
        if self.expecting_reply {
            byte |= 0x04;
        }
        byte | self.priority.to_bits()
    }

    /// Reserved bits 6 and 4 are ignored.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            network_message: (byte & 0x80) != 0,
            destination_present: (byte & 0x20) != 0,
            source_present: (byte & 0x08) != 0,
            expecting_reply: (byte & 0x04) != 0,
            priority: NetworkPriority::from_bits(byte),
        }
    }
}

/// Decoded NPDU header fields.
///
/// `hop_count` is `Some` exactly when the destination is present and
/// `vendor_id` exactly when the message type is proprietary. On encode the
/// presence bits of `control` are recomputed from the addresses handed to
/// [`encode`], and the hop count is always [`INITIAL_HOP_COUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpduHeader {
    pub protocol_version: u8,
    pub control: NpduControl,
    pub message_type: Option<NetworkMessageType>,
    pub vendor_id: Option<u16>,
    pub hop_count: Option<u8>,
}

impl Default for NpduHeader {
    fn default() -> Self {
        Self {
            protocol_version: BACNET_PROTOCOL_VERSION,
            control: NpduControl::default(),
            message_type: None,
            vendor_id: None,
            hop_count: None,
        }
    }
}

impl NpduHeader {
    /// Header for a frame carrying an APDU.
    pub fn for_apdu(expecting_reply: bool, priority: NetworkPriority) -> Self {
        Self {
            control: NpduControl {
                expecting_reply,
                priority,
                ..NpduControl::default()
            },
            ..Self::default()
        }
    }

    /// Header for a frame carrying a network layer message.
    ///
    /// `vendor_id` is only kept for proprietary message types.
    pub fn for_network_message(
        message_type: NetworkMessageType,
        vendor_id: u16,
        expecting_reply: bool,
        priority: NetworkPriority,
    ) -> Self {
        Self {
            control: NpduControl {
                network_message: true,
                expecting_reply,
                priority,
                ..NpduControl::default()
            },
            message_type: Some(message_type),
            vendor_id: message_type.has_vendor_id().then_some(vendor_id),
            ..Self::default()
        }
    }

    pub fn is_network_message(&self) -> bool {
        self.control.network_message
    }
}

/// A decoded frame header together with its addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedNpdu {
    pub header: NpduHeader,
    /// Cleared when the frame has no destination specifier
    pub destination: Address,
    /// Cleared when the frame has no source specifier
    pub source: Address,
    /// Offset of the payload (APDU or message body) within the frame
    pub offset: usize,
}

fn present(address: Option<&Address>) -> Option<&Address> {
    address.filter(|a| a.network != LOCAL_NETWORK)
}

fn put_address(buffer: &mut Vec<u8>, address: &Address) {
    buffer.extend_from_slice(&address.network.to_be_bytes());
    buffer.push(address.mac_len() as u8);
    buffer.extend_from_slice(address.mac());
}

/// Append an NPDU header to `buffer`, returning the number of octets written.
///
/// A destination or source is only written when its network number is
/// non-zero; local addresses are resolved by the datalink.
pub fn encode(
    buffer: &mut Vec<u8>,
    destination: Option<&Address>,
    source: Option<&Address>,
    header: &NpduHeader,
) -> Result<usize> {
    let start = buffer.len();
    let destination = present(destination);
    let source = present(source);

    let message_type = if header.control.network_message {
        Some(header.message_type.ok_or(NetworkError::MissingMessageType)?)
    } else {
        None
    };

    let control = NpduControl {
        destination_present: destination.is_some(),
        source_present: source.is_some(),
        ..header.control
    };

    buffer.push(header.protocol_version);
    buffer.push(control.to_byte());
    if let Some(dest) = destination {
        put_address(buffer, dest);
    }
    if let Some(src) = source {
        put_address(buffer, src);
    }
    if destination.is_some() {
        buffer.push(INITIAL_HOP_COUNT);
    }
    if let Some(message_type) = message_type {
        buffer.push(message_type.into());
        if message_type.has_vendor_id() {
            buffer.extend_from_slice(&header.vendor_id.unwrap_or(0).to_be_bytes());
        }
    }

    Ok(buffer.len() - start)
}

fn read_address(reader: &mut Reader<'_>, into: &mut Address, what: &'static str) -> Result<()> {
    let network = reader.read_u16().ok_or(NetworkError::Malformed(what))?;
    let len = reader.read_u8().ok_or(NetworkError::Malformed(what))? as usize;
    if len > MAX_MAC_LEN {
        return Err(NetworkError::InvalidAddress(len));
    }
    let mac = reader.read_bytes(len).ok_or(NetworkError::Malformed(what))?;
    into.network = network;
    into.set_mac(mac)
}

/// Decode an NPDU header into caller-owned addresses.
///
/// Both addresses are cleared first, so an absent specifier always leaves a
/// zeroed address no matter what the caller passed in. Returns the header
/// and the offset of the payload.
pub fn decode_into(
    data: &[u8],
    destination: &mut Address,
    source: &mut Address,
) -> Result<(NpduHeader, usize)> {
    destination.clear();
    source.clear();

    let mut reader = Reader::new(data);
    let protocol_version = reader
        .read_u8()
        .ok_or(NetworkError::Malformed("missing protocol version"))?;
    let control = NpduControl::from_byte(
        reader
            .read_u8()
            .ok_or(NetworkError::Malformed("missing control octet"))?,
    );

    if control.destination_present {
        read_address(&mut reader, destination, "truncated destination")?;
    }
    if control.source_present {
        read_address(&mut reader, source, "truncated source")?;
    }

    let hop_count = if control.destination_present {
        Some(
            reader
                .read_u8()
                .ok_or(NetworkError::Malformed("missing hop count"))?,
        )
    } else {
        None
    };

    let (message_type, vendor_id) = if control.network_message {
        let message_type = NetworkMessageType::from(
            reader
                .read_u8()
                .ok_or(NetworkError::Malformed("missing message type"))?,
        );
        let vendor_id = if message_type.has_vendor_id() {
            Some(
                reader
                    .read_u16()
                    .ok_or(NetworkError::Malformed("missing vendor id"))?,
            )
        } else {
            None
        };
        (Some(message_type), vendor_id)
    } else {
        (None, None)
    };

    let header = NpduHeader {
        protocol_version,
        control,
        message_type,
        vendor_id,
        hop_count,
    };
    Ok((header, reader.position()))
}

/// Decode an NPDU header, returning the addresses by value.
pub fn decode(data: &[u8]) -> Result<DecodedNpdu> {
    let mut destination = Address::default();
    let mut source = Address::default();
    let (header, offset) = decode_into(data, &mut destination, &mut source)?;
    Ok(DecodedNpdu {
        header,
        destination,
        source,
        offset,
    })
}

/// What the device does with a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpduDisposition {
    /// Hand the APDU starting at `offset` to the application layer
    Application { offset: usize },
    /// A network layer message; this device does not route, so it is dropped
    NetworkMessage(NetworkMessageType),
    /// Protocol version mismatch; dropped
    UnsupportedVersion(u8),
}

/// Apply the receive rule to a decoded header.
pub fn route_received(header: &NpduHeader, offset: usize) -> NpduDisposition {
    if header.control.network_message {
        let message_type = header
            .message_type
            .unwrap_or(NetworkMessageType::WhoIsRouterToNetwork);
        warn!("dropping network layer message {message_type}");
        NpduDisposition::NetworkMessage(message_type)
    } else if header.protocol_version == BACNET_PROTOCOL_VERSION {
        NpduDisposition::Application { offset }
    } else {
        warn!(
            "dropping frame with protocol version {}",
            header.protocol_version
        );
        NpduDisposition::UnsupportedVersion(header.protocol_version)
    }
}

/// Decode a received frame and apply the receive rule in one step.
pub fn receive(frame: &[u8]) -> Result<(DecodedNpdu, NpduDisposition)> {
    trace!("rx npdu [{}]", hex_dump(frame));
    let decoded = decode(frame).inspect_err(|e| warn!("discarding frame: {e}"))?;
    let disposition = route_received(&decoded.header, decoded.offset);
    Ok((decoded, disposition))
}
