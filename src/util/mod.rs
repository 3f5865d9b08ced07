//! Utility Functions Module
//!
//! Small helpers shared by the codecs: a bounds-checked byte reader used by
//! every decoder, object identifier packing, and frame dumps for trace logs.
//!
//! # Example
//!
//! ```
//! use bacnet_device::util::{decode_object_id, encode_object_id};
//!
//! let packed = encode_object_id(8, 1234).unwrap();
//! assert_eq!(decode_object_id(packed), (8, 1234));
//! ```

pub mod enum_macros;

/// Largest object type number that fits the 10-bit identifier field.
pub const MAX_OBJECT_TYPE: u16 = 0x3FF;

/// Pack an object type and instance into a 32-bit object identifier.
///
/// Returns `None` when either part does not fit its field.
pub fn encode_object_id(object_type: u16, instance: u32) -> Option<u32> {
    if object_type > MAX_OBJECT_TYPE || instance > crate::BACNET_MAX_INSTANCE {
        return None;
    }
    Some(((object_type as u32) << 22) | instance)
}

/// Split a 32-bit object identifier into object type and instance.
pub fn decode_object_id(object_id: u32) -> (u16, u32) {
    let object_type = (object_id >> 22) as u16;
    let instance = object_id & crate::BACNET_MAX_INSTANCE;
    (object_type, instance)
}

/// Bounds-checked big-endian reader over a received buffer.
///
/// Every accessor returns `None` instead of reading past the end, so the
/// decoders never index beyond the data they were handed.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.data.get(self.position)?;
        self.position += 1;
        Some(value)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.read_bytes(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(n)?;
        let bytes = self.data.get(self.position..end)?;
        self.position = end;
        Some(bytes)
    }

    /// Look at the next byte without consuming it
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Unread tail of the buffer
    pub fn rest(&self) -> &'a [u8] {
        self.data.get(self.position..).unwrap_or_default()
    }
}

/// Render a frame as space-separated hex for trace logging.
pub fn hex_dump(data: &[u8]) -> String {
    let encoded = hex::encode_upper(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 2);
    for (i, pair) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.extend(pair.iter().map(|&b| b as char));
    }
    out
}
