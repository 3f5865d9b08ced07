//! BACnet Encoding/Decoding Module
//!
//! Tag-length-value primitives from ASHRAE 135 clause 20.2, covering the
//! application data types a device answers with and the context-tagged
//! fields of the services it decodes.
//!
//! # Overview
//!
//! Every encoded value starts with a tag octet:
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +---+---+---+---+---+---+---+---+
//! |  tag number   |cls| len/val/typ|
//! +---+---+---+---+---+---+---+---+
//! ```
//!
//! - tag numbers above 14 are written as `0xF` followed by an extra octet
//! - lengths above 4 are written as `5` followed by 1, 3 or 5 length octets
//! - the class bit distinguishes application tags (the tag number names the
//!   data type) from context tags (the number is the field position)
//! - context tags with length/value/type 6 and 7 open and close constructed
//!   values
//!
//! Encoders append to a `Vec<u8>`. Decoders take the remaining input and
//! return the value together with the number of octets consumed, and never
//! read past the slice they are given.
//!
//! # Example
//!
//! ```
//! use bacnet_device::encoding::*;
//! use bacnet_device::object::PropertyValue;
//!
//! let mut buffer = Vec::new();
//! encode_application_unsigned(&mut buffer, 1476).unwrap();
//! assert_eq!(buffer, [0x22, 0x05, 0xC4]);
//!
//! let (value, consumed) = decode_application_data(&buffer).unwrap();
//! assert_eq!(value, PropertyValue::UnsignedInteger(1476));
//! assert_eq!(consumed, 3);
//! ```

use thiserror::Error;

use crate::object::{Date, ObjectIdentifier, ObjectType, PropertyValue, Time};
use crate::util::{decode_object_id, encode_object_id};

/// Result type for encoding operations
pub type Result<T> = core::result::Result<T, EncodingError>;

/// Errors that can occur during encoding/decoding operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Input ended before the value did
    #[error("unexpected end of data")]
    UnexpectedEndOfData,
    /// The tag does not match what the field requires
    #[error("invalid tag")]
    InvalidTag,
    /// The length does not fit the data type
    #[error("invalid length")]
    InvalidLength,
    /// The value cannot be represented on the wire
    #[error("value out of range")]
    ValueOutOfRange,
    /// A character string in a character set this device does not decode
    #[error("character set {0} not supported")]
    UnsupportedCharacterSet(u8),
    /// Anything else that is structurally wrong
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// BACnet application tag numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApplicationTag {
    Null = 0,
    Boolean = 1,
    UnsignedInt = 2,
    SignedInt = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectIdentifier = 12,
}

impl TryFrom<u8> for ApplicationTag {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => ApplicationTag::Null,
            1 => ApplicationTag::Boolean,
            2 => ApplicationTag::UnsignedInt,
            3 => ApplicationTag::SignedInt,
            4 => ApplicationTag::Real,
            5 => ApplicationTag::Double,
            6 => ApplicationTag::OctetString,
            7 => ApplicationTag::CharacterString,
            8 => ApplicationTag::BitString,
            9 => ApplicationTag::Enumerated,
            10 => ApplicationTag::Date,
            11 => ApplicationTag::Time,
            12 => ApplicationTag::ObjectIdentifier,
            _ => return Err(EncodingError::InvalidTag),
        })
    }
}

/// Character set codes carried as the first octet of a character string
pub mod charset {
    pub const UTF8: u8 = 0;
    pub const UCS2: u8 = 4;
    pub const ISO_8859_1: u8 = 5;
}

/// What follows a tag octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// Primitive data of this many octets. For an application boolean this
    /// is the value itself and no content follows.
    Length(usize),
    Opening,
    Closing,
}

/// A decoded tag header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub number: u8,
    pub context: bool,
    pub kind: TagKind,
}

impl Tag {
    pub fn is_opening(&self, number: u8) -> bool {
        self.context && self.number == number && self.kind == TagKind::Opening
    }

    pub fn is_closing(&self, number: u8) -> bool {
        self.context && self.number == number && self.kind == TagKind::Closing
    }

    /// A primitive context tag with this number
    pub fn is_context(&self, number: u8) -> bool {
        self.context && self.number == number && matches!(self.kind, TagKind::Length(_))
    }

    /// Content length for primitive tags, zero for opening/closing tags.
    ///
    /// Application booleans carry no content.
    pub fn content_len(&self) -> usize {
        match self.kind {
            TagKind::Length(_) if !self.context && self.number == ApplicationTag::Boolean as u8 => 0,
            TagKind::Length(len) => len,
            TagKind::Opening | TagKind::Closing => 0,
        }
    }
}

fn take(data: &[u8], at: usize, len: usize) -> Result<&[u8]> {
    let end = at.checked_add(len).ok_or(EncodingError::InvalidLength)?;
    data.get(at..end).ok_or(EncodingError::UnexpectedEndOfData)
}

/// Decode the tag header at the start of `data`.
///
/// Returns the tag and the number of header octets.
pub fn decode_tag(data: &[u8]) -> Result<(Tag, usize)> {
    let first = *data.first().ok_or(EncodingError::UnexpectedEndOfData)?;
    let context = first & 0x08 != 0;
    let lvt = first & 0x07;
    let mut consumed = 1;

    let mut number = first >> 4;
    if number == 0x0F {
        number = take(data, consumed, 1)?[0];
        consumed += 1;
    }

    let kind = match lvt {
        6 if context => TagKind::Opening,
        7 if context => TagKind::Closing,
        5 => {
            let len_octet = take(data, consumed, 1)?[0];
            consumed += 1;
            let len = match len_octet {
                254 => {
                    let b = take(data, consumed, 2)?;
                    consumed += 2;
                    u16::from_be_bytes([b[0], b[1]]) as usize
                }
                255 => {
                    let b = take(data, consumed, 4)?;
                    consumed += 4;
                    u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize
                }
                n => n as usize,
            };
            TagKind::Length(len)
        }
        n => TagKind::Length(n as usize),
    };

    Ok((
        Tag {
            number,
            context,
            kind,
        },
        consumed,
    ))
}

/// Decode the tag at `data` and hand back its content slice.
///
/// Returns the tag, the content and the total octets consumed.
pub fn decode_tag_and_content(data: &[u8]) -> Result<(Tag, &[u8], usize)> {
    let (tag, header_len) = decode_tag(data)?;
    let content_len = tag.content_len();
    let content = take(data, header_len, content_len)?;
    Ok((tag, content, header_len + content_len))
}

fn encode_tag(buffer: &mut Vec<u8>, number: u8, context: bool, length: usize) -> Result<()> {
    let class = if context { 0x08 } else { 0x00 };
    let lvt = if length <= 4 { length as u8 } else { 5 };
    if number <= 14 {
        buffer.push((number << 4) | class | lvt);
    } else {
        buffer.push(0xF0 | class | lvt);
        buffer.push(number);
    }

    if length > 4 {
        if length < 254 {
            buffer.push(length as u8);
        } else if length <= u16::MAX as usize {
            buffer.push(254);
            buffer.extend_from_slice(&(length as u16).to_be_bytes());
        } else {
            let length = u32::try_from(length).map_err(|_| EncodingError::ValueOutOfRange)?;
            buffer.push(255);
            buffer.extend_from_slice(&length.to_be_bytes());
        }
    }
    Ok(())
}

/// Encode an application tag header
pub fn encode_application_tag(buffer: &mut Vec<u8>, tag: ApplicationTag, length: usize) -> Result<()> {
    encode_tag(buffer, tag as u8, false, length)
}

/// Encode a context tag header
pub fn encode_context_tag(buffer: &mut Vec<u8>, tag_number: u8, length: usize) -> Result<()> {
    encode_tag(buffer, tag_number, true, length)
}

/// Encode the opening tag of a constructed value
pub fn encode_opening_tag(buffer: &mut Vec<u8>, tag_number: u8) -> Result<()> {
    push_bracket(buffer, tag_number, 0x0E);
    Ok(())
}

/// Encode the closing tag of a constructed value
pub fn encode_closing_tag(buffer: &mut Vec<u8>, tag_number: u8) -> Result<()> {
    push_bracket(buffer, tag_number, 0x0F);
    Ok(())
}

fn push_bracket(buffer: &mut Vec<u8>, tag_number: u8, low: u8) {
    if tag_number <= 14 {
        buffer.push((tag_number << 4) | low);
    } else {
        buffer.push(0xF0 | low);
        buffer.push(tag_number);
    }
}

// Content octets

fn unsigned_octets(value: u32) -> ([u8; 4], usize) {
    let bytes = value.to_be_bytes();
    let len = match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    };
    (bytes, len)
}

fn signed_octets(value: i32) -> ([u8; 4], usize) {
    let bytes = value.to_be_bytes();
    let len = if (-128..=127).contains(&value) {
        1
    } else if (-32768..=32767).contains(&value) {
        2
    } else if (-8_388_608..=8_388_607).contains(&value) {
        3
    } else {
        4
    };
    (bytes, len)
}

fn decode_unsigned_content(content: &[u8]) -> Result<u32> {
    if content.is_empty() || content.len() > 4 {
        return Err(EncodingError::InvalidLength);
    }
    Ok(content.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
}

fn decode_signed_content(content: &[u8]) -> Result<i32> {
    if content.is_empty() || content.len() > 4 {
        return Err(EncodingError::InvalidLength);
    }
    let fill = if content[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut bytes = [fill; 4];
    bytes[4 - content.len()..].copy_from_slice(content);
    Ok(i32::from_be_bytes(bytes))
}

fn decode_character_string_content(content: &[u8]) -> Result<String> {
    let (&set, text) = content.split_first().ok_or(EncodingError::InvalidLength)?;
    match set {
        charset::UTF8 => String::from_utf8(text.to_vec())
            .map_err(|e| EncodingError::InvalidFormat(e.to_string())),
        charset::UCS2 => {
            let (decoded, had_errors) = encoding_rs::UTF_16BE.decode_without_bom_handling(text);
            if had_errors {
                return Err(EncodingError::InvalidFormat("malformed UCS-2 string".into()));
            }
            Ok(decoded.into_owned())
        }
        charset::ISO_8859_1 => Ok(encoding_rs::mem::decode_latin1(text).into_owned()),
        other => Err(EncodingError::UnsupportedCharacterSet(other)),
    }
}

fn decode_bit_string_content(content: &[u8]) -> Result<Vec<bool>> {
    let (&unused, octets) = content.split_first().ok_or(EncodingError::InvalidLength)?;
    if unused > 7 || (octets.is_empty() && unused != 0) {
        return Err(EncodingError::InvalidFormat("bad unused bit count".into()));
    }
    let total = octets.len() * 8 - unused as usize;
    Ok((0..total)
        .map(|i| octets[i / 8] & (0x80 >> (i % 8)) != 0)
        .collect())
}

fn fixed<const N: usize>(content: &[u8]) -> Result<[u8; N]> {
    content.try_into().map_err(|_| EncodingError::InvalidLength)
}

// Application encoders

/// Encode an application null
pub fn encode_application_null(buffer: &mut Vec<u8>) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Null, 0)
}

/// Encode an application boolean; the value rides in the tag octet
pub fn encode_application_boolean(buffer: &mut Vec<u8>, value: bool) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Boolean, value as usize)
}

/// Encode an application unsigned integer in the fewest octets
pub fn encode_application_unsigned(buffer: &mut Vec<u8>, value: u32) -> Result<()> {
    let (bytes, len) = unsigned_octets(value);
    encode_application_tag(buffer, ApplicationTag::UnsignedInt, len)?;
    buffer.extend_from_slice(&bytes[4 - len..]);
    Ok(())
}

/// Encode an application signed integer in the fewest octets
pub fn encode_application_signed(buffer: &mut Vec<u8>, value: i32) -> Result<()> {
    let (bytes, len) = signed_octets(value);
    encode_application_tag(buffer, ApplicationTag::SignedInt, len)?;
    buffer.extend_from_slice(&bytes[4 - len..]);
    Ok(())
}

pub fn encode_application_real(buffer: &mut Vec<u8>, value: f32) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Real, 4)?;
    buffer.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

pub fn encode_application_double(buffer: &mut Vec<u8>, value: f64) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Double, 8)?;
    buffer.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

pub fn encode_application_octet_string(buffer: &mut Vec<u8>, value: &[u8]) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::OctetString, value.len())?;
    buffer.extend_from_slice(value);
    Ok(())
}

/// Encode a character string as UTF-8 (character set 0)
pub fn encode_application_character_string(buffer: &mut Vec<u8>, value: &str) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::CharacterString, value.len() + 1)?;
    buffer.push(charset::UTF8);
    buffer.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Encode a bit string, first element in the most significant bit
pub fn encode_application_bit_string(buffer: &mut Vec<u8>, bits: &[bool]) -> Result<()> {
    let octets = bits.len().div_ceil(8);
    let unused = (octets * 8 - bits.len()) as u8;
    encode_application_tag(buffer, ApplicationTag::BitString, octets + 1)?;
    buffer.push(unused);
    for chunk in bits.chunks(8) {
        let octet = chunk
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .fold(0u8, |acc, (i, _)| acc | (0x80 >> i));
        buffer.push(octet);
    }
    Ok(())
}

pub fn encode_application_enumerated(buffer: &mut Vec<u8>, value: u32) -> Result<()> {
    let (bytes, len) = unsigned_octets(value);
    encode_application_tag(buffer, ApplicationTag::Enumerated, len)?;
    buffer.extend_from_slice(&bytes[4 - len..]);
    Ok(())
}

/// Encode a date; year 255 stands for "unspecified"
pub fn encode_application_date(buffer: &mut Vec<u8>, date: &Date) -> Result<()> {
    let year = match date.year {
        Date::UNSPECIFIED_YEAR => 0xFF,
        1900..=2154 => (date.year - 1900) as u8,
        _ => return Err(EncodingError::ValueOutOfRange),
    };
    encode_application_tag(buffer, ApplicationTag::Date, 4)?;
    buffer.extend_from_slice(&[year, date.month, date.day, date.weekday]);
    Ok(())
}

pub fn encode_application_time(buffer: &mut Vec<u8>, time: &Time) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Time, 4)?;
    buffer.extend_from_slice(&[time.hour, time.minute, time.second, time.hundredths]);
    Ok(())
}

pub fn encode_application_object_identifier(
    buffer: &mut Vec<u8>,
    object_type: ObjectType,
    instance: u32,
) -> Result<()> {
    let id = encode_object_id(object_type.into(), instance).ok_or(EncodingError::ValueOutOfRange)?;
    encode_application_tag(buffer, ApplicationTag::ObjectIdentifier, 4)?;
    buffer.extend_from_slice(&id.to_be_bytes());
    Ok(())
}

/// Encode any application value
pub fn encode_application_data(buffer: &mut Vec<u8>, value: &PropertyValue) -> Result<()> {
    match value {
        PropertyValue::Null => encode_application_null(buffer),
        PropertyValue::Boolean(v) => encode_application_boolean(buffer, *v),
        PropertyValue::UnsignedInteger(v) => encode_application_unsigned(buffer, *v),
        PropertyValue::SignedInt(v) => encode_application_signed(buffer, *v),
        PropertyValue::Real(v) => encode_application_real(buffer, *v),
        PropertyValue::Double(v) => encode_application_double(buffer, *v),
        PropertyValue::OctetString(v) => encode_application_octet_string(buffer, v),
        PropertyValue::CharacterString(v) => encode_application_character_string(buffer, v),
        PropertyValue::BitString(v) => encode_application_bit_string(buffer, v),
        PropertyValue::Enumerated(v) => encode_application_enumerated(buffer, *v),
        PropertyValue::Date(v) => encode_application_date(buffer, v),
        PropertyValue::Time(v) => encode_application_time(buffer, v),
        PropertyValue::ObjectIdentifier(id) => {
            encode_application_object_identifier(buffer, id.object_type, id.instance)
        }
    }
}

// Context encoders

pub fn encode_context_unsigned(buffer: &mut Vec<u8>, tag_number: u8, value: u32) -> Result<()> {
    let (bytes, len) = unsigned_octets(value);
    encode_context_tag(buffer, tag_number, len)?;
    buffer.extend_from_slice(&bytes[4 - len..]);
    Ok(())
}

pub fn encode_context_enumerated(buffer: &mut Vec<u8>, tag_number: u8, value: u32) -> Result<()> {
    encode_context_unsigned(buffer, tag_number, value)
}

pub fn encode_context_signed(buffer: &mut Vec<u8>, tag_number: u8, value: i32) -> Result<()> {
    let (bytes, len) = signed_octets(value);
    encode_context_tag(buffer, tag_number, len)?;
    buffer.extend_from_slice(&bytes[4 - len..]);
    Ok(())
}

pub fn encode_context_object_identifier(
    buffer: &mut Vec<u8>,
    tag_number: u8,
    object_type: ObjectType,
    instance: u32,
) -> Result<()> {
    let id = encode_object_id(object_type.into(), instance).ok_or(EncodingError::ValueOutOfRange)?;
    encode_context_tag(buffer, tag_number, 4)?;
    buffer.extend_from_slice(&id.to_be_bytes());
    Ok(())
}

pub fn encode_context_character_string(buffer: &mut Vec<u8>, tag_number: u8, value: &str) -> Result<()> {
    encode_context_tag(buffer, tag_number, value.len() + 1)?;
    buffer.push(charset::UTF8);
    buffer.extend_from_slice(value.as_bytes());
    Ok(())
}

// Decoders

/// Decode any application-tagged value.
pub fn decode_application_data(data: &[u8]) -> Result<(PropertyValue, usize)> {
    let (tag, content, consumed) = decode_tag_and_content(data)?;
    if tag.context {
        return Err(EncodingError::InvalidTag);
    }
    let value = match ApplicationTag::try_from(tag.number)? {
        ApplicationTag::Null => PropertyValue::Null,
        ApplicationTag::Boolean => match tag.kind {
            TagKind::Length(0) => PropertyValue::Boolean(false),
            TagKind::Length(1) => PropertyValue::Boolean(true),
            _ => return Err(EncodingError::InvalidLength),
        },
        ApplicationTag::UnsignedInt => PropertyValue::UnsignedInteger(decode_unsigned_content(content)?),
        ApplicationTag::SignedInt => PropertyValue::SignedInt(decode_signed_content(content)?),
        ApplicationTag::Real => PropertyValue::Real(f32::from_be_bytes(fixed(content)?)),
        ApplicationTag::Double => PropertyValue::Double(f64::from_be_bytes(fixed(content)?)),
        ApplicationTag::OctetString => PropertyValue::OctetString(content.to_vec()),
        ApplicationTag::CharacterString => {
            PropertyValue::CharacterString(decode_character_string_content(content)?)
        }
        ApplicationTag::BitString => PropertyValue::BitString(decode_bit_string_content(content)?),
        ApplicationTag::Enumerated => PropertyValue::Enumerated(decode_unsigned_content(content)?),
        ApplicationTag::Date => {
            let [year, month, day, weekday] = fixed::<4>(content)?;
            PropertyValue::Date(Date {
                year: if year == 0xFF {
                    Date::UNSPECIFIED_YEAR
                } else {
                    1900 + year as u16
                },
                month,
                day,
                weekday,
            })
        }
        ApplicationTag::Time => {
            let [hour, minute, second, hundredths] = fixed::<4>(content)?;
            PropertyValue::Time(Time {
                hour,
                minute,
                second,
                hundredths,
            })
        }
        ApplicationTag::ObjectIdentifier => {
            let (object_type, instance) = decode_object_id(u32::from_be_bytes(fixed(content)?));
            PropertyValue::ObjectIdentifier(ObjectIdentifier::new(object_type.into(), instance))
        }
    };
    Ok((value, consumed))
}

fn expect_application(data: &[u8], expected: ApplicationTag) -> Result<(Tag, &[u8], usize)> {
    let (tag, content, consumed) = decode_tag_and_content(data)?;
    if tag.context || tag.number != expected as u8 || !matches!(tag.kind, TagKind::Length(_)) {
        return Err(EncodingError::InvalidTag);
    }
    Ok((tag, content, consumed))
}

fn expect_context(data: &[u8], tag_number: u8) -> Result<(&[u8], usize)> {
    let (tag, content, consumed) = decode_tag_and_content(data)?;
    if !tag.is_context(tag_number) {
        return Err(EncodingError::InvalidTag);
    }
    Ok((content, consumed))
}

pub fn decode_application_boolean(data: &[u8]) -> Result<(bool, usize)> {
    let (tag, _, consumed) = expect_application(data, ApplicationTag::Boolean)?;
    match tag.kind {
        TagKind::Length(0) => Ok((false, consumed)),
        TagKind::Length(1) => Ok((true, consumed)),
        _ => Err(EncodingError::InvalidLength),
    }
}

pub fn decode_application_unsigned(data: &[u8]) -> Result<(u32, usize)> {
    let (_, content, consumed) = expect_application(data, ApplicationTag::UnsignedInt)?;
    Ok((decode_unsigned_content(content)?, consumed))
}

pub fn decode_application_signed(data: &[u8]) -> Result<(i32, usize)> {
    let (_, content, consumed) = expect_application(data, ApplicationTag::SignedInt)?;
    Ok((decode_signed_content(content)?, consumed))
}

pub fn decode_application_enumerated(data: &[u8]) -> Result<(u32, usize)> {
    let (_, content, consumed) = expect_application(data, ApplicationTag::Enumerated)?;
    Ok((decode_unsigned_content(content)?, consumed))
}

pub fn decode_application_octet_string(data: &[u8]) -> Result<(Vec<u8>, usize)> {
    let (_, content, consumed) = expect_application(data, ApplicationTag::OctetString)?;
    Ok((content.to_vec(), consumed))
}

pub fn decode_application_object_identifier(data: &[u8]) -> Result<(ObjectIdentifier, usize)> {
    let (_, content, consumed) = expect_application(data, ApplicationTag::ObjectIdentifier)?;
    let (object_type, instance) = decode_object_id(u32::from_be_bytes(fixed(content)?));
    Ok((ObjectIdentifier::new(object_type.into(), instance), consumed))
}

pub fn decode_context_unsigned(data: &[u8], tag_number: u8) -> Result<(u32, usize)> {
    let (content, consumed) = expect_context(data, tag_number)?;
    Ok((decode_unsigned_content(content)?, consumed))
}

pub fn decode_context_enumerated(data: &[u8], tag_number: u8) -> Result<(u32, usize)> {
    decode_context_unsigned(data, tag_number)
}

pub fn decode_context_signed(data: &[u8], tag_number: u8) -> Result<(i32, usize)> {
    let (content, consumed) = expect_context(data, tag_number)?;
    Ok((decode_signed_content(content)?, consumed))
}

pub fn decode_context_object_identifier(data: &[u8], tag_number: u8) -> Result<(ObjectIdentifier, usize)> {
    let (content, consumed) = expect_context(data, tag_number)?;
    let (object_type, instance) = decode_object_id(u32::from_be_bytes(fixed(content)?));
    Ok((ObjectIdentifier::new(object_type.into(), instance), consumed))
}

pub fn decode_context_character_string(data: &[u8], tag_number: u8) -> Result<(String, usize)> {
    let (content, consumed) = expect_context(data, tag_number)?;
    Ok((decode_character_string_content(content)?, consumed))
}

/// Length of the complete value starting at `data`, including any nested
/// constructed content up to and including the matching closing tag.
pub fn encoded_value_len(data: &[u8]) -> Result<usize> {
    let mut depth = 0usize;
    let mut pos = 0;
    loop {
        let (tag, _, consumed) = decode_tag_and_content(&data[pos..])?;
        pos += consumed;
        match tag.kind {
            TagKind::Opening => depth += 1,
            TagKind::Closing => {
                depth = depth.checked_sub(1).ok_or(EncodingError::InvalidTag)?;
            }
            TagKind::Length(_) => {}
        }
        if depth == 0 {
            return Ok(pos);
        }
    }
}

/// Split the content between an opening tag and its matching closing tag.
///
/// `data` must start with the opening tag. Returns the enclosed octets and
/// the total length including both brackets.
pub fn decode_enclosed(data: &[u8], tag_number: u8) -> Result<(&[u8], usize)> {
    let (open, open_len) = decode_tag(data)?;
    if !open.is_opening(tag_number) {
        return Err(EncodingError::InvalidTag);
    }
    let mut depth = 0usize;
    let mut pos = open_len;
    loop {
        let (tag, _, consumed) = decode_tag_and_content(&data[pos..])?;
        match tag.kind {
            TagKind::Opening => depth += 1,
            TagKind::Closing if depth == 0 => {
                if !tag.is_closing(tag_number) {
                    return Err(EncodingError::InvalidTag);
                }
                return Ok((&data[open_len..pos], pos + consumed));
            }
            TagKind::Closing => depth -= 1,
            TagKind::Length(_) => {}
        }
        pos += consumed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_minimal_length() {
        let mut buffer = Vec::new();
        encode_application_unsigned(&mut buffer, 0).unwrap();
        assert_eq!(buffer, [0x21, 0x00]);

        buffer.clear();
        encode_application_unsigned(&mut buffer, 0x0001_0000).unwrap();
        assert_eq!(buffer, [0x23, 0x01, 0x00, 0x00]);

        buffer.clear();
        encode_application_unsigned(&mut buffer, u32::MAX).unwrap();
        assert_eq!(buffer, [0x24, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(decode_application_unsigned(&buffer).unwrap(), (u32::MAX, 5));
    }

    #[test]
    fn test_signed_sign_extension() {
        let mut buffer = Vec::new();
        encode_application_signed(&mut buffer, -1).unwrap();
        assert_eq!(buffer, [0x31, 0xFF]);
        assert_eq!(decode_application_signed(&buffer).unwrap(), (-1, 2));

        buffer.clear();
        encode_application_signed(&mut buffer, 200).unwrap();
        assert_eq!(buffer, [0x32, 0x00, 0xC8]);
        assert_eq!(decode_application_signed(&buffer).unwrap(), (200, 3));
    }

    #[test]
    fn test_boolean_in_tag() {
        let mut buffer = Vec::new();
        encode_application_boolean(&mut buffer, true).unwrap();
        encode_application_boolean(&mut buffer, false).unwrap();
        assert_eq!(buffer, [0x11, 0x10]);
        assert_eq!(decode_application_boolean(&buffer).unwrap(), (true, 1));
        assert_eq!(decode_application_boolean(&buffer[1..]).unwrap(), (false, 1));
    }

    #[test]
    fn test_character_string() {
        let mut buffer = Vec::new();
        encode_application_character_string(&mut buffer, "FILE 0").unwrap();
        assert_eq!(buffer[0], 0x75);
        assert_eq!(buffer[1], 7);
        assert_eq!(buffer[2], charset::UTF8);
        let (value, consumed) = decode_application_data(&buffer).unwrap();
        assert_eq!(value, PropertyValue::CharacterString("FILE 0".into()));
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_character_sets() {
        // ISO 8859-1 "caf\xE9"
        let latin1 = [0x75, 0x05, charset::ISO_8859_1, b'c', b'a', b'f', 0xE9];
        let (value, _) = decode_application_data(&latin1).unwrap();
        assert_eq!(value, PropertyValue::CharacterString("caf\u{e9}".into()));

        // UCS-2 "AB"
        let ucs2 = [0x75, 0x05, charset::UCS2, 0x00, b'A', 0x00, b'B'];
        let (value, _) = decode_application_data(&ucs2).unwrap();
        assert_eq!(value, PropertyValue::CharacterString("AB".into()));

        // JIS X 0208
        let jis = [0x73, 0x02, 0x41, 0x42];
        assert_eq!(
            decode_application_data(&jis),
            Err(EncodingError::UnsupportedCharacterSet(2))
        );
    }

    #[test]
    fn test_bit_string() {
        let bits = [true, false, true, false, false, false, false, false, true];
        let mut buffer = Vec::new();
        encode_application_bit_string(&mut buffer, &bits).unwrap();
        assert_eq!(buffer, [0x83, 0x07, 0xA0, 0x80]);
        let (value, consumed) = decode_application_data(&buffer).unwrap();
        assert_eq!(value, PropertyValue::BitString(bits.to_vec()));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_object_identifier() {
        let mut buffer = Vec::new();
        encode_application_object_identifier(&mut buffer, ObjectType::File, 2).unwrap();
        assert_eq!(buffer, [0xC4, 0x02, 0x80, 0x00, 0x02]);
        let (id, _) = decode_application_object_identifier(&buffer).unwrap();
        assert_eq!(id, ObjectIdentifier::new(ObjectType::File, 2));

        assert_eq!(
            encode_application_object_identifier(&mut buffer, ObjectType::Device, 0x40_0000),
            Err(EncodingError::ValueOutOfRange)
        );
    }

    #[test]
    fn test_date_and_time() {
        let date = Date {
            year: 2024,
            month: 3,
            day: 15,
            weekday: 5,
        };
        let mut buffer = Vec::new();
        encode_application_date(&mut buffer, &date).unwrap();
        assert_eq!(buffer, [0xA4, 124, 3, 15, 5]);
        assert_eq!(decode_application_data(&buffer).unwrap().0, PropertyValue::Date(date));

        buffer.clear();
        encode_application_date(&mut buffer, &Date::unspecified()).unwrap();
        assert_eq!(buffer, [0xA4, 0xFF, 0xFF, 0xFF, 0xFF]);

        buffer.clear();
        let time = Time {
            hour: 13,
            minute: 5,
            second: 0,
            hundredths: 0,
        };
        encode_application_time(&mut buffer, &time).unwrap();
        assert_eq!(decode_application_data(&buffer).unwrap(), (PropertyValue::Time(time), 5));
    }

    #[test]
    fn test_context_tags() {
        let mut buffer = Vec::new();
        encode_context_unsigned(&mut buffer, 1, 85).unwrap();
        assert_eq!(buffer, [0x19, 85]);
        assert_eq!(decode_context_unsigned(&buffer, 1).unwrap(), (85, 2));
        assert_eq!(decode_context_unsigned(&buffer, 2), Err(EncodingError::InvalidTag));

        buffer.clear();
        encode_context_signed(&mut buffer, 0, -10).unwrap();
        assert_eq!(decode_context_signed(&buffer, 0).unwrap(), (-10, 2));
    }

    #[test]
    fn test_extended_tag_number_and_length() {
        let mut buffer = Vec::new();
        encode_context_tag(&mut buffer, 20, 300).unwrap();
        assert_eq!(buffer, [0xFD, 20, 254, 0x01, 0x2C]);
        let (tag, consumed) = decode_tag(&buffer).unwrap();
        assert_eq!(
            tag,
            Tag {
                number: 20,
                context: true,
                kind: TagKind::Length(300)
            }
        );
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_enclosed_value() {
        let mut buffer = Vec::new();
        encode_opening_tag(&mut buffer, 3).unwrap();
        encode_application_unsigned(&mut buffer, 7).unwrap();
        encode_opening_tag(&mut buffer, 0).unwrap();
        encode_closing_tag(&mut buffer, 0).unwrap();
        encode_closing_tag(&mut buffer, 3).unwrap();
        buffer.push(0x49);

        let (inner, total) = decode_enclosed(&buffer, 3).unwrap();
        assert_eq!(inner, [0x21, 0x07, 0x0E, 0x0F]);
        assert_eq!(total, 6);
        assert_eq!(decode_enclosed(&buffer, 4), Err(EncodingError::InvalidTag));
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(decode_tag(&[]), Err(EncodingError::UnexpectedEndOfData));
        assert_eq!(
            decode_application_data(&[0x22, 0x01]),
            Err(EncodingError::UnexpectedEndOfData)
        );
        assert_eq!(
            decode_application_data(&[0x75, 0xFE, 0x00]),
            Err(EncodingError::UnexpectedEndOfData)
        );
        let mut unterminated = Vec::new();
        encode_opening_tag(&mut unterminated, 3).unwrap();
        encode_application_null(&mut unterminated).unwrap();
        assert_eq!(
            encoded_value_len(&unterminated),
            Err(EncodingError::UnexpectedEndOfData)
        );
    }
}
