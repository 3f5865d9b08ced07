//! BACnet Object Model and Property Dispatch
//!
//! Objects are the addressable data points of a device. Each object is named
//! by an object type and an instance number, and exposes a set of properties
//! that peers read and write.
//!
//! # Overview
//!
//! Rather than one struct per object, each object *type* registers a
//! capability bundle implementing [`ObjectFunctions`]: how many instances it
//! has, how to enumerate them, and how to read and write their properties.
//! The [`ObjectRegistry`] holds the bundles in a fixed order with the device
//! object first, and the dispatch engine ([`dispatch`]) answers generic
//! ReadProperty / WriteProperty / ReadPropertyMultiple requests against it
//! without per-type knowledge.
//!
//! Every failure a peer can see is a single [`PropertyError`], an
//! `(ErrorClass, ErrorCode)` pair from ASHRAE 135 clause 18. Faults that are
//! this device's own problem are [`DispatchError::Internal`] and only turn
//! into `services/other` at the protocol boundary.
//!
//! # Object types provided
//!
//! - [`device::DeviceObject`] - the mandatory device object
//! - [`file::FileObjects`] - file objects backed by named byte stores
//! - [`analog::AnalogObjects`] - analog input/value points
//! - [`binary::BinaryObjects`] - binary input/output points

use std::fmt;

use bitflags::bitflags;
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use thiserror::Error;

use crate::encoding::{self, EncodingError};
use crate::generate_custom_enum;
use crate::service::BACNET_ARRAY_ALL;
use crate::BACNET_MAX_INSTANCE;

pub mod analog;
pub mod binary;
pub mod device;
pub mod dispatch;
pub mod file;
pub mod object_list;
pub mod object_type;
pub mod property_identifier;
pub mod registry;

pub use dispatch::{PropertyDispatcher, PropertyResult, ReadAccessResult};
pub use object_list::ObjectList;
pub use object_type::ObjectType;
pub use property_identifier::PropertyIdentifier;
pub use registry::{ObjectFunctions, ObjectRegistry, PropertyLists, RegistryBuilder};

/// Result type for property dispatch
pub type Result<T> = core::result::Result<T, DispatchError>;

/// Object identifier (object type + instance number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    pub object_type: ObjectType,
    pub instance: u32,
}

impl ObjectIdentifier {
    pub fn new(object_type: ObjectType, instance: u32) -> Self {
        Self {
            object_type,
            instance,
        }
    }

    /// Instance fits the 22-bit field
    pub fn is_valid(&self) -> bool {
        self.instance <= BACNET_MAX_INSTANCE
    }

    /// Device objects may be addressed by the wildcard instance 4194303,
    /// which stands for "whichever device receives this".
    pub fn is_wildcard(&self) -> bool {
        self.object_type == ObjectType::Device && self.instance == BACNET_MAX_INSTANCE
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.instance)
    }
}

/// A decoded application-tagged value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    UnsignedInteger(u32),
    SignedInt(i32),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(String),
    BitString(Vec<bool>),
    Enumerated(u32),
    Date(Date),
    Time(Time),
    ObjectIdentifier(ObjectIdentifier),
}

/// BACnet date; 255 in any field means "unspecified"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub year: u16,   // 1900-2154, 255 = unspecified
    pub month: u8,   // 1-12
    pub day: u8,     // 1-31
    pub weekday: u8, // 1-7 (Mon-Sun)
}

impl Date {
    pub const UNSPECIFIED_YEAR: u16 = 255;

    pub fn unspecified() -> Self {
        Self {
            year: Self::UNSPECIFIED_YEAR,
            month: 0xFF,
            day: 0xFF,
            weekday: 0xFF,
        }
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year().clamp(1900, 2154) as u16,
            month: date.month() as u8,
            day: date.day() as u8,
            weekday: date.weekday().number_from_monday() as u8,
        }
    }
}

/// BACnet time of day; 255 in any field means "unspecified"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
}

impl Time {
    pub fn unspecified() -> Self {
        Self {
            hour: 0xFF,
            minute: 0xFF,
            second: 0xFF,
            hundredths: 0xFF,
        }
    }
}

impl From<NaiveTime> for Time {
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second() as u8,
            hundredths: (time.nanosecond() / 10_000_000).min(99) as u8,
        }
    }
}

bitflags! {
    /// Status flags of a point object (BACnetStatusFlags)
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct StatusFlags: u8 {
        const IN_ALARM = 1 << 0;
        const FAULT = 1 << 1;
        const OVERRIDDEN = 1 << 2;
        const OUT_OF_SERVICE = 1 << 3;
    }
}

impl StatusFlags {
    /// Append as a four-bit application bit string.
    pub fn encode(self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        let bits: Vec<bool> = (0..4).map(|bit| self.bits() & (1 << bit) != 0).collect();
        encoding::encode_application_bit_string(buffer, &bits)
    }
}

generate_custom_enum!(
    /// Event state (BACnetEventState)
    EventState {
        Normal = 0,
        Fault = 1,
        Offnormal = 2,
        HighLimit = 3,
        LowLimit = 4,
        LifeSafetyAlarm = 5,
    },
    u32,
    64..=65535
);

generate_custom_enum!(
    /// Error classes (BACnetErrorClass)
    ErrorClass {
        Device = 0,
        Object = 1,
        Property = 2,
        Resources = 3,
        Security = 4,
        Services = 5,
        Vt = 6,
        Communication = 7,
    },
    u16,
    64..=65535
);

generate_custom_enum!(
    /// Error codes (BACnetErrorCode)
    ErrorCode {
        Other = 0,
        ConfigurationInProgress = 2,
        DeviceBusy = 3,
        FileAccessDenied = 5,
        InconsistentParameters = 7,
        InvalidDataType = 9,
        InvalidFileAccessMethod = 10,
        InvalidFileStartPosition = 11,
        MissingRequiredParameter = 16,
        NoSpaceForObject = 18,
        NoSpaceToWriteProperty = 20,
        OperationalProblem = 25,
        PasswordFailure = 26,
        ReadAccessDenied = 27,
        ServiceRequestDenied = 29,
        Timeout = 30,
        UnknownObject = 31,
        UnknownProperty = 32,
        UnsupportedObjectType = 36,
        ValueOutOfRange = 37,
        WriteAccessDenied = 40,
        CharacterSetNotSupported = 41,
        InvalidArrayIndex = 42,
        PropertyIsNotAnArray = 50,
    },
    u16,
    256..=65535
);

/// The single `(class, code)` pair reported to a peer for a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("{class}/{code}")]
pub struct PropertyError {
    pub class: ErrorClass,
    pub code: ErrorCode,
}

impl PropertyError {
    pub const fn new(class: ErrorClass, code: ErrorCode) -> Self {
        Self { class, code }
    }

    pub const UNSUPPORTED_OBJECT_TYPE: Self =
        Self::new(ErrorClass::Object, ErrorCode::UnsupportedObjectType);
    pub const UNKNOWN_OBJECT: Self = Self::new(ErrorClass::Object, ErrorCode::UnknownObject);
    pub const UNKNOWN_PROPERTY: Self = Self::new(ErrorClass::Property, ErrorCode::UnknownProperty);
    pub const INVALID_DATA_TYPE: Self = Self::new(ErrorClass::Property, ErrorCode::InvalidDataType);
    pub const VALUE_OUT_OF_RANGE: Self = Self::new(ErrorClass::Property, ErrorCode::ValueOutOfRange);
    pub const WRITE_ACCESS_DENIED: Self =
        Self::new(ErrorClass::Property, ErrorCode::WriteAccessDenied);
    pub const PROPERTY_IS_NOT_AN_ARRAY: Self =
        Self::new(ErrorClass::Property, ErrorCode::PropertyIsNotAnArray);
    pub const INVALID_ARRAY_INDEX: Self =
        Self::new(ErrorClass::Property, ErrorCode::InvalidArrayIndex);
    pub const NO_SPACE_FOR_OBJECT: Self =
        Self::new(ErrorClass::Services, ErrorCode::NoSpaceForObject);
    pub const NO_SPACE_TO_WRITE_PROPERTY: Self =
        Self::new(ErrorClass::Property, ErrorCode::NoSpaceToWriteProperty);
    pub const CHARACTER_SET_NOT_SUPPORTED: Self =
        Self::new(ErrorClass::Property, ErrorCode::CharacterSetNotSupported);
    pub const FILE_ACCESS_DENIED: Self = Self::new(ErrorClass::Services, ErrorCode::FileAccessDenied);
    pub const INVALID_FILE_ACCESS_METHOD: Self =
        Self::new(ErrorClass::Services, ErrorCode::InvalidFileAccessMethod);
    pub const INVALID_FILE_START_POSITION: Self =
        Self::new(ErrorClass::Services, ErrorCode::InvalidFileStartPosition);
    pub const OTHER: Self = Self::new(ErrorClass::Services, ErrorCode::Other);
    pub const PASSWORD_FAILURE: Self = Self::new(ErrorClass::Security, ErrorCode::PasswordFailure);
}

/// Failure of a dispatched request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A protocol-visible error
    #[error("{0}")]
    Protocol(#[from] PropertyError),
    /// A fault in this device (encode failure, poisoned lock, registry
    /// inconsistency); reported to peers as services/other
    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// The pair to put in an Error PDU.
    pub fn to_property_error(&self) -> PropertyError {
        match self {
            DispatchError::Protocol(e) => *e,
            DispatchError::Internal(_) => PropertyError::OTHER,
        }
    }
}

impl From<EncodingError> for DispatchError {
    fn from(e: EncodingError) -> Self {
        DispatchError::Internal(format!("encode failed: {e}"))
    }
}

impl From<crate::storage::StorageError> for DispatchError {
    fn from(e: crate::storage::StorageError) -> Self {
        DispatchError::Internal(format!("settings store: {e}"))
    }
}

impl<T> From<std::sync::PoisonError<T>> for DispatchError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        DispatchError::Internal("object state lock poisoned".into())
    }
}

/// Which part of an array property a request addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayIndex {
    /// No index in the request
    #[default]
    None,
    /// The whole array (index 0xFFFFFFFF on the wire)
    All,
    /// One element; element 0 is the array length
    Element(u32),
}

impl ArrayIndex {
    /// Interpret the optional propertyArrayIndex field of a request
    pub fn from_wire(index: Option<u32>) -> Self {
        match index {
            None => ArrayIndex::None,
            Some(BACNET_ARRAY_ALL) => ArrayIndex::All,
            Some(n) => ArrayIndex::Element(n),
        }
    }

    pub fn to_wire(self) -> Option<u32> {
        match self {
            ArrayIndex::None => None,
            ArrayIndex::All => Some(BACNET_ARRAY_ALL),
            ArrayIndex::Element(n) => Some(n),
        }
    }

    /// The request addresses the property as a whole
    pub fn is_whole(self) -> bool {
        matches!(self, ArrayIndex::None | ArrayIndex::All)
    }
}

/// A read of one property of one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyReadRequest {
    pub object_type: ObjectType,
    pub object_instance: u32,
    pub property: PropertyIdentifier,
    pub array_index: ArrayIndex,
    /// Space available for the encoded value
    pub max_apdu: usize,
}

impl PropertyReadRequest {
    pub fn new(object: ObjectIdentifier, property: PropertyIdentifier) -> Self {
        Self {
            object_type: object.object_type,
            object_instance: object.instance,
            property,
            array_index: ArrayIndex::None,
            max_apdu: crate::BACNET_MAX_APDU,
        }
    }

    pub fn with_array_index(mut self, array_index: ArrayIndex) -> Self {
        self.array_index = array_index;
        self
    }

    pub fn with_max_apdu(mut self, max_apdu: usize) -> Self {
        self.max_apdu = max_apdu;
        self
    }

    pub fn object(&self) -> ObjectIdentifier {
        ObjectIdentifier::new(self.object_type, self.object_instance)
    }
}

/// A write of one property of one object.
///
/// The value stays in its encoded form; each object type decodes it and
/// checks the data type it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyWriteRequest<'a> {
    pub object_type: ObjectType,
    pub object_instance: u32,
    pub property: PropertyIdentifier,
    pub array_index: ArrayIndex,
    /// Application-tagged value octets
    pub value: &'a [u8],
    /// Command priority 1-16, if given
    pub priority: Option<u8>,
}

impl<'a> PropertyWriteRequest<'a> {
    pub fn new(object: ObjectIdentifier, property: PropertyIdentifier, value: &'a [u8]) -> Self {
        Self {
            object_type: object.object_type,
            object_instance: object.instance,
            property,
            array_index: ArrayIndex::None,
            value,
            priority: None,
        }
    }

    pub fn object(&self) -> ObjectIdentifier {
        ObjectIdentifier::new(self.object_type, self.object_instance)
    }

    /// Decode the value being written.
    ///
    /// A string in a character set this device cannot decode is
    /// character-set-not-supported; any other undecodable value is
    /// invalid-data-type.
    pub fn decode_value(&self) -> Result<PropertyValue> {
        match encoding::decode_application_data(self.value) {
            Ok((value, _)) => Ok(value),
            Err(EncodingError::UnsupportedCharacterSet(_)) => {
                Err(PropertyError::CHARACTER_SET_NOT_SUPPORTED.into())
            }
            Err(_) => Err(PropertyError::INVALID_DATA_TYPE.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_identifier() {
        let id = ObjectIdentifier::new(ObjectType::Device, BACNET_MAX_INSTANCE);
        assert!(id.is_valid());
        assert!(id.is_wildcard());
        assert!(!ObjectIdentifier::new(ObjectType::AnalogInput, BACNET_MAX_INSTANCE).is_wildcard());
        assert!(!ObjectIdentifier::new(ObjectType::File, BACNET_MAX_INSTANCE + 1).is_valid());
        assert_eq!(ObjectIdentifier::new(ObjectType::File, 2).to_string(), "File:2");
    }

    #[test]
    fn test_array_index_wire_form() {
        assert_eq!(ArrayIndex::from_wire(None), ArrayIndex::None);
        assert_eq!(ArrayIndex::from_wire(Some(0xFFFF_FFFF)), ArrayIndex::All);
        assert_eq!(ArrayIndex::from_wire(Some(0)), ArrayIndex::Element(0));
        assert_eq!(ArrayIndex::Element(3).to_wire(), Some(3));
        assert!(ArrayIndex::All.is_whole());
        assert!(!ArrayIndex::Element(1).is_whole());
    }

    #[test]
    fn test_error_pairs() {
        let err = PropertyError::NO_SPACE_FOR_OBJECT;
        assert_eq!(u16::from(err.class), 5);
        assert_eq!(u16::from(err.code), 18);
        assert_eq!(err.to_string(), "Services/NoSpaceForObject");

        let internal = DispatchError::Internal("boom".into());
        assert_eq!(internal.to_property_error(), PropertyError::OTHER);
        assert_eq!(
            DispatchError::from(PropertyError::UNKNOWN_OBJECT).to_property_error(),
            PropertyError::UNKNOWN_OBJECT
        );
    }

    #[test]
    fn test_write_value_decoding() {
        let id = ObjectIdentifier::new(ObjectType::Device, 1);
        let request = PropertyWriteRequest::new(id, PropertyIdentifier::ObjectName, &[0x91, 0x01]);
        assert_eq!(request.decode_value().unwrap(), PropertyValue::Enumerated(1));

        let jis = [0x73, 0x02, b'A', b'B'];
        let request = PropertyWriteRequest::new(id, PropertyIdentifier::ObjectName, &jis);
        assert_eq!(
            request.decode_value(),
            Err(PropertyError::CHARACTER_SET_NOT_SUPPORTED.into())
        );

        let request = PropertyWriteRequest::new(id, PropertyIdentifier::ObjectName, &[]);
        assert_eq!(request.decode_value(), Err(PropertyError::INVALID_DATA_TYPE.into()));
    }

    #[test]
    fn test_chrono_conversions() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            Date::from(date),
            Date {
                year: 2024,
                month: 3,
                day: 15,
                weekday: 5
            }
        );
        let time = NaiveTime::from_hms_milli_opt(13, 5, 9, 250).unwrap();
        assert_eq!(
            Time::from(time),
            Time {
                hour: 13,
                minute: 5,
                second: 9,
                hundredths: 25
            }
        );
    }
}
