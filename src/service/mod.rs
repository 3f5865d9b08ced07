//! BACnet Service Layer
//!
//! Request decoders and acknowledgement encoders for the confirmed services
//! this device serves:
//!
//! - ReadProperty ([`read_property`])
//! - WriteProperty ([`write_property`])
//! - ReadPropertyMultiple ([`read_property_multiple`])
//! - AtomicReadFile / AtomicWriteFile ([`atomic_file`])
//! - ReinitializeDevice ([`reinitialize`])
//!
//! Each request type has a `decode` used by the server side and an `encode`
//! for building requests (and for tests). Decode failures are
//! [`ServiceError`]s, which the application layer turns into Reject PDUs via
//! [`ServiceError::reject_reason`].

use bitflags::bitflags;
use thiserror::Error;

use crate::encoding::{self, EncodingError};

pub mod atomic_file;
pub mod read_property;
pub mod read_property_multiple;
pub mod reinitialize;
pub mod write_property;

pub use atomic_file::{
    AtomicReadFileAck, AtomicReadFileRequest, AtomicWriteFileAck, AtomicWriteFileRequest,
    FileAccess, FileWriteAccess,
};
pub use read_property::{ReadPropertyAck, ReadPropertyRequest};
pub use read_property_multiple::{ReadAccessSpecification, ReadPropertyMultipleAck};
pub use reinitialize::{ReinitializeDeviceRequest, ReinitializedState};
pub use write_property::WritePropertyRequest;

/// Result type for service operations
pub type Result<T> = core::result::Result<T, ServiceError>;

/// Special array index value indicating all elements
pub const BACNET_ARRAY_ALL: u32 = 0xFFFFFFFF;

/// Number of bits in the protocol-services-supported bit string
pub const MAX_SERVICES_SUPPORTED: usize = 40;

/// Service request decode errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("missing required parameter")]
    MissingRequiredParameter,
    #[error("invalid tag")]
    InvalidTag,
    #[error("parameter out of range")]
    ParameterOutOfRange,
    #[error("unsupported service choice: {0}")]
    UnsupportedServiceChoice(u8),
    #[error("encoding error: {0}")]
    EncodingError(#[from] EncodingError),
}

impl ServiceError {
    /// The reason to put in the Reject PDU.
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            ServiceError::MissingRequiredParameter => RejectReason::MissingRequiredParameter,
            ServiceError::InvalidTag => RejectReason::InvalidTag,
            ServiceError::ParameterOutOfRange => RejectReason::ParameterOutOfRange,
            ServiceError::UnsupportedServiceChoice(_) => RejectReason::UnrecognizedService,
            ServiceError::EncodingError(EncodingError::UnexpectedEndOfData) => {
                RejectReason::MissingRequiredParameter
            }
            ServiceError::EncodingError(EncodingError::ValueOutOfRange) => {
                RejectReason::ParameterOutOfRange
            }
            ServiceError::EncodingError(EncodingError::InvalidTag)
            | ServiceError::EncodingError(EncodingError::InvalidLength) => RejectReason::InvalidTag,
            ServiceError::EncodingError(_) => RejectReason::Other,
        }
    }
}

/// Confirmed service choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfirmedServiceChoice {
    // Alarm and Event Services
    AcknowledgeAlarm = 0,
    ConfirmedCovNotification = 1,
    ConfirmedEventNotification = 2,
    GetAlarmSummary = 3,
    GetEnrollmentSummary = 4,
    SubscribeCov = 5,

    // File Access Services
    AtomicReadFile = 6,
    AtomicWriteFile = 7,

    // Object Access Services
    AddListElement = 8,
    RemoveListElement = 9,
    CreateObject = 10,
    DeleteObject = 11,
    ReadProperty = 12,
    ReadPropertyMultiple = 14,
    WriteProperty = 15,
    WritePropertyMultiple = 16,

    // Remote Device Management Services
    DeviceCommunicationControl = 17,
    ConfirmedPrivateTransfer = 18,
    ConfirmedTextMessage = 19,
    ReinitializeDevice = 20,

    // Other Services
    ReadRange = 26,
    SubscribeCovProperty = 28,
    GetEventInformation = 29,
}

impl TryFrom<u8> for ConfirmedServiceChoice {
    type Error = ServiceError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::AcknowledgeAlarm),
            1 => Ok(Self::ConfirmedCovNotification),
            2 => Ok(Self::ConfirmedEventNotification),
            3 => Ok(Self::GetAlarmSummary),
            4 => Ok(Self::GetEnrollmentSummary),
            5 => Ok(Self::SubscribeCov),
            6 => Ok(Self::AtomicReadFile),
            7 => Ok(Self::AtomicWriteFile),
            8 => Ok(Self::AddListElement),
            9 => Ok(Self::RemoveListElement),
            10 => Ok(Self::CreateObject),
            11 => Ok(Self::DeleteObject),
            12 => Ok(Self::ReadProperty),
            14 => Ok(Self::ReadPropertyMultiple),
            15 => Ok(Self::WriteProperty),
            16 => Ok(Self::WritePropertyMultiple),
            17 => Ok(Self::DeviceCommunicationControl),
            18 => Ok(Self::ConfirmedPrivateTransfer),
            19 => Ok(Self::ConfirmedTextMessage),
            20 => Ok(Self::ReinitializeDevice),
            26 => Ok(Self::ReadRange),
            28 => Ok(Self::SubscribeCovProperty),
            29 => Ok(Self::GetEventInformation),
            _ => Err(ServiceError::UnsupportedServiceChoice(value)),
        }
    }
}

/// Reject reason codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectReason {
    Other = 0,
    BufferOverflow = 1,
    InconsistentParameters = 2,
    InvalidParameterDataType = 3,
    InvalidTag = 4,
    MissingRequiredParameter = 5,
    ParameterOutOfRange = 6,
    TooManyArguments = 7,
    UndefinedEnumeration = 8,
    UnrecognizedService = 9,
}

/// Abort reason codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AbortReason {
    Other = 0,
    BufferOverflow = 1,
    InvalidApduInThisState = 2,
    PreemptedByHigherPriorityTask = 3,
    SegmentationNotSupported = 4,
}

bitflags! {
    /// Protocol services supported bitfield
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ProtocolServicesSupported: u64 {
        const ACKNOWLEDGE_ALARM = 1 << 0;
        const CONFIRMED_COV_NOTIFICATION = 1 << 1;
        const CONFIRMED_EVENT_NOTIFICATION = 1 << 2;
        const GET_ALARM_SUMMARY = 1 << 3;
        const GET_ENROLLMENT_SUMMARY = 1 << 4;
        const SUBSCRIBE_COV = 1 << 5;
        const ATOMIC_READ_FILE = 1 << 6;
        const ATOMIC_WRITE_FILE = 1 << 7;
        const ADD_LIST_ELEMENT = 1 << 8;
        const REMOVE_LIST_ELEMENT = 1 << 9;
        const CREATE_OBJECT = 1 << 10;
        const DELETE_OBJECT = 1 << 11;
        const READ_PROPERTY = 1 << 12;
        const READ_PROPERTY_CONDITIONAL = 1 << 13;
        const READ_PROPERTY_MULTIPLE = 1 << 14;
        const WRITE_PROPERTY = 1 << 15;
        const WRITE_PROPERTY_MULTIPLE = 1 << 16;
        const DEVICE_COMMUNICATION_CONTROL = 1 << 17;
        const CONFIRMED_PRIVATE_TRANSFER = 1 << 18;
        const CONFIRMED_TEXT_MESSAGE = 1 << 19;
        const REINITIALIZE_DEVICE = 1 << 20;
        const VT_OPEN = 1 << 21;
        const VT_CLOSE = 1 << 22;
        const VT_DATA = 1 << 23;
        const AUTHENTICATE = 1 << 24;
        const REQUEST_KEY = 1 << 25;
        const I_AM = 1 << 26;
        const I_HAVE = 1 << 27;
        const UNCONFIRMED_COV_NOTIFICATION = 1 << 28;
        const UNCONFIRMED_EVENT_NOTIFICATION = 1 << 29;
        const UNCONFIRMED_PRIVATE_TRANSFER = 1 << 30;
        const UNCONFIRMED_TEXT_MESSAGE = 1 << 31;
        const TIME_SYNCHRONIZATION = 1 << 32;
        const WHO_HAS = 1 << 33;
        const WHO_IS = 1 << 34;
        const READ_RANGE = 1 << 35;
        const UTC_TIME_SYNCHRONIZATION = 1 << 36;
        const LIFE_SAFETY_OPERATION = 1 << 37;
        const SUBSCRIBE_COV_PROPERTY = 1 << 38;
        const GET_EVENT_INFORMATION = 1 << 39;
    }
}

impl ProtocolServicesSupported {
    /// The services [`crate::app::ApplicationHandler`] executes
    pub fn served() -> Self {
        Self::READ_PROPERTY
            | Self::READ_PROPERTY_MULTIPLE
            | Self::WRITE_PROPERTY
            | Self::ATOMIC_READ_FILE
            | Self::ATOMIC_WRITE_FILE
            | Self::REINITIALIZE_DEVICE
    }

    /// Bit string form, bit 0 first
    pub fn to_bit_string(self) -> Vec<bool> {
        (0..MAX_SERVICES_SUPPORTED)
            .map(|bit| self.bits() & (1 << bit) != 0)
            .collect()
    }
}

/// Whether `data` starts with the primitive context tag `tag_number`
pub(crate) fn starts_with_context(data: &[u8], tag_number: u8) -> bool {
    matches!(encoding::decode_tag(data), Ok((tag, _)) if tag.is_context(tag_number))
}

/// Whether `data` starts with the opening tag `tag_number`
pub(crate) fn starts_with_opening(data: &[u8], tag_number: u8) -> bool {
    matches!(encoding::decode_tag(data), Ok((tag, _)) if tag.is_opening(tag_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_choice() {
        assert_eq!(
            ConfirmedServiceChoice::try_from(12),
            Ok(ConfirmedServiceChoice::ReadProperty)
        );
        assert_eq!(
            ConfirmedServiceChoice::try_from(13),
            Err(ServiceError::UnsupportedServiceChoice(13))
        );
    }

    #[test]
    fn test_reject_reasons() {
        assert_eq!(
            ServiceError::from(EncodingError::UnexpectedEndOfData).reject_reason(),
            RejectReason::MissingRequiredParameter
        );
        assert_eq!(
            ServiceError::from(EncodingError::InvalidTag).reject_reason(),
            RejectReason::InvalidTag
        );
        assert_eq!(
            ServiceError::UnsupportedServiceChoice(99).reject_reason(),
            RejectReason::UnrecognizedService
        );
        assert_eq!(RejectReason::UnrecognizedService as u8, 9);
    }

    #[test]
    fn test_services_bit_string() {
        let bits = ProtocolServicesSupported::served().to_bit_string();
        assert_eq!(bits.len(), MAX_SERVICES_SUPPORTED);
        let set: Vec<usize> = bits
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.then_some(i))
            .collect();
        assert_eq!(set, vec![6, 7, 12, 14, 15, 20]);
    }
}
