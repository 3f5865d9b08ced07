//! BACnet Application Layer Module
//!
//! Serves confirmed requests against the object registry. A received frame
//! passes through the network layer, the APDU header is decoded, the service
//! request is handed to the matching codec and then to the dispatch engine,
//! and the outcome is encoded as a reply APDU wrapped in a reply NPDU.
//!
//! # APDU Types
//!
//! Only Confirmed-Request PDUs are answered. The replies produced are:
//!
//! - SimpleACK for WriteProperty and ReinitializeDevice
//! - ComplexACK for ReadProperty, ReadPropertyMultiple, AtomicReadFile and
//!   AtomicWriteFile
//! - Error when a request decodes but fails
//! - Reject when a request does not decode or names an unknown service
//! - Abort when a request or its reply would need segmentation
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bacnet_device::app::ApplicationHandler;
//! use bacnet_device::object::device::{DeviceConfig, DeviceObject};
//! use bacnet_device::object::{ObjectRegistry, PropertyDispatcher};
//! use bacnet_device::storage::MemoryKeyValueStore;
//!
//! let device = Arc::new(DeviceObject::new(
//!     DeviceConfig::default(),
//!     Arc::new(MemoryKeyValueStore::new()),
//! ));
//! let registry = ObjectRegistry::builder()
//!     .with_device(device.clone())
//!     .build()
//!     .unwrap();
//! registry.init_all().unwrap();
//! let handler = ApplicationHandler::new(PropertyDispatcher::new(Arc::new(registry)), device);
//!
//! // ReadProperty device,4194303 protocol-version
//! let request = [0x00, 0x05, 0x01, 0x0C, 0x0C, 0x02, 0x3F, 0xFF, 0xFF, 0x19, 0x62];
//! let reply = handler.handle_apdu(&request).unwrap().unwrap();
//! assert_eq!(reply[0], 0x30);
//! ```

use std::sync::Arc;

use log::{debug, error, trace, warn};
use thiserror::Error;

use crate::encoding::{self, EncodingError};
use crate::network::{self, NetworkError, NpduDisposition, NpduHeader, MAX_NPDU_HEADER_LEN};
use crate::object::device::DeviceObject;
use crate::object::file::FileObjects;
use crate::object::{ObjectType, PropertyDispatcher, PropertyError};
use crate::service::{
    AbortReason, AtomicReadFileAck, AtomicReadFileRequest, AtomicWriteFileAck,
    AtomicWriteFileRequest, ConfirmedServiceChoice, FileAccess, FileWriteAccess, ReadAccessSpecification,
    ReadPropertyAck, ReadPropertyMultipleAck, ReadPropertyRequest, ReinitializeDeviceRequest,
    RejectReason, ServiceError, WritePropertyRequest,
};
use crate::util::{hex_dump, Reader};

/// Result type for application layer operations
pub type Result<T> = core::result::Result<T, ApplicationError>;

/// Errors that can occur in application layer operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplicationError {
    #[error("network layer: {0}")]
    Network(#[from] NetworkError),
    #[error("invalid APDU: {0}")]
    InvalidApdu(&'static str),
    #[error("reply encoding failed: {0}")]
    Encoding(#[from] EncodingError),
}

/// APDU types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApduType {
    ConfirmedRequest = 0,
    UnconfirmedRequest = 1,
    SimpleAck = 2,
    ComplexAck = 3,
    SegmentAck = 4,
    Error = 5,
    Reject = 6,
    Abort = 7,
}

impl TryFrom<u8> for ApduType {
    type Error = ApplicationError;

    /// Decode from the high nibble of the first APDU octet.
    fn try_from(byte: u8) -> Result<Self> {
        match byte >> 4 {
            0 => Ok(ApduType::ConfirmedRequest),
            1 => Ok(ApduType::UnconfirmedRequest),
            2 => Ok(ApduType::SimpleAck),
            3 => Ok(ApduType::ComplexAck),
            4 => Ok(ApduType::SegmentAck),
            5 => Ok(ApduType::Error),
            6 => Ok(ApduType::Reject),
            7 => Ok(ApduType::Abort),
            _ => Err(ApplicationError::InvalidApdu("unknown PDU type")),
        }
    }
}

/// First octet of a PDU of type `apdu_type`, flags clear
const fn pdu_type(apdu_type: ApduType) -> u8 {
    (apdu_type as u8) << 4
}

/// Largest APDU a peer accepts, from the low nibble of octet 1
pub fn max_apdu_from_bits(bits: u8) -> usize {
    match bits & 0x0F {
        0 => 50,
        1 => 128,
        2 => 206,
        3 => 480,
        4 => 1024,
        _ => 1476,
    }
}

/// Fixed part of a Confirmed-Request PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedRequestHeader {
    pub segmented: bool,
    pub more_follows: bool,
    pub segmented_response_accepted: bool,
    /// Largest reply APDU the requester accepts
    pub max_apdu: usize,
    pub invoke_id: u8,
    pub sequence_number: Option<u8>,
    pub proposed_window_size: Option<u8>,
    pub service_choice: u8,
}

impl ConfirmedRequestHeader {
    /// Decode the header, returning it and the offset of the service request.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut reader = Reader::new(data);
        let truncated = ApplicationError::InvalidApdu("truncated confirmed request");

        let flags = reader.read_u8().ok_or(truncated.clone())?;
        if flags >> 4 != ApduType::ConfirmedRequest as u8 {
            return Err(ApplicationError::InvalidApdu("not a confirmed request"));
        }
        let segmented = flags & 0x08 != 0;
        let max = reader.read_u8().ok_or(truncated.clone())?;
        let invoke_id = reader.read_u8().ok_or(truncated.clone())?;
        let (sequence_number, proposed_window_size) = if segmented {
            (
                Some(reader.read_u8().ok_or(truncated.clone())?),
                Some(reader.read_u8().ok_or(truncated.clone())?),
            )
        } else {
            (None, None)
        };
        let service_choice = reader.read_u8().ok_or(truncated)?;

        let header = Self {
            segmented,
            more_follows: flags & 0x04 != 0,
            segmented_response_accepted: flags & 0x02 != 0,
            max_apdu: max_apdu_from_bits(max),
            invoke_id,
            sequence_number,
            proposed_window_size,
            service_choice,
        };
        Ok((header, reader.position()))
    }
}

/// A reply APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    SimpleAck {
        invoke_id: u8,
        service_choice: u8,
    },
    ComplexAck {
        invoke_id: u8,
        service_choice: u8,
        service_data: Vec<u8>,
    },
    Error {
        invoke_id: u8,
        service_choice: u8,
        error: PropertyError,
    },
    Reject {
        invoke_id: u8,
        reason: RejectReason,
    },
    Abort {
        invoke_id: u8,
        reason: AbortReason,
    },
}

impl Reply {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<()> {
        match self {
            Reply::SimpleAck {
                invoke_id,
                service_choice,
            } => {
                buffer.extend_from_slice(&[pdu_type(ApduType::SimpleAck), *invoke_id, *service_choice]);
            }
            Reply::ComplexAck {
                invoke_id,
                service_choice,
                service_data,
            } => {
                buffer.extend_from_slice(&[pdu_type(ApduType::ComplexAck), *invoke_id, *service_choice]);
                buffer.extend_from_slice(service_data);
            }
            Reply::Error {
                invoke_id,
                service_choice,
                error,
            } => {
                buffer.extend_from_slice(&[pdu_type(ApduType::Error), *invoke_id, *service_choice]);
                encoding::encode_application_enumerated(buffer, u16::from(error.class) as u32)?;
                encoding::encode_application_enumerated(buffer, u16::from(error.code) as u32)?;
            }
            Reply::Reject { invoke_id, reason } => {
                buffer.extend_from_slice(&[pdu_type(ApduType::Reject), *invoke_id, *reason as u8]);
            }
            Reply::Abort { invoke_id, reason } => {
                // server flag set: the abort comes from the responding device
                buffer.extend_from_slice(&[pdu_type(ApduType::Abort) | 0x01, *invoke_id, *reason as u8]);
            }
        }
        Ok(())
    }

    pub fn invoke_id(&self) -> u8 {
        match self {
            Reply::SimpleAck { invoke_id, .. }
            | Reply::ComplexAck { invoke_id, .. }
            | Reply::Error { invoke_id, .. }
            | Reply::Reject { invoke_id, .. }
            | Reply::Abort { invoke_id, .. } => *invoke_id,
        }
    }
}

/// Octets of a ComplexACK header
const COMPLEX_ACK_HEADER_LEN: usize = 3;

/// Largest AtomicReadFile-ACK overhead besides the file data: header,
/// end-of-file, opening tag, start position, octet string tag, closing tag
const READ_FILE_ACK_OVERHEAD: usize = COMPLEX_ACK_HEADER_LEN + 1 + 1 + 5 + 5 + 1;

/// Serves confirmed requests for one device.
pub struct ApplicationHandler {
    dispatcher: PropertyDispatcher,
    device: Arc<DeviceObject>,
    files: Option<Arc<FileObjects>>,
    max_apdu: usize,
}

impl ApplicationHandler {
    pub fn new(dispatcher: PropertyDispatcher, device: Arc<DeviceObject>) -> Self {
        let max_apdu = device.config().max_apdu as usize;
        Self {
            dispatcher,
            device,
            files: None,
            max_apdu,
        }
    }

    /// Serve AtomicReadFile and AtomicWriteFile from `files`.
    pub fn with_files(mut self, files: Arc<FileObjects>) -> Self {
        self.files = Some(files);
        self
    }

    pub fn dispatcher(&self) -> &PropertyDispatcher {
        &self.dispatcher
    }

    /// Process a received frame.
    ///
    /// Returns the reply frame, addressed to the requester, or `None` when
    /// the frame needs no reply.
    pub fn handle_frame(&self, frame: &[u8]) -> Result<Option<Vec<u8>>> {
        let (decoded, disposition) = network::receive(frame)?;
        let NpduDisposition::Application { offset } = disposition else {
            return Ok(None);
        };
        let Some(apdu) = self.handle_apdu(&frame[offset..])? else {
            return Ok(None);
        };

        let header = NpduHeader::for_apdu(false, decoded.header.control.priority);
        let mut reply = Vec::with_capacity(MAX_NPDU_HEADER_LEN + apdu.len());
        network::encode(&mut reply, Some(&decoded.source), None, &header)?;
        reply.extend_from_slice(&apdu);
        trace!("tx npdu [{}]", hex_dump(&reply));
        Ok(Some(reply))
    }

    /// Process one APDU, returning the reply APDU if there is one.
    pub fn handle_apdu(&self, apdu: &[u8]) -> Result<Option<Vec<u8>>> {
        let first = *apdu.first().ok_or(ApplicationError::InvalidApdu("empty APDU"))?;
        match ApduType::try_from(first)? {
            ApduType::ConfirmedRequest => {
                let reply = self.handle_confirmed(apdu)?;
                let mut buffer = Vec::new();
                reply.encode(&mut buffer)?;
                Ok(Some(buffer))
            }
            other => {
                debug!("ignoring {other:?} PDU");
                Ok(None)
            }
        }
    }

    fn handle_confirmed(&self, apdu: &[u8]) -> Result<Reply> {
        let (header, offset) = ConfirmedRequestHeader::decode(apdu)?;
        let invoke_id = header.invoke_id;
        if header.segmented {
            warn!("segmented request {invoke_id} refused");
            return Ok(Reply::Abort {
                invoke_id,
                reason: AbortReason::SegmentationNotSupported,
            });
        }

        let service = match ConfirmedServiceChoice::try_from(header.service_choice) {
            Ok(service) => service,
            Err(e) => return Ok(reject(invoke_id, &e)),
        };
        let data = &apdu[offset..];
        let max_reply = header.max_apdu.min(self.max_apdu);
        debug!("confirmed request {invoke_id}: {service:?}, {} octets", data.len());

        let reply = match service {
            ConfirmedServiceChoice::ReadProperty => self.read_property(invoke_id, data, max_reply),
            ConfirmedServiceChoice::WriteProperty => self.write_property(invoke_id, data),
            ConfirmedServiceChoice::ReadPropertyMultiple => {
                self.read_property_multiple(invoke_id, data, max_reply)
            }
            ConfirmedServiceChoice::AtomicReadFile => self.atomic_read_file(invoke_id, data, max_reply),
            ConfirmedServiceChoice::AtomicWriteFile => self.atomic_write_file(invoke_id, data),
            ConfirmedServiceChoice::ReinitializeDevice => self.reinitialize_device(invoke_id, data),
            other => {
                debug!("service {other:?} not executed");
                return Ok(Reply::Reject {
                    invoke_id,
                    reason: RejectReason::UnrecognizedService,
                });
            }
        };

        Ok(reply.unwrap_or_else(|e| {
            error!("request {invoke_id} ({service:?}) failed: {e}");
            Reply::Abort {
                invoke_id,
                reason: AbortReason::Other,
            }
        }))
    }

    fn read_property(&self, invoke_id: u8, data: &[u8], max_reply: usize) -> Result<Reply> {
        let service_choice = ConfirmedServiceChoice::ReadProperty as u8;
        let request = match ReadPropertyRequest::decode(data) {
            Ok(request) => request,
            Err(e) => return Ok(reject(invoke_id, &e)),
        };

        let mut head = Vec::new();
        request.encode(&mut head)?;
        // opening and closing tag [3]
        let overhead = COMPLEX_ACK_HEADER_LEN + head.len() + 2;
        let mut value = Vec::new();
        let read = request.to_read_request(max_reply.saturating_sub(overhead));
        if let Err(e) = self.dispatcher.read(&read, &mut value) {
            return Ok(error_reply(invoke_id, service_choice, e.to_property_error()));
        }

        let mut service_data = Vec::with_capacity(overhead + value.len());
        ReadPropertyAck::encode_with_value(&mut service_data, &request, &value)?;
        Ok(complex_ack(invoke_id, service_choice, service_data, max_reply))
    }

    fn write_property(&self, invoke_id: u8, data: &[u8]) -> Result<Reply> {
        let service_choice = ConfirmedServiceChoice::WriteProperty as u8;
        let request = match WritePropertyRequest::decode(data) {
            Ok(request) => request,
            Err(e) => return Ok(reject(invoke_id, &e)),
        };
        Ok(match self.dispatcher.write(&request.to_write_request()) {
            Ok(()) => Reply::SimpleAck {
                invoke_id,
                service_choice,
            },
            Err(e) => error_reply(invoke_id, service_choice, e.to_property_error()),
        })
    }

    fn read_property_multiple(&self, invoke_id: u8, data: &[u8], max_reply: usize) -> Result<Reply> {
        let service_choice = ConfirmedServiceChoice::ReadPropertyMultiple as u8;
        let specifications = match ReadAccessSpecification::decode_list(data) {
            Ok(specifications) => specifications,
            Err(e) => return Ok(reject(invoke_id, &e)),
        };

        let mut service_data = Vec::new();
        for specification in &specifications {
            let result = self
                .dispatcher
                .read_multiple(specification.object_identifier, &specification.property_references);
            ReadPropertyMultipleAck::encode_result(&mut service_data, &result)?;
            if COMPLEX_ACK_HEADER_LEN + service_data.len() > max_reply {
                break;
            }
        }
        Ok(complex_ack(invoke_id, service_choice, service_data, max_reply))
    }

    fn atomic_read_file(&self, invoke_id: u8, data: &[u8], max_reply: usize) -> Result<Reply> {
        let service_choice = ConfirmedServiceChoice::AtomicReadFile as u8;
        let request = match AtomicReadFileRequest::decode(data) {
            Ok(request) => request,
            Err(e) => return Ok(reject(invoke_id, &e)),
        };
        let files = match self.file_objects(request.file_identifier.object_type) {
            Ok(files) => files,
            Err(e) => return Ok(error_reply(invoke_id, service_choice, e)),
        };
        let FileAccess::Stream {
            start_position,
            octet_count,
        } = request.access
        else {
            return Ok(error_reply(
                invoke_id,
                service_choice,
                PropertyError::INVALID_FILE_ACCESS_METHOD,
            ));
        };

        let room = max_reply.saturating_sub(READ_FILE_ACK_OVERHEAD) as u32;
        let count = octet_count.min(room);
        match files.atomic_read(request.file_identifier.instance, start_position, count) {
            Ok(read) => {
                let ack = AtomicReadFileAck {
                    end_of_file: read.end_of_file,
                    start_position,
                    data: read.data,
                };
                let mut service_data = Vec::new();
                ack.encode(&mut service_data)?;
                Ok(complex_ack(invoke_id, service_choice, service_data, max_reply))
            }
            Err(e) => {
                warn!("atomic read of {}: {e}", request.file_identifier);
                Ok(error_reply(invoke_id, service_choice, e.to_property_error()))
            }
        }
    }

    fn atomic_write_file(&self, invoke_id: u8, data: &[u8]) -> Result<Reply> {
        let service_choice = ConfirmedServiceChoice::AtomicWriteFile as u8;
        let request = match AtomicWriteFileRequest::decode(data) {
            Ok(request) => request,
            Err(e) => return Ok(reject(invoke_id, &e)),
        };
        let files = match self.file_objects(request.file_identifier.object_type) {
            Ok(files) => files,
            Err(e) => return Ok(error_reply(invoke_id, service_choice, e)),
        };
        let FileWriteAccess::Stream {
            start_position,
            data,
        } = &request.access
        else {
            return Ok(error_reply(
                invoke_id,
                service_choice,
                PropertyError::INVALID_FILE_ACCESS_METHOD,
            ));
        };

        match files.atomic_write_stream(request.file_identifier.instance, *start_position, data) {
            Ok(position) => {
                let ack = AtomicWriteFileAck {
                    start_position: position as i32,
                };
                let mut service_data = Vec::new();
                ack.encode(&mut service_data)?;
                Ok(Reply::ComplexAck {
                    invoke_id,
                    service_choice,
                    service_data,
                })
            }
            Err(e) => {
                warn!("atomic write of {}: {e}", request.file_identifier);
                Ok(error_reply(invoke_id, service_choice, e.to_property_error()))
            }
        }
    }

    fn reinitialize_device(&self, invoke_id: u8, data: &[u8]) -> Result<Reply> {
        let service_choice = ConfirmedServiceChoice::ReinitializeDevice as u8;
        let request = match ReinitializeDeviceRequest::decode(data) {
            Ok(request) => request,
            Err(e) => return Ok(reject(invoke_id, &e)),
        };
        Ok(
            match self
                .device
                .reinitialize(request.state, request.password.as_deref())
            {
                Ok(()) => Reply::SimpleAck {
                    invoke_id,
                    service_choice,
                },
                Err(e) => error_reply(invoke_id, service_choice, e.to_property_error()),
            },
        )
    }

    fn file_objects(&self, object_type: ObjectType) -> core::result::Result<&FileObjects, PropertyError> {
        if object_type != ObjectType::File {
            return Err(PropertyError::UNSUPPORTED_OBJECT_TYPE);
        }
        self.files
            .as_deref()
            .ok_or(PropertyError::UNSUPPORTED_OBJECT_TYPE)
    }
}

fn reject(invoke_id: u8, error: &ServiceError) -> Reply {
    let reason = error.reject_reason();
    warn!("rejecting request {invoke_id}: {error}");
    Reply::Reject { invoke_id, reason }
}

fn error_reply(invoke_id: u8, service_choice: u8, error: PropertyError) -> Reply {
    debug!("request {invoke_id} failed: {error}");
    Reply::Error {
        invoke_id,
        service_choice,
        error,
    }
}

/// ComplexACK, or an abort when it does not fit the requester's limit
fn complex_ack(invoke_id: u8, service_choice: u8, service_data: Vec<u8>, max_reply: usize) -> Reply {
    if COMPLEX_ACK_HEADER_LEN + service_data.len() > max_reply {
        warn!(
            "reply to {invoke_id} needs {} octets, limit is {max_reply}",
            COMPLEX_ACK_HEADER_LEN + service_data.len()
        );
        return Reply::Abort {
            invoke_id,
            reason: AbortReason::SegmentationNotSupported,
        };
    }
    Reply::ComplexAck {
        invoke_id,
        service_choice,
        service_data,
    }
}
