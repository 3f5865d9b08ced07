//! AtomicReadFile and AtomicWriteFile services (ASHRAE 135 clauses 14.1, 14.2)
//!
//! Only stream access is executed by this device; record access requests
//! still decode so the handler can answer them with a proper error.

use crate::encoding::{self, EncodingError};
use crate::object::ObjectIdentifier;

use super::{starts_with_opening, Result, ServiceError};

/// Access method and position of a file read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    Stream { start_position: i32, octet_count: u32 },
    Record { start_record: i32, record_count: u32 },
}

/// Access method, position and data of a file write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileWriteAccess {
    Stream {
        start_position: i32,
        data: Vec<u8>,
    },
    Record {
        start_record: i32,
        records: Vec<Vec<u8>>,
    },
}

fn decode_signed_unsigned(inner: &[u8]) -> Result<(i32, u32)> {
    let (start, used) = encoding::decode_application_signed(inner)?;
    let (count, rest) = encoding::decode_application_unsigned(&inner[used..])?;
    if used + rest != inner.len() {
        return Err(ServiceError::InvalidTag);
    }
    Ok((start, count))
}

/// Atomic Read File request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomicReadFileRequest {
    pub file_identifier: ObjectIdentifier,
    pub access: FileAccess,
}

impl AtomicReadFileRequest {
    pub fn stream(file_identifier: ObjectIdentifier, start_position: i32, octet_count: u32) -> Self {
        Self {
            file_identifier,
            access: FileAccess::Stream {
                start_position,
                octet_count,
            },
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        encoding::encode_application_object_identifier(
            buffer,
            self.file_identifier.object_type,
            self.file_identifier.instance,
        )?;
        let (tag, start, count) = match self.access {
            FileAccess::Stream {
                start_position,
                octet_count,
            } => (0, start_position, octet_count),
            FileAccess::Record {
                start_record,
                record_count,
            } => (1, start_record, record_count),
        };
        encoding::encode_opening_tag(buffer, tag)?;
        encoding::encode_application_signed(buffer, start)?;
        encoding::encode_application_unsigned(buffer, count)?;
        encoding::encode_closing_tag(buffer, tag)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ServiceError::MissingRequiredParameter);
        }
        let (file_identifier, pos) = encoding::decode_application_object_identifier(data)?;
        let rest = &data[pos..];

        let (access, consumed) = if starts_with_opening(rest, 0) {
            let (inner, consumed) = encoding::decode_enclosed(rest, 0)?;
            let (start_position, octet_count) = decode_signed_unsigned(inner)?;
            (
                FileAccess::Stream {
                    start_position,
                    octet_count,
                },
                consumed,
            )
        } else if starts_with_opening(rest, 1) {
            let (inner, consumed) = encoding::decode_enclosed(rest, 1)?;
            let (start_record, record_count) = decode_signed_unsigned(inner)?;
            (
                FileAccess::Record {
                    start_record,
                    record_count,
                },
                consumed,
            )
        } else if rest.is_empty() {
            return Err(ServiceError::MissingRequiredParameter);
        } else {
            return Err(ServiceError::InvalidTag);
        };

        if pos + consumed != data.len() {
            return Err(ServiceError::InvalidTag);
        }
        Ok(Self {
            file_identifier,
            access,
        })
    }
}

/// Atomic Read File acknowledgement (stream access)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicReadFileAck {
    pub end_of_file: bool,
    pub start_position: i32,
    pub data: Vec<u8>,
}

impl AtomicReadFileAck {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        encoding::encode_application_boolean(buffer, self.end_of_file)?;
        encoding::encode_opening_tag(buffer, 0)?;
        encoding::encode_application_signed(buffer, self.start_position)?;
        encoding::encode_application_octet_string(buffer, &self.data)?;
        encoding::encode_closing_tag(buffer, 0)
    }

    pub fn decode(data: &[u8]) -> encoding::Result<Self> {
        let (end_of_file, pos) = encoding::decode_application_boolean(data)?;
        let (inner, _) = encoding::decode_enclosed(&data[pos..], 0)?;
        let (start_position, used) = encoding::decode_application_signed(inner)?;
        let (data, _) = encoding::decode_application_octet_string(&inner[used..])?;
        Ok(Self {
            end_of_file,
            start_position,
            data,
        })
    }
}

/// Atomic Write File request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicWriteFileRequest {
    pub file_identifier: ObjectIdentifier,
    pub access: FileWriteAccess,
}

impl AtomicWriteFileRequest {
    pub fn stream(file_identifier: ObjectIdentifier, start_position: i32, data: Vec<u8>) -> Self {
        Self {
            file_identifier,
            access: FileWriteAccess::Stream {
                start_position,
                data,
            },
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        encoding::encode_application_object_identifier(
            buffer,
            self.file_identifier.object_type,
            self.file_identifier.instance,
        )?;
        match &self.access {
            FileWriteAccess::Stream {
                start_position,
                data,
            } => {
                encoding::encode_opening_tag(buffer, 0)?;
                encoding::encode_application_signed(buffer, *start_position)?;
                encoding::encode_application_octet_string(buffer, data)?;
                encoding::encode_closing_tag(buffer, 0)
            }
            FileWriteAccess::Record {
                start_record,
                records,
            } => {
                let count = u32::try_from(records.len()).map_err(|_| EncodingError::ValueOutOfRange)?;
                encoding::encode_opening_tag(buffer, 1)?;
                encoding::encode_application_signed(buffer, *start_record)?;
                encoding::encode_application_unsigned(buffer, count)?;
                for record in records {
                    encoding::encode_application_octet_string(buffer, record)?;
                }
                encoding::encode_closing_tag(buffer, 1)
            }
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ServiceError::MissingRequiredParameter);
        }
        let (file_identifier, pos) = encoding::decode_application_object_identifier(data)?;
        let rest = &data[pos..];

        let (access, consumed) = if starts_with_opening(rest, 0) {
            let (inner, consumed) = encoding::decode_enclosed(rest, 0)?;
            let (start_position, used) = encoding::decode_application_signed(inner)?;
            let (data, rest_len) = encoding::decode_application_octet_string(&inner[used..])?;
            if used + rest_len != inner.len() {
                return Err(ServiceError::InvalidTag);
            }
            (
                FileWriteAccess::Stream {
                    start_position,
                    data,
                },
                consumed,
            )
        } else if starts_with_opening(rest, 1) {
            let (inner, consumed) = encoding::decode_enclosed(rest, 1)?;
            let (start_record, mut at) = encoding::decode_application_signed(inner)?;
            let (count, used) = encoding::decode_application_unsigned(&inner[at..])?;
            at += used;
            let mut records = Vec::new();
            for _ in 0..count {
                let (record, used) = encoding::decode_application_octet_string(&inner[at..])?;
                at += used;
                records.push(record);
            }
            if at != inner.len() {
                return Err(ServiceError::InvalidTag);
            }
            (
                FileWriteAccess::Record {
                    start_record,
                    records,
                },
                consumed,
            )
        } else if rest.is_empty() {
            return Err(ServiceError::MissingRequiredParameter);
        } else {
            return Err(ServiceError::InvalidTag);
        };

        if pos + consumed != data.len() {
            return Err(ServiceError::InvalidTag);
        }
        Ok(Self {
            file_identifier,
            access,
        })
    }
}

/// Atomic Write File acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomicWriteFileAck {
    /// Position the data was written at
    pub start_position: i32,
}

impl AtomicWriteFileAck {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        encoding::encode_context_signed(buffer, 0, self.start_position)
    }

    pub fn decode(data: &[u8]) -> encoding::Result<Self> {
        let (start_position, _) = encoding::decode_context_signed(data, 0)?;
        Ok(Self { start_position })
    }
}
