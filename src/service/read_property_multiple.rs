//! ReadPropertyMultiple service (ASHRAE 135 clause 15.7)

use crate::encoding::{self, EncodingError};
use crate::object::dispatch::PropertyReference;
use crate::object::{
    ArrayIndex, ErrorClass, ErrorCode, ObjectIdentifier, PropertyError, PropertyResult,
    ReadAccessResult,
};

use super::{starts_with_context, starts_with_opening, Result, ServiceError};

/// One object and the properties to read from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAccessSpecification {
    pub object_identifier: ObjectIdentifier,
    pub property_references: Vec<PropertyReference>,
}

impl ReadAccessSpecification {
    pub fn new(object_identifier: ObjectIdentifier, property_references: Vec<PropertyReference>) -> Self {
        Self {
            object_identifier,
            property_references,
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        encoding::encode_context_object_identifier(
            buffer,
            0,
            self.object_identifier.object_type,
            self.object_identifier.instance,
        )?;
        encoding::encode_opening_tag(buffer, 1)?;
        for reference in &self.property_references {
            encoding::encode_context_enumerated(buffer, 0, reference.property.into())?;
            if let Some(index) = reference.array_index.to_wire() {
                encoding::encode_context_unsigned(buffer, 1, index)?;
            }
        }
        encoding::encode_closing_tag(buffer, 1)
    }

    /// Decode one specification, returning it and the octets consumed
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (object_identifier, mut pos) = encoding::decode_context_object_identifier(data, 0)?;

        let (list, consumed) = encoding::decode_enclosed(&data[pos..], 1)?;
        pos += consumed;

        let mut property_references = Vec::new();
        let mut at = 0;
        while at < list.len() {
            let (property, consumed) = encoding::decode_context_enumerated(&list[at..], 0)?;
            at += consumed;
            let index = if starts_with_context(&list[at..], 1) {
                let (index, consumed) = encoding::decode_context_unsigned(&list[at..], 1)?;
                at += consumed;
                Some(index)
            } else {
                None
            };
            property_references.push(PropertyReference {
                property: property.into(),
                array_index: ArrayIndex::from_wire(index),
            });
        }
        if property_references.is_empty() {
            return Err(ServiceError::MissingRequiredParameter);
        }

        Ok((
            Self {
                object_identifier,
                property_references,
            },
            pos,
        ))
    }

    /// Decode the whole request: one or more specifications
    pub fn decode_list(data: &[u8]) -> Result<Vec<Self>> {
        if data.is_empty() {
            return Err(ServiceError::MissingRequiredParameter);
        }
        let mut specifications = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let (specification, consumed) = Self::decode(&data[pos..])?;
            specifications.push(specification);
            pos += consumed;
        }
        Ok(specifications)
    }
}

/// Read Property Multiple acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPropertyMultipleAck {
    pub results: Vec<ReadAccessResult>,
}

impl ReadPropertyMultipleAck {
    /// Append one object's results.
    pub fn encode_result(buffer: &mut Vec<u8>, result: &ReadAccessResult) -> encoding::Result<()> {
        encoding::encode_context_object_identifier(
            buffer,
            0,
            result.object.object_type,
            result.object.instance,
        )?;
        encoding::encode_opening_tag(buffer, 1)?;
        for property in &result.results {
            encoding::encode_context_enumerated(buffer, 2, property.property.into())?;
            if let Some(index) = property.array_index.to_wire() {
                encoding::encode_context_unsigned(buffer, 3, index)?;
            }
            match &property.value {
                Ok(value) => {
                    encoding::encode_opening_tag(buffer, 4)?;
                    buffer.extend_from_slice(value);
                    encoding::encode_closing_tag(buffer, 4)?;
                }
                Err(error) => {
                    encoding::encode_opening_tag(buffer, 5)?;
                    encoding::encode_application_enumerated(buffer, u16::from(error.class) as u32)?;
                    encoding::encode_application_enumerated(buffer, u16::from(error.code) as u32)?;
                    encoding::encode_closing_tag(buffer, 5)?;
                }
            }
        }
        encoding::encode_closing_tag(buffer, 1)
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        for result in &self.results {
            Self::encode_result(buffer, result)?;
        }
        Ok(())
    }

    pub fn decode(data: &[u8]) -> encoding::Result<Self> {
        let mut results = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let (object, consumed) = encoding::decode_context_object_identifier(&data[pos..], 0)?;
            pos += consumed;
            let (list, consumed) = encoding::decode_enclosed(&data[pos..], 1)?;
            pos += consumed;

            let mut properties = Vec::new();
            let mut at = 0;
            while at < list.len() {
                let (property, consumed) = encoding::decode_context_enumerated(&list[at..], 2)?;
                at += consumed;
                let index = if starts_with_context(&list[at..], 3) {
                    let (index, consumed) = encoding::decode_context_unsigned(&list[at..], 3)?;
                    at += consumed;
                    Some(index)
                } else {
                    None
                };
                let value = if starts_with_opening(&list[at..], 4) {
                    let (value, consumed) = encoding::decode_enclosed(&list[at..], 4)?;
                    at += consumed;
                    Ok(value.to_vec())
                } else {
                    let (error, consumed) = encoding::decode_enclosed(&list[at..], 5)?;
                    at += consumed;
                    let (class, used) = encoding::decode_application_enumerated(error)?;
                    let (code, _) = encoding::decode_application_enumerated(&error[used..])?;
                    let class = u16::try_from(class).map_err(|_| EncodingError::ValueOutOfRange)?;
                    let code = u16::try_from(code).map_err(|_| EncodingError::ValueOutOfRange)?;
                    Err(PropertyError::new(ErrorClass::from(class), ErrorCode::from(code)))
                };
                properties.push(PropertyResult {
                    property: property.into(),
                    array_index: ArrayIndex::from_wire(index),
                    value,
                });
            }
            results.push(ReadAccessResult {
                object,
                results: properties,
            });
        }
        Ok(Self { results })
    }
}
