//! ReadProperty service (ASHRAE 135 clause 15.5)

use crate::encoding::{self, EncodingError};
use crate::object::{ArrayIndex, ObjectIdentifier, PropertyIdentifier, PropertyReadRequest};

use super::{starts_with_context, Result, ServiceError};

/// Read Property request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
}

impl ReadPropertyRequest {
    pub fn new(object_identifier: ObjectIdentifier, property_identifier: PropertyIdentifier) -> Self {
        Self {
            object_identifier,
            property_identifier,
            property_array_index: None,
        }
    }

    pub fn with_array_index(mut self, array_index: u32) -> Self {
        self.property_array_index = Some(array_index);
        self
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        encoding::encode_context_object_identifier(
            buffer,
            0,
            self.object_identifier.object_type,
            self.object_identifier.instance,
        )?;
        encoding::encode_context_enumerated(buffer, 1, self.property_identifier.into())?;
        if let Some(index) = self.property_array_index {
            encoding::encode_context_unsigned(buffer, 2, index)?;
        }
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ServiceError::MissingRequiredParameter);
        }
        let mut pos = 0;

        let (object_identifier, consumed) = encoding::decode_context_object_identifier(data, 0)?;
        pos += consumed;

        let (property, consumed) = encoding::decode_context_enumerated(&data[pos..], 1)?;
        pos += consumed;

        let property_array_index = if starts_with_context(&data[pos..], 2) {
            let (index, consumed) = encoding::decode_context_unsigned(&data[pos..], 2)?;
            pos += consumed;
            Some(index)
        } else {
            None
        };

        if pos != data.len() {
            return Err(ServiceError::InvalidTag);
        }

        Ok(Self {
            object_identifier,
            property_identifier: property.into(),
            property_array_index,
        })
    }

    /// The dispatch request, with room for `max_value` octets of value
    pub fn to_read_request(&self, max_value: usize) -> PropertyReadRequest {
        PropertyReadRequest::new(self.object_identifier, self.property_identifier)
            .with_array_index(ArrayIndex::from_wire(self.property_array_index))
            .with_max_apdu(max_value)
    }
}

/// Read Property acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPropertyAck {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
    /// Application-tagged value octets
    pub property_value: Vec<u8>,
}

impl ReadPropertyAck {
    /// Encode the acknowledgement around an already encoded value.
    pub fn encode_with_value(
        buffer: &mut Vec<u8>,
        request: &ReadPropertyRequest,
        value: &[u8],
    ) -> encoding::Result<()> {
        ReadPropertyRequest::encode(request, buffer)?;
        encoding::encode_opening_tag(buffer, 3)?;
        buffer.extend_from_slice(value);
        encoding::encode_closing_tag(buffer, 3)
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> encoding::Result<()> {
        let request = ReadPropertyRequest {
            object_identifier: self.object_identifier,
            property_identifier: self.property_identifier,
            property_array_index: self.property_array_index,
        };
        Self::encode_with_value(buffer, &request, &self.property_value)
    }

    pub fn decode(data: &[u8]) -> encoding::Result<Self> {
        let mut pos = 0;
        let (object_identifier, consumed) = encoding::decode_context_object_identifier(data, 0)?;
        pos += consumed;

        let (property, consumed) = encoding::decode_context_enumerated(&data[pos..], 1)?;
        pos += consumed;

        let property_array_index = if starts_with_context(&data[pos..], 2) {
            let (index, consumed) = encoding::decode_context_unsigned(&data[pos..], 2)?;
            pos += consumed;
            Some(index)
        } else {
            None
        };

        let (value, consumed) = encoding::decode_enclosed(&data[pos..], 3)?;
        if pos + consumed != data.len() {
            return Err(EncodingError::InvalidFormat("trailing octets after value".into()));
        }

        Ok(Self {
            object_identifier,
            property_identifier: property.into(),
            property_array_index,
            property_value: value.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;

    #[test]
    fn test_request_decode() {
        // device,1234 object-name
        let data = [0x0C, 0x02, 0x00, 0x04, 0xD2, 0x19, 0x4D];
        let request = ReadPropertyRequest::decode(&data).unwrap();
        assert_eq!(
            request.object_identifier,
            ObjectIdentifier::new(ObjectType::Device, 1234)
        );
        assert_eq!(request.property_identifier, PropertyIdentifier::ObjectName);
        assert_eq!(request.property_array_index, None);

        let mut encoded = Vec::new();
        request.encode(&mut encoded).unwrap();
        assert_eq!(encoded, data);
    }

    #[test]
    fn test_request_with_index() {
        let request = ReadPropertyRequest::new(
            ObjectIdentifier::new(ObjectType::Device, 7),
            PropertyIdentifier::ObjectList,
        )
        .with_array_index(0);
        let mut encoded = Vec::new();
        request.encode(&mut encoded).unwrap();
        assert_eq!(encoded[encoded.len() - 2..], [0x29, 0x00]);

        let decoded = ReadPropertyRequest::decode(&encoded).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(
            decoded.to_read_request(100).array_index,
            ArrayIndex::Element(0)
        );
    }

    #[test]
    fn test_request_errors() {
        assert_eq!(
            ReadPropertyRequest::decode(&[]),
            Err(ServiceError::MissingRequiredParameter)
        );
        // object identifier only
        let data = [0x0C, 0x02, 0x00, 0x04, 0xD2];
        assert_eq!(
            ReadPropertyRequest::decode(&data).unwrap_err().reject_reason(),
            super::super::RejectReason::MissingRequiredParameter
        );
        // application tag where context 0 belongs
        let data = [0xC4, 0x02, 0x00, 0x04, 0xD2, 0x19, 0x4D];
        assert_eq!(
            ReadPropertyRequest::decode(&data).unwrap_err().reject_reason(),
            super::super::RejectReason::InvalidTag
        );
    }

    #[test]
    fn test_ack() {
        let request = ReadPropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogInput, 0),
            PropertyIdentifier::PresentValue,
        );
        let mut buffer = Vec::new();
        ReadPropertyAck::encode_with_value(&mut buffer, &request, &[0x44, 0x41, 0xA0, 0x00, 0x00])
            .unwrap();
        assert_eq!(buffer[buffer.len() - 7], 0x3E);
        assert_eq!(buffer[buffer.len() - 1], 0x3F);

        let ack = ReadPropertyAck::decode(&buffer).unwrap();
        assert_eq!(ack.property_identifier, PropertyIdentifier::PresentValue);
        assert_eq!(ack.property_value, [0x44, 0x41, 0xA0, 0x00, 0x00]);
    }
}
