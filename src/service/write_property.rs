//! WriteProperty service (ASHRAE 135 clause 15.9)

use crate::encoding;
use crate::object::{ArrayIndex, ObjectIdentifier, PropertyIdentifier, PropertyWriteRequest};

use super::{starts_with_context, Result, ServiceError};

/// Lowest and highest command priority
pub const PRIORITY_RANGE: core::ops::RangeInclusive<u8> = 1..=16;

/// Write Property request; the value is borrowed from the APDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePropertyRequest<'a> {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
    /// Application-tagged value octets
    pub property_value: &'a [u8],
    pub priority: Option<u8>,
}

impl<'a> WritePropertyRequest<'a> {
    pub fn new(
        object_identifier: ObjectIdentifier,
        property_identifier: PropertyIdentifier,
        property_value: &'a [u8],
    ) -> Self {
        Self {
            object_identifier,
            property_identifier,
            property_array_index: None,
            property_value,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
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
        encoding::encode_opening_tag(buffer, 3)?;
        buffer.extend_from_slice(self.property_value);
        encoding::encode_closing_tag(buffer, 3)?;
        if let Some(priority) = self.priority {
            encoding::encode_context_unsigned(buffer, 4, priority as u32)?;
        }
        Ok(())
    }

    pub fn decode(data: &'a [u8]) -> Result<Self> {
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

        let (property_value, consumed) = encoding::decode_enclosed(&data[pos..], 3)?;
        pos += consumed;

        let priority = if starts_with_context(&data[pos..], 4) {
            let (priority, consumed) = encoding::decode_context_unsigned(&data[pos..], 4)?;
            pos += consumed;
            let priority = u8::try_from(priority)
                .ok()
                .filter(|p| PRIORITY_RANGE.contains(p))
                .ok_or(ServiceError::ParameterOutOfRange)?;
            Some(priority)
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
            property_value,
            priority,
        })
    }

    /// The dispatch request
    pub fn to_write_request(&self) -> PropertyWriteRequest<'a> {
        PropertyWriteRequest {
            object_type: self.object_identifier.object_type,
            object_instance: self.object_identifier.instance,
            property: self.property_identifier,
            array_index: ArrayIndex::from_wire(self.property_array_index),
            value: self.property_value,
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;
    use crate::service::RejectReason;

    fn object_name_write() -> Vec<u8> {
        let mut value = Vec::new();
        encoding::encode_application_character_string(&mut value, "AHU-1").unwrap();
        let mut buffer = Vec::new();
        WritePropertyRequest::new(
            ObjectIdentifier::new(ObjectType::Device, 1234),
            PropertyIdentifier::ObjectName,
            &value,
        )
        .encode(&mut buffer)
        .unwrap();
        buffer
    }

    #[test]
    fn test_decode() {
        let data = object_name_write();
        let request = WritePropertyRequest::decode(&data).unwrap();
        assert_eq!(request.property_identifier, PropertyIdentifier::ObjectName);
        assert_eq!(request.property_value[0], 0x75);
        assert_eq!(request.priority, None);

        let write = request.to_write_request();
        assert_eq!(write.object_instance, 1234);
        assert_eq!(write.array_index, ArrayIndex::None);
    }

    #[test]
    fn test_priority() {
        let value = [0x44, 0x42, 0x28, 0x00, 0x00];
        let object = ObjectIdentifier::new(ObjectType::AnalogValue, 1);
        let mut buffer = Vec::new();
        WritePropertyRequest::new(object, PropertyIdentifier::PresentValue, &value)
            .with_priority(8)
            .encode(&mut buffer)
            .unwrap();
        assert_eq!(WritePropertyRequest::decode(&buffer).unwrap().priority, Some(8));

        let mut buffer = Vec::new();
        WritePropertyRequest::new(object, PropertyIdentifier::PresentValue, &value)
            .with_priority(17)
            .encode(&mut buffer)
            .unwrap();
        assert_eq!(
            WritePropertyRequest::decode(&buffer).unwrap_err().reject_reason(),
            RejectReason::ParameterOutOfRange
        );
    }

    #[test]
    fn test_missing_value() {
        let data = object_name_write();
        // cut off before the closing tag
        let truncated = &data[..data.len() - 1];
        assert_eq!(
            WritePropertyRequest::decode(truncated).unwrap_err().reject_reason(),
            RejectReason::MissingRequiredParameter
        );
    }
}
