//! Binary Object Types Implementation
//!
//! Binary Input and Binary Output points, instances numbered `0..count`.
//! Outputs take a present-value write of `inactive` (0) or `active` (1);
//! the command priority of the request is accepted but not arbitrated.

use std::sync::RwLock;

use log::debug;

use super::registry::{ObjectFunctions, ObjectRegistry, PropertyLists};
use super::{
    EventState, ObjectType, PropertyError, PropertyIdentifier, PropertyReadRequest, PropertyValue,
    PropertyWriteRequest, Result, StatusFlags,
};
use crate::encoding;

/// BACnetBinaryPV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum BinaryPv {
    #[default]
    Inactive = 0,
    Active = 1,
}

impl TryFrom<u32> for BinaryPv {
    type Error = PropertyError;

    fn try_from(value: u32) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(BinaryPv::Inactive),
            1 => Ok(BinaryPv::Active),
            _ => Err(PropertyError::VALUE_OUT_OF_RANGE),
        }
    }
}

impl From<bool> for BinaryPv {
    fn from(active: bool) -> Self {
        if active {
            BinaryPv::Active
        } else {
            BinaryPv::Inactive
        }
    }
}

/// BACnetPolarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum Polarity {
    #[default]
    Normal = 0,
    Reverse = 1,
}

#[derive(Debug, Clone, Copy, Default)]
struct BinaryPoint {
    present_value: BinaryPv,
    out_of_service: bool,
    polarity: Polarity,
}

static BINARY_REQUIRED: [PropertyIdentifier; 8] = [
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::Polarity,
];

/// Binary Input or Binary Output objects
#[derive(Debug)]
pub struct BinaryObjects {
    object_type: ObjectType,
    points: RwLock<Vec<BinaryPoint>>,
}

impl BinaryObjects {
    fn with_type(object_type: ObjectType, count: u32) -> Self {
        Self {
            object_type,
            points: RwLock::new(vec![BinaryPoint::default(); count as usize]),
        }
    }

    /// `count` Binary Input objects
    pub fn inputs(count: u32) -> Self {
        Self::with_type(ObjectType::BinaryInput, count)
    }

    /// `count` Binary Output objects
    pub fn outputs(count: u32) -> Self {
        Self::with_type(ObjectType::BinaryOutput, count)
    }

    fn point(&self, instance: u32) -> Result<BinaryPoint> {
        let points = self.points.read()?;
        points
            .get(instance as usize)
            .copied()
            .ok_or_else(|| PropertyError::UNKNOWN_OBJECT.into())
    }

    fn update(&self, instance: u32, f: impl FnOnce(&mut BinaryPoint)) -> Result<()> {
        let mut points = self.points.write()?;
        let point = points
            .get_mut(instance as usize)
            .ok_or(PropertyError::UNKNOWN_OBJECT)?;
        f(point);
        Ok(())
    }

    pub fn present_value(&self, instance: u32) -> Result<BinaryPv> {
        Ok(self.point(instance)?.present_value)
    }

    pub fn set_present_value(&self, instance: u32, value: BinaryPv) -> Result<()> {
        self.update(instance, |p| p.present_value = value)
    }

    pub fn set_polarity(&self, instance: u32, polarity: Polarity) -> Result<()> {
        self.update(instance, |p| p.polarity = polarity)
    }

    fn writable(&self) -> bool {
        self.object_type == ObjectType::BinaryOutput
    }
}

impl ObjectFunctions for BinaryObjects {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn count(&self) -> usize {
        self.points.read().map(|p| p.len()).unwrap_or(0)
    }

    fn index_to_instance(&self, index: usize) -> Option<u32> {
        (index < self.count()).then_some(index as u32)
    }

    fn valid_instance(&self, instance: u32) -> bool {
        (instance as usize) < self.count()
    }

    fn object_name(&self, instance: u32) -> Option<String> {
        let prefix = match self.object_type {
            ObjectType::BinaryInput => "BI",
            _ => "BO",
        };
        self.valid_instance(instance)
            .then(|| format!("{prefix}-{instance}"))
    }

    fn supports_read(&self) -> bool {
        true
    }

    fn read_property(
        &self,
        _registry: &ObjectRegistry,
        request: &PropertyReadRequest,
        apdu: &mut Vec<u8>,
    ) -> Result<()> {
        let point = self.point(request.object_instance)?;
        match request.property {
            PropertyIdentifier::PresentValue => {
                encoding::encode_application_enumerated(apdu, point.present_value as u32)?
            }
            PropertyIdentifier::StatusFlags => {
                let mut flags = StatusFlags::empty();
                flags.set(StatusFlags::OUT_OF_SERVICE, point.out_of_service);
                flags.encode(apdu)?
            }
            PropertyIdentifier::EventState => {
                encoding::encode_application_enumerated(apdu, EventState::Normal.into())?
            }
            PropertyIdentifier::OutOfService => {
                encoding::encode_application_boolean(apdu, point.out_of_service)?
            }
            PropertyIdentifier::Polarity => {
                encoding::encode_application_enumerated(apdu, point.polarity as u32)?
            }
            _ => return Err(PropertyError::UNKNOWN_PROPERTY.into()),
        }
        Ok(())
    }

    fn supports_write(&self) -> bool {
        self.writable()
    }

    fn write_property(&self, request: &PropertyWriteRequest<'_>) -> Result<()> {
        if !self.writable() {
            return Err(PropertyError::WRITE_ACCESS_DENIED.into());
        }
        let instance = request.object_instance;
        match request.property {
            PropertyIdentifier::PresentValue => match request.decode_value()? {
                PropertyValue::Enumerated(value) => {
                    let value = BinaryPv::try_from(value)?;
                    debug!("{} {instance} present value {value:?}", self.object_type);
                    self.update(instance, |p| p.present_value = value)
                }
                _ => Err(PropertyError::INVALID_DATA_TYPE.into()),
            },
            PropertyIdentifier::OutOfService => match request.decode_value()? {
                PropertyValue::Boolean(value) => self.update(instance, |p| p.out_of_service = value),
                _ => Err(PropertyError::INVALID_DATA_TYPE.into()),
            },
            _ => Err(PropertyError::WRITE_ACCESS_DENIED.into()),
        }
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: &BINARY_REQUIRED,
            optional: &[],
            proprietary: &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::registry::tests::Fixed;
    use crate::object::ObjectIdentifier;

    fn write(objects: &BinaryObjects, property: PropertyIdentifier, value: &[u8]) -> Result<()> {
        let id = ObjectIdentifier::new(objects.object_type, 0);
        objects.write_property(&PropertyWriteRequest::new(id, property, value))
    }

    #[test]
    fn test_output_writes() {
        let outputs = BinaryObjects::outputs(2);
        write(&outputs, PropertyIdentifier::PresentValue, &[0x91, 0x01]).unwrap();
        assert_eq!(outputs.present_value(0).unwrap(), BinaryPv::Active);
        assert_eq!(outputs.present_value(1).unwrap(), BinaryPv::Inactive);

        assert_eq!(
            write(&outputs, PropertyIdentifier::PresentValue, &[0x91, 0x02]),
            Err(PropertyError::VALUE_OUT_OF_RANGE.into())
        );
        assert_eq!(
            write(&outputs, PropertyIdentifier::PresentValue, &[0x21, 0x01]),
            Err(PropertyError::INVALID_DATA_TYPE.into())
        );
        assert_eq!(
            write(&outputs, PropertyIdentifier::Polarity, &[0x91, 0x01]),
            Err(PropertyError::WRITE_ACCESS_DENIED.into())
        );
    }

    #[test]
    fn test_inputs_are_read_only() {
        let inputs = BinaryObjects::inputs(1);
        assert_eq!(
            write(&inputs, PropertyIdentifier::PresentValue, &[0x91, 0x01]),
            Err(PropertyError::WRITE_ACCESS_DENIED.into())
        );
    }

    #[test]
    fn test_read() {
        let registry = ObjectRegistry::builder()
            .with_device(Fixed::new(ObjectType::Device, &[1]))
            .build()
            .unwrap();
        let inputs = BinaryObjects::inputs(1);
        inputs.set_present_value(0, BinaryPv::from(true)).unwrap();
        inputs.set_polarity(0, Polarity::Reverse).unwrap();

        let read = |property| {
            let request =
                PropertyReadRequest::new(ObjectIdentifier::new(ObjectType::BinaryInput, 0), property);
            let mut apdu = Vec::new();
            inputs.read_property(&registry, &request, &mut apdu).map(|_| apdu)
        };
        assert_eq!(read(PropertyIdentifier::PresentValue).unwrap(), [0x91, 0x01]);
        assert_eq!(read(PropertyIdentifier::Polarity).unwrap(), [0x91, 0x01]);
        assert_eq!(read(PropertyIdentifier::OutOfService).unwrap(), [0x10]);
        assert_eq!(read(PropertyIdentifier::EventState).unwrap(), [0x91, 0x00]);
        assert_eq!(inputs.object_name(0).as_deref(), Some("BI-0"));
        assert_eq!(inputs.object_name(1), None);
    }
}
