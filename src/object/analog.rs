//! Analog Object Types Implementation
//!
//! Analog Input and Analog Value points. Each bundle serves one object type
//! with instances numbered `0..count`. Inputs are read-only to peers and are
//! updated by the host through [`AnalogObjects::set_present_value`]; values
//! also accept WriteProperty on present-value and out-of-service.

use std::sync::RwLock;

use log::debug;

use super::registry::{ObjectFunctions, ObjectRegistry, PropertyLists};
use super::{
    EventState, ObjectType, PropertyError, PropertyIdentifier, PropertyReadRequest, PropertyValue,
    PropertyWriteRequest, Result, StatusFlags,
};
use crate::encoding;
use crate::generate_custom_enum;

generate_custom_enum!(
    /// Engineering units (BACnetEngineeringUnits, subset)
    EngineeringUnits {
        Amperes = 2,
        Ohms = 4,
        Volts = 5,
        Watts = 47,
        Kilowatts = 48,
        Pascals = 53,
        Kilopascals = 54,
        DegreesCelsius = 62,
        DegreesKelvin = 63,
        DegreesFahrenheit = 64,
        MetersPerSecond = 74,
        KilometersPerHour = 75,
        CubicMetersPerSecond = 85,
        NoUnits = 95,
        Percent = 98,
        Milliamperes = 119,
        Millivolts = 124,
        LitersPerSecond = 126,
    },
    u32,
    256..=65535
);

#[derive(Debug, Clone, Copy)]
struct AnalogPoint {
    present_value: f32,
    out_of_service: bool,
    units: EngineeringUnits,
}

static ANALOG_REQUIRED: [PropertyIdentifier; 8] = [
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::Units,
];

/// Analog Input or Analog Value objects
#[derive(Debug)]
pub struct AnalogObjects {
    object_type: ObjectType,
    points: RwLock<Vec<AnalogPoint>>,
}

impl AnalogObjects {
    fn with_type(object_type: ObjectType, count: u32) -> Self {
        let point = AnalogPoint {
            present_value: 0.0,
            out_of_service: false,
            units: EngineeringUnits::NoUnits,
        };
        Self {
            object_type,
            points: RwLock::new(vec![point; count as usize]),
        }
    }

    /// `count` Analog Input objects
    pub fn inputs(count: u32) -> Self {
        Self::with_type(ObjectType::AnalogInput, count)
    }

    /// `count` Analog Value objects
    pub fn values(count: u32) -> Self {
        Self::with_type(ObjectType::AnalogValue, count)
    }

    /// Use `units` for every instance
    pub fn with_units(self, units: EngineeringUnits) -> Self {
        if let Ok(mut points) = self.points.write() {
            points.iter_mut().for_each(|p| p.units = units);
        }
        self
    }

    fn point(&self, instance: u32) -> Result<AnalogPoint> {
        let points = self.points.read()?;
        points
            .get(instance as usize)
            .copied()
            .ok_or_else(|| PropertyError::UNKNOWN_OBJECT.into())
    }

    fn update(&self, instance: u32, f: impl FnOnce(&mut AnalogPoint)) -> Result<()> {
        let mut points = self.points.write()?;
        let point = points
            .get_mut(instance as usize)
            .ok_or(PropertyError::UNKNOWN_OBJECT)?;
        f(point);
        Ok(())
    }

    pub fn present_value(&self, instance: u32) -> Result<f32> {
        Ok(self.point(instance)?.present_value)
    }

    /// Update a value from the host side, e.g. a new sensor sample.
    pub fn set_present_value(&self, instance: u32, value: f32) -> Result<()> {
        self.update(instance, |p| p.present_value = value)
    }

    fn writable(&self) -> bool {
        self.object_type == ObjectType::AnalogValue
    }
}

impl ObjectFunctions for AnalogObjects {
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
            ObjectType::AnalogInput => "AI",
            _ => "AV",
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
                encoding::encode_application_real(apdu, point.present_value)?
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
            PropertyIdentifier::Units => {
                encoding::encode_application_enumerated(apdu, point.units.into())?
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
                PropertyValue::Real(value) => {
                    debug!("{} {instance} present value {value}", self.object_type);
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
            required: &ANALOG_REQUIRED,
            optional: &[],
            proprietary: &[],
        }
    }
}
