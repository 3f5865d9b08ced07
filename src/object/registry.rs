//! Object type registry.
//!
//! Each object type a device hosts is described by one capability bundle, a
//! value implementing [`ObjectFunctions`]. Bundles are registered once at
//! start-up through [`RegistryBuilder`] and live as long as the device. The
//! device object must be present and always occupies the first slot, so the
//! object list starts with the device itself.
//!
//! Only `object_type` is mandatory. Everything else has a default meaning
//! "this bundle does not provide that capability": no instances, no names,
//! unknown-property on read and write-access-denied on write.

use std::fmt;
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use super::{
    ObjectList, ObjectType, PropertyError, PropertyIdentifier, PropertyReadRequest,
    PropertyWriteRequest, Result,
};

/// Errors raised while assembling a registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a device object is required")]
    MissingDevice,
    #[error("the device slot holds a {0} bundle")]
    NotADevice(ObjectType),
    #[error("object type {0} registered twice")]
    DuplicateType(ObjectType),
}

/// The property identifiers an object type supports, in the order
/// ReadPropertyMultiple reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyLists {
    pub required: &'static [PropertyIdentifier],
    pub optional: &'static [PropertyIdentifier],
    pub proprietary: &'static [PropertyIdentifier],
}

impl PropertyLists {
    pub const EMPTY: Self = Self {
        required: &[],
        optional: &[],
        proprietary: &[],
    };

    /// Every listed property: required, then optional, then proprietary.
    pub fn all(&self) -> impl Iterator<Item = PropertyIdentifier> + '_ {
        self.required
            .iter()
            .chain(self.optional)
            .chain(self.proprietary)
            .copied()
    }

    pub fn contains(&self, property: PropertyIdentifier) -> bool {
        self.all().any(|p| p == property)
    }

    pub fn len(&self) -> usize {
        self.required.len() + self.optional.len() + self.proprietary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capabilities of one object type.
///
/// Implementations keep their mutable state behind interior locks; the
/// registry only ever hands out shared references.
pub trait ObjectFunctions: Send + Sync {
    /// The object type this bundle serves
    fn object_type(&self) -> ObjectType;

    /// One-time start-up hook, called in registration order
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Number of instances
    fn count(&self) -> usize {
        0
    }

    /// Instance number at a zero-based position
    fn index_to_instance(&self, _index: usize) -> Option<u32> {
        None
    }

    /// Whether `instance` names an existing object. The default walks the
    /// enumeration.
    fn valid_instance(&self, instance: u32) -> bool {
        (0..self.count()).any(|i| self.index_to_instance(i) == Some(instance))
    }

    fn object_name(&self, _instance: u32) -> Option<String> {
        None
    }

    /// Whether [`read_property`](Self::read_property) is provided
    fn supports_read(&self) -> bool {
        false
    }

    /// Append the encoded value of a type-specific property to `apdu`.
    ///
    /// The generic properties (identifier, name, type) never reach this
    /// method.
    fn read_property(
        &self,
        _registry: &ObjectRegistry,
        _request: &PropertyReadRequest,
        _apdu: &mut Vec<u8>,
    ) -> Result<()> {
        Err(PropertyError::UNKNOWN_PROPERTY.into())
    }

    /// Whether [`write_property`](Self::write_property) is provided
    fn supports_write(&self) -> bool {
        false
    }

    fn write_property(&self, _request: &PropertyWriteRequest<'_>) -> Result<()> {
        Err(PropertyError::WRITE_ACCESS_DENIED.into())
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists::EMPTY
    }
}

/// Ordered, fixed set of capability bundles with the device first
pub struct ObjectRegistry {
    device: Arc<dyn ObjectFunctions>,
    table: Vec<Arc<dyn ObjectFunctions>>,
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.table.iter().map(|b| (b.object_type(), b.count())))
            .finish()
    }
}

impl ObjectRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Bundle for an object type, by linear scan
    pub fn find(&self, object_type: ObjectType) -> Option<&dyn ObjectFunctions> {
        self.table
            .iter()
            .find(|b| b.object_type() == object_type)
            .map(|b| b.as_ref())
    }

    /// Bundles in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn ObjectFunctions> {
        self.table.iter().map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn device(&self) -> &dyn ObjectFunctions {
        self.device.as_ref()
    }

    /// The device's own instance number
    pub fn device_instance(&self) -> Option<u32> {
        self.device.index_to_instance(0)
    }

    pub fn object_list(&self) -> ObjectList<'_> {
        ObjectList::new(self)
    }

    /// Run every bundle's start-up hook in registration order.
    pub fn init_all(&self) -> Result<()> {
        for bundle in &self.table {
            debug!("initialising {} objects", bundle.object_type());
            bundle.init()?;
        }
        Ok(())
    }
}

/// Builder for [`ObjectRegistry`]
#[derive(Default)]
pub struct RegistryBuilder {
    device: Option<Arc<dyn ObjectFunctions>>,
    objects: Vec<Arc<dyn ObjectFunctions>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device bundle; it always takes the first slot
    pub fn with_device(mut self, device: Arc<dyn ObjectFunctions>) -> Self {
        self.device = Some(device);
        self
    }

    /// Append a bundle after the ones already added
    pub fn add_object(mut self, object: Arc<dyn ObjectFunctions>) -> Self {
        self.objects.push(object);
        self
    }

    pub fn build(self) -> core::result::Result<ObjectRegistry, RegistryError> {
        let device = self.device.ok_or(RegistryError::MissingDevice)?;
        if device.object_type() != ObjectType::Device {
            return Err(RegistryError::NotADevice(device.object_type()));
        }

        let mut table: Vec<Arc<dyn ObjectFunctions>> = Vec::with_capacity(self.objects.len() + 1);
        table.push(Arc::clone(&device));
        for object in self.objects {
            let object_type = object.object_type();
            if table.iter().any(|b| b.object_type() == object_type) {
                return Err(RegistryError::DuplicateType(object_type));
            }
            table.push(object);
        }

        Ok(ObjectRegistry { device, table })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A bundle with fixed instance numbers and nothing else
    pub(crate) struct Fixed {
        pub object_type: ObjectType,
        pub instances: Vec<u32>,
    }

    impl Fixed {
        pub fn new(object_type: ObjectType, instances: &[u32]) -> Arc<Self> {
            Arc::new(Self {
                object_type,
                instances: instances.to_vec(),
            })
        }
    }

    impl ObjectFunctions for Fixed {
        fn object_type(&self) -> ObjectType {
            self.object_type
        }

        fn count(&self) -> usize {
            self.instances.len()
        }

        fn index_to_instance(&self, index: usize) -> Option<u32> {
            self.instances.get(index).copied()
        }

        fn object_name(&self, instance: u32) -> Option<String> {
            self.valid_instance(instance)
                .then(|| format!("{} {}", self.object_type, instance))
        }
    }

    #[test]
    fn test_device_required() {
        let err = RegistryBuilder::new()
            .add_object(Fixed::new(ObjectType::AnalogInput, &[1]))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::MissingDevice);

        let err = RegistryBuilder::new()
            .with_device(Fixed::new(ObjectType::File, &[1]))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::NotADevice(ObjectType::File));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let err = RegistryBuilder::new()
            .with_device(Fixed::new(ObjectType::Device, &[7]))
            .add_object(Fixed::new(ObjectType::AnalogInput, &[1]))
            .add_object(Fixed::new(ObjectType::AnalogInput, &[2]))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateType(ObjectType::AnalogInput));
    }

    #[test]
    fn test_registration_order() {
        let registry = RegistryBuilder::new()
            .add_object(Fixed::new(ObjectType::BinaryInput, &[0]))
            .with_device(Fixed::new(ObjectType::Device, &[7]))
            .add_object(Fixed::new(ObjectType::AnalogInput, &[0]))
            .build()
            .unwrap();

        let order: Vec<_> = registry.iter().map(|b| b.object_type()).collect();
        assert_eq!(
            order,
            vec![ObjectType::Device, ObjectType::BinaryInput, ObjectType::AnalogInput]
        );
        assert_eq!(registry.device_instance(), Some(7));
        assert!(registry.find(ObjectType::AnalogInput).is_some());
        assert!(registry.find(ObjectType::File).is_none());
        assert!(registry.init_all().is_ok());
    }

    #[test]
    fn test_default_capabilities() {
        let bundle = Fixed::new(ObjectType::AnalogValue, &[3, 9]);
        assert!(bundle.valid_instance(9));
        assert!(!bundle.valid_instance(4));
        assert!(!bundle.supports_read());
        assert!(!bundle.supports_write());
        assert!(bundle.property_lists().is_empty());

        let id = super::super::ObjectIdentifier::new(ObjectType::AnalogValue, 3);
        assert_eq!(
            bundle.write_property(&PropertyWriteRequest::new(id, PropertyIdentifier::PresentValue, &[])),
            Err(PropertyError::WRITE_ACCESS_DENIED.into())
        );
    }

    #[test]
    fn test_property_lists() {
        static REQUIRED: [PropertyIdentifier; 2] =
            [PropertyIdentifier::ObjectIdentifier, PropertyIdentifier::ObjectName];
        let lists = PropertyLists {
            required: &REQUIRED,
            optional: &[PropertyIdentifier::Description],
            proprietary: &[],
        };
        assert_eq!(lists.len(), 3);
        assert!(lists.contains(PropertyIdentifier::Description));
        assert!(!lists.contains(PropertyIdentifier::PresentValue));
        assert_eq!(lists.all().last(), Some(PropertyIdentifier::Description));
    }
}
