//! The device object-list: every object in the device as one dense array.
//!
//! Positions are assigned by walking the registry in registration order and
//! each bundle in its own index order, so the same registry contents always
//! produce the same list. Array index 0 is the length; elements start at 1.

use log::error;

use super::registry::ObjectRegistry;
use super::{ArrayIndex, DispatchError, ObjectIdentifier, PropertyError, PropertyReadRequest, Result};
use crate::encoding;

/// View of a registry as the object-list array
#[derive(Debug, Clone, Copy)]
pub struct ObjectList<'a> {
    registry: &'a ObjectRegistry,
}

impl<'a> ObjectList<'a> {
    pub fn new(registry: &'a ObjectRegistry) -> Self {
        Self { registry }
    }

    /// Total number of objects across all bundles
    pub fn count(&self) -> usize {
        self.registry.iter().map(|b| b.count()).sum()
    }

    /// Identifier at a one-based array position. Position 0 is the length
    /// and never names an object.
    pub fn identifier_at(&self, position: usize) -> Option<ObjectIdentifier> {
        let mut index = position.checked_sub(1)?;
        for bundle in self.registry.iter() {
            let count = bundle.count();
            if index < count {
                let instance = bundle.index_to_instance(index)?;
                return Some(ObjectIdentifier::new(bundle.object_type(), instance));
            }
            index -= count;
        }
        None
    }

    /// Every identifier in list order
    pub fn iter(&self) -> impl Iterator<Item = ObjectIdentifier> + 'a {
        let list = *self;
        (1..=self.count()).filter_map(move |position| list.identifier_at(position))
    }

    /// First object whose name equals `name`.
    pub fn find_by_name(&self, name: &str) -> Option<ObjectIdentifier> {
        self.iter().find(|id| {
            self.registry
                .find(id.object_type)
                .and_then(|b| b.object_name(id.instance))
                .is_some_and(|n| n == name)
        })
    }

    /// Encode the object-list property value for `request.array_index`.
    ///
    /// The whole list must fit in `request.max_apdu` octets; the first element
    /// that would not fit fails the read with no-space-for-object.
    pub fn encode_property(&self, request: &PropertyReadRequest, apdu: &mut Vec<u8>) -> Result<()> {
        match request.array_index {
            ArrayIndex::Element(0) => {
                encoding::encode_application_unsigned(apdu, self.count() as u32)?;
            }
            ArrayIndex::Element(position) => {
                let id = self
                    .identifier_at(position as usize)
                    .ok_or(PropertyError::INVALID_ARRAY_INDEX)?;
                encoding::encode_application_object_identifier(apdu, id.object_type, id.instance)?;
            }
            ArrayIndex::None | ArrayIndex::All => {
                let start = apdu.len();
                for position in 1..=self.count() {
                    let id = self.identifier_at(position).ok_or_else(|| {
                        error!("object list position {position} has no identifier");
                        DispatchError::Internal(format!("object list position {position} unresolved"))
                    })?;
                    let before = apdu.len();
                    encoding::encode_application_object_identifier(apdu, id.object_type, id.instance)?;
                    if apdu.len() - start > request.max_apdu {
                        apdu.truncate(before);
                        return Err(PropertyError::NO_SPACE_FOR_OBJECT.into());
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::registry::tests::Fixed;
    use crate::object::{ObjectType, PropertyIdentifier, RegistryBuilder};

    fn registry() -> ObjectRegistry {
        RegistryBuilder::new()
            .with_device(Fixed::new(ObjectType::Device, &[260001]))
            .add_object(Fixed::new(ObjectType::AnalogInput, &[0, 1, 2]))
            .add_object(Fixed::new(ObjectType::Program, &[]))
            .add_object(Fixed::new(ObjectType::BinaryInput, &[10, 11]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_identifier_positions() {
        let registry = registry();
        let list = registry.object_list();
        assert_eq!(list.count(), 6);
        assert_eq!(list.identifier_at(0), None);
        assert_eq!(
            list.identifier_at(1),
            Some(ObjectIdentifier::new(ObjectType::Device, 260001))
        );
        assert_eq!(
            list.identifier_at(4),
            Some(ObjectIdentifier::new(ObjectType::AnalogInput, 2))
        );
        assert_eq!(
            list.identifier_at(5),
            Some(ObjectIdentifier::new(ObjectType::BinaryInput, 10))
        );
        assert_eq!(
            list.identifier_at(6),
            Some(ObjectIdentifier::new(ObjectType::BinaryInput, 11))
        );
        assert_eq!(list.identifier_at(7), None);
    }

    #[test]
    fn test_enumeration_is_stable() {
        let first: Vec<_> = registry().object_list().iter().collect();
        let second: Vec<_> = registry().object_list().iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn test_find_by_name() {
        let registry = registry();
        let list = registry.object_list();
        assert_eq!(
            list.find_by_name("BinaryInput 11"),
            Some(ObjectIdentifier::new(ObjectType::BinaryInput, 11))
        );
        assert_eq!(list.find_by_name("nothing"), None);
    }

    fn read(index: ArrayIndex, max_apdu: usize) -> (Result<()>, Vec<u8>) {
        let registry = registry();
        let request = PropertyReadRequest::new(
            ObjectIdentifier::new(ObjectType::Device, 260001),
            PropertyIdentifier::ObjectList,
        )
        .with_array_index(index)
        .with_max_apdu(max_apdu);
        let mut apdu = Vec::new();
        let result = registry.object_list().encode_property(&request, &mut apdu);
        (result, apdu)
    }

    #[test]
    fn test_encode_length_and_elements() {
        let (result, apdu) = read(ArrayIndex::Element(0), 1476);
        assert!(result.is_ok());
        assert_eq!(apdu, [0x21, 0x06]);

        let (result, apdu) = read(ArrayIndex::Element(2), 1476);
        assert!(result.is_ok());
        assert_eq!(apdu, [0xC4, 0x00, 0x00, 0x00, 0x00]);

        let (result, _) = read(ArrayIndex::Element(7), 1476);
        assert_eq!(result, Err(PropertyError::INVALID_ARRAY_INDEX.into()));
    }

    #[test]
    fn test_encode_whole_list() {
        let (result, apdu) = read(ArrayIndex::All, 1476);
        assert!(result.is_ok());
        assert_eq!(apdu.len(), 6 * 5);

        let (result, apdu) = read(ArrayIndex::None, 30);
        assert!(result.is_ok());
        assert_eq!(apdu.len(), 30);
    }

    #[test]
    fn test_encode_overflow() {
        let (result, _) = read(ArrayIndex::All, 29);
        assert_eq!(result, Err(PropertyError::NO_SPACE_FOR_OBJECT.into()));
    }
}
