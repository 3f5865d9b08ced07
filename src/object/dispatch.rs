//! Property dispatch engine.
//!
//! Resolves a property request against the registry:
//!
//! 1. the object type must have a bundle, else unsupported-object-type
//! 2. the instance must be valid, else unknown-object (the device wildcard
//!    4194303 is always accepted and resolved to the real device instance)
//! 3. object-identifier, object-name and object-type are answered here for
//!    every object type; anything else goes to the bundle
//! 4. only the object-list may be read with an array index
//!
//! On failure the output buffer is restored to its length on entry, so a
//! caller never sees half an encoded value.

use std::sync::Arc;

use log::{error, trace};

use super::registry::{ObjectFunctions, ObjectRegistry};
use super::{
    ArrayIndex, DispatchError, ObjectIdentifier, ObjectType, PropertyError, PropertyIdentifier,
    PropertyReadRequest, PropertyWriteRequest, Result,
};
use crate::encoding;

/// One property named in a ReadPropertyMultiple request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyReference {
    pub property: PropertyIdentifier,
    pub array_index: ArrayIndex,
}

impl PropertyReference {
    pub fn new(property: PropertyIdentifier) -> Self {
        Self {
            property,
            array_index: ArrayIndex::None,
        }
    }
}

/// Outcome of reading one property in a ReadPropertyMultiple request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyResult {
    pub property: PropertyIdentifier,
    pub array_index: ArrayIndex,
    /// Encoded value or the error reported for this property alone
    pub value: core::result::Result<Vec<u8>, PropertyError>,
}

/// All results for one object of a ReadPropertyMultiple request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAccessResult {
    pub object: ObjectIdentifier,
    pub results: Vec<PropertyResult>,
}

/// Answers property requests against a shared registry
#[derive(Debug, Clone)]
pub struct PropertyDispatcher {
    registry: Arc<ObjectRegistry>,
}

impl PropertyDispatcher {
    pub fn new(registry: Arc<ObjectRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Find the bundle and the effective instance for a request.
    fn resolve(&self, object_type: ObjectType, instance: u32) -> Result<(&dyn ObjectFunctions, u32)> {
        let bundle = self
            .registry
            .find(object_type)
            .ok_or(PropertyError::UNSUPPORTED_OBJECT_TYPE)?;

        if ObjectIdentifier::new(object_type, instance).is_wildcard() {
            let own = self.registry.device_instance().ok_or_else(|| {
                DispatchError::Internal("device bundle reports no instance".into())
            })?;
            return Ok((bundle, own));
        }

        if !bundle.valid_instance(instance) {
            return Err(PropertyError::UNKNOWN_OBJECT.into());
        }
        Ok((bundle, instance))
    }

    /// Read one property, appending its encoded value to `apdu`.
    ///
    /// Returns the number of octets appended.
    pub fn read(&self, request: &PropertyReadRequest, apdu: &mut Vec<u8>) -> Result<usize> {
        let start = apdu.len();
        match self.read_inner(request, apdu) {
            Ok(()) => {
                trace!(
                    "read {}:{} {} -> {} octets",
                    request.object_type,
                    request.object_instance,
                    request.property,
                    apdu.len() - start
                );
                Ok(apdu.len() - start)
            }
            Err(e) => {
                apdu.truncate(start);
                if let DispatchError::Internal(msg) = &e {
                    error!("read of {} failed: {msg}", request.property);
                }
                Err(e)
            }
        }
    }

    fn read_inner(&self, request: &PropertyReadRequest, apdu: &mut Vec<u8>) -> Result<()> {
        let (bundle, instance) = self.resolve(request.object_type, request.object_instance)?;
        let resolved = PropertyReadRequest {
            object_instance: instance,
            ..*request
        };

        match request.property {
            PropertyIdentifier::ObjectIdentifier => {
                encoding::encode_application_object_identifier(apdu, request.object_type, instance)?;
            }
            PropertyIdentifier::ObjectName => {
                let name = bundle.object_name(instance).unwrap_or_default();
                encoding::encode_application_character_string(apdu, &name)?;
            }
            PropertyIdentifier::ObjectType => {
                encoding::encode_application_enumerated(apdu, u16::from(request.object_type) as u32)?;
            }
            _ if bundle.supports_read() => {
                bundle.read_property(&self.registry, &resolved, apdu)?;
            }
            _ => return Err(PropertyError::UNKNOWN_PROPERTY.into()),
        }

        if request.property != PropertyIdentifier::ObjectList && !request.array_index.is_whole() {
            return Err(PropertyError::PROPERTY_IS_NOT_AN_ARRAY.into());
        }
        Ok(())
    }

    /// Write one property.
    pub fn write(&self, request: &PropertyWriteRequest<'_>) -> Result<()> {
        let (bundle, instance) = self.resolve(request.object_type, request.object_instance)?;
        if !bundle.supports_write() {
            return Err(PropertyError::WRITE_ACCESS_DENIED.into());
        }
        let resolved = PropertyWriteRequest {
            object_instance: instance,
            ..*request
        };
        bundle.write_property(&resolved).inspect_err(|e| {
            if let DispatchError::Internal(msg) = e {
                error!("write of {} failed: {msg}", request.property);
            }
        })
    }

    /// Read a set of properties of one object.
    ///
    /// `ALL`, `REQUIRED` and `OPTIONAL` expand to the bundle's property
    /// lists. Each property succeeds or fails on its own; a missing object
    /// yields a single failed entry for the first reference.
    pub fn read_multiple(
        &self,
        object: ObjectIdentifier,
        references: &[PropertyReference],
    ) -> ReadAccessResult {
        let (bundle, instance) = match self.resolve(object.object_type, object.instance) {
            Ok(found) => found,
            Err(e) => {
                let reference = references
                    .first()
                    .copied()
                    .unwrap_or(PropertyReference::new(PropertyIdentifier::All));
                return ReadAccessResult {
                    object,
                    results: vec![PropertyResult {
                        property: reference.property,
                        array_index: reference.array_index,
                        value: Err(e.to_property_error()),
                    }],
                };
            }
        };
        let lists = bundle.property_lists();
        let resolved_object = ObjectIdentifier::new(object.object_type, instance);

        let mut results = Vec::new();
        for reference in references {
            let expanded: Vec<PropertyIdentifier> = match reference.property {
                PropertyIdentifier::All => lists.all().collect(),
                PropertyIdentifier::Required => lists.required.to_vec(),
                PropertyIdentifier::Optional => lists.optional.to_vec(),
                property => vec![property],
            };
            let array_index = if reference.property.is_special() {
                ArrayIndex::None
            } else {
                reference.array_index
            };

            for property in expanded {
                let request = PropertyReadRequest::new(resolved_object, property)
                    .with_array_index(array_index);
                let mut buffer = Vec::new();
                let value = self
                    .read(&request, &mut buffer)
                    .map(|_| buffer)
                    .map_err(|e| e.to_property_error());
                results.push(PropertyResult {
                    property,
                    array_index,
                    value,
                });
            }
        }

        ReadAccessResult {
            object: resolved_object,
            results,
        }
    }
}
