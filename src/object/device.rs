//! Device Object Implementation
//!
//! Every BACnet device contains exactly one Device object. It describes the
//! device (vendor, model, protocol support) and lists every other object the
//! device contains through its object-list property.
//!
//! The instance number and object name are persistent: they are kept in a
//! [`KeyValueStore`] and survive a restart. A missing or corrupt name is
//! replaced by `DEVICE-<instance>` the first time it is needed.

use std::sync::{Arc, RwLock};

use log::{debug, info, warn};

use super::object_type::MAX_ASHRAE_OBJECT_TYPE;
use super::registry::{ObjectFunctions, ObjectRegistry, PropertyLists};
use super::{
    ObjectType, PropertyError, PropertyIdentifier, PropertyReadRequest, PropertyValue,
    PropertyWriteRequest, Result,
};
use crate::encoding::{self, charset};
use crate::generate_custom_enum;
use crate::service::{ProtocolServicesSupported, ReinitializedState};
use crate::storage::{keys, KeyValueStore};
use crate::{BACNET_MAX_INSTANCE, BACNET_PROTOCOL_REVISION, BACNET_PROTOCOL_VERSION};

/// Longest object name the settings store holds, in octets
pub const DEVICE_NAME_SIZE: usize = 64;

/// BACnetSegmentation no-segmentation
const SEGMENTATION_NONE: u32 = 3;

generate_custom_enum!(
    /// Device status (BACnetDeviceStatus)
    DeviceStatus {
        Operational = 0,
        OperationalReadOnly = 1,
        DownloadRequired = 2,
        DownloadInProgress = 3,
        NonOperational = 4,
        BackupInProgress = 5,
    },
    u32,
    64..=65535
);

/// Static description of the device
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Instance number used when the settings store has none
    pub instance: u32,
    pub vendor_name: String,
    pub vendor_identifier: u16,
    pub model_name: String,
    pub firmware_revision: String,
    pub application_software_version: String,
    pub description: String,
    pub max_apdu: u16,
    /// APDU timeout in milliseconds
    pub apdu_timeout: u32,
    pub apdu_retries: u32,
    pub max_master: u8,
    pub max_info_frames: u8,
    /// Password ReinitializeDevice must carry
    pub reinitialize_password: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            instance: 260001,
            vendor_name: "bacnet-device".into(),
            vendor_identifier: 260,
            model_name: "bacnet-device".into(),
            firmware_revision: env!("CARGO_PKG_VERSION").into(),
            application_software_version: "1.0".into(),
            description: "BACnet Development Kit".into(),
            max_apdu: crate::BACNET_MAX_APDU as u16,
            apdu_timeout: 3000,
            apdu_retries: 3,
            max_master: 127,
            max_info_frames: 1,
            reinitialize_password: "rehmite".into(),
        }
    }
}

#[derive(Debug)]
struct DeviceState {
    instance: u32,
    system_status: DeviceStatus,
    max_master: u8,
    max_info_frames: u8,
    database_revision: u32,
    reinitialize: Option<ReinitializedState>,
}

static DEVICE_REQUIRED: [PropertyIdentifier; 22] = [
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::SystemStatus,
    PropertyIdentifier::VendorName,
    PropertyIdentifier::VendorIdentifier,
    PropertyIdentifier::ModelName,
    PropertyIdentifier::FirmwareRevision,
    PropertyIdentifier::ApplicationSoftwareVersion,
    PropertyIdentifier::ProtocolVersion,
    PropertyIdentifier::ProtocolRevision,
    PropertyIdentifier::ProtocolServicesSupported,
    PropertyIdentifier::ProtocolObjectTypesSupported,
    PropertyIdentifier::ObjectList,
    PropertyIdentifier::MaxApduLengthAccepted,
    PropertyIdentifier::SegmentationSupported,
    PropertyIdentifier::ApduTimeout,
    PropertyIdentifier::NumberOfApduRetries,
    PropertyIdentifier::MaxMaster,
    PropertyIdentifier::MaxInfoFrames,
    PropertyIdentifier::DeviceAddressBinding,
    PropertyIdentifier::DatabaseRevision,
];

static DEVICE_OPTIONAL: [PropertyIdentifier; 1] = [PropertyIdentifier::Description];

/// The device object
pub struct DeviceObject {
    config: DeviceConfig,
    store: Arc<dyn KeyValueStore>,
    state: RwLock<DeviceState>,
}

impl std::fmt::Debug for DeviceObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceObject")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

impl DeviceObject {
    /// Create the device object. The persistent instance number is loaded by
    /// [`ObjectFunctions::init`].
    pub fn new(config: DeviceConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let instance = if config.instance < BACNET_MAX_INSTANCE {
            config.instance
        } else {
            0
        };
        let state = DeviceState {
            instance,
            system_status: DeviceStatus::Operational,
            max_master: config.max_master,
            max_info_frames: config.max_info_frames,
            database_revision: 0,
            reinitialize: None,
        };
        Self {
            config,
            store,
            state: RwLock::new(state),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Current instance number
    pub fn instance(&self) -> Result<u32> {
        Ok(self.state.read()?.instance)
    }

    /// Change and persist the instance number.
    pub fn set_instance(&self, instance: u32) -> Result<()> {
        if instance > BACNET_MAX_INSTANCE {
            return Err(PropertyError::VALUE_OUT_OF_RANGE.into());
        }
        self.store.set(keys::DEVICE_INSTANCE, &instance.to_be_bytes())?;
        let mut state = self.state.write()?;
        state.instance = instance;
        state.database_revision = state.database_revision.wrapping_add(1);
        info!("device instance is now {instance}");
        Ok(())
    }

    /// The persisted object name, restoring the default if it is missing
    /// or unreadable.
    pub fn name(&self) -> Result<String> {
        let stored = self.store.get(keys::DEVICE_NAME)?;
        if let Some(name) = stored.as_deref().and_then(parse_stored_name) {
            return Ok(name);
        }
        let name = format!("DEVICE-{}", self.instance()?);
        warn!("device name missing or corrupt, restoring {name}");
        self.store.set(keys::DEVICE_NAME, &stored_name(&name))?;
        Ok(name)
    }

    /// Change and persist the object name.
    pub fn set_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(PropertyError::VALUE_OUT_OF_RANGE.into());
        }
        if name.len() >= DEVICE_NAME_SIZE {
            return Err(PropertyError::NO_SPACE_TO_WRITE_PROPERTY.into());
        }
        self.store.set(keys::DEVICE_NAME, &stored_name(name))?;
        let mut state = self.state.write()?;
        state.database_revision = state.database_revision.wrapping_add(1);
        debug!("device name is now {name}");
        Ok(())
    }

    pub fn system_status(&self) -> Result<DeviceStatus> {
        Ok(self.state.read()?.system_status)
    }

    pub fn set_system_status(&self, status: DeviceStatus) -> Result<()> {
        self.state.write()?.system_status = status;
        Ok(())
    }

    /// Accept a ReinitializeDevice request if the password matches.
    ///
    /// The device does not restart by itself; the host collects the
    /// requested state with [`take_reinitialize`](Self::take_reinitialize)
    /// once the acknowledgement is on its way.
    pub fn reinitialize(&self, state: ReinitializedState, password: Option<&str>) -> Result<()> {
        if password.unwrap_or_default() != self.config.reinitialize_password {
            warn!("reinitialize {state} refused: wrong password");
            return Err(PropertyError::PASSWORD_FAILURE.into());
        }
        info!("reinitialize {state} accepted");
        self.state.write()?.reinitialize = Some(state);
        Ok(())
    }

    /// The pending reinitialize request, if any
    pub fn take_reinitialize(&self) -> Result<Option<ReinitializedState>> {
        Ok(self.state.write()?.reinitialize.take())
    }

    fn encode_object_types_supported(registry: &ObjectRegistry, apdu: &mut Vec<u8>) -> Result<()> {
        let mut bits = vec![false; MAX_ASHRAE_OBJECT_TYPE as usize];
        for bundle in registry.iter().filter(|b| b.count() > 0) {
            let code = u16::from(bundle.object_type()) as usize;
            if let Some(bit) = bits.get_mut(code) {
                *bit = true;
            }
        }
        encoding::encode_application_bit_string(apdu, &bits)?;
        Ok(())
    }
}

fn stored_name(name: &str) -> Vec<u8> {
    let mut value = Vec::with_capacity(name.len() + 1);
    value.push(charset::UTF8);
    value.extend_from_slice(name.as_bytes());
    value
}

fn parse_stored_name(value: &[u8]) -> Option<String> {
    let (&set, text) = value.split_first()?;
    if set != charset::UTF8 || text.is_empty() || text.len() > DEVICE_NAME_SIZE {
        return None;
    }
    String::from_utf8(text.to_vec()).ok()
}

impl ObjectFunctions for DeviceObject {
    fn object_type(&self) -> ObjectType {
        ObjectType::Device
    }

    /// Load the persistent instance number and make sure a name exists.
    fn init(&self) -> Result<()> {
        let stored = self
            .store
            .get(keys::DEVICE_INSTANCE)?
            .and_then(|v| <[u8; 4]>::try_from(v.as_slice()).ok())
            .map(u32::from_be_bytes);

        let instance = match stored {
            Some(instance) if instance < BACNET_MAX_INSTANCE => instance,
            Some(instance) => {
                warn!("stored device instance {instance} out of range, using 0");
                self.store.set(keys::DEVICE_INSTANCE, &0u32.to_be_bytes())?;
                0
            }
            None => {
                let instance = self.instance()?;
                self.store.set(keys::DEVICE_INSTANCE, &instance.to_be_bytes())?;
                instance
            }
        };
        self.state.write()?.instance = instance;
        let name = self.name()?;
        info!("device {instance} \"{name}\" ready");
        Ok(())
    }

    fn count(&self) -> usize {
        1
    }

    fn index_to_instance(&self, index: usize) -> Option<u32> {
        if index == 0 {
            self.instance().ok()
        } else {
            None
        }
    }

    fn valid_instance(&self, instance: u32) -> bool {
        self.instance().is_ok_and(|own| own == instance)
    }

    fn object_name(&self, instance: u32) -> Option<String> {
        if !self.valid_instance(instance) {
            return None;
        }
        self.name()
            .inspect_err(|e| warn!("device name unavailable: {e}"))
            .ok()
    }

    fn supports_read(&self) -> bool {
        true
    }

    fn read_property(
        &self,
        registry: &ObjectRegistry,
        request: &PropertyReadRequest,
        apdu: &mut Vec<u8>,
    ) -> Result<()> {
        let config = &self.config;
        match request.property {
            PropertyIdentifier::Description => {
                encoding::encode_application_character_string(apdu, &config.description)?
            }
            PropertyIdentifier::SystemStatus => {
                encoding::encode_application_enumerated(apdu, self.system_status()?.into())?
            }
            PropertyIdentifier::VendorName => {
                encoding::encode_application_character_string(apdu, &config.vendor_name)?
            }
            PropertyIdentifier::VendorIdentifier => {
                encoding::encode_application_unsigned(apdu, config.vendor_identifier as u32)?
            }
            PropertyIdentifier::ModelName => {
                encoding::encode_application_character_string(apdu, &config.model_name)?
            }
            PropertyIdentifier::FirmwareRevision => {
                encoding::encode_application_character_string(apdu, &config.firmware_revision)?
            }
            PropertyIdentifier::ApplicationSoftwareVersion => encoding::encode_application_character_string(
                apdu,
                &config.application_software_version,
            )?,
            PropertyIdentifier::ProtocolVersion => {
                encoding::encode_application_unsigned(apdu, BACNET_PROTOCOL_VERSION as u32)?
            }
            PropertyIdentifier::ProtocolRevision => {
                encoding::encode_application_unsigned(apdu, BACNET_PROTOCOL_REVISION as u32)?
            }
            PropertyIdentifier::ProtocolServicesSupported => encoding::encode_application_bit_string(
                apdu,
                &ProtocolServicesSupported::served().to_bit_string(),
            )?,
            PropertyIdentifier::ProtocolObjectTypesSupported => {
                Self::encode_object_types_supported(registry, apdu)?
            }
            PropertyIdentifier::ObjectList => registry.object_list().encode_property(request, apdu)?,
            PropertyIdentifier::MaxApduLengthAccepted => {
                encoding::encode_application_unsigned(apdu, config.max_apdu as u32)?
            }
            PropertyIdentifier::SegmentationSupported => {
                encoding::encode_application_enumerated(apdu, SEGMENTATION_NONE)?
            }
            PropertyIdentifier::ApduTimeout => {
                encoding::encode_application_unsigned(apdu, config.apdu_timeout)?
            }
            PropertyIdentifier::NumberOfApduRetries => {
                encoding::encode_application_unsigned(apdu, config.apdu_retries)?
            }
            PropertyIdentifier::MaxMaster => {
                encoding::encode_application_unsigned(apdu, self.state.read()?.max_master as u32)?
            }
            PropertyIdentifier::MaxInfoFrames => {
                encoding::encode_application_unsigned(apdu, self.state.read()?.max_info_frames as u32)?
            }
            // no bindings are cached; the list is empty
            PropertyIdentifier::DeviceAddressBinding => {}
            PropertyIdentifier::DatabaseRevision => {
                encoding::encode_application_unsigned(apdu, self.state.read()?.database_revision)?
            }
            _ => return Err(PropertyError::UNKNOWN_PROPERTY.into()),
        }
        Ok(())
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn write_property(&self, request: &PropertyWriteRequest<'_>) -> Result<()> {
        match request.property {
            PropertyIdentifier::ObjectIdentifier => match request.decode_value()? {
                PropertyValue::ObjectIdentifier(id) if id.object_type == ObjectType::Device => {
                    self.set_instance(id.instance)
                }
                PropertyValue::ObjectIdentifier(_) => Err(PropertyError::VALUE_OUT_OF_RANGE.into()),
                _ => Err(PropertyError::INVALID_DATA_TYPE.into()),
            },
            PropertyIdentifier::ObjectName => match request.decode_value()? {
                PropertyValue::CharacterString(name) => self.set_name(&name),
                _ => Err(PropertyError::INVALID_DATA_TYPE.into()),
            },
            PropertyIdentifier::MaxInfoFrames => match request.decode_value()? {
                PropertyValue::UnsignedInteger(frames) => {
                    let frames =
                        u8::try_from(frames).map_err(|_| PropertyError::VALUE_OUT_OF_RANGE)?;
                    self.state.write()?.max_info_frames = frames;
                    Ok(())
                }
                _ => Err(PropertyError::INVALID_DATA_TYPE.into()),
            },
            PropertyIdentifier::MaxMaster => match request.decode_value()? {
                PropertyValue::UnsignedInteger(master @ 1..=127) => {
                    self.state.write()?.max_master = master as u8;
                    Ok(())
                }
                PropertyValue::UnsignedInteger(_) => Err(PropertyError::VALUE_OUT_OF_RANGE.into()),
                _ => Err(PropertyError::INVALID_DATA_TYPE.into()),
            },
            _ => Err(PropertyError::WRITE_ACCESS_DENIED.into()),
        }
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: &DEVICE_REQUIRED,
            optional: &DEVICE_OPTIONAL,
            proprietary: &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::registry::tests::Fixed;
    use crate::object::{ObjectIdentifier, RegistryBuilder};
    use crate::storage::MemoryKeyValueStore;

    fn device_with(store: Arc<MemoryKeyValueStore>) -> Arc<DeviceObject> {
        let config = DeviceConfig {
            instance: 1234,
            ..DeviceConfig::default()
        };
        let device = Arc::new(DeviceObject::new(config, store));
        device.init().unwrap();
        device
    }

    fn write(device: &DeviceObject, property: PropertyIdentifier, value: &[u8]) -> Result<()> {
        let object = ObjectIdentifier::new(ObjectType::Device, 1234);
        device.write_property(&PropertyWriteRequest::new(object, property, value))
    }

    fn charstring(text: &str) -> Vec<u8> {
        let mut value = Vec::new();
        encoding::encode_application_character_string(&mut value, text).unwrap();
        value
    }

    #[test]
    fn test_default_name_persisted() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let device = device_with(store.clone());
        assert_eq!(device.object_name(1234).as_deref(), Some("DEVICE-1234"));
        assert_eq!(
            store.get(keys::DEVICE_NAME).unwrap(),
            Some(stored_name("DEVICE-1234"))
        );
        assert_eq!(
            store.get(keys::DEVICE_INSTANCE).unwrap(),
            Some(1234u32.to_be_bytes().to_vec())
        );
        assert_eq!(device.object_name(99), None);
    }

    #[test]
    fn test_corrupt_name_restored() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set(keys::DEVICE_NAME, &[0x09, b'x']).unwrap();
        let device = device_with(store.clone());
        assert_eq!(device.name().unwrap(), "DEVICE-1234");
    }

    #[test]
    fn test_stored_instance_wins() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set(keys::DEVICE_INSTANCE, &77u32.to_be_bytes()).unwrap();
        let device = device_with(store);
        assert_eq!(device.instance().unwrap(), 77);
        assert_eq!(device.index_to_instance(0), Some(77));
        assert!(device.valid_instance(77));
        assert!(!device.valid_instance(1234));
    }

    #[test]
    fn test_out_of_range_instance_reset() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store
            .set(keys::DEVICE_INSTANCE, &BACNET_MAX_INSTANCE.to_be_bytes())
            .unwrap();
        let device = device_with(store.clone());
        assert_eq!(device.instance().unwrap(), 0);
        assert_eq!(
            store.get(keys::DEVICE_INSTANCE).unwrap(),
            Some(vec![0, 0, 0, 0])
        );
    }

    #[test]
    fn test_write_object_name() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let device = device_with(store);
        write(&device, PropertyIdentifier::ObjectName, &charstring("Boiler Room")).unwrap();
        assert_eq!(device.name().unwrap(), "Boiler Room");

        assert_eq!(
            write(&device, PropertyIdentifier::ObjectName, &charstring("")),
            Err(PropertyError::VALUE_OUT_OF_RANGE.into())
        );
        assert_eq!(
            write(&device, PropertyIdentifier::ObjectName, &charstring(&"x".repeat(64))),
            Err(PropertyError::NO_SPACE_TO_WRITE_PROPERTY.into())
        );
        assert_eq!(
            write(&device, PropertyIdentifier::ObjectName, &[0x21, 0x01]),
            Err(PropertyError::INVALID_DATA_TYPE.into())
        );
        // character set 1 (IBM/Microsoft DBCS)
        assert_eq!(
            write(&device, PropertyIdentifier::ObjectName, &[0x73, 0x01, b'a', b'b']),
            Err(PropertyError::CHARACTER_SET_NOT_SUPPORTED.into())
        );
        assert_eq!(device.name().unwrap(), "Boiler Room");
    }

    #[test]
    fn test_write_object_identifier() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let device = device_with(store.clone());

        let mut value = Vec::new();
        encoding::encode_application_object_identifier(&mut value, ObjectType::Device, 4000).unwrap();
        write(&device, PropertyIdentifier::ObjectIdentifier, &value).unwrap();
        assert_eq!(device.instance().unwrap(), 4000);
        assert_eq!(
            store.get(keys::DEVICE_INSTANCE).unwrap(),
            Some(4000u32.to_be_bytes().to_vec())
        );

        let mut value = Vec::new();
        encoding::encode_application_object_identifier(&mut value, ObjectType::AnalogInput, 1).unwrap();
        assert_eq!(
            write(&device, PropertyIdentifier::ObjectIdentifier, &value),
            Err(PropertyError::VALUE_OUT_OF_RANGE.into())
        );
        assert_eq!(
            write(&device, PropertyIdentifier::ObjectIdentifier, &[0x21, 0x01]),
            Err(PropertyError::INVALID_DATA_TYPE.into())
        );
    }

    #[test]
    fn test_write_mstp_settings() {
        let device = device_with(Arc::new(MemoryKeyValueStore::new()));
        write(&device, PropertyIdentifier::MaxMaster, &[0x21, 0x40]).unwrap();
        assert_eq!(
            write(&device, PropertyIdentifier::MaxMaster, &[0x21, 0x00]),
            Err(PropertyError::VALUE_OUT_OF_RANGE.into())
        );
        assert_eq!(
            write(&device, PropertyIdentifier::MaxMaster, &[0x21, 0x80]),
            Err(PropertyError::VALUE_OUT_OF_RANGE.into())
        );
        write(&device, PropertyIdentifier::MaxInfoFrames, &[0x21, 0xFF]).unwrap();
        assert_eq!(
            write(&device, PropertyIdentifier::MaxInfoFrames, &[0x22, 0x01, 0x00]),
            Err(PropertyError::VALUE_OUT_OF_RANGE.into())
        );
        assert_eq!(
            write(&device, PropertyIdentifier::VendorName, &charstring("x")),
            Err(PropertyError::WRITE_ACCESS_DENIED.into())
        );
    }

    #[test]
    fn test_reinitialize_password() {
        let device = device_with(Arc::new(MemoryKeyValueStore::new()));
        assert_eq!(
            device.reinitialize(ReinitializedState::Warmstart, Some("wrong")),
            Err(PropertyError::PASSWORD_FAILURE.into())
        );
        assert_eq!(
            device.reinitialize(ReinitializedState::Warmstart, None),
            Err(PropertyError::PASSWORD_FAILURE.into())
        );
        assert_eq!(device.take_reinitialize().unwrap(), None);

        device
            .reinitialize(ReinitializedState::Coldstart, Some("rehmite"))
            .unwrap();
        assert_eq!(
            device.take_reinitialize().unwrap(),
            Some(ReinitializedState::Coldstart)
        );
        assert_eq!(device.take_reinitialize().unwrap(), None);
    }

    #[test]
    fn test_object_types_supported() {
        let device = device_with(Arc::new(MemoryKeyValueStore::new()));
        let registry = RegistryBuilder::new()
            .with_device(device.clone())
            .add_object(Fixed::new(ObjectType::AnalogInput, &[0]))
            .add_object(Fixed::new(ObjectType::BinaryInput, &[]))
            .build()
            .unwrap();
        let request = PropertyReadRequest::new(
            ObjectIdentifier::new(ObjectType::Device, 1234),
            PropertyIdentifier::ProtocolObjectTypesSupported,
        );
        let mut apdu = Vec::new();
        device.read_property(&registry, &request, &mut apdu).unwrap();
        let (value, _) = encoding::decode_application_data(&apdu).unwrap();
        let PropertyValue::BitString(bits) = value else {
            panic!("expected a bit string, got {value:?}");
        };
        assert_eq!(bits.len(), MAX_ASHRAE_OBJECT_TYPE as usize);
        let set: Vec<usize> = bits
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.then_some(i))
            .collect();
        assert_eq!(set, vec![0, 8]);
    }

    #[test]
    fn test_fixed_properties() {
        let device = device_with(Arc::new(MemoryKeyValueStore::new()));
        let registry = RegistryBuilder::new()
            .with_device(device.clone())
            .build()
            .unwrap();
        let read = |property| {
            let request =
                PropertyReadRequest::new(ObjectIdentifier::new(ObjectType::Device, 1234), property);
            let mut apdu = Vec::new();
            device.read_property(&registry, &request, &mut apdu).map(|_| apdu)
        };
        assert_eq!(read(PropertyIdentifier::SegmentationSupported).unwrap(), [0x91, 0x03]);
        assert_eq!(read(PropertyIdentifier::ProtocolVersion).unwrap(), [0x21, 0x01]);
        assert!(read(PropertyIdentifier::DeviceAddressBinding).unwrap().is_empty());
        assert_eq!(read(PropertyIdentifier::MaxApduLengthAccepted).unwrap(), [0x22, 0x05, 0xC4]);
        assert_eq!(
            read(PropertyIdentifier::PresentValue),
            Err(PropertyError::UNKNOWN_PROPERTY.into())
        );
    }
}
