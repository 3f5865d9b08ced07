//! # bacnet-device
//!
//! The server side of a small BACnet device: NPDU framing for received and
//! transmitted frames, and an object/property dispatch engine that answers
//! ReadProperty, WriteProperty, ReadPropertyMultiple, AtomicReadFile,
//! AtomicWriteFile and ReinitializeDevice requests.
//!
//! ## Layout
//!
//! - [`network`] - NPDU header codec and the receive rule
//! - [`encoding`] - application and context tag primitives
//! - [`object`] - object registry, dispatch engine and the object types
//! - [`service`] - request and acknowledgement codecs
//! - [`app`] - confirmed request handling and reply APDUs
//! - [`storage`] - persistent settings for the device name and instance
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use bacnet_device::app::ApplicationHandler;
//! use bacnet_device::object::analog::AnalogObjects;
//! use bacnet_device::object::device::{DeviceConfig, DeviceObject};
//! use bacnet_device::object::{ObjectRegistry, PropertyDispatcher};
//! use bacnet_device::storage::MemoryKeyValueStore;
//!
//! let device = Arc::new(DeviceObject::new(
//!     DeviceConfig { instance: 1234, ..DeviceConfig::default() },
//!     Arc::new(MemoryKeyValueStore::new()),
//! ));
//! let registry = ObjectRegistry::builder()
//!     .with_device(device.clone())
//!     .add_object(Arc::new(AnalogObjects::inputs(4)))
//!     .build()
//!     .unwrap();
//! registry.init_all().unwrap();
//!
//! let handler = ApplicationHandler::new(PropertyDispatcher::new(Arc::new(registry)), device);
//! // NPDU without addresses, then ReadProperty analog-input,2 present-value
//! let frame = [0x01, 0x04, 0x00, 0x05, 0x01, 0x0C, 0x0C, 0x00, 0x00, 0x00, 0x02, 0x19, 0x55];
//! let reply = handler.handle_frame(&frame).unwrap().unwrap();
//! assert_eq!(&reply[..5], &[0x01, 0x00, 0x30, 0x01, 0x0C]);
//! ```

pub mod app;
pub mod encoding;
pub mod network;
pub mod object;
pub mod service;
pub mod storage;
pub mod util;

pub use app::{ApplicationError, ApplicationHandler};
pub use encoding::{ApplicationTag, EncodingError};
pub use network::{Address, NetworkError, NpduHeader};
pub use object::{
    DispatchError, ObjectIdentifier, ObjectRegistry, ObjectType, PropertyDispatcher, PropertyError,
    PropertyIdentifier,
};
pub use service::{ConfirmedServiceChoice, ServiceError};

pub const BACNET_PROTOCOL_VERSION: u8 = 1;
pub const BACNET_PROTOCOL_REVISION: u8 = 14;
pub const BACNET_MAX_APDU: usize = 1476;
/// Largest instance number; on a device identifier it is also the wildcard
pub const BACNET_MAX_INSTANCE: u32 = 0x3FFFFF;

#[cfg(test)]
mod tests {
    use crate::object::ObjectIdentifier;
    use crate::util::{decode_object_id, encode_object_id};
    use crate::{ApplicationTag, EncodingError, ObjectType};

    #[test]
    fn test_reexports() {
        assert_eq!(ApplicationTag::Boolean as u8, 1);
        assert_eq!(u16::from(ObjectType::AnalogInput), 0);

        let obj_id = ObjectIdentifier::new(ObjectType::Device, 123);
        assert_eq!(obj_id.instance, 123);
        assert!(obj_id.is_valid());
        assert_eq!(EncodingError::InvalidTag.to_string(), "invalid tag");
    }

    #[test]
    fn test_object_id_round_trip() {
        let encoded = encode_object_id(8, 123).unwrap();
        assert_eq!(decode_object_id(encoded), (8, 123));
    }
}
