//! File Device Example
//!
//! Builds a device with analog, binary and file objects backed by the
//! current directory, then feeds it a few request frames and prints the
//! replies. Pass a device instance as the first argument.

use std::sync::Arc;

use bacnet_device::app::ApplicationHandler;
use bacnet_device::network::{self, Address, NetworkPriority, NpduHeader};
use bacnet_device::object::analog::AnalogObjects;
use bacnet_device::object::binary::BinaryObjects;
use bacnet_device::object::device::{DeviceConfig, DeviceObject};
use bacnet_device::object::file::{FileEntry, FileObjects};
use bacnet_device::object::{ObjectIdentifier, ObjectRegistry, ObjectType, PropertyDispatcher};
use bacnet_device::service::{
    AtomicReadFileRequest, AtomicWriteFileRequest, ConfirmedServiceChoice, ReadPropertyRequest,
};
use bacnet_device::storage::MemoryKeyValueStore;
use bacnet_device::util::hex_dump;
use bacnet_device::PropertyIdentifier;

fn request(invoke_id: u8, service: ConfirmedServiceChoice, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::new();
    // header without addresses cannot fail
    let _ = network::encode(
        &mut frame,
        None,
        None,
        &NpduHeader::for_apdu(true, NetworkPriority::Normal),
    );
    frame.extend_from_slice(&[0x00, 0x05, invoke_id, service as u8]);
    frame.extend_from_slice(data);
    frame
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    println!("BACnet File Device Example");
    println!("==========================\n");

    let instance: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(260001);

    let device = Arc::new(DeviceObject::new(
        DeviceConfig {
            instance,
            model_name: "File Device Example".into(),
            ..DeviceConfig::default()
        },
        Arc::new(MemoryKeyValueStore::new()),
    ));
    let dir = std::env::temp_dir().join("bacnet-file-device");
    std::fs::create_dir_all(&dir)?;
    let files = Arc::new(FileObjects::on_filesystem(FileEntry::defaults(), &dir));

    let registry = ObjectRegistry::builder()
        .with_device(device.clone())
        .add_object(Arc::new(AnalogObjects::inputs(2)))
        .add_object(Arc::new(BinaryObjects::outputs(2)))
        .add_object(files.clone())
        .build()?;
    registry.init_all()?;

    println!("Device {} ({})", device.instance()?, device.name()?);
    println!("Files under {}\n", dir.display());

    let handler =
        ApplicationHandler::new(PropertyDispatcher::new(Arc::new(registry)), device.clone())
            .with_files(files);

    let device_id = ObjectIdentifier::new(ObjectType::Device, instance);
    let file_id = ObjectIdentifier::new(ObjectType::File, 0);
    let mut frames = Vec::new();

    let mut data = Vec::new();
    ReadPropertyRequest::new(device_id, PropertyIdentifier::ObjectList).encode(&mut data)?;
    frames.push((
        "ReadProperty object-list",
        request(1, ConfirmedServiceChoice::ReadProperty, &data),
    ));

    let mut data = Vec::new();
    AtomicWriteFileRequest::stream(file_id, 0, b"hello from bacnet".to_vec()).encode(&mut data)?;
    frames.push((
        "AtomicWriteFile",
        request(2, ConfirmedServiceChoice::AtomicWriteFile, &data),
    ));

    let mut data = Vec::new();
    AtomicReadFileRequest::stream(file_id, 0, 64).encode(&mut data)?;
    frames.push((
        "AtomicReadFile",
        request(3, ConfirmedServiceChoice::AtomicReadFile, &data),
    ));

    for (label, frame) in frames {
        println!("{label}");
        println!("  -> {}", hex_dump(&frame));
        match handler.handle_frame(&frame)? {
            Some(reply) => {
                let decoded = network::decode(&reply)?;
                let to = if decoded.destination == Address::default() {
                    "local".to_string()
                } else {
                    format!("network {}", decoded.destination.network)
                };
                println!("  <- {} ({to})", hex_dump(&reply));
            }
            None => println!("  <- no reply"),
        }
    }

    Ok(())
}
